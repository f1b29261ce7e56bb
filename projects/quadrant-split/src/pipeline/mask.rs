// Instance mask rasterization and outer-contour tracing
//
// Every shape gets a 1-based instance index matching its position in the
// source list. The index -> metadata mapping is recorded in an InstanceTable
// at rasterization time so later lookups never depend on list order.

use crate::annotation::Shape;
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Per-pixel instance indices; 0 is background.
pub type InstanceMask = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Metadata inherited by every polygon traced from one instance
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeTemplate {
    pub label: String,
    pub line_color: Value,
    pub fill_color: Value,
    pub shape_type: String,
    pub flags: Value,
}

impl ShapeTemplate {
    pub fn from_shape(shape: &Shape) -> Self {
        let field = |key: &str| shape.get(key).cloned().unwrap_or(Value::Null);
        let flags = match shape.get("flags") {
            Some(Value::Object(map)) => Value::Object(map.clone()),
            _ => Value::Object(Map::new()),
        };
        Self {
            label: shape.label.clone(),
            line_color: field("line_color"),
            fill_color: field("fill_color"),
            shape_type: shape.shape_type().to_string(),
            flags,
        }
    }

    /// Builds an output shape with the six LabelMe keys; other per-shape
    /// fields are not inherited.
    pub fn instantiate(&self, points: Vec<[f64; 2]>) -> Shape {
        let mut fields = Map::new();
        fields.insert("label".to_string(), Value::String(self.label.clone()));
        fields.insert("line_color".to_string(), self.line_color.clone());
        fields.insert("fill_color".to_string(), self.fill_color.clone());
        fields.insert("points".to_string(), Value::Null);
        fields.insert(
            "shape_type".to_string(),
            Value::String(self.shape_type.clone()),
        );
        fields.insert("flags".to_string(), self.flags.clone());
        Shape::from_fields(fields, points, true)
    }
}

/// Instance index -> shape metadata
#[derive(Debug, Clone, Default)]
pub struct InstanceTable {
    entries: BTreeMap<u32, ShapeTemplate>,
}

impl InstanceTable {
    pub fn get(&self, instance_id: u32) -> Option<&ShapeTemplate> {
        self.entries.get(&instance_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Vertices are clamped to this many pixels either side of the origin before
/// scan filling. Edge differences stay well inside `i32` and the outline pass
/// walks at most a few million pixels per edge.
const COORD_LIMIT: f64 = 1_048_576.0;

/// Clamps, truncates toward zero, drops consecutive duplicates and a closing
/// point equal to the first.
fn to_pixel_polygon(points: &[[f64; 2]]) -> Vec<Point<i32>> {
    let to_pixel = |v: f64| v.clamp(-COORD_LIMIT, COORD_LIMIT) as i32;
    let mut poly: Vec<Point<i32>> = Vec::with_capacity(points.len());
    for [x, y] in points {
        let p = Point::new(to_pixel(*x), to_pixel(*y));
        if poly.last() != Some(&p) {
            poly.push(p);
        }
    }
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    poly
}

/// Scan-fills every shape into one instance mask, later shapes on top.
pub fn rasterize(shapes: &[Shape], width: u32, height: u32) -> (InstanceMask, InstanceTable) {
    let mut mask = InstanceMask::new(width, height);
    let mut table = InstanceTable::default();

    for (idx, shape) in shapes.iter().enumerate() {
        let instance_id = idx as u32 + 1;
        table
            .entries
            .insert(instance_id, ShapeTemplate::from_shape(shape));

        let poly = to_pixel_polygon(&shape.points);
        match poly.len() {
            0 => {
                tracing::debug!("Shape {} ({}) has no points", idx, shape.label);
            }
            1 => {
                let p = poly[0];
                if p.x >= 0 && p.y >= 0 && (p.x as u32) < width && (p.y as u32) < height {
                    mask.put_pixel(p.x as u32, p.y as u32, Luma([instance_id]));
                }
            }
            _ => draw_polygon_mut(&mut mask, &poly, Luma([instance_id])),
        }
    }

    (mask, table)
}

/// Unique nonzero instance ids, ascending.
pub fn instance_ids(mask: &InstanceMask) -> Vec<u32> {
    mask.pixels()
        .map(|p| p[0])
        .filter(|&id| id != 0)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Binary mask of one instance with a one-pixel background border, so that
/// pixels on the tile edge still start an outer contour.
fn padded_binary_mask(mask: &InstanceMask, instance_id: u32) -> GrayImage {
    let (w, h) = mask.dimensions();
    GrayImage::from_fn(w + 2, h + 2, |x, y| {
        if x == 0 || y == 0 || x > w || y > h {
            return Luma([0]);
        }
        if mask.get_pixel(x - 1, y - 1)[0] == instance_id {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Drops points that continue in the same step direction as the previous one.
///
/// Contour chains move one pixel at a time, so equal steps mean collinear
/// points; horizontal, vertical and diagonal runs collapse to their endpoints.
pub fn simplify_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let curr = points[i];
            let next = points[(i + 1) % n];
            (curr.x - prev.x, curr.y - prev.y) != (next.x - curr.x, next.y - curr.y)
        })
        .map(|i| points[i])
        .collect()
}

/// Outer contours of one instance, simplified. Contours with fewer than three
/// vertices are discarded.
pub fn trace_instance(mask: &InstanceMask, instance_id: u32) -> Vec<Vec<[f64; 2]>> {
    let binary = padded_binary_mask(mask, instance_id);

    find_contours::<i32>(&binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| {
            let simplified = simplify_chain(&c.points);
            if simplified.len() < 3 {
                return None;
            }
            Some(
                simplified
                    .iter()
                    .map(|p| [(p.x - 1) as f64, (p.y - 1) as f64])
                    .collect(),
            )
        })
        .collect()
}
