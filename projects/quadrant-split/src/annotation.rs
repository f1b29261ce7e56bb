// LabelMe annotation documents
//
// Documents and shapes keep their raw JSON objects. Only the keys this tool
// rewrites are parsed out; on write they go back into their original slots,
// so key order, integer coordinates and unknown fields survive.

use crate::pipeline::types::Region;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

pub const DEFAULT_SHAPE_TYPE: &str = "polygon";

fn parse_points(value: &Value) -> Result<(Vec<[f64; 2]>, bool)> {
    let list = value
        .as_array()
        .ok_or_else(|| anyhow!("points must be an array, got {}", value))?;

    let mut integer_coords = true;
    let mut points = Vec::with_capacity(list.len());
    for (i, p) in list.iter().enumerate() {
        let coords = match p.as_array() {
            Some(c) if c.len() == 2 => c,
            _ => anyhow::bail!("point {} is not an [x, y] pair: {}", i, p),
        };
        let mut xy = [0.0; 2];
        for (slot, c) in xy.iter_mut().zip(coords) {
            *slot = c
                .as_f64()
                .ok_or_else(|| anyhow!("point {} has a non-numeric coordinate: {}", i, c))?;
            integer_coords &= c.is_i64() || c.is_u64();
        }
        points.push(xy);
    }

    Ok((points, integer_coords))
}

/// Whole values are written back as integers when the source used integers.
fn coord_value(v: f64, integer_coords: bool) -> Value {
    if integer_coords && v.fract() == 0.0 && v.abs() < 9.0e15 {
        Value::from(v as i64)
    } else {
        Value::from(v)
    }
}

/// A single annotated shape
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Shape {
    pub label: String,
    pub points: Vec<[f64; 2]>,
    /// Every source coordinate was a JSON integer
    integer_coords: bool,
    /// The shape object as read; `label` and `points` are refreshed on write
    fields: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for Shape {
    type Error = anyhow::Error;

    fn try_from(fields: Map<String, Value>) -> Result<Self> {
        let points = fields
            .get("points")
            .ok_or_else(|| anyhow!("shape has no points"))?;
        let (points, integer_coords) = parse_points(points)?;
        Ok(Self::from_fields(fields, points, integer_coords))
    }
}

impl From<Shape> for Map<String, Value> {
    fn from(shape: Shape) -> Self {
        let mut fields = shape.fields;
        if fields.contains_key("label") || !shape.label.is_empty() {
            fields.insert("label".to_string(), Value::String(shape.label));
        }
        let points = shape
            .points
            .iter()
            .map(|[x, y]| {
                Value::Array(vec![
                    coord_value(*x, shape.integer_coords),
                    coord_value(*y, shape.integer_coords),
                ])
            })
            .collect();
        fields.insert("points".to_string(), Value::Array(points));
        fields
    }
}

impl Shape {
    /// Builds a shape from an object whose `points` entry is replaced by `points`.
    pub fn from_fields(
        fields: Map<String, Value>,
        points: Vec<[f64; 2]>,
        integer_coords: bool,
    ) -> Self {
        let label = match fields.get("label") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Self {
            label,
            points,
            integer_coords,
            fields,
        }
    }

    /// Copy of this shape with its points replaced. All other keys carry over.
    pub fn with_points(&self, points: Vec<[f64; 2]>) -> Self {
        Self {
            points,
            ..self.clone()
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Sets a passthrough key. `label` and `points` are owned by their fields.
    pub fn set(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    /// `shape_type`, or `"polygon"` when absent or not a string
    pub fn shape_type(&self) -> &str {
        self.fields
            .get("shape_type")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SHAPE_TYPE)
    }

    pub fn is_polygon(&self) -> bool {
        self.shape_type() == DEFAULT_SHAPE_TYPE
    }
}

/// Reads `imageWidth`/`imageHeight`. Missing or null reads as 0; whole floats
/// such as `100.0` are accepted.
fn read_dimension(fields: &Map<String, Value>, key: &str) -> Result<u32> {
    let value = match fields.get(key) {
        None | Some(Value::Null) => return Ok(0),
        Some(v) => v,
    };
    let n = value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        })
        .ok_or_else(|| anyhow!("{} must be a non-negative integer, got {}", key, value))?;
    u32::try_from(n).with_context(|| format!("{} out of range: {}", key, n))
}

/// A LabelMe annotation file
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct AnnotationDocument {
    pub shapes: Vec<Shape>,
    pub image_path: String,
    pub image_width: u32,
    pub image_height: u32,
    /// The document object as read; the four fields above are refreshed on write
    fields: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for AnnotationDocument {
    type Error = anyhow::Error;

    fn try_from(mut fields: Map<String, Value>) -> Result<Self> {
        let raw_shapes = fields
            .get_mut("shapes")
            .ok_or_else(|| anyhow!("annotation has no shapes"))?
            .take();
        let list = match raw_shapes {
            Value::Array(list) => list,
            other => anyhow::bail!("shapes must be an array, got {}", other),
        };

        let mut shapes = Vec::with_capacity(list.len());
        for (i, raw) in list.into_iter().enumerate() {
            let shape = match raw {
                Value::Object(obj) => Shape::try_from(obj),
                other => Err(anyhow!("not an object: {}", other)),
            }
            .with_context(|| format!("Invalid shape {}", i))?;
            shapes.push(shape);
        }

        let image_path = fields
            .get("imagePath")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let image_width = read_dimension(&fields, "imageWidth")?;
        let image_height = read_dimension(&fields, "imageHeight")?;

        Ok(Self {
            shapes,
            image_path,
            image_width,
            image_height,
            fields,
        })
    }
}

impl From<AnnotationDocument> for Map<String, Value> {
    fn from(doc: AnnotationDocument) -> Self {
        let mut fields = doc.fields;
        let shapes = doc
            .shapes
            .into_iter()
            .map(|s| Value::Object(s.into()))
            .collect();
        fields.insert("shapes".to_string(), Value::Array(shapes));
        fields.insert("imagePath".to_string(), Value::String(doc.image_path));
        fields.insert("imageWidth".to_string(), Value::from(doc.image_width));
        fields.insert("imageHeight".to_string(), Value::from(doc.image_height));
        fields
    }
}

impl AnnotationDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read annotation file {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse annotation file {:?}", path))
    }

    /// Writes the document with LabelMe's 4-space indentation.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)
            .with_context(|| format!("Failed to serialize annotation for {:?}", path))?;
        fs::write(path, buf).with_context(|| format!("Failed to write annotation {:?}", path))
    }

    /// Top-level passthrough key (`version`, `flags`, `imageData`, ...)
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Builds the document for one region. The source document is cloned
    /// first and never mutated.
    pub fn for_region(
        &self,
        region: &Region,
        image_name: &str,
        shapes: Vec<Shape>,
        strip_image_data: bool,
    ) -> Self {
        let mut doc = self.clone();
        doc.shapes = shapes;
        doc.image_path = image_name.to_string();
        doc.image_width = region.width;
        doc.image_height = region.height;
        if strip_image_data {
            if let Some(data) = doc.fields.get_mut("imageData") {
                *data = Value::Null;
            }
        }
        doc
    }
}
