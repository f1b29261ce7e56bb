// Point remap: assigns each shape's vertices to the regions that contain them.
//
// Vertices outside a region are dropped, not clipped, unless the clip policy
// is selected. Dropping can leave polygons with fewer than three points.

use crate::annotation::Shape;
use crate::pipeline::crop::to_region_coords;
use crate::pipeline::geometry::clip_polygon_to_region;
use crate::pipeline::types::{PointPolicy, Region, RegionShapes};

/// Keeps the vertices inside `region`, translated to region-local coordinates.
/// Returns `None` when no vertex qualifies.
pub fn remap_shape(shape: &Shape, region: &Region) -> Option<Shape> {
    let inside: Vec<[f64; 2]> = shape
        .points
        .iter()
        .copied()
        .filter(|[x, y]| region.contains(*x, *y))
        .collect();

    if inside.is_empty() {
        return None;
    }

    Some(shape.with_points(to_region_coords(&inside, region)))
}

/// Clips a polygon against `region`; one output shape per disjoint piece.
/// Non-polygon shapes fall back to [`remap_shape`].
pub fn clip_shape(shape: &Shape, region: &Region) -> Vec<Shape> {
    if !shape.is_polygon() || shape.points.len() < 3 {
        return remap_shape(shape, region).into_iter().collect();
    }

    clip_polygon_to_region(&shape.points, region)
        .into_iter()
        .map(|piece| shape.with_points(to_region_coords(&piece, region)))
        .collect()
}

/// Computes the shapes of every region.
pub fn remap_regions(
    shapes: &[Shape],
    regions: &[Region],
    policy: PointPolicy,
) -> Vec<RegionShapes> {
    regions
        .iter()
        .map(|region| {
            let remapped: Vec<Shape> = match policy {
                PointPolicy::Drop => shapes
                    .iter()
                    .filter_map(|shape| remap_shape(shape, region))
                    .collect(),
                PointPolicy::Clip => shapes
                    .iter()
                    .flat_map(|shape| clip_shape(shape, region))
                    .collect(),
            };

            let degenerate = remapped
                .iter()
                .filter(|s| s.is_polygon() && s.points.len() < 3)
                .count();
            if degenerate > 0 {
                tracing::warn!(
                    "Region {} has {} polygon(s) with fewer than 3 points after remap",
                    region.index,
                    degenerate
                );
            }
            tracing::debug!("Region {}: {} shape(s)", region.index, remapped.len());

            RegionShapes {
                region: *region,
                shapes: remapped,
            }
        })
        .collect()
}
