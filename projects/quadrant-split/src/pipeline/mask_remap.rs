use crate::annotation::Shape;
use crate::pipeline::crop::crop_region;
use crate::pipeline::mask::{instance_ids, trace_instance, InstanceMask, InstanceTable};
use crate::pipeline::types::{Region, RegionShapes};
use anyhow::Result;

/// Re-extracts polygons for one region from its slice of the instance mask.
///
/// An instance cut into several pieces yields one shape per piece, each with
/// the metadata of the shape it was rasterized from.
pub fn shapes_for_region(
    mask: &InstanceMask,
    table: &InstanceTable,
    region: &Region,
) -> Result<Vec<Shape>> {
    let tile = crop_region(mask, region);
    let mut shapes = Vec::new();

    for instance_id in instance_ids(&tile) {
        let template = table.get(instance_id).ok_or_else(|| {
            anyhow::anyhow!(
                "Instance {} in region {} has no source shape ({} known)",
                instance_id,
                region.index,
                table.len()
            )
        })?;

        for contour in trace_instance(&tile, instance_id) {
            shapes.push(template.instantiate(contour));
        }
    }

    Ok(shapes)
}

/// Computes the shapes of every region.
pub fn remap_regions(
    mask: &InstanceMask,
    table: &InstanceTable,
    regions: &[Region],
) -> Result<Vec<RegionShapes>> {
    regions
        .iter()
        .map(|region| {
            let shapes = shapes_for_region(mask, table, region)?;
            tracing::debug!("Region {}: {} shape(s)", region.index, shapes.len());
            Ok(RegionShapes {
                region: *region,
                shapes,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::mask::rasterize;
    use crate::pipeline::slicing::compute_regions;
    use crate::pipeline::types::GridSpec;
    use image::Luma;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn shape(label: &str, points: &[[f64; 2]]) -> Shape {
        serde_json::from_value(json!({
            "label": label,
            "points": points,
            "flags": { "occluded": true },
            "group_id": 3,
        }))
        .unwrap()
    }

    fn quadrants() -> Vec<Region> {
        compute_regions(100, 100, &GridSpec::default()).unwrap()
    }

    fn vertex_set(points: &[[f64; 2]]) -> BTreeSet<(i64, i64)> {
        points.iter().map(|[x, y]| (*x as i64, *y as i64)).collect()
    }

    #[test]
    fn test_square_becomes_four_rectangles() {
        let shapes = vec![shape(
            "square",
            &[[10.0, 10.0], [90.0, 10.0], [90.0, 90.0], [10.0, 90.0]],
        )];
        let (mask, table) = rasterize(&shapes, 100, 100);
        let out = remap_regions(&mask, &table, &quadrants()).unwrap();

        let expected = [
            BTreeSet::from([(10, 10), (49, 10), (49, 49), (10, 49)]),
            BTreeSet::from([(0, 10), (40, 10), (40, 49), (0, 49)]),
            BTreeSet::from([(10, 0), (49, 0), (49, 40), (10, 40)]),
            BTreeSet::from([(0, 0), (40, 0), (40, 40), (0, 40)]),
        ];
        for (r, want) in out.iter().zip(expected.iter()) {
            assert_eq!(r.shapes.len(), 1, "region {}", r.region.index);
            let s = &r.shapes[0];
            assert_eq!(s.points.len(), 4);
            assert_eq!(&vertex_set(&s.points), want);
            assert_eq!(s.label, "square");
            assert_eq!(s.shape_type(), "polygon");
            assert_eq!(s.get("flags"), Some(&json!({ "occluded": true })));
            // only the six LabelMe shape fields are rebuilt
            let value = serde_json::to_value(s).unwrap();
            let keys: Vec<&str> = value
                .as_object()
                .unwrap()
                .keys()
                .map(String::as_str)
                .collect();
            assert_eq!(
                keys,
                ["label", "line_color", "fill_color", "points", "shape_type", "flags"]
            );
            assert!(value["points"][0][0].is_i64());
        }
    }

    #[test]
    fn test_fragmented_instance_yields_one_shape_per_piece() {
        // a bar crossing the vertical midline in the top half
        let shapes = vec![shape(
            "bar",
            &[[10.0, 10.0], [90.0, 10.0], [90.0, 30.0], [10.0, 30.0]],
        )];
        let (mask, table) = rasterize(&shapes, 100, 100);
        let out = remap_regions(&mask, &table, &quadrants()).unwrap();

        let all: Vec<&Shape> = out.iter().flat_map(|r| r.shapes.iter()).collect();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|s| s.label == "bar"));
        assert_eq!(out[0].shapes.len(), 1);
        assert_eq!(out[1].shapes.len(), 1);
    }

    #[test]
    fn test_disjoint_pieces_inside_one_region() {
        // a U whose arms are cut apart by the horizontal midline
        let shapes = vec![shape(
            "u",
            &[
                [5.0, 40.0],
                [45.0, 40.0],
                [45.0, 90.0],
                [35.0, 90.0],
                [35.0, 45.0],
                [15.0, 45.0],
                [15.0, 90.0],
                [5.0, 90.0],
            ],
        )];
        let (mask, table) = rasterize(&shapes, 100, 100);
        let out = remap_regions(&mask, &table, &quadrants()).unwrap();
        assert_eq!(out[0].shapes.len(), 1);
        assert_eq!(out[2].shapes.len(), 2);
        assert!(out[1].shapes.is_empty());
        assert!(out[3].shapes.is_empty());
    }

    #[test]
    fn test_unknown_instance_is_an_error() {
        let mut mask = InstanceMask::new(100, 100);
        for y in 0..10 {
            for x in 0..10 {
                mask.put_pixel(x, y, Luma([9]));
            }
        }
        let err = remap_regions(&mask, &InstanceTable::default(), &quadrants()).unwrap_err();
        assert!(err.to_string().contains("Instance 9"));
    }
}
