use crate::pipeline::types::Region;
use geo::{Area, BooleanOps};
use geo_types::{coord, LineString, MultiPolygon, Polygon, Rect};

/// Convert annotation points to a geo_types Polygon
fn to_geo_polygon(points: &[[f64; 2]]) -> Polygon<f64> {
    let coords: Vec<(f64, f64)> = points.iter().map(|[x, y]| (*x, *y)).collect();
    Polygon::new(LineString::from(coords), vec![])
}

/// Convert each polygon's exterior ring back to an open point list
fn from_geo_multipolygon(mp: &MultiPolygon<f64>) -> Vec<Vec<[f64; 2]>> {
    mp.0.iter()
        .map(|poly| {
            let mut pts: Vec<[f64; 2]> = poly.exterior().coords().map(|c| [c.x, c.y]).collect();
            // geo rings are closed; annotations are not
            if pts.len() > 1 && pts.first() == pts.last() {
                pts.pop();
            }
            pts
        })
        .filter(|pts| pts.len() >= 3)
        .collect()
}

fn region_polygon(region: &Region) -> Polygon<f64> {
    let x1 = region.x as f64;
    let y1 = region.y as f64;
    Rect::new(
        coord! { x: x1, y: y1 },
        coord! { x: x1 + region.width as f64, y: y1 + region.height as f64 },
    )
    .to_polygon()
}

/// Intersects a polygon with a region rectangle.
///
/// Returns one point list per disjoint piece, in source coordinates. A polygon
/// that only touches the region along an edge yields nothing.
pub fn clip_polygon_to_region(points: &[[f64; 2]], region: &Region) -> Vec<Vec<[f64; 2]>> {
    if points.len() < 3 {
        return vec![];
    }
    let poly = to_geo_polygon(points);
    let clipped = poly.intersection(&region_polygon(region));
    from_geo_multipolygon(&clipped)
}

/// Unsigned shoelace area of a closed point list
pub fn polygon_area(points: &[[f64; 2]]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    to_geo_polygon(points).unsigned_area()
}
