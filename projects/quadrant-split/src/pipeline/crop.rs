use crate::pipeline::types::Region;
use image::{GenericImageView, ImageBuffer, Pixel};

/// Copies a region out of an image or mask into its own buffer.
pub fn crop_region<I>(
    img: &I,
    region: &Region,
) -> ImageBuffer<I::Pixel, Vec<<I::Pixel as Pixel>::Subpixel>>
where
    I: GenericImageView + 'static,
    I::Pixel: 'static,
{
    image::imageops::crop_imm(img, region.x, region.y, region.width, region.height).to_image()
}

/// Transforms points from source coordinates to region-local coordinates.
pub fn to_region_coords(points: &[[f64; 2]], region: &Region) -> Vec<[f64; 2]> {
    let dx = region.x as f64;
    let dy = region.y as f64;
    points.iter().map(|[x, y]| [x - dx, y - dy]).collect()
}
