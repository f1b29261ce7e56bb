use crate::annotation::AnnotationDocument;
use crate::pipeline::crop::crop_region;
use crate::pipeline::types::RegionShapes;
use crate::run_artifacts::OutputArtifact;
use anyhow::{Context, Result};
use image::RgbImage;
use std::path::Path;

/// Writes `sub_image_{i}.jpg` and `sub_image_{i}.json` for every region.
pub fn write_outputs(
    image: &RgbImage,
    doc: &AnnotationDocument,
    results: Vec<RegionShapes>,
    output_dir: &Path,
    strip_image_data: bool,
) -> Result<Vec<OutputArtifact>> {
    let mut artifacts = Vec::with_capacity(results.len());

    for RegionShapes { region, shapes } in results {
        let stem = region.file_stem();
        let image_name = format!("{}.jpg", stem);
        let image_path = output_dir.join(&image_name);
        let annotation_path = output_dir.join(format!("{}.json", stem));

        let tile = crop_region(image, &region);
        tile.save(&image_path)
            .with_context(|| format!("Failed to write sub-image {:?}", image_path))?;

        let shape_count = shapes.len();
        let region_doc = doc.for_region(&region, &image_name, shapes, strip_image_data);
        region_doc.save(&annotation_path)?;

        tracing::info!(
            "Wrote {} ({}x{} at {},{}) with {} shape(s)",
            image_name,
            region.width,
            region.height,
            region.x,
            region.y,
            shape_count
        );

        artifacts.push(OutputArtifact {
            index: region.index,
            image_path,
            annotation_path,
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
            shape_count,
        });
    }

    Ok(artifacts)
}
