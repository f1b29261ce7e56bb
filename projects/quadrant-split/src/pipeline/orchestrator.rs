// Pipeline orchestrator: one split run from source files to written outputs
//
// load -> split -> remap -> write. Every region's shapes are computed before
// the first file is written, so a bad annotation never leaves a half-written
// output directory behind.

use crate::annotation::AnnotationDocument;
use crate::pipeline::finalize::write_outputs;
use crate::pipeline::slicing::compute_regions;
use crate::pipeline::types::{SplitConfig, Variant};
use crate::pipeline::{mask, mask_remap, point_remap};
use crate::run_artifacts::{OutputArtifact, RunManifest};
use crate::run_context::{
    batch_output_dir, discover_annotations, prepare_output_dir, resolve_image_path,
};
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;

/// Splits an image into grid regions and writes one remapped annotation per region.
pub fn split_and_remap(
    image_path: &Path,
    json_path: &Path,
    output_dir: &Path,
    config: &SplitConfig,
) -> Result<Vec<OutputArtifact>> {
    prepare_output_dir(output_dir)?;

    let image = image::open(image_path)
        .with_context(|| format!("Failed to decode image {:?}", image_path))?
        .to_rgb8();
    let doc = AnnotationDocument::load(json_path)?;

    let (width, height) = image.dimensions();
    if doc.image_width != 0 && (doc.image_width, doc.image_height) != (width, height) {
        tracing::warn!(
            "Annotation {:?} declares {}x{} but image is {}x{}",
            json_path,
            doc.image_width,
            doc.image_height,
            width,
            height
        );
    }

    let regions = compute_regions(width, height, &config.grid)
        .with_context(|| format!("Failed to split image {:?}", image_path))?;

    tracing::info!(
        "Splitting {:?} ({}x{}, {} shape(s)) into {} region(s) using {:?} remap",
        image_path,
        width,
        height,
        doc.shapes.len(),
        regions.len(),
        config.variant
    );

    let results = match config.variant {
        Variant::Points => point_remap::remap_regions(&doc.shapes, &regions, config.point_policy),
        Variant::Mask => {
            let (instance_mask, table) = mask::rasterize(&doc.shapes, width, height);
            mask_remap::remap_regions(&instance_mask, &table, &regions)
                .with_context(|| format!("Failed to remap annotations from {:?}", json_path))?
        }
    };

    let artifacts = write_outputs(&image, &doc, results, output_dir, config.strip_image_data)?;

    if config.write_manifest {
        let manifest = RunManifest {
            created_at: Utc::now(),
            source_image: image_path.to_path_buf(),
            source_annotation: json_path.to_path_buf(),
            variant: config.variant,
            point_policy: config.point_policy,
            grid: config.grid,
            artifacts: artifacts.clone(),
        };
        let path = manifest.save(output_dir)?;
        tracing::info!("Wrote manifest {:?}", path);
    }

    Ok(artifacts)
}

/// Runs [`split_and_remap`] for every annotation file under `input_dir`.
///
/// Each document's outputs go to `output_root/<json stem>/`. The first
/// failure aborts the batch.
pub fn split_directory(
    input_dir: &Path,
    output_root: &Path,
    config: &SplitConfig,
) -> Result<Vec<OutputArtifact>> {
    let annotations = discover_annotations(input_dir);
    if annotations.is_empty() {
        anyhow::bail!("No annotation files found under {:?}", input_dir);
    }
    tracing::info!(
        "Found {} annotation file(s) under {:?}",
        annotations.len(),
        input_dir
    );

    let mut all = Vec::new();
    for json_path in annotations {
        let doc = AnnotationDocument::load(&json_path)?;
        let image_path = resolve_image_path(&json_path, &doc)?;
        let output_dir = batch_output_dir(output_root, &json_path)?;
        let artifacts = split_and_remap(&image_path, &json_path, &output_dir, config)
            .with_context(|| format!("Failed to split {:?}", json_path))?;
        all.extend(artifacts);
    }

    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{GridSpec, PointPolicy};
    use image::{Rgb, RgbImage};
    use serde_json::json;
    use std::fs;
    use std::path::PathBuf;

    fn write_fixture(dir: &Path, width: u32, height: u32) -> (PathBuf, PathBuf) {
        let image_path = dir.join("00000.png");
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 90])
        })
        .save(&image_path)
        .unwrap();

        let json_path = dir.join("00000.json");
        let doc = json!({
            "version": "5.4.1",
            "flags": {},
            "shapes": [
                {
                    "label": "square",
                    "points": [[10, 10], [90, 10], [90, 90], [10, 90]],
                    "group_id": null,
                    "shape_type": "polygon",
                    "flags": {}
                }
            ],
            "imagePath": "00000.png",
            "imageData": null,
            "imageHeight": height,
            "imageWidth": width
        });
        fs::write(&json_path, serde_json::to_string(&doc).unwrap()).unwrap();
        (image_path, json_path)
    }

    fn config(variant: Variant) -> SplitConfig {
        SplitConfig {
            variant,
            ..SplitConfig::default()
        }
    }

    #[test]
    fn test_points_variant_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let (image_path, json_path) = write_fixture(dir.path(), 100, 100);
        let out_dir = dir.path().join("out");

        let artifacts =
            split_and_remap(&image_path, &json_path, &out_dir, &config(Variant::Points)).unwrap();
        assert_eq!(artifacts.len(), 4);

        let tl = AnnotationDocument::load(&out_dir.join("sub_image_0.json")).unwrap();
        assert_eq!(tl.image_path, "sub_image_0.jpg");
        assert_eq!(tl.shapes.len(), 1);
        assert_eq!(tl.shapes[0].points, vec![[10.0, 10.0]]);
        assert_eq!(tl.get("version"), Some(&json!("5.4.1")));
        assert!(!out_dir.join("manifest.json").exists());

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out_dir.join("sub_image_0.json")).unwrap())
                .unwrap();
        let top: Vec<&String> = raw.as_object().unwrap().keys().collect();
        assert_eq!(
            top,
            [
                "version",
                "flags",
                "shapes",
                "imagePath",
                "imageData",
                "imageHeight",
                "imageWidth"
            ]
        );
        assert_eq!(
            raw["shapes"][0],
            json!({
                "label": "square",
                "points": [[10, 10]],
                "group_id": null,
                "shape_type": "polygon",
                "flags": {}
            })
        );
    }

    #[test]
    fn test_mask_variant_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let (image_path, json_path) = write_fixture(dir.path(), 100, 100);
        let out_dir = dir.path().join("out");

        let artifacts =
            split_and_remap(&image_path, &json_path, &out_dir, &config(Variant::Mask)).unwrap();
        for artifact in &artifacts {
            assert_eq!(artifact.shape_count, 1);
            let doc = AnnotationDocument::load(&artifact.annotation_path).unwrap();
            assert_eq!(doc.shapes[0].label, "square");
            assert_eq!(doc.shapes[0].points.len(), 4);
        }
    }

    #[test]
    fn test_written_dimensions_match_annotations() {
        let dir = tempfile::tempdir().unwrap();
        let (image_path, json_path) = write_fixture(dir.path(), 101, 77);

        for variant in [Variant::Points, Variant::Mask] {
            let out_dir = dir.path().join(format!("out_{:?}", variant));
            let artifacts =
                split_and_remap(&image_path, &json_path, &out_dir, &config(variant)).unwrap();
            assert_eq!(artifacts.len(), 4);

            for i in 0..4 {
                let jpg = out_dir.join(format!("sub_image_{}.jpg", i));
                let json = out_dir.join(format!("sub_image_{}.json", i));
                let doc = AnnotationDocument::load(&json).unwrap();
                let (w, h) = image::image_dimensions(&jpg).unwrap();
                assert_eq!((doc.image_width, doc.image_height), (w, h));
                assert_eq!(doc.image_path, format!("sub_image_{}.jpg", i));
            }
        }
    }

    #[test]
    fn test_manifest_and_grid_options() {
        let dir = tempfile::tempdir().unwrap();
        let (image_path, json_path) = write_fixture(dir.path(), 90, 60);
        let out_dir = dir.path().join("nested").join("out");
        let cfg = SplitConfig {
            variant: Variant::Points,
            point_policy: PointPolicy::Clip,
            grid: GridSpec::new(2, 3),
            strip_image_data: true,
            write_manifest: true,
        };

        let artifacts = split_and_remap(&image_path, &json_path, &out_dir, &cfg).unwrap();
        assert_eq!(artifacts.len(), 6);

        let manifest = RunManifest::load(&out_dir).unwrap();
        assert_eq!(manifest.artifacts, artifacts);
        assert_eq!(manifest.grid, GridSpec::new(2, 3));
        assert_eq!(manifest.point_policy, PointPolicy::Clip);
    }

    #[test]
    fn test_missing_image_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (_, json_path) = write_fixture(dir.path(), 20, 20);
        let missing = dir.path().join("missing.jpg");
        let out_dir = dir.path().join("out");
        let err = split_and_remap(&missing, &json_path, &out_dir, &SplitConfig::default())
            .unwrap_err();
        assert!(format!("{:#}", err).contains("missing.jpg"));
    }

    #[test]
    fn test_malformed_json_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (image_path, json_path) = write_fixture(dir.path(), 20, 20);
        fs::write(&json_path, "{\"shapes\": [").unwrap();
        let out_dir = dir.path().join("out");

        let result = split_and_remap(&image_path, &json_path, &out_dir, &SplitConfig::default());
        assert!(result.is_err());
        assert!(!out_dir.join("sub_image_0.jpg").exists());
    }

    #[test]
    fn test_split_directory() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        fs::create_dir_all(&input).unwrap();
        write_fixture(&input, 40, 40);
        let output_root = dir.path().join("output");

        let artifacts = split_directory(&input, &output_root, &config(Variant::Mask)).unwrap();
        assert_eq!(artifacts.len(), 4);
        assert!(output_root.join("00000").join("sub_image_3.json").exists());
    }
}
