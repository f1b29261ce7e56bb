use crate::annotation::AnnotationDocument;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Creates the output directory (and parents) if it does not exist yet.
pub fn prepare_output_dir(output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))
}

/// Lists annotation files under `root`, sorted by path.
pub fn discover_annotations(root: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|s| s.to_lowercase() == "json")
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    found.sort();
    found
}

/// Resolves a document's `imagePath` relative to the annotation file.
pub fn resolve_image_path(json_path: &Path, doc: &AnnotationDocument) -> Result<PathBuf> {
    if doc.image_path.is_empty() {
        anyhow::bail!("Annotation {:?} has no imagePath", json_path);
    }
    let image_path = Path::new(&doc.image_path);
    if image_path.is_absolute() {
        return Ok(image_path.to_path_buf());
    }
    let base = json_path.parent().unwrap_or_else(|| Path::new(""));
    Ok(base.join(image_path))
}

/// Output directory for one annotation file in a batch run.
pub fn batch_output_dir(output_root: &Path, json_path: &Path) -> Result<PathBuf> {
    let stem = json_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid annotation file name: {:?}", json_path))?;
    Ok(output_root.join(stem))
}
