// Run artifact struct definitions
//
// This module contains the struct definitions for artifacts that are persisted
// as JSON files within a run's output directory.

use crate::pipeline::types::{GridSpec, PointPolicy, Variant};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";

/// One written sub-image and its annotation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OutputArtifact {
    pub index: usize,
    pub image_path: PathBuf,
    pub annotation_path: PathBuf,
    /// Origin of the sub-image in the source image
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub shape_count: usize,
}

/// Record of a split run, written as manifest.json when requested
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RunManifest {
    pub created_at: DateTime<Utc>,
    pub source_image: PathBuf,
    pub source_annotation: PathBuf,
    pub variant: Variant,
    pub point_policy: PointPolicy,
    pub grid: GridSpec,
    pub artifacts: Vec<OutputArtifact>,
}

impl RunManifest {
    pub fn save(&self, output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(MANIFEST_FILE);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write manifest {:?}", path))?;
        Ok(path)
    }

    pub fn load(output_dir: &Path) -> Result<Self> {
        let path = output_dir.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read manifest {:?}", path))?;
        Ok(serde_json::from_str(&content)?)
    }
}
