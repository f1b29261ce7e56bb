use crate::annotation::Shape;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which remapping strategy turns the source shapes into per-region shapes.
#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Keep the source vertices that fall inside each region.
    #[default]
    Points,
    /// Rasterize into an instance mask and re-trace polygons per region.
    Mask,
}

/// How the point variant treats vertices outside a region.
#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PointPolicy {
    /// Drop out-of-region vertices without clipping.
    #[default]
    Drop,
    /// Intersect polygons against the region rectangle.
    Clip,
}

/// Number of rows and columns the image is cut into.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
    pub rows: u32,
    pub cols: u32,
}

impl GridSpec {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    pub fn len(&self) -> usize {
        (self.rows * self.cols) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self { rows: 2, cols: 2 }
    }
}

/// Options for a single split run
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SplitConfig {
    pub variant: Variant,
    pub point_policy: PointPolicy,
    pub grid: GridSpec,
    /// Null out an embedded `imageData` payload, which would otherwise still
    /// hold the full source image.
    pub strip_image_data: bool,
    /// Write `manifest.json` next to the sub-images.
    pub write_manifest: bool,
}

/// A rectangular sub-image of the source, in source pixel coordinates.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub index: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Half-open membership test: `[x, x + width) × [y, y + height)`.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        let x1 = self.x as f64;
        let y1 = self.y as f64;
        px >= x1 && px < x1 + self.width as f64 && py >= y1 && py < y1 + self.height as f64
    }

    pub fn file_stem(&self) -> String {
        format!("sub_image_{}", self.index)
    }
}

/// Shapes computed for one region, ready to be written.
#[derive(Debug, Clone)]
pub struct RegionShapes {
    pub region: Region,
    pub shapes: Vec<Shape>,
}
