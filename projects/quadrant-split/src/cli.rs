use anyhow::Result;
use clap::{Parser, Subcommand};
use quadrant_split::{GridSpec, PointPolicy, SplitConfig, Variant};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Split one image and its annotation file
    Split {
        /// Source image
        #[arg(long, env = "QUADRANT_SPLIT_IMAGE")]
        image: PathBuf,

        /// LabelMe annotation for the source image
        #[arg(long, env = "QUADRANT_SPLIT_ANNOTATION")]
        annotation: PathBuf,

        /// Directory for sub_image_{i}.jpg / .json (created if absent)
        #[arg(long, env = "QUADRANT_SPLIT_OUTPUT_DIR")]
        output_dir: PathBuf,

        #[command(flatten)]
        options: SplitOptions,
    },
    /// Split every annotation file found under a directory
    Batch {
        /// Directory searched recursively for *.json annotations
        #[arg(long, env = "QUADRANT_SPLIT_INPUT_DIR")]
        input_dir: PathBuf,

        /// Each annotation's outputs go to <output-root>/<annotation stem>/
        #[arg(long, env = "QUADRANT_SPLIT_OUTPUT_ROOT")]
        output_root: PathBuf,

        #[command(flatten)]
        options: SplitOptions,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct SplitOptions {
    /// Remap strategy
    #[arg(long, value_enum, default_value_t = Variant::Points, env = "QUADRANT_SPLIT_VARIANT")]
    pub variant: Variant,

    /// What the points variant does with vertices outside a region
    #[arg(
        long,
        value_enum,
        default_value_t = PointPolicy::Drop,
        env = "QUADRANT_SPLIT_POINT_POLICY"
    )]
    pub point_policy: PointPolicy,

    /// Grid rows
    #[arg(
        long,
        default_value_t = 2,
        value_parser = clap::value_parser!(u32).range(1..),
        env = "QUADRANT_SPLIT_ROWS"
    )]
    pub rows: u32,

    /// Grid columns
    #[arg(
        long,
        default_value_t = 2,
        value_parser = clap::value_parser!(u32).range(1..),
        env = "QUADRANT_SPLIT_COLS"
    )]
    pub cols: u32,

    /// Null out embedded imageData in the written annotations
    #[arg(long, env = "QUADRANT_SPLIT_STRIP_IMAGE_DATA")]
    pub strip_image_data: bool,

    /// Also write manifest.json describing the run
    #[arg(long, env = "QUADRANT_SPLIT_MANIFEST")]
    pub manifest: bool,
}

impl SplitOptions {
    pub fn to_config(&self) -> SplitConfig {
        SplitConfig {
            variant: self.variant,
            point_policy: self.point_policy,
            grid: GridSpec::new(self.rows, self.cols),
            strip_image_data: self.strip_image_data,
            write_manifest: self.manifest,
        }
    }
}

fn require_file(path: &Path, what: &str) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!("{} not found: {:?}", what, path);
    }
    Ok(())
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Checks that the input paths exist before any work starts.
    pub fn validate(&self) -> Result<()> {
        match &self.command {
            Command::Split {
                image, annotation, ..
            } => {
                require_file(image, "Image")?;
                require_file(annotation, "Annotation")?;
            }
            Command::Batch { input_dir, .. } => {
                if !input_dir.is_dir() {
                    anyhow::bail!("Input directory not found: {:?}", input_dir);
                }
            }
        }
        Ok(())
    }
}
