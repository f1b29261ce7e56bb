//! Split an image into a grid of sub-images (quadrants by default) and remap
//! its LabelMe polygon annotations onto each piece.

pub mod annotation;
pub mod pipeline;
pub mod run_artifacts;
pub mod run_context;

pub use annotation::{AnnotationDocument, Shape};
pub use pipeline::orchestrator::{split_and_remap, split_directory};
pub use pipeline::types::{GridSpec, PointPolicy, Region, SplitConfig, Variant};
pub use run_artifacts::{OutputArtifact, RunManifest};
