// Split pipeline: region geometry, annotation remapping, output writing

pub mod crop;
pub mod finalize;
pub mod geometry;
pub mod mask;
pub mod mask_remap;
pub mod orchestrator;
pub mod point_remap;
pub mod slicing;
pub mod types;
