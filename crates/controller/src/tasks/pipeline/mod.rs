pub mod client;
pub mod vars;

pub use client::{KubePipelinePlatform, PipelineOptions, PipelinePlatform, PipelineTrigger};
