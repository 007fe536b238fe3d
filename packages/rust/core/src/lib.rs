//! Core pipeline orchestration for noteharvest.
//!
//! This crate ties together listing discovery, browser capture, readable
//! extraction, and Markdown conversion into the incremental `harvest` run.

pub mod harvest;
pub mod pipeline;
pub mod stage;

pub use harvest::{
    HarvestSummary, ProgressReporter, SilentProgress, WorkspaceStatus, harvest, workspace_status,
};
pub use pipeline::DocumentPipeline;
pub use stage::{CacheStats, Keyed, Memoized, Transform};
