//! Shared types, error model, and configuration for noteharvest.
//!
//! This crate is the foundation depended on by all other noteharvest crates.
//! It provides:
//! - [`HarvestError`] - the unified error type
//! - Domain types ([`Meta`], [`Note`], [`Stage`], [`ListingRecord`])
//! - Configuration ([`AppConfig`], [`HarvestConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BrowserConfig, DefaultsConfig, HarvestConfig, ListingConfig, SourceProfile,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{HarvestError, Result};
pub use types::{
    ListingRecord, Markdown, MarkdownNote, Meta, Note, Raw, RawContent, RawNote, Readable,
    ReadableNote, Rendered, RenderedNote, Stage, StageKind,
};
