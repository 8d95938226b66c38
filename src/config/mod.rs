// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] contains the serde-mapped `Exerun.toml` structures and the
//!   validated [`ProjectConfig`] / [`ProjectDescriptor`].
//! - [`loader`] reads and parses TOML files.
//! - [`validate`] turns a [`RawConfigFile`] into a [`ProjectConfig`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, CONFIG_FILE_NAME};
pub use model::{
    PipelineSettings, ProjectConfig, ProjectDescriptor, ProjectSection, RawConfigFile,
    StyleSection, SubmitSection, ToolsSection,
};
