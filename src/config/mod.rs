// src/config/mod.rs

//! Settings loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a settings file from disk (`loader.rs`).
//! - Validate it into a [`ConfigFile`] (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, resolve};
pub use model::{
    ConfigFile, RawConfigFile, RawSettingsSection, RawTaskSettings, SettingsSection,
    TaskSettings,
};
