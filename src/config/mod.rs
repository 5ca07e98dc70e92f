// src/config/mod.rs

//! Configuration loading and validation for the scheduler.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate value ranges and URLs (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    default_config_path, load_and_validate, load_from_path, load_graph, load_or_default,
};
pub use model::{
    AdmissionSection, ConfigFile, HttpSection, RawConfigFile, RetrySection, SchedulerSection,
};
