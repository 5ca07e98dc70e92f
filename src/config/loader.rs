// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;
use crate::model::TaskGraph;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// `Rex.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Rex.toml")
}

/// Read the config at `path`, falling back to defaults when `path` is the
/// default location and nothing is there.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if !path.exists() && path == default_config_path().as_path() {
        return ConfigFile::try_from(RawConfigFile::default());
    }
    load_and_validate(path)
}

/// Read a task graph submission from a JSON file.
pub fn load_graph(path: impl AsRef<Path>) -> Result<TaskGraph> {
    let contents = fs::read_to_string(path.as_ref())?;
    let graph: TaskGraph = serde_json::from_str(&contents)?;
    Ok(graph)
}
