//! Configuration module for evaltree
//!
//! This module handles engine configuration including:
//! - [`EngineSettings`]: script limits, hook policy, build validation, logging
//! - [`Definitions`]: named declarative node trees fed to the builder
//!
//! Both load from JSON or TOML, chosen by file extension (`.toml` is TOML,
//! anything else is JSON).
//!
//! # Example
//!
//! ```ignore
//! use evaltree::config::{Definitions, EngineSettings};
//!
//! let settings = EngineSettings::load_or_default("evaltree.toml");
//! let definitions = Definitions::load("rules.json")?;
//! ```

pub mod definitions;
pub mod settings;

pub use definitions::Definitions;
pub use settings::*;

use crate::error::{EngineError, Result, ResultExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// On-disk formats understood by the loaders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => FileFormat::Toml,
            _ => FileFormat::Json,
        }
    }

    pub fn parse<T: DeserializeOwned>(self, content: &str) -> Result<T> {
        match self {
            FileFormat::Json => serde_json::from_str(content)
                .map_err(|e| EngineError::Serialization(format!("Invalid JSON: {}", e))),
            FileFormat::Toml => toml::from_str(content)
                .map_err(|e| EngineError::Serialization(format!("Invalid TOML: {}", e))),
        }
    }

    pub fn render<T: Serialize>(self, value: &T) -> Result<String> {
        match self {
            FileFormat::Json => serde_json::to_string_pretty(value)
                .map_err(|e| EngineError::Serialization(format!("Failed to encode JSON: {}", e))),
            FileFormat::Toml => toml::to_string_pretty(value)
                .map_err(|e| EngineError::Serialization(format!("Failed to encode TOML: {}", e))),
        }
    }
}

/// Read and decode a file, format chosen by extension
pub(crate) fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        EngineError::Config(format!("Failed to read {:?}: {}", path, e))
    })?;
    FileFormat::from_path(path).parse(&content)
}

/// Encode and write a file, creating parent directories
pub(crate) fn write_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }
    }

    let content = FileFormat::from_path(path).render(value)?;
    std::fs::write(path, content)
        .map_err(|e| EngineError::Config(format!("Failed to write {:?}: {}", path, e)))
}

impl EngineSettings {
    /// Load settings from a JSON or TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        read_file(path).with_context(|| format!("Loading settings {:?}", path))
    }

    /// Load settings, falling back to defaults when the file is missing or invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load engine settings, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save settings to a JSON or TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_file(path.as_ref(), self)
    }
}
