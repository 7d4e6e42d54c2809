//! Document loader.
//!
//! A config source is tried as a file first (YAML for `.yaml`/`.yml`, JSON otherwise),
//! then as an inline JSON string.

use crate::error::{ConfError, ConfResult};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Where a loaded document came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from a file on disk.
    File(PathBuf),
    /// Parsed from the source string itself.
    Inline,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Inline => write!(f, "inline JSON"),
        }
    }
}

/// A parsed configuration document and its origin.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document: Map<String, Value>,
    pub source: ConfigSource,
}

#[derive(Debug, Error)]
enum SourceError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("document root is not a mapping")]
    NotAMapping,
}

/// Load a configuration document from a file path or an inline JSON string.
pub fn load_document(source: &str) -> ConfResult<LoadedDocument> {
    let file_err = match read_file(Path::new(source)) {
        Ok((document, path)) => {
            debug!(path = %path.display(), "Loaded configuration file");
            return Ok(LoadedDocument {
                document,
                source: ConfigSource::File(path),
            });
        }
        Err(e) => e,
    };

    debug!(error = %file_err, "Config source is not a readable file, trying inline JSON");
    match parse_inline(source) {
        Ok(document) => Ok(LoadedDocument {
            document,
            source: ConfigSource::Inline,
        }),
        Err(inline_err) => Err(ConfError::config_load(
            source,
            format!("as file: {}; as inline JSON: {}", file_err, inline_err),
        )),
    }
}

fn read_file(path: &Path) -> Result<(Map<String, Value>, PathBuf), SourceError> {
    let content = std::fs::read_to_string(path).map_err(|e| SourceError::Read {
        path: path.display().to_string(),
        source: e,
    })?;

    let value: Value = if is_yaml(path) {
        let mut yaml: serde_yaml::Value = serde_yaml::from_str(&content)?;
        yaml.apply_merge()?;
        serde_json::to_value(yaml)?
    } else {
        serde_json::from_str(&content)?
    };

    match value {
        Value::Object(map) => Ok((map, path.to_path_buf())),
        _ => Err(SourceError::NotAMapping),
    }
}

fn parse_inline(source: &str) -> Result<Map<String, Value>, SourceError> {
    match serde_json::from_str::<Value>(source)? {
        Value::Object(map) => Ok(map),
        _ => Err(SourceError::NotAMapping),
    }
}

fn is_yaml(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| {
            let name = name.to_lowercase();
            name.ends_with(".yaml") || name.ends_with(".yml")
        })
        .unwrap_or(false)
}
