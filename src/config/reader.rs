//! The configuration reader.

use super::loader::{ConfigSource, LoadedDocument, load_document};
use super::paths::resolve_paths;
use super::properties::{WORKING_DIR_KEY, resolve_properties};
use super::resolved::{ResolvedPaths, ResolvedProperties};
use super::shape::{DocumentShape, is_step_body};
use crate::error::{ConfError, ConfResult};
use crate::logging::Logger;
use crate::paths::get_working_dir_path;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::info;

const RESTART_KEY: &str = "restart";

/// Loads a workflow document once and resolves per-step views from it.
///
/// The working directory is chosen at construction (the only filesystem
/// check); `get_prop_dic` and `get_paths_dic` are pure and may be called
/// any number of times.
#[derive(Debug, Clone)]
pub struct ConfReader {
    source: ConfigSource,
    document: Map<String, Value>,
    system: Option<String>,
    shape: DocumentShape,
    working_dir: PathBuf,
}

impl ConfReader {
    /// Load `config` (a YAML/JSON file path or an inline JSON string).
    ///
    /// `system` selects a system body whose settings every step inherits.
    pub fn new(config: &str, system: Option<&str>) -> ConfResult<Self> {
        Self::from_loaded(load_document(config)?, system)
    }

    /// Build a reader from an already-parsed document.
    pub fn from_document(document: Map<String, Value>, system: Option<&str>) -> ConfResult<Self> {
        Self::from_loaded(
            LoadedDocument {
                document,
                source: ConfigSource::Inline,
            },
            system,
        )
    }

    fn from_loaded(loaded: LoadedDocument, system: Option<&str>) -> ConfResult<Self> {
        let LoadedDocument { document, source } = loaded;
        let system = system
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        if let Some(ref name) = system {
            if !document.get(name).is_some_and(Value::is_object) {
                return Err(ConfError::unknown_system(name));
            }
        }

        let configured = match lookup(&document, system.as_deref(), WORKING_DIR_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(dir)) => Some(dir.as_str()),
            Some(other) => {
                return Err(ConfError::missing_working_dir(&format!(
                    "{} must be a string, got {}",
                    WORKING_DIR_KEY, other
                )));
            }
        };
        let restart = lookup(&document, system.as_deref(), RESTART_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let working_dir = get_working_dir_path(configured, restart)?;

        let shape = DocumentShape::detect(&document, system.as_deref());
        info!(
            source = %source,
            system = system.as_deref().unwrap_or("-"),
            working_dir = %working_dir.display(),
            shape = ?shape,
            "Loaded workflow configuration"
        );

        Ok(Self {
            source,
            document,
            system,
            shape,
            working_dir,
        })
    }

    /// The working directory every generated path lives under.
    pub fn get_working_dir_path(&self) -> &Path {
        &self.working_dir
    }

    /// Per-step properties.
    ///
    /// `prefix` is trimmed and defaults to empty; `global_log` is forwarded
    /// into every entry as-is.
    pub fn get_prop_dic(
        &self,
        prefix: Option<&str>,
        global_log: Option<&Logger>,
    ) -> ResolvedProperties {
        resolve_properties(self, normalize_prefix(prefix), global_log)
    }

    /// Per-step absolute paths with `file:` and `dependency/` values resolved.
    pub fn get_paths_dic(&self, prefix: Option<&str>) -> ConfResult<ResolvedPaths> {
        resolve_paths(self, normalize_prefix(prefix))
    }

    pub fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    pub fn shape(&self) -> &DocumentShape {
        &self.shape
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// The document as loaded.
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    /// The selected system's body.
    pub(crate) fn system_body(&self) -> Option<&Map<String, Value>> {
        self.system
            .as_deref()
            .and_then(|name| self.document.get(name))
            .and_then(Value::as_object)
    }

    /// Body of a named step. A definition in the system body wins over the root.
    pub(crate) fn step_body(&self, step: &str) -> Option<&Map<String, Value>> {
        self.system_body()
            .and_then(|body| body.get(step))
            .filter(|value| is_step_body(value))
            .or_else(|| self.document.get(step).filter(|value| is_step_body(value)))
            .and_then(Value::as_object)
    }

    /// Mapping carrying `paths`/`properties` for the unnamed shapes.
    pub(crate) fn unnamed_body(&self) -> Option<&Map<String, Value>> {
        match self.shape {
            DocumentShape::SingleStep => Some(&self.document),
            DocumentShape::SystemScoped(_) => self.system_body(),
            _ => None,
        }
    }

    /// Setting from the system body, falling back to the document root.
    pub(crate) fn inherited(&self, key: &str) -> Option<&Value> {
        lookup(&self.document, self.system.as_deref(), key)
    }
}

fn lookup<'a>(document: &'a Map<String, Value>, system: Option<&str>, key: &str) -> Option<&'a Value> {
    system
        .and_then(|name| document.get(name))
        .and_then(Value::as_object)
        .and_then(|body| body.get(key))
        .or_else(|| document.get(key))
}

fn normalize_prefix(prefix: Option<&str>) -> &str {
    prefix.map(str::trim).unwrap_or("")
}
