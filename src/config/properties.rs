//! Properties view: per-step tool parameters with inherited settings.

use super::merge::overlay_all;
use super::reader::ConfReader;
use super::resolved::{Resolved, ResolvedProperties};
use super::shape::{DocumentShape, PATHS_KEY, PROPERTIES_KEY, is_step_body};
use crate::logging::Logger;
use crate::paths::join_components;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::debug;

pub(crate) const WORKING_DIR_KEY: &str = "working_dir_path";
pub(crate) const LOG_LEVEL_KEY: &str = "log_level";
pub(crate) const CONSOLE_LOG_KEY: &str = "can_write_console_log";

/// Resolved properties of one step.
///
/// `path`, `step`, `prefix`, `global_log` and `system` are always present.
/// Everything else (system settings, the step's own `properties`,
/// `working_dir_path`, `log_level`, `can_write_console_log`) lives in `settings`.
#[derive(Debug, Clone, PartialEq)]
pub struct StepProperties {
    /// Absolute output directory of the step.
    pub path: PathBuf,
    /// Step name, `None` for an unnamed entry.
    pub step: Option<String>,
    pub prefix: String,
    /// Workflow-level logger, forwarded untouched.
    pub global_log: Option<Logger>,
    /// Selected system name.
    pub system: Option<String>,
    pub settings: Map<String, Value>,
}

impl StepProperties {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.settings.get(key).and_then(Value::as_bool)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.get_str(LOG_LEVEL_KEY)
    }

    pub fn can_write_console_log(&self) -> bool {
        self.get_bool(CONSOLE_LOG_KEY).unwrap_or(true)
    }

    pub fn working_dir_path(&self) -> Option<&str> {
        self.get_str(WORKING_DIR_KEY)
    }

    /// All keys, reserved ones first.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys = vec!["path", "step", "prefix", "global_log", "system"];
        keys.extend(
            self.settings
                .keys()
                .map(String::as_str)
                .filter(|k| !RESERVED_KEYS.contains(k)),
        );
        keys
    }

    /// Flatten into a single JSON mapping.
    ///
    /// `global_log` is rendered as the logger name (or null). Reserved keys
    /// take precedence over same-named settings.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            "path".to_string(),
            Value::String(self.path.to_string_lossy().into_owned()),
        );
        map.insert("step".to_string(), opt_string(self.step.as_deref()));
        map.insert("prefix".to_string(), Value::String(self.prefix.clone()));
        map.insert(
            "global_log".to_string(),
            opt_string(self.global_log.as_ref().and_then(Logger::name)),
        );
        map.insert("system".to_string(), opt_string(self.system.as_deref()));
        for (key, value) in &self.settings {
            if !map.contains_key(key) {
                map.insert(key.clone(), value.clone());
            }
        }
        Value::Object(map)
    }
}

impl Serialize for StepProperties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

const RESERVED_KEYS: &[&str] = &["path", "step", "prefix", "global_log", "system"];

fn opt_string(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |s| Value::String(s.to_string()))
}

/// Build the properties view of `reader`'s document.
pub(crate) fn resolve_properties(
    reader: &ConfReader,
    prefix: &str,
    global_log: Option<&Logger>,
) -> ResolvedProperties {
    let resolved = match reader.shape() {
        DocumentShape::MultiStep(steps) => Resolved::Steps(
            steps
                .iter()
                .map(|step| {
                    let own = reader.step_body(step).and_then(own_properties);
                    let entry = build_entry(reader, prefix, Some(step.as_str()), global_log, None, own);
                    (step.clone(), entry)
                })
                .collect(),
        ),
        DocumentShape::SingleStep | DocumentShape::SystemScoped(_) => {
            let own = reader.unnamed_body().and_then(own_properties);
            Resolved::Unnamed(build_entry(reader, prefix, None, global_log, None, own))
        }
        DocumentShape::Degenerate => Resolved::Unnamed(build_entry(
            reader,
            prefix,
            None,
            global_log,
            Some(reader.document()),
            None,
        )),
    };

    debug!(entries = resolved.len(), prefix = %prefix, "Resolved properties");
    resolved
}

fn own_properties(body: &Map<String, Value>) -> Option<&Map<String, Value>> {
    body.get(PROPERTIES_KEY).and_then(Value::as_object)
}

/// Settings layering, lowest first: inherited log settings, `base` (whole
/// document for degenerate documents), system settings, the resolved working
/// directory, the step's own `properties`.
fn build_entry(
    reader: &ConfReader,
    prefix: &str,
    step: Option<&str>,
    global_log: Option<&Logger>,
    base: Option<&Map<String, Value>>,
    own: Option<&Map<String, Value>>,
) -> StepProperties {
    let working_dir = reader.get_working_dir_path();

    let inherited = inherited_log_settings(reader);
    let system = reader.system_body().map(system_settings).unwrap_or_default();
    let mut resolved_dir = Map::new();
    resolved_dir.insert(
        WORKING_DIR_KEY.to_string(),
        Value::String(working_dir.to_string_lossy().into_owned()),
    );
    let empty = Map::new();

    let settings = overlay_all([
        &inherited,
        base.unwrap_or(&empty),
        &system,
        &resolved_dir,
        own.unwrap_or(&empty),
    ]);

    StepProperties {
        path: join_components(working_dir, &[prefix, step.unwrap_or("")]),
        step: step.map(str::to_string),
        prefix: prefix.to_string(),
        global_log: global_log.cloned(),
        system: reader.system().map(str::to_string),
        settings,
    }
}

/// `log_level` and `can_write_console_log` from the system body or document
/// root. Console logging defaults to on.
fn inherited_log_settings(reader: &ConfReader) -> Map<String, Value> {
    let mut settings = Map::new();
    if let Some(level) = reader.inherited(LOG_LEVEL_KEY).filter(|v| !v.is_null()) {
        settings.insert(LOG_LEVEL_KEY.to_string(), level.clone());
    }
    let console = reader
        .inherited(CONSOLE_LOG_KEY)
        .filter(|v| !v.is_null())
        .cloned()
        .unwrap_or(Value::Bool(true));
    settings.insert(CONSOLE_LOG_KEY.to_string(), console);
    settings
}

/// System body minus step-shaped entries and its own `paths`/`properties`.
fn system_settings(body: &Map<String, Value>) -> Map<String, Value> {
    body.iter()
        .filter(|(key, value)| {
            key.as_str() != PATHS_KEY && key.as_str() != PROPERTIES_KEY && !is_step_body(value)
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
