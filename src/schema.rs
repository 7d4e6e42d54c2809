//! Declared property schemas for wrappers.
//!
//! Each wrapper states the property names it understands, with a kind and an
//! optional default. Supplied properties are checked against that list and every
//! unknown key produces one warning naming the closest known property.

use crate::config::StepProperties;
use crate::error::{ConfError, ConfResult};
use crate::similarity::closest_match;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use tracing::warn;

/// Keys every resolved entry carries that no wrapper needs to declare.
const ALWAYS_ALLOWED: &[&str] = &["system", "working_dir_path"];

/// Value kind of a declared property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Bool,
    Integer,
    Number,
    String,
    Any,
}

impl PropertyKind {
    /// Whether `value` fits this kind. Null fits everything.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (PropertyKind::Any, _) => true,
            (PropertyKind::Bool, Value::Bool(_)) => true,
            (PropertyKind::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (PropertyKind::Number, Value::Number(_)) => true,
            (PropertyKind::String, Value::String(_)) => true,
            _ => false,
        }
    }
}

/// One declared property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySpec {
    pub name: String,
    pub kind: PropertyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl PropertySpec {
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// A supplied property that the schema does not declare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnrecognizedProperty {
    pub name: String,
    pub suggestion: Option<String>,
}

impl fmt::Display for UnrecognizedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is not a recognized property. The most similar property is: {}",
            self.name,
            self.suggestion.as_deref().unwrap_or("")
        )
    }
}

/// Ordered set of declared properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropertySchema {
    specs: Vec<PropertySpec>,
}

impl PropertySchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Properties shared by every wrapper: entry metadata, restart/cleanup
    /// flags, and local, container and API execution settings.
    pub fn common() -> Self {
        use PropertyKind as K;
        Self::new()
            .with(PropertySpec::new("can_write_console_log", K::Bool).with_default(json!(true)))
            .with(PropertySpec::new("log_level", K::String))
            .with(PropertySpec::new("global_log", K::Any))
            .with(PropertySpec::new("prefix", K::String))
            .with(PropertySpec::new("step", K::String))
            .with(PropertySpec::new("path", K::String).with_default(json!("")))
            .with(PropertySpec::new("remove_tmp", K::Bool).with_default(json!(true)))
            .with(PropertySpec::new("restart", K::Bool).with_default(json!(false)))
            .with(PropertySpec::new("binary_path", K::String))
            .with(PropertySpec::new("container_path", K::String))
            .with(PropertySpec::new("container_image", K::String))
            .with(PropertySpec::new("container_volume_path", K::String).with_default(json!("/data")))
            .with(PropertySpec::new("container_working_dir", K::String))
            .with(PropertySpec::new("container_user_id", K::String))
            .with(
                PropertySpec::new("container_shell_path", K::String).with_default(json!("/bin/bash")),
            )
            .with(PropertySpec::new("api_base_url", K::String))
            .with(PropertySpec::new("api_launch_url", K::String).with_default(json!("launch")))
            .with(PropertySpec::new("api_poll_url", K::String).with_default(json!("retrieve/status")))
            .with(
                PropertySpec::new("api_retrieve_url", K::String).with_default(json!("retrieve/data")),
            )
    }

    /// Add (or replace) a declared property.
    pub fn with(mut self, spec: PropertySpec) -> Self {
        match self.specs.iter_mut().find(|s| s.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.specs.push(spec),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropertySpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.name.as_str())
    }

    /// Check a resolved entry. See [`PropertySchema::check_map`].
    pub fn check_properties(
        &self,
        properties: &StepProperties,
        reserved: &[&str],
    ) -> Vec<UnrecognizedProperty> {
        self.check_map(&properties.settings, reserved)
    }

    /// Report every key of `properties` the schema does not declare.
    ///
    /// `system`, `working_dir_path` and `reserved` are never reported. Each
    /// unknown key is logged once at WARN with its closest declared name.
    /// Results are sorted by key.
    pub fn check_map(
        &self,
        properties: &Map<String, Value>,
        reserved: &[&str],
    ) -> Vec<UnrecognizedProperty> {
        let mut unknown: Vec<&str> = properties
            .keys()
            .map(String::as_str)
            .filter(|key| !self.contains(key))
            .filter(|key| !ALWAYS_ALLOWED.contains(key) && !reserved.contains(key))
            .collect();
        unknown.sort_unstable();

        unknown
            .into_iter()
            .map(|name| {
                let issue = UnrecognizedProperty {
                    name: name.to_string(),
                    suggestion: closest_match(name, self.names()).map(str::to_string),
                };
                warn!("{}", issue);
                issue
            })
            .collect()
    }

    /// Declared properties whose supplied value has the wrong kind.
    pub fn mistyped<'a>(&self, properties: &'a Map<String, Value>) -> Vec<&'a str> {
        properties
            .iter()
            .filter(|(key, value)| {
                self.get(key)
                    .is_some_and(|spec| !spec.kind.accepts(value))
            })
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// Copy of `properties` with declared defaults filled in for missing keys.
    pub fn apply_defaults(&self, properties: &Map<String, Value>) -> Map<String, Value> {
        let mut filled = properties.clone();
        for spec in &self.specs {
            if let Some(ref default) = spec.default {
                if !filled.contains_key(&spec.name) {
                    filled.insert(spec.name.clone(), default.clone());
                }
            }
        }
        filled
    }
}

/// Typed view of the properties every wrapper reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonProperties {
    #[serde(default = "default_true")]
    pub can_write_console_log: bool,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub step: Option<String>,
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_true")]
    pub remove_tmp: bool,
    #[serde(default)]
    pub restart: bool,
    #[serde(default)]
    pub binary_path: Option<String>,
    #[serde(default)]
    pub container_path: Option<String>,
    #[serde(default)]
    pub container_image: Option<String>,
    #[serde(default = "default_container_volume_path")]
    pub container_volume_path: String,
    #[serde(default)]
    pub container_working_dir: Option<String>,
    #[serde(default)]
    pub container_user_id: Option<String>,
    #[serde(default = "default_container_shell_path")]
    pub container_shell_path: String,
    #[serde(default)]
    pub api_base_url: Option<String>,
}

impl CommonProperties {
    /// Read the common properties of a resolved entry.
    pub fn from_step(properties: &StepProperties) -> ConfResult<Self> {
        let step = properties.step.clone().unwrap_or_default();
        serde_json::from_value(properties.to_value()).map_err(|e| {
            ConfError::internal(format!("invalid common properties: {}", e)).with_step(step)
        })
    }

    /// Whether the tool runs through a container runtime.
    pub fn uses_container(&self) -> bool {
        self.container_path.as_deref().is_some_and(|p| !p.is_empty())
    }
}

impl Default for CommonProperties {
    fn default() -> Self {
        Self {
            can_write_console_log: true,
            log_level: None,
            prefix: None,
            step: None,
            path: String::new(),
            remove_tmp: true,
            restart: false,
            binary_path: None,
            container_path: None,
            container_image: None,
            container_volume_path: default_container_volume_path(),
            container_working_dir: None,
            container_user_id: None,
            container_shell_path: default_container_shell_path(),
            api_base_url: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_container_volume_path() -> String {
    "/data".to_string()
}

fn default_container_shell_path() -> String {
    "/bin/bash".to_string()
}
