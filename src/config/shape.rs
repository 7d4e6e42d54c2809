//! Document shape detection.

use serde_json::{Map, Value};

/// Key holding a step's raw path fragments.
pub(crate) const PATHS_KEY: &str = "paths";
/// Key holding a step's tool parameters.
pub(crate) const PROPERTIES_KEY: &str = "properties";

/// How a document lays out its steps. Determined once, when the reader is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentShape {
    /// The document root carries `paths`/`properties` directly: one unnamed step.
    SingleStep,
    /// The selected system's body carries `paths`/`properties`: one unnamed step.
    SystemScoped(String),
    /// Named steps, in document order.
    MultiStep(Vec<String>),
    /// Nothing qualifies as a step; the whole document is one unnamed step.
    Degenerate,
}

impl DocumentShape {
    /// Classify `document`, looking into the body of `system` when one is selected.
    ///
    /// Step names come from the root first, then from the system body. The system's
    /// own key is never a step.
    pub fn detect(document: &Map<String, Value>, system: Option<&str>) -> Self {
        if is_step_body_map(document) {
            return DocumentShape::SingleStep;
        }

        let system_body = system.and_then(|name| document.get(name)).and_then(Value::as_object);
        if let (Some(name), Some(body)) = (system, system_body) {
            if is_step_body_map(body) {
                return DocumentShape::SystemScoped(name.to_string());
            }
        }

        let mut steps: Vec<String> = document
            .iter()
            .filter(|(key, value)| Some(key.as_str()) != system && is_step_body(value))
            .map(|(key, _)| key.clone())
            .collect();

        if let Some(body) = system_body {
            for (key, value) in body {
                if is_step_body(value) && !steps.contains(key) {
                    steps.push(key.clone());
                }
            }
        }

        if steps.is_empty() {
            DocumentShape::Degenerate
        } else {
            DocumentShape::MultiStep(steps)
        }
    }

    /// Whether path values may carry `dependency/...` references.
    pub fn has_step_layer(&self) -> bool {
        matches!(self, DocumentShape::MultiStep(_))
    }

    /// Named steps, empty for the unnamed shapes.
    pub fn step_names(&self) -> &[String] {
        match self {
            DocumentShape::MultiStep(steps) => steps,
            _ => &[],
        }
    }
}

/// A value is a step body if it is a mapping with `paths` or `properties`.
pub(crate) fn is_step_body(value: &Value) -> bool {
    value.as_object().is_some_and(is_step_body_map)
}

fn is_step_body_map(map: &Map<String, Value>) -> bool {
    map.contains_key(PATHS_KEY) || map.contains_key(PROPERTIES_KEY)
}
