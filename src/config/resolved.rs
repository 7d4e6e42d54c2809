//! Result containers for the properties and paths views.

use super::properties::StepProperties;
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;

/// Resolved path key to absolute path, in document order.
pub type StepPaths = IndexMap<String, PathBuf>;

/// Per-step properties view.
pub type ResolvedProperties = Resolved<StepProperties>;

/// Per-step paths view.
pub type ResolvedPaths = Resolved<StepPaths>;

/// A view over the steps of a document.
///
/// Documents without a step layer produce a single `Unnamed` entry; otherwise
/// entries are keyed by step name in document order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resolved<T> {
    Unnamed(T),
    Steps(IndexMap<String, T>),
}

impl<T> Resolved<T> {
    /// Entry for a named step. Always `None` for an unnamed view.
    pub fn get(&self, step: &str) -> Option<&T> {
        match self {
            Resolved::Steps(steps) => steps.get(step),
            Resolved::Unnamed(_) => None,
        }
    }

    /// The single entry of an unnamed view.
    pub fn unnamed(&self) -> Option<&T> {
        match self {
            Resolved::Unnamed(entry) => Some(entry),
            Resolved::Steps(_) => None,
        }
    }

    pub fn into_unnamed(self) -> Option<T> {
        match self {
            Resolved::Unnamed(entry) => Some(entry),
            Resolved::Steps(_) => None,
        }
    }

    pub fn is_unnamed(&self) -> bool {
        matches!(self, Resolved::Unnamed(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Resolved::Unnamed(_) => 1,
            Resolved::Steps(steps) => steps.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn step_names(&self) -> Vec<&str> {
        match self {
            Resolved::Unnamed(_) => Vec::new(),
            Resolved::Steps(steps) => steps.keys().map(String::as_str).collect(),
        }
    }

    /// Iterate entries with their step name (`None` for the unnamed entry).
    pub fn iter(&self) -> Box<dyn Iterator<Item = (Option<&str>, &T)> + '_> {
        match self {
            Resolved::Unnamed(entry) => Box::new(std::iter::once((None, entry))),
            Resolved::Steps(steps) => {
                Box::new(steps.iter().map(|(name, entry)| (Some(name.as_str()), entry)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unnamed_view() {
        let view: Resolved<u32> = Resolved::Unnamed(7);
        assert_eq!(view.len(), 1);
        assert!(view.is_unnamed());
        assert_eq!(view.unnamed(), Some(&7));
        assert_eq!(view.get("anything"), None);
        assert!(view.step_names().is_empty());
        assert_eq!(view.iter().collect::<Vec<_>>(), vec![(None, &7)]);
    }

    #[test]
    fn test_named_view_keeps_order() {
        let mut steps = IndexMap::new();
        steps.insert("b".to_string(), 2);
        steps.insert("a".to_string(), 1);
        let view = Resolved::Steps(steps);

        assert_eq!(view.step_names(), vec!["b", "a"]);
        assert_eq!(view.get("a"), Some(&1));
        assert_eq!(view.unnamed(), None);
        assert!(!view.is_empty());
    }

    #[test]
    fn test_serializes_as_plain_mapping() {
        let mut paths = StepPaths::new();
        paths.insert("out".to_string(), PathBuf::from("/wd/s/out.txt"));
        let mut steps = IndexMap::new();
        steps.insert("s".to_string(), paths);

        let json = serde_json::to_value(Resolved::Steps(steps)).unwrap();
        assert_eq!(json, serde_json::json!({"s": {"out": "/wd/s/out.txt"}}));
    }
}
