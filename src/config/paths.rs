//! Paths view: per-step absolute paths with dependency references resolved.

use super::reader::ConfReader;
use super::resolved::{Resolved, ResolvedPaths, StepPaths};
use super::shape::{DocumentShape, PATHS_KEY};
use crate::error::{ConfError, ConfResult};
use crate::paths::join_components;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

const FILE_PREFIX: &str = "file:";
const DEPENDENCY_PREFIX: &str = "dependency/";

/// A raw path value, classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathValue<'a> {
    /// `file:<path>`: used verbatim.
    Literal(&'a str),
    /// `dependency/<step>/<key>`: borrows `<key>` from step `<step>`.
    Dependency { step: &'a str, key: &'a str },
    /// Anything else: joined under the owning step's directory.
    Relative(&'a str),
}

impl<'a> PathValue<'a> {
    /// Classify `raw`. Returns `None` for a `dependency/` reference without
    /// both a step and a key.
    pub fn parse(raw: &'a str) -> Option<Self> {
        if let Some(literal) = raw.strip_prefix(FILE_PREFIX) {
            return Some(PathValue::Literal(literal));
        }
        if let Some(reference) = raw.strip_prefix(DEPENDENCY_PREFIX) {
            let mut parts = reference.split('/');
            let step = parts.next().filter(|s| !s.is_empty())?;
            let key = parts.next().filter(|s| !s.is_empty())?;
            return Some(PathValue::Dependency { step, key });
        }
        Some(PathValue::Relative(raw))
    }
}

/// Raw `paths` mappings of every step, read-only for the whole resolution.
type RawPaths<'a> = IndexMap<&'a str, &'a Map<String, Value>>;

/// Build the paths view of `reader`'s document.
pub(crate) fn resolve_paths(reader: &ConfReader, prefix: &str) -> ConfResult<ResolvedPaths> {
    let working_dir = reader.get_working_dir_path();

    let resolved = match reader.shape() {
        DocumentShape::MultiStep(steps) => {
            let empty = Map::new();
            let raw: RawPaths<'_> = steps
                .iter()
                .map(|step| {
                    let paths = reader
                        .step_body(step)
                        .and_then(|body| body.get(PATHS_KEY))
                        .and_then(Value::as_object)
                        .unwrap_or(&empty);
                    (step.as_str(), paths)
                })
                .collect();

            let mut resolved = IndexMap::new();
            for (step, paths) in &raw {
                let mut entry = StepPaths::new();
                for (key, value) in paths.iter() {
                    let path = resolve_step_value(&raw, working_dir, prefix, step, key, value)?;
                    entry.insert(key.clone(), path);
                }
                resolved.insert(step.to_string(), entry);
            }
            Resolved::Steps(resolved)
        }
        DocumentShape::SingleStep | DocumentShape::SystemScoped(_) => {
            let mut entry = StepPaths::new();
            let paths = reader
                .unnamed_body()
                .and_then(|body| body.get(PATHS_KEY))
                .and_then(Value::as_object);
            for (key, value) in paths.into_iter().flatten() {
                let raw = value
                    .as_str()
                    .ok_or_else(|| ConfError::invalid_path_value("", key))?;
                // No step layer: dependency syntax is just a relative fragment here.
                let path = match raw.strip_prefix(FILE_PREFIX) {
                    Some(literal) => PathBuf::from(literal),
                    None => join_components(working_dir, &[prefix, raw]),
                };
                entry.insert(key.clone(), path);
            }
            Resolved::Unnamed(entry)
        }
        DocumentShape::Degenerate => Resolved::Unnamed(StepPaths::new()),
    };

    debug!(entries = resolved.len(), prefix = %prefix, "Resolved paths");
    Ok(resolved)
}

fn resolve_step_value(
    raw: &RawPaths<'_>,
    working_dir: &Path,
    prefix: &str,
    step: &str,
    key: &str,
    value: &Value,
) -> ConfResult<PathBuf> {
    let text = value
        .as_str()
        .ok_or_else(|| ConfError::invalid_path_value(step, key))?;

    match PathValue::parse(text) {
        Some(PathValue::Literal(literal)) => Ok(PathBuf::from(literal)),
        Some(PathValue::Relative(fragment)) => {
            Ok(join_components(working_dir, &[prefix, step, fragment]))
        }
        Some(PathValue::Dependency { .. }) => {
            follow_dependency(raw, working_dir, prefix, step, key, text)
        }
        None => Err(ConfError::unresolved_dependency(step, key, text)),
    }
}

/// Follow a chain of `dependency/` references starting at `step`/`key`.
///
/// The final fragment is joined under the last step the chain passed through.
/// Revisiting a `(step, key)` pair is a cycle.
fn follow_dependency(
    raw: &RawPaths<'_>,
    working_dir: &Path,
    prefix: &str,
    step: &str,
    key: &str,
    first: &str,
) -> ConfResult<PathBuf> {
    let mut visited: HashSet<(&str, &str)> = HashSet::new();
    visited.insert((step, key));
    let mut chain = vec![format!("{}/{}", step, key)];

    let mut current = first;
    let mut source_step = step;
    loop {
        match PathValue::parse(current) {
            Some(PathValue::Dependency {
                step: dep_step,
                key: dep_key,
            }) => {
                let next = raw
                    .get(dep_step)
                    .and_then(|paths| paths.get(dep_key))
                    .ok_or_else(|| ConfError::unresolved_dependency(step, key, current))?;

                chain.push(format!("{}/{}", dep_step, dep_key));
                if !visited.insert((dep_step, dep_key)) {
                    return Err(ConfError::cyclic_dependency(step, &chain));
                }

                source_step = dep_step;
                current = next
                    .as_str()
                    .ok_or_else(|| ConfError::invalid_path_value(dep_step, dep_key))?;
            }
            Some(PathValue::Literal(literal)) => return Ok(PathBuf::from(literal)),
            Some(PathValue::Relative(fragment)) => {
                return Ok(join_components(
                    working_dir,
                    &[prefix, source_step, fragment],
                ));
            }
            None => return Err(ConfError::unresolved_dependency(step, key, current)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal() {
        assert_eq!(
            PathValue::parse("file:/abs/path.txt"),
            Some(PathValue::Literal("/abs/path.txt"))
        );
        assert_eq!(
            PathValue::parse("file:C:/data/in.pdb"),
            Some(PathValue::Literal("C:/data/in.pdb"))
        );
    }

    #[test]
    fn test_parse_dependency() {
        assert_eq!(
            PathValue::parse("dependency/step1/output_pdb"),
            Some(PathValue::Dependency {
                step: "step1",
                key: "output_pdb"
            })
        );
    }

    #[test]
    fn test_parse_malformed_dependency() {
        assert_eq!(PathValue::parse("dependency/step1"), None);
        assert_eq!(PathValue::parse("dependency//key"), None);
        assert_eq!(PathValue::parse("dependency/"), None);
    }

    #[test]
    fn test_dependency_prefix_needs_slash() {
        assert_eq!(
            PathValue::parse("dependency_file.txt"),
            Some(PathValue::Relative("dependency_file.txt"))
        );
    }

    #[test]
    fn test_parse_relative() {
        assert_eq!(
            PathValue::parse("output.gro"),
            Some(PathValue::Relative("output.gro"))
        );
    }
}
