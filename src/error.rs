//! Structured error types for configuration resolution.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Load errors
    ConfigLoad,
    MissingWorkingDir,

    // Resolution errors
    UnresolvedDependency,
    CyclicDependency,
    InvalidPathValue,

    // Internal errors
    Io,
    Internal,
}

/// Structured error returned by the loader and the resolvers.
#[derive(Debug, Serialize)]
pub struct ConfError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ConfError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            step: None,
            details: None,
        }
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn config_load(source: &str, reason: impl fmt::Display) -> Self {
        let shown = if source.chars().count() > 80 {
            let head: String = source.chars().take(77).collect();
            format!("{}...", head)
        } else {
            source.to_string()
        };
        Self::new(
            ErrorCode::ConfigLoad,
            format!(
                "Configuration source is neither a readable file nor a JSON document: {}",
                shown
            ),
        )
        .with_details(reason.to_string())
    }

    pub fn missing_working_dir(reason: &str) -> Self {
        Self::new(
            ErrorCode::MissingWorkingDir,
            format!("Cannot determine working directory: {}", reason),
        )
    }

    pub fn unknown_system(system: &str) -> Self {
        Self::missing_working_dir(&format!(
            "system '{}' is not a mapping in the configuration",
            system
        ))
    }

    pub fn unresolved_dependency(step: &str, key: &str, reference: &str) -> Self {
        Self::new(
            ErrorCode::UnresolvedDependency,
            format!("Path '{}' of step '{}' references a missing entry: {}", key, step, reference),
        )
        .with_step(step)
    }

    pub fn cyclic_dependency(step: &str, chain: &[String]) -> Self {
        Self::new(
            ErrorCode::CyclicDependency,
            format!("Dependency cycle detected: {}", chain.join(" -> ")),
        )
        .with_step(step)
    }

    pub fn invalid_path_value(step: &str, key: &str) -> Self {
        Self::new(
            ErrorCode::InvalidPathValue,
            format!("Path '{}' of step '{}' must be a string", key, step),
        )
        .with_step(step)
    }

    pub fn io(path: &std::path::Path, err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::Io, format!("I/O error on {}", path.display()))
            .with_details(err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::Internal, err.to_string())
    }
}

impl fmt::Display for ConfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.details {
            Some(ref details) => write!(f, "{} ({})", self.message, details),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ConfError {}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for ConfError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ConfError>() {
            Ok(conf_err) => conf_err,
            Err(err) => ConfError::internal(err),
        }
    }
}

/// Result type for resolver operations.
pub type ConfResult<T> = std::result::Result<T, ConfError>;
