//! Boundary errors.
//!
//! The analysis core never fails on data-quality problems (it reports them as
//! warnings or `None` fields). `AppError` covers what remains: unreadable
//! inputs, bad configuration, and references to runs/designs that don't exist.
//! Each variant maps to a process exit code so `main` can stay tiny.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{kind} '{id}' not found.")]
    NotFound { kind: &'static str, id: String },

    #[error("Validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

impl AppError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) | AppError::Io { .. } | AppError::Json { .. } => 2,
            AppError::NotFound { .. } => 3,
            AppError::Validation(_) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(AppError::Config("x".into()).exit_code(), 2);
        assert_eq!(
            AppError::NotFound {
                kind: "Run",
                id: "r1".into()
            }
            .exit_code(),
            3
        );
        assert_eq!(AppError::Validation(vec!["a".into()]).exit_code(), 4);
    }

    #[test]
    fn validation_message_lists_every_error() {
        let err = AppError::Validation(vec!["first".into(), "second".into()]);
        let text = err.to_string();
        assert!(text.contains("- first"));
        assert!(text.contains("- second"));
    }
}
