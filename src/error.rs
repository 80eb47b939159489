use anyhow::Error as AnyhowError;
use itertools::Itertools;
use thiserror::Error;

use crate::ast::SyntaxError;

/// Result alias for errors emitted by vb-lint internals.
pub type ClippyResult<T> = Result<T, VbLintError>;

/// Structured error type for vb-lint subsystems.
#[derive(Debug, Error)]
pub enum VbLintError {
    #[error("{} syntax error(s): {}", .0.len(), .0.iter().join("; "))]
    Syntax(Vec<SyntaxError>),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl VbLintError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

impl From<AnyhowError> for VbLintError {
    fn from(err: AnyhowError) -> Self {
        VbLintError::other(err.to_string())
    }
}
