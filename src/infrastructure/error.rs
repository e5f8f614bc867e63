//! Infrastructure-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;

/// Failures at the process boundary: terminal, files, rendered output.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A scene could not be rendered as JSON.
    #[error("cannot render {what}")]
    Render {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

impl InfraError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn render(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Render {
            what: what.into(),
            source,
        }
    }
}

pub type InfraResult<T> = Result<T, InfraError>;
