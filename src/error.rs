//! Error taxonomy shared by the registry, adapter, pipeline and handlers.

use thiserror::Error;

/// Errors surfaced to a caller of the extraction pipeline.
///
/// Stream source failures never appear here: they are absorbed inside
/// [`BackendAdapter::resolve_streams`](crate::adapter::BackendAdapter::resolve_streams).
#[derive(Error, Debug)]
pub enum GatewayError {
    /// A required parameter is missing, empty or malformed.
    #[error("{0}")]
    InvalidInput(String),

    /// The requested source is not registered.
    #[error("Source {name} not available")]
    InvalidSource {
        name: String,
        available: Vec<String>,
    },

    /// A positional index points past the end of the current result set.
    #[error("{field} {index} out of range ({len} available)")]
    IndexOutOfRange {
        field: &'static str,
        index: usize,
        len: usize,
    },

    /// Anything that went wrong while talking to the upstream catalog.
    #[error("{0:#}")]
    Backend(anyhow::Error),
}

impl From<anyhow::Error> for GatewayError {
    fn from(err: anyhow::Error) -> Self {
        Self::Backend(err)
    }
}

impl GatewayError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Stable machine-readable kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidSource { .. } => "invalid_source",
            Self::IndexOutOfRange { .. } => "index_out_of_range",
            Self::Backend(_) => "backend_fault",
        }
    }

    /// Whether the caller is at fault (as opposed to the upstream catalog).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Backend(_))
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
