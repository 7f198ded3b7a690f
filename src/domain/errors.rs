use reqwest::StatusCode;
use thiserror::Error;

/// Network and HTTP level failures while fetching the receiver document
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Receiver returned non-200 status: {status}")]
    UnexpectedStatus { status: StatusCode },

    #[error("Failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("Request cancelled")]
    Cancelled,
}

/// Errors that abort a single fetch-transform-emit tick.
///
/// None of these are fatal to the process: the poll loop logs them and waits
/// for the next scheduled tick.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to decode receiver document: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to serialize aircraft {hex}: {source}")]
    Serialization {
        hex: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineError {
    /// Stable label used in log fields and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport_error",
            Self::Decode(_) => "decode_error",
            Self::Serialization { .. } => "serialization_error",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Cancelled))
    }
}
