use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("CodePipeline {operation} failed: {message}")]
    UpstreamQuery {
        operation: &'static str,
        message: String,
    },

    #[error("No artifact revision found for execution {execution_id} of pipeline {pipeline}")]
    MissingRevision {
        pipeline: String,
        execution_id: String,
    },

    #[error("Stage {stage} not found in pipeline {pipeline}")]
    StageNotFound { pipeline: String, stage: String },

    #[error("status code: {0}")]
    DeliveryStatus(u16),

    #[error("{0}")]
    DeliveryTransport(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NotifierError {
    pub(crate) fn upstream(operation: &'static str, message: impl Into<String>) -> Self {
        Self::UpstreamQuery {
            operation,
            message: message.into(),
        }
    }

    /// Whether this error came from the webhook POST rather than enrichment.
    pub fn is_delivery(&self) -> bool {
        matches!(self, Self::DeliveryStatus(_) | Self::DeliveryTransport(_))
    }
}

pub type Result<T> = std::result::Result<T, NotifierError>;
