use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid viewport: {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },

    #[error("Unknown layout strategy '{name}'")]
    UnknownStrategy { name: String },

    /// Rejected configuration, or any other untyped failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// A single raw record that could not be normalized.
/// Skipped by the batch normalizer, never fatal.
#[derive(Error, Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MalformedRecordError {
    #[error("record {index}: missing origin number")]
    MissingOrigin { index: usize },

    #[error("record {index}: missing timestamp")]
    MissingTimestamp { index: usize },

    #[error("record {index}: unparseable timestamp '{value}'")]
    InvalidTimestamp { index: usize, value: String },

    #[error("record {index}: call without counterpart number")]
    MissingCounterpart { index: usize },

    #[error("record {index}: {number} calls itself")]
    SelfInteraction { index: usize, number: String },

    #[error("record {index}: unknown interaction kind '{value}'")]
    UnknownKind { index: usize, value: String },
}

impl MalformedRecordError {
    pub fn index(&self) -> usize {
        match self {
            Self::MissingOrigin { index }
            | Self::MissingTimestamp { index }
            | Self::InvalidTimestamp { index, .. }
            | Self::MissingCounterpart { index }
            | Self::SelfInteraction { index, .. }
            | Self::UnknownKind { index, .. } => *index,
        }
    }
}
