use thiserror::Error;

/// Failure reported by a text measurement backend.
#[derive(Debug, Error)]
pub enum MeasureError {
    #[error("no font face available for family `{0}`")]
    FontUnavailable(String),
    #[error("text measurement backend failed: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("failed to measure {text:?}")]
    Measure {
        text: String,
        #[source]
        source: MeasureError,
    },
}

pub type LayoutResult<T> = Result<T, LayoutError>;
