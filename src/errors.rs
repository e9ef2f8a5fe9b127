use thiserror::Error;

/// Failure of a single place-search or geocoding call.
///
/// These never escape the aggregation step: the caller logs them and treats
/// the query as having contributed nothing.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode provider response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion contained no text")]
    EmptyCompletion,
    #[error("failed to decode completion response: {0}")]
    Decode(String),
}

/// Errors surfaced to whoever asked for a course.
#[derive(Debug, Error)]
pub enum CourseError {
    #[error("invalid request: {0}")]
    InvalidInput(String),
    #[error("no places found for {region} ({})", areas.join(", "))]
    NoCandidates { region: String, areas: Vec<String> },
    #[error("course generation failed: {0}")]
    GenerationFailed(String),
}

impl CourseError {
    pub fn status_code(&self) -> u16 {
        match self {
            CourseError::InvalidInput(_) => 400,
            CourseError::NoCandidates { .. } => 404,
            CourseError::GenerationFailed(_) => 502,
        }
    }
}
