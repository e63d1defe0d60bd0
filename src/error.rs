use thiserror::Error;

/// Errors raised by the scanning pipeline.
///
/// "No detection" is never an error; it is reported as an incomplete frame.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("frame unavailable: {0}")]
    InputUnavailable(String),

    #[error("malformed quadrilateral: {0}")]
    MalformedQuad(String),

    #[error("rectification failed: {0}")]
    Rectification(String),

    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
