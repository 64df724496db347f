use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid rule JSON: {0}")]
    RuleParse(#[from] serde_json::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Malformed rule: {reason}")]
    MalformedRule { reason: String },

    #[error("Document has no pages")]
    EmptyDocument,

    #[error("Segment invariant violated: {reason}")]
    SegmentInvariant { reason: String },

    #[error("Packaging error: {reason}")]
    Packaging { reason: String },

    #[error("PDF error: {reason}")]
    Pdf { reason: String },

    #[error("Split configuration error: {reason}")]
    SplitConfig { reason: String },

    #[error("Output directory error: {reason}")]
    OutputDirectory { reason: String },

    #[error("HTTP status error: {status}")]
    HttpStatus { status: u16 },

    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl SplitterError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        SplitterError::MalformedRule {
            reason: reason.into(),
        }
    }
}

impl From<zip::result::ZipError> for SplitterError {
    fn from(e: zip::result::ZipError) -> Self {
        SplitterError::Packaging {
            reason: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SplitterError>;
