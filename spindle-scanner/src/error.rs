use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Unsupported content type {} from {url}", .content_type.as_deref().unwrap_or("<none>"))]
    UnsupportedContent {
        url: String,
        content_type: Option<String>,
    },

    #[error("Redirect from {url} leaves the host: {location}")]
    OffHostRedirect { url: String, location: String },

    #[error("Fetch cancelled: {0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl ScanError {
    /// Cancellation is an expected shutdown path, not a failure worth reporting.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Cancelled(_))
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
