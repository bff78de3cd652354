use thiserror::Error;
use url::Url;

/// Failure of a single transport or fetch-and-decode operation
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read
    #[error("request to {url} failed: {message}")]
    Request { url: Url, message: String },

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: Url, status: u16 },

    /// The body was fetched but is not a decodable image
    #[error("failed to decode image from {url}: {message}")]
    Decode { url: Url, message: String },

    /// The operation was cancelled before it settled
    #[error("fetching {url} was cancelled")]
    Cancelled { url: Url },

    /// The blocking decode task panicked or was aborted
    #[error("decode task for {url} did not complete: {message}")]
    Join { url: Url, message: String },
}

impl FetchError {
    /// URL of the operation that failed
    pub fn url(&self) -> &Url {
        match self {
            FetchError::Request { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Decode { url, .. }
            | FetchError::Cancelled { url }
            | FetchError::Join { url, .. } => url,
        }
    }
}

/// Failure of a complete viewer run
#[derive(Debug, Error)]
pub enum ViewerError {
    /// The source document could not be fetched over HTTP
    #[error("failed to fetch source document: {0}")]
    Document(#[source] FetchError),

    /// The WebDriver session could not render the source document
    #[error("webdriver error: {0}")]
    WebDriver(String),

    /// At least one image download failed after all of them settled
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Configuration could not be loaded
    #[error("invalid configuration: {0}")]
    Config(String),
}
