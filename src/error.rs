// Error kinds raised while preparing or running a publish.

use thiserror::Error;

/// Every failure a platform workflow (or the input checks before it) can
/// produce. The orchestrator turns these into per-platform outcomes; only
/// `Input` stops the run before any platform is attempted.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Missing or invalid local input: files, sizes, timestamps, options.
    #[error("{0}")]
    Input(String),

    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    /// Connection, timeout or decoding failure inside the HTTP client.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Local I/O while reading a file for upload.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The platform embedded an error in an otherwise successful response.
    #[error("API error {code}: {message}")]
    Application { code: String, message: String },

    /// The platform reported that its processing job failed.
    #[error("processing failed: {0}")]
    Processing(String),

    /// Polling budget exhausted while the job was still running.
    #[error("timed out after {polls} status checks")]
    Timeout { polls: u32 },
}

impl PublishError {
    pub fn input(message: impl Into<String>) -> Self {
        PublishError::Input(message.into())
    }

    /// Input errors are fatal before any network activity.
    pub fn is_input(&self) -> bool {
        matches!(self, PublishError::Input(_))
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;
