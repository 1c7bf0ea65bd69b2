use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Request to {0} timed out")]
    NetworkTimeout(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Rate limit still in effect, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Server error {status} from {url}")]
    ServerError { url: String, status: u16 },

    #[error("Malformed response body from {url}: {reason}")]
    MalformedResponseBody { url: String, reason: String },

    #[error("Authentication failed for {0}, check your GitHub token")]
    Authentication(String),

    #[error("Access forbidden for {0}, check token permissions or scope")]
    Permission(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("GitHub API error: {url} responded with {status}")]
    GitHubApi { url: String, status: u16 },

    #[error("Failed to list repositories (page {page}): {source}")]
    Listing {
        page: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("Failed to fetch details for {repository}: {source}")]
    Detail {
        repository: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Errors that end the whole collection run rather than a single probe.
    pub fn is_run_terminal(&self) -> bool {
        match self {
            Error::Authentication(_) | Error::Listing { .. } => true,
            Error::Detail { source, .. } => source.is_run_terminal(),
            _ => false,
        }
    }
}
