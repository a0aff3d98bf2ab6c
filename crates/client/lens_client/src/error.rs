#[derive(Debug, thiserror::Error)]
pub enum LensClientError {
    #[error("HTTP call failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Lens API answered with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("GraphQL errors: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    #[error("GraphQL response has no data")]
    MissingData,

    #[error("Invalid access token")]
    InvalidAccessToken(#[from] http::header::InvalidHeaderValue),
}

impl LensClientError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::GraphQl(_) | Self::MissingData | Self::InvalidAccessToken(_) => false,
        }
    }
}
