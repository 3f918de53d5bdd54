use crate::models::PageId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WikiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid response from corpus: {status}")]
    BackendResponse { status: reqwest::StatusCode },

    #[error("response is missing `{0}`")]
    MissingField(&'static str),

    #[error("no results for page {page_id}")]
    MissingPage { page_id: PageId },

    #[error("no extract returned for page {page_id}")]
    MissingExtract { page_id: PageId },

    #[error("invalid config: {0}")]
    Config(String),

    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl WikiError {
    /// Page the error is scoped to, when it is a page-level failure.
    pub fn page_id(&self) -> Option<PageId> {
        match self {
            Self::MissingPage { page_id } | Self::MissingExtract { page_id } => Some(*page_id),
            _ => None,
        }
    }
}

pub type Result<T, E = WikiError> = std::result::Result<T, E>;
