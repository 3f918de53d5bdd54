//! Run configuration for the search pipeline.
//!
//! [`PipelineConfig`] is what the command-line layer fills in; [`ClientConfig`]
//! controls how each stage reaches the corpus endpoint.

use crate::error::WikiError;
use crate::models::{OutputMode, SearchMode, SearchRequest};
use std::time::Duration;

/// The corpus refuses to return more than this many search hits per request.
pub const MAX_PAGE_LIMIT: usize = 50;

pub const DEFAULT_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    /// Applied to every request, independent of pipeline cancellation.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("wiki-grep/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub term: String,
    pub search_mode: SearchMode,
    pub output_mode: OutputMode,
    /// Cap on pages that proceed past the search stage.
    pub limit: usize,
    pub offset: usize,
    pub chunk_size: usize,
    pub words_before: usize,
    pub words_after: usize,
    pub client: ClientConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            term: String::new(),
            search_mode: SearchMode::Body,
            output_mode: OutputMode::Grep,
            limit: 5,
            offset: 0,
            chunk_size: 1,
            words_before: 50,
            words_after: 50,
            client: ClientConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), WikiError> {
        if self.term.trim().is_empty() {
            return Err(WikiError::Config("search term is empty".into()));
        }
        if self.limit == 0 || self.limit > MAX_PAGE_LIMIT {
            return Err(WikiError::Config(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}, got {}",
                self.limit
            )));
        }
        if self.chunk_size == 0 || self.chunk_size > MAX_PAGE_LIMIT {
            return Err(WikiError::Config(format!(
                "chunk size must be between 1 and {MAX_PAGE_LIMIT}, got {}",
                self.chunk_size
            )));
        }
        if self.client.timeout.is_zero() {
            return Err(WikiError::Config("request timeout must be non-zero".into()));
        }
        Ok(())
    }

    /// The search always asks for a full page of hits; `limit` is applied downstream.
    pub fn search_request(&self) -> SearchRequest {
        SearchRequest {
            term: self.term.clone(),
            mode: self.search_mode,
            offset: self.offset,
            limit: MAX_PAGE_LIMIT,
        }
    }
}
