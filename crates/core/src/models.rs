use crate::error::WikiError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type PageId = u64;

/// Which part of a page the search term must appear in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum SearchMode {
    Title,
    #[default]
    Body,
}

impl SearchMode {
    /// `title` restricts to titles; anything else searches full text.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("title") {
            Self::Title
        } else {
            Self::Body
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum OutputMode {
    Summary,
    #[default]
    Grep,
}

impl OutputMode {
    /// Batch size that fits the corpus's per-request extract ceiling for this mode.
    pub fn default_chunk_size(self, limit: usize) -> usize {
        match self {
            Self::Grep => 1,
            Self::Summary => limit.clamp(1, SUMMARY_EXTRACT_LIMIT),
        }
    }

    pub fn content_kind(self) -> ContentKind {
        match self {
            Self::Summary => ContentKind::Summary,
            Self::Grep => ContentKind::Body,
        }
    }
}

/// The corpus returns at most this many intro extracts per request.
pub const SUMMARY_EXTRACT_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Summary,
    Body,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Summary => f.write_str("summary"),
            Self::Body => f.write_str("body"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SearchRequest {
    pub term: String,
    pub mode: SearchMode,
    pub offset: usize,
    pub limit: usize,
}

impl SearchRequest {
    /// Value of the `srsearch` parameter: the term quoted as a phrase.
    pub fn search_expression(&self) -> String {
        match self.mode {
            SearchMode::Title => format!("intitle:\"{}\"", self.term),
            SearchMode::Body => format!("\"{}\"", self.term),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SearchHits {
    pub total_hits: u64,
    /// Unique, in the relevance order returned by the corpus.
    pub page_ids: Vec<PageId>,
    pub suggestion: Option<String>,
}

pub type SearchOutcome = Result<SearchHits, WikiError>;

pub type PageChunk = Vec<PageId>;

pub type ChunkOutcome = Result<PageChunk, WikiError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageContent {
    pub page_id: PageId,
    pub title: String,
    pub url: String,
    /// Intro extract or full plain-text body, depending on [`ContentKind`].
    pub text: String,
}

/// Page-level outcome: `Err` when the page was absent from its batch response.
pub type PageOutcome = Result<PageContent, WikiError>;

/// Batch-level outcome: `Err` when the whole batched fetch failed.
pub type EnrichedBatch = Result<Vec<PageOutcome>, WikiError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrepMatch {
    pub page_id: PageId,
    pub title: String,
    pub url: String,
    /// One snippet per match, in body order.
    pub snippets: Vec<String>,
}

pub type MatchOutcome = Result<GrepMatch, WikiError>;
