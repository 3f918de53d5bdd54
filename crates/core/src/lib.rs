pub mod chunking;
pub mod config;
pub mod error;
pub mod grep;
pub mod models;
pub mod orchestrator;
pub mod pool;
pub mod sources;
pub mod stages;
pub mod traits;

pub use chunking::{partition_hits, truncate_hits};
pub use config::{ClientConfig, PipelineConfig, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT, MAX_PAGE_LIMIT};
pub use error::{Result, WikiError};
pub use grep::{extract_window, Matcher, WordWindow};
pub use models::{
    ChunkOutcome, ContentKind, EnrichedBatch, GrepMatch, MatchOutcome, OutputMode, PageChunk,
    PageContent, PageId, PageOutcome, SearchHits, SearchMode, SearchOutcome, SearchRequest,
    SUMMARY_EXTRACT_LIMIT,
};
pub use orchestrator::{Pipeline, RunOutput};
pub use pool::WorkerPool;
pub use sources::WikipediaClient;
pub use stages::{
    flatten_batch, spawn_chunker, spawn_enricher, spawn_matcher, spawn_searcher, spawn_take,
};
pub use traits::Corpus;
