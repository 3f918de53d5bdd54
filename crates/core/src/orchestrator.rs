use crate::config::PipelineConfig;
use crate::grep::{Matcher, WordWindow};
use crate::sources::WikipediaClient;
use crate::stages::{spawn_chunker, spawn_enricher, spawn_matcher, spawn_searcher, spawn_take};
use crate::traits::Corpus;
use crate::{ChunkOutcome, EnrichedBatch, MatchOutcome, OutputMode, WikiError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

/// Sink side of a run, shaped by the configured output mode.
pub enum RunOutput {
    Summaries(mpsc::Receiver<EnrichedBatch>),
    Matches(mpsc::Receiver<MatchOutcome>),
}

/// Wires the stages together for one run.
///
/// The search stage and the enrichment stage each own a corpus handle; the
/// handle is released when its stage task finishes.
pub struct Pipeline<C>
where
    C: Corpus + 'static,
{
    config: PipelineConfig,
    search_corpus: Arc<C>,
    content_corpus: Arc<C>,
}

impl Pipeline<WikipediaClient> {
    pub fn wikipedia(config: PipelineConfig) -> Result<Self, WikiError> {
        let search_corpus = WikipediaClient::new(&config.client)?;
        let content_corpus = WikipediaClient::new(&config.client)?;
        Self::new(config, search_corpus, content_corpus)
    }
}

impl<C> Pipeline<C>
where
    C: Corpus + 'static,
{
    pub fn new(
        config: PipelineConfig,
        search_corpus: C,
        content_corpus: C,
    ) -> Result<Self, WikiError> {
        config.validate()?;
        Ok(Self {
            config,
            search_corpus: Arc::new(search_corpus),
            content_corpus: Arc::new(content_corpus),
        })
    }

    /// Starts the run selected by `config.output_mode`.
    pub fn run(self, cancel: CancellationToken) -> Result<RunOutput, WikiError> {
        match self.config.output_mode {
            OutputMode::Summary => Ok(RunOutput::Summaries(self.run_summary(cancel))),
            OutputMode::Grep => self.run_grep(cancel).map(RunOutput::Matches),
        }
    }

    /// Search → take → chunk → fetch bodies → grep.
    ///
    /// Fails up front only when the search term is not a valid pattern.
    pub fn run_grep(
        self,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<MatchOutcome>, WikiError> {
        let matcher = Matcher::new(
            &self.config.term,
            WordWindow {
                before: self.config.words_before,
                after: self.config.words_after,
            },
        )?;

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("grep_run", %run_id, term = %self.config.term);
        let _entered = span.enter();
        info!(
            limit = self.config.limit,
            chunk_size = self.config.chunk_size,
            "starting grep pipeline"
        );

        let chunks = self.spawn_chunks(&cancel);
        let batches = self.spawn_fetch(OutputMode::Grep, chunks, &cancel);
        Ok(spawn_matcher(matcher, batches, cancel))
    }

    /// Search → take → chunk → fetch intro summaries.
    pub fn run_summary(self, cancel: CancellationToken) -> mpsc::Receiver<EnrichedBatch> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("summary_run", %run_id, term = %self.config.term);
        let _entered = span.enter();
        info!(limit = self.config.limit, "starting summary pipeline");

        let chunks = self.spawn_chunks(&cancel);
        self.spawn_fetch(OutputMode::Summary, chunks, &cancel)
    }

    fn spawn_chunks(&self, cancel: &CancellationToken) -> mpsc::Receiver<ChunkOutcome> {
        let searched = spawn_searcher(
            Arc::clone(&self.search_corpus),
            self.config.search_request(),
            cancel.clone(),
        );
        let taken = spawn_take(self.config.limit, searched, cancel.clone());
        spawn_chunker(self.config.chunk_size, taken, cancel.clone())
    }

    fn spawn_fetch(
        &self,
        mode: OutputMode,
        chunks: mpsc::Receiver<ChunkOutcome>,
        cancel: &CancellationToken,
    ) -> mpsc::Receiver<EnrichedBatch> {
        spawn_enricher(
            Arc::clone(&self.content_corpus),
            mode.content_kind(),
            chunks,
            cancel.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ContentKind, PageContent, PageId, PageOutcome, SearchHits, SearchMode, SearchRequest,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeWiki {
        hits: SearchHits,
        pages: HashMap<PageId, PageContent>,
        searches: Mutex<Vec<SearchRequest>>,
        kinds: Mutex<Vec<ContentKind>>,
    }

    impl FakeWiki {
        fn new(hits: SearchHits, pages: Vec<PageContent>) -> Self {
            Self {
                hits,
                pages: pages.into_iter().map(|page| (page.page_id, page)).collect(),
                searches: Mutex::new(Vec::new()),
                kinds: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Corpus for FakeWiki {
        async fn search(&self, request: &SearchRequest) -> Result<SearchHits, WikiError> {
            self.searches.lock().unwrap().push(request.clone());
            Ok(self.hits.clone())
        }

        async fn fetch_pages(
            &self,
            page_ids: &[PageId],
            kind: ContentKind,
        ) -> Result<Vec<PageOutcome>, WikiError> {
            self.kinds.lock().unwrap().push(kind);
            Ok(page_ids
                .iter()
                .map(|&page_id| {
                    self.pages
                        .get(&page_id)
                        .cloned()
                        .ok_or(WikiError::MissingPage { page_id })
                })
                .collect())
        }
    }

    fn turing_pages() -> Vec<PageContent> {
        vec![
            PageContent {
                page_id: 30_157,
                title: "Alan Turing".to_string(),
                url: "https://en.wikipedia.org/wiki/Alan_Turing".to_string(),
                text: "Alan Mathison Turing was an English mathematician. Turing is widely considered the father of computer science."
                    .to_string(),
            },
            PageContent {
                page_id: 1_120,
                title: "Turing machine".to_string(),
                url: "https://en.wikipedia.org/wiki/Turing_machine".to_string(),
                text: "A Turing machine is a mathematical model of computation.".to_string(),
            },
            PageContent {
                page_id: 9_999,
                title: "Turing test".to_string(),
                url: "https://en.wikipedia.org/wiki/Turing_test".to_string(),
                text: "The Turing test measures machine intelligence.".to_string(),
            },
        ]
    }

    fn turing_hits() -> SearchHits {
        SearchHits {
            total_hits: 4_500,
            page_ids: vec![30_157, 1_120, 9_999],
            suggestion: None,
        }
    }

    fn config(limit: usize, chunk_size: usize) -> PipelineConfig {
        PipelineConfig {
            term: "Turing".to_string(),
            search_mode: SearchMode::Body,
            limit,
            chunk_size,
            words_before: 1,
            words_after: 1,
            ..Default::default()
        }
    }

    async fn collect<T>(mut rx: mpsc::Receiver<T>) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = rx.recv().await {
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn grep_run_returns_windowed_matches_for_capped_pages() {
        let pipeline = Pipeline::new(
            config(2, 1),
            FakeWiki::new(turing_hits(), Vec::new()),
            FakeWiki::new(turing_hits(), turing_pages()),
        )
        .unwrap();

        let mut results: Vec<_> = collect(pipeline.run_grep(CancellationToken::new()).unwrap())
            .await
            .into_iter()
            .map(|outcome| outcome.unwrap())
            .collect();
        results.sort_by_key(|result| result.page_id);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].page_id, 1_120);
        assert_eq!(results[0].title, "Turing machine");
        assert_eq!(results[0].snippets, vec!["A Turing machine"]);

        assert_eq!(results[1].url, "https://en.wikipedia.org/wiki/Alan_Turing");
        assert_eq!(
            results[1].snippets,
            vec!["Mathison Turing was", "mathematician. Turing is"]
        );
        for result in &results {
            for snippet in &result.snippets {
                assert!(snippet.split_whitespace().count() <= 3);
            }
        }
    }

    #[tokio::test]
    async fn search_asks_for_a_full_page_of_hits() {
        let search = FakeWiki::new(turing_hits(), Vec::new());
        let content = FakeWiki::new(turing_hits(), turing_pages());
        let pipeline = Pipeline::new(config(2, 1), search, content).unwrap();
        let search_corpus = Arc::clone(&pipeline.search_corpus);

        collect(pipeline.run_grep(CancellationToken::new()).unwrap()).await;

        let searches = search_corpus.searches.lock().unwrap();
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0].limit, crate::MAX_PAGE_LIMIT);
    }

    #[tokio::test]
    async fn summary_run_batches_pages_together() {
        let pipeline = Pipeline::new(
            config(3, 3),
            FakeWiki::new(turing_hits(), Vec::new()),
            FakeWiki::new(turing_hits(), turing_pages()),
        )
        .unwrap();

        let batches = collect(pipeline.run_summary(CancellationToken::new())).await;
        assert_eq!(batches.len(), 1);
        let pages = batches.into_iter().next().unwrap().unwrap();
        let titles: Vec<_> = pages.into_iter().map(|page| page.unwrap().title).collect();
        assert_eq!(titles, vec!["Alan Turing", "Turing machine", "Turing test"]);
    }

    #[tokio::test]
    async fn zero_hits_close_the_run_without_results() {
        let empty = SearchHits::default();
        let pipeline = Pipeline::new(
            config(5, 1),
            FakeWiki::new(empty.clone(), Vec::new()),
            FakeWiki::new(empty, Vec::new()),
        )
        .unwrap();

        let outcomes = collect(pipeline.run_grep(CancellationToken::new()).unwrap()).await;
        assert!(outcomes.is_empty());
    }

    #[test]
    fn invalid_config_is_rejected_before_running() {
        let result = Pipeline::new(
            config(51, 1),
            FakeWiki::new(turing_hits(), Vec::new()),
            FakeWiki::new(turing_hits(), Vec::new()),
        );
        assert!(matches!(result, Err(WikiError::Config(_))));
    }

    #[tokio::test]
    async fn invalid_pattern_is_rejected_before_running() {
        let mut cfg = config(2, 1);
        cfg.term = "Turing(".to_string();
        let pipeline = Pipeline::new(
            cfg,
            FakeWiki::new(turing_hits(), Vec::new()),
            FakeWiki::new(turing_hits(), Vec::new()),
        )
        .unwrap();

        assert!(matches!(
            pipeline.run_grep(CancellationToken::new()),
            Err(WikiError::Pattern(_))
        ));
    }

    #[tokio::test]
    async fn run_follows_the_configured_output_mode() {
        let mut cfg = config(3, 3);
        cfg.output_mode = OutputMode::Summary;
        let pipeline = Pipeline::new(
            cfg,
            FakeWiki::new(turing_hits(), Vec::new()),
            FakeWiki::new(turing_hits(), turing_pages()),
        )
        .unwrap();
        let content_corpus = Arc::clone(&pipeline.content_corpus);

        let Ok(RunOutput::Summaries(batches)) = pipeline.run(CancellationToken::new()) else {
            panic!("summary mode should produce summaries");
        };
        assert_eq!(collect(batches).await.len(), 1);
        assert_eq!(
            *content_corpus.kinds.lock().unwrap(),
            vec![ContentKind::Summary]
        );

        let pipeline = Pipeline::new(
            config(2, 1),
            FakeWiki::new(turing_hits(), Vec::new()),
            FakeWiki::new(turing_hits(), turing_pages()),
        )
        .unwrap();
        let content_corpus = Arc::clone(&pipeline.content_corpus);

        let Ok(RunOutput::Matches(matches)) = pipeline.run(CancellationToken::new()) else {
            panic!("grep mode should produce matches");
        };
        assert_eq!(collect(matches).await.len(), 2);
        assert!(content_corpus
            .kinds
            .lock()
            .unwrap()
            .iter()
            .all(|kind| *kind == ContentKind::Body));
    }
}
