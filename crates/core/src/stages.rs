//! Pipeline stages.
//!
//! Each `spawn_*` function starts one task and hands back the receiving end of
//! its bounded output queue. Every queue read and write races the shared
//! cancellation token, and a stage closes its output by returning.

use crate::chunking::{partition_hits, truncate_hits};
use crate::grep::Matcher;
use crate::pool::WorkerPool;
use crate::traits::Corpus;
use crate::{
    ChunkOutcome, ContentKind, EnrichedBatch, MatchOutcome, PageOutcome, SearchHits,
    SearchOutcome, SearchRequest,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

/// Sends `item`, giving up if cancellation fires first. Returns `false` when the
/// stage should stop.
async fn forward<T>(output: &mpsc::Sender<T>, item: T, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        sent = output.send(item) => sent.is_ok(),
    }
}

/// Issues one search and emits its outcome at most once.
///
/// Zero total hits is a valid empty result: the output closes without an item.
pub fn spawn_searcher<C>(
    corpus: Arc<C>,
    request: SearchRequest,
    cancel: CancellationToken,
) -> mpsc::Receiver<SearchOutcome>
where
    C: Corpus + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(
        async move {
            let outcome = tokio::select! {
                () = cancel.cancelled() => return,
                outcome = corpus.search(&request) => outcome,
            };

            if let Ok(SearchHits {
                suggestion: Some(suggestion),
                ..
            }) = &outcome
            {
                info!(term = %request.term, %suggestion, "corpus suggests another spelling");
            }

            match &outcome {
                Ok(hits) if hits.total_hits == 0 => {
                    debug!(term = %request.term, "search returned no hits");
                    return;
                }
                Ok(hits) => debug!(
                    total_hits = hits.total_hits,
                    returned = hits.page_ids.len(),
                    "search complete"
                ),
                Err(error) => warn!(%error, "search failed"),
            }
            forward(&tx, outcome, &cancel).await;
        }
        .in_current_span(),
    );
    rx
}

/// Single-shot gate: forwards the first upstream outcome with at most `cap` ids.
pub fn spawn_take(
    cap: usize,
    mut input: mpsc::Receiver<SearchOutcome>,
    cancel: CancellationToken,
) -> mpsc::Receiver<SearchOutcome> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(
        async move {
            let outcome = tokio::select! {
                () = cancel.cancelled() => return,
                outcome = input.recv() => match outcome {
                    Some(outcome) => outcome,
                    None => return,
                },
            };
            forward(&tx, outcome.map(|hits| truncate_hits(hits, cap)), &cancel).await;
        }
        .in_current_span(),
    );
    rx
}

/// Splits the first upstream outcome into batches of at most `chunk_size` ids.
///
/// A failed search is passed along as a single error item.
pub fn spawn_chunker(
    chunk_size: usize,
    mut input: mpsc::Receiver<SearchOutcome>,
    cancel: CancellationToken,
) -> mpsc::Receiver<ChunkOutcome> {
    let (tx, rx) = mpsc::channel(chunk_size.max(1));
    tokio::spawn(
        async move {
            let outcome = tokio::select! {
                () = cancel.cancelled() => return,
                outcome = input.recv() => match outcome {
                    Some(outcome) => outcome,
                    None => return,
                },
            };

            let hits = match outcome {
                Ok(hits) => hits,
                Err(error) => {
                    forward(&tx, Err(error), &cancel).await;
                    return;
                }
            };

            for chunk in partition_hits(&hits, chunk_size) {
                if !forward(&tx, Ok(chunk), &cancel).await {
                    return;
                }
            }
        }
        .in_current_span(),
    );
    rx
}

/// Fetches every chunk concurrently, one batched request per chunk.
///
/// Output closes once the input is exhausted (or cancelled) and every fetch
/// already launched has reported.
pub fn spawn_enricher<C>(
    corpus: Arc<C>,
    kind: ContentKind,
    mut input: mpsc::Receiver<ChunkOutcome>,
    cancel: CancellationToken,
) -> mpsc::Receiver<EnrichedBatch>
where
    C: Corpus + 'static,
{
    let (tx, rx) = mpsc::channel(input.max_capacity());
    tokio::spawn(
        async move {
            let pool = WorkerPool::new(tx, cancel.clone());

            loop {
                let chunk = tokio::select! {
                    () = cancel.cancelled() => break,
                    chunk = input.recv() => match chunk {
                        Some(chunk) => chunk,
                        None => break,
                    },
                };

                let corpus = Arc::clone(&corpus);
                pool.spawn(async move {
                    let page_ids = chunk?;
                    debug!(?page_ids, %kind, "fetching batch");
                    let batch = corpus.fetch_pages(&page_ids, kind).await;
                    if let Err(error) = &batch {
                        warn!(?page_ids, %error, "batch fetch failed");
                    }
                    batch
                });
            }

            debug!(workers = pool.len(), "waiting for in-flight batches");
            pool.finish().await;
        }
        .in_current_span(),
    );
    rx
}

/// Scans every page of every batch and emits one outcome per page.
///
/// Batch failures become a single error outcome. A page that failed on its own
/// is reported once as an error and is not scanned.
pub fn spawn_matcher(
    matcher: Matcher,
    mut input: mpsc::Receiver<EnrichedBatch>,
    cancel: CancellationToken,
) -> mpsc::Receiver<MatchOutcome> {
    let (tx, rx) = mpsc::channel(input.max_capacity());
    tokio::spawn(
        async move {
            loop {
                let batch = tokio::select! {
                    () = cancel.cancelled() => return,
                    batch = input.recv() => match batch {
                        Some(batch) => batch,
                        None => return,
                    },
                };

                for page in flatten_batch(batch) {
                    let outcome = page.map(|content| matcher.scan(content));
                    if !forward(&tx, outcome, &cancel).await {
                        return;
                    }
                }
            }
        }
        .in_current_span(),
    );
    rx
}

/// Page outcomes of one batch; a batch failure becomes a single error item.
pub fn flatten_batch(batch: EnrichedBatch) -> Vec<PageOutcome> {
    match batch {
        Ok(pages) => pages,
        Err(error) => vec![Err(error)],
    }
}
