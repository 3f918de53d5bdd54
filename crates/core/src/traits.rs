use crate::{ContentKind, PageId, PageOutcome, SearchHits, SearchRequest, WikiError};
use async_trait::async_trait;

#[async_trait]
pub trait Corpus: Send + Sync {
    /// One search request. `Err` when the call failed or the response had no hit list.
    async fn search(&self, request: &SearchRequest) -> Result<SearchHits, WikiError>;

    /// One batched content request. The outer `Err` is a batch-level failure;
    /// otherwise there is one outcome per requested id, in request order.
    async fn fetch_pages(
        &self,
        page_ids: &[PageId],
        kind: ContentKind,
    ) -> Result<Vec<PageOutcome>, WikiError>;
}
