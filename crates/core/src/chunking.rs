use crate::models::{PageChunk, SearchHits};

/// Keeps at most `cap` page ids, preserving their order.
pub fn truncate_hits(mut hits: SearchHits, cap: usize) -> SearchHits {
    hits.page_ids.truncate(cap);
    hits
}

/// Splits the page ids into request-sized batches.
///
/// When the whole result set already fits in one batch (`total_hits <=
/// chunk_size`) the ids are returned as a single chunk. Empty id lists yield no
/// chunks.
pub fn partition_hits(hits: &SearchHits, chunk_size: usize) -> Vec<PageChunk> {
    if hits.page_ids.is_empty() {
        return Vec::new();
    }

    let chunk_size = chunk_size.max(1);
    if hits.total_hits <= chunk_size as u64 {
        return vec![hits.page_ids.clone()];
    }

    hits.page_ids
        .chunks(chunk_size)
        .map(<[_]>::to_vec)
        .collect()
}
