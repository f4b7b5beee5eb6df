// =============================================================================
// DOCUMENT STORE - In-memory chunk list + brute-force similarity search
// =============================================================================
//
// Chunks are append-only for the lifetime of the process; the only mutation
// besides `add` is a wholesale `clear` during rebuild/initialize. There is no
// persistence and no real index structure: `search` is an O(n) scan, which is
// an explicit scaling limit of this service, acceptable because the corpus is
// a handful of documents. The `VectorIndex` trait exists so a real ANN index
// could be swapped in without touching callers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::similarity::cosine_similarity;

/// Where a chunk came from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Original source: file path or URL.
    pub source: String,
    /// Bare filename (equal to `source` for websites).
    pub filename: String,
    /// "pdf", "website" or "text".
    pub doc_type: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// True when the source document is the AZ-1 Content Catalog; these
    /// chunks get a similarity boost at query time.
    pub is_catalog: bool,
    pub date_added: DateTime<Utc>,
}

/// A bounded slice of source text with its embedding.
///
/// Immutable once created. An empty embedding means "unembedded": the
/// embedding call failed and the chunk opts out of similarity scoring,
/// remaining reachable only through keyword fallback.
#[derive(Debug, Clone)]
pub struct DocChunk {
    pub content: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

/// Query-time tunables. The catalog boost is an inherited tuning choice, not
/// a derived constant; do not assume 1.1 is correct.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Multiplier applied to catalog-chunk similarities.
    pub catalog_boost: f32,
    /// Minimum effective k whenever any catalog chunk is stored.
    pub catalog_min_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            catalog_boost: 1.1,
            catalog_min_k: 10,
        }
    }
}

/// Narrow storage/search interface so the linear scan can later be replaced
/// by a real vector index without changing callers.
pub trait VectorIndex: Send + Sync {
    fn add(&mut self, chunk: DocChunk);

    /// Top-k chunks by (boosted) cosine similarity, non-increasing order.
    fn search(&self, query: &[f32], k: usize, config: &SearchConfig) -> Vec<DocChunk>;

    /// Case-insensitive substring filter in store order; the fallback when
    /// the query could not be embedded.
    fn keyword_search(&self, query: &str, k: usize) -> Vec<DocChunk>;

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn has_catalog_chunks(&self) -> bool;

    /// Filenames of every stored chunk's source, in store order.
    fn sources(&self) -> Vec<String>;
}

/// Brute-force implementation backed by a plain Vec.
#[derive(Default)]
pub struct LinearScanIndex {
    chunks: Vec<DocChunk>,
}

impl LinearScanIndex {
    pub fn new() -> Self {
        Self { chunks: Vec::new() }
    }
}

impl VectorIndex for LinearScanIndex {
    fn add(&mut self, chunk: DocChunk) {
        self.chunks.push(chunk);
    }

    fn search(&self, query: &[f32], k: usize, config: &SearchConfig) -> Vec<DocChunk> {
        let mut scored: Vec<(f32, &DocChunk)> = self
            .chunks
            .iter()
            .map(|chunk| {
                let similarity = cosine_similarity(query, &chunk.embedding);
                let boosted = if chunk.metadata.is_catalog {
                    similarity * config.catalog_boost
                } else {
                    similarity
                };
                (boosted, chunk)
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().take(k).map(|(_, c)| c.clone()).collect()
    }

    fn keyword_search(&self, query: &str, k: usize) -> Vec<DocChunk> {
        let needle = query.to_lowercase();
        self.chunks
            .iter()
            .filter(|chunk| chunk.content.to_lowercase().contains(&needle))
            .take(k)
            .cloned()
            .collect()
    }

    fn clear(&mut self) {
        self.chunks.clear();
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }

    fn has_catalog_chunks(&self) -> bool {
        self.chunks.iter().any(|c| c.metadata.is_catalog)
    }

    fn sources(&self) -> Vec<String> {
        self.chunks
            .iter()
            .map(|c| c.metadata.filename.clone())
            .collect()
    }
}

#[cfg(test)]
pub(crate) fn test_chunk(content: &str, embedding: Vec<f32>, is_catalog: bool) -> DocChunk {
    DocChunk {
        content: content.to_string(),
        metadata: ChunkMetadata {
            source: "test.pdf".to_string(),
            filename: "test.pdf".to_string(),
            doc_type: "pdf".to_string(),
            chunk_index: 0,
            total_chunks: 1,
            is_catalog,
            date_added: Utc::now(),
        },
        embedding,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_returns_top_k_sorted() {
        let mut index = LinearScanIndex::new();
        index.add(test_chunk("far", vec![0.0, 1.0], false));
        index.add(test_chunk("near", vec![1.0, 0.1], false));
        index.add(test_chunk("exact", vec![1.0, 0.0], false));

        let results = index.search(&[1.0, 0.0], 2, &SearchConfig::default());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "exact");
        assert_eq!(results[1].content, "near");
    }

    #[test]
    fn test_search_caps_result_count() {
        let mut index = LinearScanIndex::new();
        for i in 0..10 {
            index.add(test_chunk(&format!("c{i}"), vec![1.0, 0.0], false));
        }
        let results = index.search(&[1.0, 0.0], 3, &SearchConfig::default());
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_catalog_boost_reorders_results() {
        let mut index = LinearScanIndex::new();
        // Plain chunk scores slightly higher raw, catalog chunk wins boosted.
        index.add(test_chunk("plain", vec![1.0, 0.05], false));
        index.add(test_chunk("catalog", vec![1.0, 0.15], true));

        let results = index.search(&[1.0, 0.0], 2, &SearchConfig::default());
        assert_eq!(results[0].content, "catalog");
    }

    #[test]
    fn test_unembedded_chunks_score_zero() {
        let mut index = LinearScanIndex::new();
        index.add(test_chunk("unembedded", vec![], false));
        index.add(test_chunk("embedded", vec![1.0, 0.0], false));

        let results = index.search(&[1.0, 0.0], 2, &SearchConfig::default());
        assert_eq!(results[0].content, "embedded");
    }

    #[test]
    fn test_keyword_search_is_case_insensitive() {
        let mut index = LinearScanIndex::new();
        index.add(test_chunk("Broadband availability in Pima County", vec![], false));
        index.add(test_chunk("Device lending programs", vec![], false));

        let results = index.keyword_search("BROADBAND", 5);
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("Broadband"));
    }

    #[test]
    fn test_keyword_search_preserves_store_order() {
        let mut index = LinearScanIndex::new();
        index.add(test_chunk("alpha match", vec![], false));
        index.add(test_chunk("beta match", vec![], false));

        let results = index.keyword_search("match", 5);
        assert_eq!(results[0].content, "alpha match");
        assert_eq!(results[1].content, "beta match");
    }

    #[test]
    fn test_clear_empties_the_store() {
        let mut index = LinearScanIndex::new();
        index.add(test_chunk("x", vec![], false));
        assert_eq!(index.len(), 1);
        index.clear();
        assert!(index.is_empty());
        assert!(!index.has_catalog_chunks());
    }
}
