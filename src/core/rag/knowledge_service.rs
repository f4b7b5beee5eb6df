// =============================================================================
// KNOWLEDGE SERVICE - Document ingestion, retrieval and prompt enhancement
// =============================================================================
//
// Owns the in-memory chunk index and wires together the chunker, the
// embedding provider and the content extractor. Ingestion paths:
// - raw text        -> add_document
// - uploaded PDF    -> extract via Gemini inline data -> add_document
// - website URL     -> extract via Gemini             -> add_document
//
// Embedding failures are deliberately swallowed: the chunk is stored with an
// empty vector and stays reachable through keyword fallback. RAG enhancement
// never errors toward the caller either; the worst case is the unenhanced
// query.

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::core::ai::{ContentExtractor, EmbeddingProvider};

use super::chunker::{split_text, ChunkPolicy, ChunkingConfig};
use super::store::{ChunkMetadata, DocChunk, SearchConfig, VectorIndex};

/// Default number of chunks retrieved for prompt enhancement.
const DEFAULT_TOP_K: usize = 5;

/// Websites ingested by `initialize`.
const SEED_URLS: &[&str] = &[
    "https://az-1.info",
    "https://developers.arcgis.com/experience-builder/",
];

/// Known document names mapped to human-readable citation labels, checked in
/// order. Pure substring matching over the filename; fragile but only a
/// display convenience, never correctness-critical.
const CITATION_PATTERNS: &[(&str, &str)] = &[
    ("Content Catalog", "AZ-1 Content Catalog"),
    ("Digital-Navigator-Standards", "Digital Navigator Standards"),
    ("DN-Process-Outline", "Digital Navigator Process Outline"),
    (
        "Digital-Navigator-Baseline-Job-Description",
        "Digital Navigator Job Description",
    ),
    ("Skills-Assessment", "Digital Skills Assessment"),
];

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("upload store error: {0}")]
    Upload(String),

    #[error("content extraction failed for {source_name}: {detail}")]
    Extraction {
        source_name: String,
        detail: String,
    },
}

/// Persistence for uploaded PDF files (the only thing this service ever
/// writes to disk; the chunk index itself is process-lifetime only).
#[async_trait]
pub trait UploadStore: Send + Sync {
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<(), KnowledgeError>;

    async fn read(&self, name: &str) -> Result<Vec<u8>, KnowledgeError>;

    async fn list(&self) -> Result<Vec<String>, KnowledgeError>;
}

/// The read-side surface the chat service and recommender depend on.
#[async_trait]
pub trait KnowledgeAccess: Send + Sync {
    /// Wraps the query with retrieved context and citation instructions.
    /// Returns the query unchanged when there is nothing to retrieve.
    async fn enhance_prompt(&self, query: &str) -> String;

    /// Top-k retrieval; falls back to keyword matching when the query cannot
    /// be embedded.
    async fn query(&self, text: &str, k: usize) -> Vec<DocChunk>;
}

/// Provenance handed to `add_document` by the ingestion paths.
#[derive(Debug, Clone)]
pub struct DocumentMeta {
    pub source: String,
    pub filename: String,
    pub doc_type: String,
}

impl DocumentMeta {
    pub fn pdf(filename: &str) -> Self {
        Self {
            source: filename.to_string(),
            filename: filename.to_string(),
            doc_type: "pdf".to_string(),
        }
    }

    pub fn website(url: &str) -> Self {
        Self {
            source: url.to_string(),
            filename: url.to_string(),
            doc_type: "website".to_string(),
        }
    }
}

pub struct KnowledgeService<E, X, U>
where
    E: EmbeddingProvider,
    X: ContentExtractor,
    U: UploadStore,
{
    embedder: E,
    extractor: X,
    uploads: U,
    index: RwLock<Box<dyn VectorIndex>>,
    chunking: ChunkingConfig,
    search: SearchConfig,
}

impl<E, X, U> KnowledgeService<E, X, U>
where
    E: EmbeddingProvider,
    X: ContentExtractor,
    U: UploadStore,
{
    pub fn new(
        embedder: E,
        extractor: X,
        uploads: U,
        index: Box<dyn VectorIndex>,
        chunking: ChunkingConfig,
        search: SearchConfig,
    ) -> Self {
        Self {
            embedder,
            extractor,
            uploads,
            index: RwLock::new(index),
            chunking,
            search,
        }
    }

    /// Chunks and embeds raw text into the index.
    ///
    /// Catalog detection is by filename/source substring: the AZ-1 Content
    /// Catalog gets the dual chunking strategy and the query-time boost.
    pub async fn add_document(&self, content: &str, meta: DocumentMeta) {
        let is_catalog =
            meta.filename.contains("Content Catalog") || meta.source.contains("Content Catalog");
        let policy = if is_catalog {
            ChunkPolicy::Catalog
        } else {
            ChunkPolicy::Standard
        };

        let chunks = split_text(content, policy, &self.chunking);
        let total_chunks = chunks.len();
        tracing::info!(
            source = %meta.source,
            total_chunks,
            is_catalog,
            "adding document to knowledge base"
        );

        for (chunk_index, chunk) in chunks.into_iter().enumerate() {
            // Embed outside the write lock; an error leaves the chunk
            // unembedded rather than failing the whole document.
            let embedding = match self.embedder.embed(&chunk).await {
                Ok(vector) => vector,
                Err(err) => {
                    tracing::warn!(
                        source = %meta.source,
                        chunk_index,
                        "embedding failed, storing unembedded chunk: {err}"
                    );
                    Vec::new()
                }
            };

            self.index.write().await.add(DocChunk {
                content: chunk,
                metadata: ChunkMetadata {
                    source: meta.source.clone(),
                    filename: meta.filename.clone(),
                    doc_type: meta.doc_type.clone(),
                    chunk_index,
                    total_chunks,
                    is_catalog,
                    date_added: Utc::now(),
                },
                embedding,
            });
        }
    }

    /// Reads a previously uploaded PDF and ingests its extracted text.
    pub async fn add_pdf(&self, filename: &str) -> Result<(), KnowledgeError> {
        let bytes = self.uploads.read(filename).await?;
        tracing::info!(filename, size = bytes.len(), "extracting uploaded PDF");

        let text = self
            .extractor
            .extract_pdf(&bytes)
            .await
            .map_err(|err| KnowledgeError::Extraction {
                source_name: filename.to_string(),
                detail: err.to_string(),
            })?;

        self.add_document(&text, DocumentMeta::pdf(filename)).await;
        Ok(())
    }

    /// Extracts a website's content through the model and ingests it.
    pub async fn add_website(&self, url: &str) -> Result<(), KnowledgeError> {
        let text = self
            .extractor
            .extract_website(url)
            .await
            .map_err(|err| KnowledgeError::Extraction {
                source_name: url.to_string(),
                detail: err.to_string(),
            })?;

        self.add_document(&text, DocumentMeta::website(url)).await;
        Ok(())
    }

    /// Persists an uploaded file so rebuilds can re-ingest it later.
    pub async fn save_upload(&self, name: &str, bytes: &[u8]) -> Result<(), KnowledgeError> {
        self.uploads.save(name, bytes).await
    }

    pub async fn uploaded_files(&self) -> Result<Vec<String>, KnowledgeError> {
        self.uploads.list().await
    }

    /// Clears the index and re-ingests every uploaded PDF. Per-file failures
    /// are logged and skipped so one bad document cannot empty the base.
    pub async fn rebuild(&self) -> Result<(), KnowledgeError> {
        tracing::info!("rebuilding knowledge base");
        self.index.write().await.clear();

        let pdfs: Vec<String> = self
            .uploads
            .list()
            .await?
            .into_iter()
            .filter(|f| f.ends_with(".pdf"))
            .collect();
        tracing::info!(count = pdfs.len(), "found PDF files to process");

        for pdf in &pdfs {
            if let Err(err) = self.add_pdf(pdf).await {
                tracing::error!(filename = %pdf, "failed to re-ingest PDF: {err}");
            }
        }

        let total_chunks = self.index.read().await.len();
        tracing::info!(total_chunks, "knowledge base rebuilt");
        Ok(())
    }

    /// Clears the index and ingests the seed websites plus every uploaded
    /// PDF. Per-item failures are logged and skipped.
    pub async fn initialize(&self) -> Result<(), KnowledgeError> {
        self.index.write().await.clear();

        for url in SEED_URLS {
            if let Err(err) = self.add_website(url).await {
                tracing::error!(url, "failed to ingest seed website: {err}");
            }
        }

        let pdfs: Vec<String> = self
            .uploads
            .list()
            .await?
            .into_iter()
            .filter(|f| f.ends_with(".pdf"))
            .collect();
        for pdf in &pdfs {
            if let Err(err) = self.add_pdf(pdf).await {
                tracing::error!(filename = %pdf, "failed to ingest PDF: {err}");
            }
        }

        let total_chunks = self.index.read().await.len();
        tracing::info!(total_chunks, "knowledge base initialized");
        Ok(())
    }

    /// Number of chunks currently stored.
    pub async fn chunk_count(&self) -> usize {
        self.index.read().await.len()
    }

    fn citation_label(metadata: &ChunkMetadata) -> String {
        for (pattern, label) in CITATION_PATTERNS {
            if metadata.filename.contains(pattern) {
                return (*label).to_string();
            }
        }
        if metadata.filename.is_empty() {
            "Unknown Source".to_string()
        } else {
            metadata.filename.clone()
        }
    }
}

#[async_trait]
impl<E, X, U> KnowledgeAccess for KnowledgeService<E, X, U>
where
    E: EmbeddingProvider,
    X: ContentExtractor,
    U: UploadStore,
{
    async fn query(&self, text: &str, k: usize) -> Vec<DocChunk> {
        let index = self.index.read().await;
        if index.is_empty() {
            return Vec::new();
        }

        // Any stored catalog chunk widens the result set so catalog rows can
        // surface next to prose matches.
        let effective_k = if index.has_catalog_chunks() {
            k.max(self.search.catalog_min_k)
        } else {
            k
        };

        let query_embedding = match self.embedder.embed(text).await {
            Ok(vector) => vector,
            Err(err) => {
                tracing::warn!("query embedding failed, falling back to keyword search: {err}");
                Vec::new()
            }
        };

        if query_embedding.is_empty() {
            return index.keyword_search(text, effective_k);
        }

        index.search(&query_embedding, effective_k, &self.search)
    }

    async fn enhance_prompt(&self, query: &str) -> String {
        if self.index.read().await.is_empty() {
            tracing::debug!("knowledge base is empty, returning original query");
            return query.to_string();
        }

        let relevant = self.query(query, DEFAULT_TOP_K).await;
        if relevant.is_empty() {
            return query.to_string();
        }

        let context: Vec<String> = relevant
            .iter()
            .map(|chunk| {
                format!(
                    "Content from [{}]:\n{}",
                    Self::citation_label(&chunk.metadata),
                    chunk.content
                )
            })
            .collect();

        format!(
            "\nQuery: {query}\n\nRelevant context:\n{}\n\nBased on the above context, \
             please provide a comprehensive answer to the query. Make sure to cite sources \
             using the format [Source: Document Name] when providing specific information \
             from the context.\n",
            context.join("\n\n")
        )
    }
}
