pub mod chunker;
pub mod knowledge_service;
pub mod similarity;
pub mod store;

pub use chunker::{ChunkPolicy, ChunkingConfig};
pub use knowledge_service::{
    DocumentMeta, KnowledgeAccess, KnowledgeError, KnowledgeService, UploadStore,
};
pub use store::{ChunkMetadata, DocChunk, LinearScanIndex, SearchConfig, VectorIndex};
