//! Vector storage and chunk ingestion for filing text.

pub mod document;
pub mod error;
pub mod in_memory_store;
pub mod qdrant_ops;
pub mod vector_store;

pub use error::MemoryError;
pub use in_memory_store::InMemoryVectorStore;
pub use qdrant_ops::QdrantOps;
pub use vector_store::{ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError};
