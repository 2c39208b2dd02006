//! Offline filing ingestion and request-time passage retrieval.
//!
//! The ingestion side runs in three stages: the filing index client lists
//! 10-K filings into a JSON manifest, the fetcher downloads each filing and
//! reduces it to plain text, and the indexer chunks and embeds the text into
//! the vector store. The retriever answers one query against that store.

pub mod error;
pub mod fetcher;
pub mod filings;
pub mod html;
pub mod indexer;
pub mod retriever;

pub use error::{IndexError, Result};
