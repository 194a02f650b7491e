//! Vector store clients for Statecraft.
//!
//! Two implementations of [`statecraft_core::VectorIndex`]:
//! - [`HttpVectorStore`] talks to an external store over its REST API
//!   (HNSW index, cosine distance, client-supplied vectors).
//! - [`MemoryVectorStore`] keeps collections in process memory with exact
//!   cosine ranking — useful for testing and ephemeral sessions.

pub mod http;
pub mod memory;
pub mod similarity;

pub use http::HttpVectorStore;
pub use memory::MemoryVectorStore;
