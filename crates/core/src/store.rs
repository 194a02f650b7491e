//! VectorIndex trait — the abstraction over vector databases.
//!
//! One collection per agent, fixed vector dimension per collection, cosine
//! nearest-neighbour queries with optional tag filtering. Implementations:
//! the HTTP client for an external store and an in-memory index.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::VectorStoreError;

/// Hard upper bound on one page of a listing.
pub const MAX_PAGE_LIMIT: usize = 10_000;

/// One stored object, as returned by queries and listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
    pub id: String,

    /// Arbitrary JSON properties. Tag filtering matches against a `tags`
    /// string-array property when present.
    pub properties: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,

    /// Cosine distance to the query vector, for query results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

/// A vector database holding per-agent collections.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Idempotently create `name` with the given dimension. Fails with
    /// `DimensionConflict` when the collection exists with another dimension.
    async fn ensure_collection(
        &self,
        name: &str,
        vector_dim: usize,
    ) -> std::result::Result<(), VectorStoreError>;

    async fn collection_exists(&self, name: &str) -> std::result::Result<bool, VectorStoreError>;

    /// Upsert one object by id.
    async fn insert(
        &self,
        name: &str,
        id: &str,
        properties: Value,
        vector: Vec<f32>,
    ) -> std::result::Result<(), VectorStoreError>;

    /// Remove every object but keep the collection.
    async fn delete_all(&self, name: &str) -> std::result::Result<(), VectorStoreError>;

    /// Drop the collection entirely.
    async fn delete_collection(&self, name: &str) -> std::result::Result<(), VectorStoreError>;

    /// Up to `top_k` nearest objects; `tag_filter` is a conjunction of tag
    /// equalities.
    async fn query_by_vector(
        &self,
        name: &str,
        vector: &[f32],
        top_k: usize,
        tag_filter: &[String],
    ) -> std::result::Result<Vec<StoredObject>, VectorStoreError>;

    /// Paginated scan; `limit` must be at most [`MAX_PAGE_LIMIT`].
    async fn list(
        &self,
        name: &str,
        offset: usize,
        limit: usize,
    ) -> std::result::Result<Vec<StoredObject>, VectorStoreError>;
}

/// Whether `properties.tags` contains every tag in `filter`.
pub fn matches_tags(properties: &Value, filter: &[String]) -> bool {
    if filter.is_empty() {
        return true;
    }
    let Some(tags) = properties.get("tags").and_then(Value::as_array) else {
        return false;
    };
    filter
        .iter()
        .all(|wanted| tags.iter().any(|t| t.as_str() == Some(wanted)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_filter_matches_everything() {
        assert!(matches_tags(&json!({}), &[]));
    }

    #[test]
    fn conjunction_of_tags() {
        let props = json!({"tags": ["a", "b", "c"]});
        assert!(matches_tags(&props, &["a".into(), "c".into()]));
        assert!(!matches_tags(&props, &["a".into(), "d".into()]));
    }

    #[test]
    fn missing_tags_property_fails_nonempty_filter() {
        assert!(!matches_tags(&json!({"text": "x"}), &["a".into()]));
    }
}
