//! In-memory vector store — useful for testing and ephemeral sessions.
//!
//! Exact cosine ranking over a `Vec` per collection. Mirrors the external
//! store's contract, including the dimension conflict check and the page
//! limit, so code exercised against it behaves the same in production.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use statecraft_core::error::VectorStoreError;
use statecraft_core::store::{matches_tags, StoredObject, VectorIndex, MAX_PAGE_LIMIT};

use crate::similarity::cosine_distance;

struct Collection {
    vector_dim: usize,
    /// Insertion-ordered; upserts rewrite in place.
    objects: Vec<(String, Value, Vec<f32>)>,
}

/// A process-local vector store.
#[derive(Default)]
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorStore {
    async fn ensure_collection(
        &self,
        name: &str,
        vector_dim: usize,
    ) -> Result<(), VectorStoreError> {
        let mut collections = self.collections.write().await;
        match collections.get(name) {
            Some(existing) if existing.vector_dim != vector_dim => {
                Err(VectorStoreError::DimensionConflict {
                    collection: name.to_string(),
                    existing: existing.vector_dim,
                    requested: vector_dim,
                })
            }
            Some(_) => Ok(()),
            None => {
                collections.insert(
                    name.to_string(),
                    Collection {
                        vector_dim,
                        objects: Vec::new(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, VectorStoreError> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn insert(
        &self,
        name: &str,
        id: &str,
        properties: Value,
        vector: Vec<f32>,
    ) -> Result<(), VectorStoreError> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(name.to_string()))?;

        if vector.len() != collection.vector_dim {
            return Err(VectorStoreError::DimensionConflict {
                collection: name.to_string(),
                existing: collection.vector_dim,
                requested: vector.len(),
            });
        }

        match collection.objects.iter_mut().find(|(oid, _, _)| oid == id) {
            Some(slot) => {
                slot.1 = properties;
                slot.2 = vector;
            }
            None => collection.objects.push((id.to_string(), properties, vector)),
        }
        Ok(())
    }

    async fn delete_all(&self, name: &str) -> Result<(), VectorStoreError> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(name.to_string()))?;
        collection.objects.clear();
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), VectorStoreError> {
        self.collections.write().await.remove(name);
        Ok(())
    }

    async fn query_by_vector(
        &self,
        name: &str,
        vector: &[f32],
        top_k: usize,
        tag_filter: &[String],
    ) -> Result<Vec<StoredObject>, VectorStoreError> {
        let collections = self.collections.read().await;
        let collection = collections
            .get(name)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(name.to_string()))?;

        let mut scored: Vec<StoredObject> = collection
            .objects
            .iter()
            .filter(|(_, properties, _)| matches_tags(properties, tag_filter))
            .map(|(id, properties, stored)| StoredObject {
                id: id.clone(),
                properties: properties.clone(),
                vector: None,
                distance: Some(cosine_distance(stored, vector)),
            })
            .collect();

        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn list(
        &self,
        name: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<StoredObject>, VectorStoreError> {
        if limit > MAX_PAGE_LIMIT {
            return Err(VectorStoreError::PageTooLarge {
                requested: limit,
                max: MAX_PAGE_LIMIT,
            });
        }

        let collections = self.collections.read().await;
        let collection = collections
            .get(name)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(name.to_string()))?;

        Ok(collection
            .objects
            .iter()
            .skip(offset)
            .take(limit)
            .map(|(id, properties, _)| StoredObject {
                id: id.clone(),
                properties: properties.clone(),
                vector: None,
                distance: None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn seeded() -> MemoryVectorStore {
        let store = MemoryVectorStore::new();
        store.ensure_collection("Agent", 3).await.unwrap();
        store
            .insert("Agent", "a", json!({"tags": ["x"]}), vec![1.0, 0.0, 0.0])
            .await
            .unwrap();
        store
            .insert("Agent", "b", json!({"tags": ["y"]}), vec![0.0, 1.0, 0.0])
            .await
            .unwrap();
        store
            .insert("Agent", "c", json!({"tags": ["x", "y"]}), vec![0.7, 0.7, 0.0])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn ensure_is_idempotent_but_checks_dimension() {
        let store = MemoryVectorStore::new();
        store.ensure_collection("Agent", 3).await.unwrap();
        store.ensure_collection("Agent", 3).await.unwrap();

        let err = store.ensure_collection("Agent", 4).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::DimensionConflict { .. }));
    }

    #[tokio::test]
    async fn insert_rejects_wrong_dimension() {
        let store = MemoryVectorStore::new();
        store.ensure_collection("Agent", 3).await.unwrap();
        let err = store
            .insert("Agent", "a", json!({}), vec![1.0])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::DimensionConflict { .. }));
    }

    #[tokio::test]
    async fn insert_upserts_by_id() {
        let store = seeded().await;
        store
            .insert("Agent", "a", json!({"v": 2}), vec![0.5, 0.5, 0.0])
            .await
            .unwrap();
        let all = store.list("Agent", 0, 10).await.unwrap();
        assert_eq!(all.len(), 3);
        let a = all.iter().find(|o| o.id == "a").unwrap();
        assert_eq!(a.properties["v"], 2);
    }

    #[tokio::test]
    async fn query_ranks_by_cosine_distance() {
        let store = seeded().await;
        let results = store
            .query_by_vector("Agent", &[1.0, 0.0, 0.0], 2, &[])
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a");
        assert_eq!(results[1].id, "c");
        assert!(results[0].distance.unwrap() < results[1].distance.unwrap());
    }

    #[tokio::test]
    async fn query_applies_tag_conjunction() {
        let store = seeded().await;
        let results = store
            .query_by_vector("Agent", &[1.0, 0.0, 0.0], 10, &["x".into(), "y".into()])
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "c");
    }

    #[tokio::test]
    async fn list_paginates_and_caps() {
        let store = seeded().await;
        let page = store.list("Agent", 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "b");

        let err = store.list("Agent", 0, MAX_PAGE_LIMIT + 1).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::PageTooLarge { .. }));
    }

    #[tokio::test]
    async fn delete_all_keeps_collection() {
        let store = seeded().await;
        store.delete_all("Agent").await.unwrap();
        assert!(store.collection_exists("Agent").await.unwrap());
        assert!(store.list("Agent", 0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_collection_drops_it() {
        let store = seeded().await;
        store.delete_collection("Agent").await.unwrap();
        assert!(!store.collection_exists("Agent").await.unwrap());

        let err = store.list("Agent", 0, 10).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::CollectionNotFound(_)));
    }
}
