//! HTTP client for an external vector store.
//!
//! Collections are created with vectorizer `none` (the client supplies
//! vectors), an HNSW index with cosine distance, `efConstruction` 128 and
//! `maxConnections` 64. The REST surface used:
//!
//! - `GET    /v1/schema/{collection}`            — describe (404 when absent)
//! - `POST   /v1/schema`                         — create collection
//! - `DELETE /v1/schema/{collection}`            — drop collection
//! - `PUT    /v1/objects/{collection}/{id}`      — upsert one object
//! - `DELETE /v1/objects/{collection}/{id}`      — delete one object
//! - `GET    /v1/objects?class=&offset=&limit=`  — paginated listing
//! - `POST   /v1/search/{collection}`            — nearest-neighbour query

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use statecraft_core::error::VectorStoreError;
use statecraft_core::store::{StoredObject, VectorIndex, MAX_PAGE_LIMIT};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Page size used when draining a collection.
const DRAIN_PAGE: usize = 1_000;

pub struct HttpVectorStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpVectorStore {
    pub fn new(base_url: &str) -> Result<Self, VectorStoreError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| VectorStoreError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn describe(&self, name: &str) -> Result<Option<SchemaResponse>, VectorStoreError> {
        let response = self
            .client
            .get(self.url(&format!("/v1/schema/{name}")))
            .send()
            .await
            .map_err(|e| VectorStoreError::Network(e.to_string()))?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        let response = check_status(response).await?;
        let schema: SchemaResponse = response
            .json()
            .await
            .map_err(|e| VectorStoreError::Network(e.to_string()))?;
        Ok(Some(schema))
    }

    async fn delete_object(&self, name: &str, id: &str) -> Result<(), VectorStoreError> {
        let response = self
            .client
            .delete(self.url(&format!("/v1/objects/{name}/{id}")))
            .send()
            .await
            .map_err(|e| VectorStoreError::Network(e.to_string()))?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for HttpVectorStore {
    async fn ensure_collection(
        &self,
        name: &str,
        vector_dim: usize,
    ) -> Result<(), VectorStoreError> {
        if let Some(existing) = self.describe(name).await? {
            if existing.vector_dimension != vector_dim {
                return Err(VectorStoreError::DimensionConflict {
                    collection: name.to_string(),
                    existing: existing.vector_dimension,
                    requested: vector_dim,
                });
            }
            debug!(collection = name, "Collection already exists");
            return Ok(());
        }

        info!(collection = name, vector_dim, "Creating collection");
        let body = json!({
            "class": name,
            "vectorizer": "none",
            "vectorDimension": vector_dim,
            "vectorIndexType": "hnsw",
            "vectorIndexConfig": {
                "distance": "cosine",
                "efConstruction": 128,
                "maxConnections": 64,
            },
            "properties": [
                { "name": "text", "dataType": ["text"] },
                { "name": "tags", "dataType": ["text[]"] },
            ],
        });

        let response = self
            .client
            .post(self.url("/v1/schema"))
            .json(&body)
            .send()
            .await
            .map_err(|e| VectorStoreError::Network(e.to_string()))?;
        check_status(response).await?;
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, VectorStoreError> {
        Ok(self.describe(name).await?.is_some())
    }

    async fn insert(
        &self,
        name: &str,
        id: &str,
        properties: Value,
        vector: Vec<f32>,
    ) -> Result<(), VectorStoreError> {
        let body = json!({
            "properties": properties,
            "vector": vector,
        });

        let response = self
            .client
            .put(self.url(&format!("/v1/objects/{name}/{id}")))
            .json(&body)
            .send()
            .await
            .map_err(|e| VectorStoreError::Network(e.to_string()))?;
        check_status(response).await?;
        Ok(())
    }

    async fn delete_all(&self, name: &str) -> Result<(), VectorStoreError> {
        loop {
            let page = self.list(name, 0, DRAIN_PAGE).await?;
            if page.is_empty() {
                return Ok(());
            }
            for object in &page {
                self.delete_object(name, &object.id).await?;
            }
        }
    }

    async fn delete_collection(&self, name: &str) -> Result<(), VectorStoreError> {
        let response = self
            .client
            .delete(self.url(&format!("/v1/schema/{name}")))
            .send()
            .await
            .map_err(|e| VectorStoreError::Network(e.to_string()))?;

        // Dropping an absent collection is a no-op
        if response.status().as_u16() == 404 {
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }

    async fn query_by_vector(
        &self,
        name: &str,
        vector: &[f32],
        top_k: usize,
        tag_filter: &[String],
    ) -> Result<Vec<StoredObject>, VectorStoreError> {
        let mut body = json!({
            "vector": vector,
            "limit": top_k,
        });
        if !tag_filter.is_empty() {
            body["tags"] = json!(tag_filter);
        }

        let response = self
            .client
            .post(self.url(&format!("/v1/search/{name}")))
            .json(&body)
            .send()
            .await
            .map_err(|e| VectorStoreError::Network(e.to_string()))?;

        if response.status().as_u16() == 404 {
            return Err(VectorStoreError::CollectionNotFound(name.to_string()));
        }
        let response = check_status(response).await?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| VectorStoreError::Network(e.to_string()))?;
        Ok(parsed
            .results
            .into_iter()
            .map(ObjectDto::into_stored)
            .collect())
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

        let response = self
            .client
            .get(self.url("/v1/objects"))
            .query(&[
                ("class", name.to_string()),
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| VectorStoreError::Network(e.to_string()))?;

        if response.status().as_u16() == 404 {
            return Err(VectorStoreError::CollectionNotFound(name.to_string()));
        }
        let response = check_status(response).await?;

        let parsed: ListResponse = response
            .json()
            .await
            .map_err(|e| VectorStoreError::Network(e.to_string()))?;
        Ok(parsed
            .objects
            .into_iter()
            .map(ObjectDto::into_stored)
            .collect())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, VectorStoreError> {
    let status = response.status().as_u16();
    if (200..300).contains(&status) {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(VectorStoreError::Api {
        status_code: status,
        message,
    })
}

// --- Wire DTOs ---

#[derive(Debug, Deserialize)]
struct SchemaResponse {
    #[serde(rename = "vectorDimension")]
    vector_dimension: usize,
}

#[derive(Debug, Deserialize)]
struct ObjectDto {
    id: String,
    #[serde(default)]
    properties: Value,
    #[serde(default)]
    vector: Option<Vec<f32>>,
    #[serde(default)]
    distance: Option<f32>,
}

impl ObjectDto {
    fn into_stored(self) -> StoredObject {
        StoredObject {
            id: self.id,
            properties: self.properties,
            vector: self.vector,
            distance: self.distance,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<ObjectDto>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    objects: Vec<ObjectDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let store = HttpVectorStore::new("http://localhost:8080/").unwrap();
        assert_eq!(store.url("/v1/schema"), "http://localhost:8080/v1/schema");
    }

    #[test]
    fn schema_response_parses_dimension() {
        let parsed: SchemaResponse =
            serde_json::from_str(r#"{"class": "Agent", "vectorDimension": 1536}"#).unwrap();
        assert_eq!(parsed.vector_dimension, 1536);
    }

    #[test]
    fn search_response_parses_objects() {
        let parsed: SearchResponse = serde_json::from_str(
            r#"{"results": [{"id": "1", "properties": {"text": "x"}, "distance": 0.12}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.results.len(), 1);
        let stored = parsed.results.into_iter().next().unwrap().into_stored();
        assert_eq!(stored.id, "1");
        assert_eq!(stored.distance, Some(0.12));
    }

    #[test]
    fn list_response_defaults_to_empty() {
        let parsed: ListResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.objects.is_empty());
    }
}
