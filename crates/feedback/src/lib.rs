//! Feedback store — vector-indexed (observation, action) exemplars.
//!
//! Each agent owns one collection. A feedback pairs what was observed with
//! the action that should follow it; at chat time the orchestrator retrieves
//! the nearest exemplars to the latest observation and feeds them to the
//! selection agents as few-shot context.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use statecraft_core::error::{Error, Result, VectorStoreError};
use statecraft_core::provider::Embedder;
use statecraft_core::store::VectorIndex;

pub const TAG_OBSERVATION_NAME: &str = "observation_name:";
pub const TAG_STATE_NAME: &str = "state_name:";

/// What was observed: typically the name and result of the last action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub name: String,
    pub content: String,
}

/// The exemplary action to take on that observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExemplarAction {
    pub name: String,
    pub content: String,
}

/// A stored (observation, action) exemplar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// Store-assigned identifier; regenerated on every insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub agent_name: String,

    pub observation: Observation,

    pub action: ExemplarAction,

    #[serde(default)]
    pub state_name: String,
}

impl Feedback {
    /// Tags used for filtered retrieval.
    pub fn tags(&self) -> Vec<String> {
        let mut tags = vec![format!("{TAG_OBSERVATION_NAME}{}", self.observation.name)];
        if !self.state_name.is_empty() {
            tags.push(format!("{TAG_STATE_NAME}{}", self.state_name));
        }
        tags
    }

    /// The text rendering that gets embedded.
    pub fn canonical_text(&self) -> String {
        format!(
            "{}: {}\n{}: {}",
            self.observation.name, self.observation.content, self.action.name, self.action.content
        )
    }
}

/// Sanitize an agent name into a collection identifier (PascalCase, split on
/// whitespace, `_` and `-`).
pub fn collection_name(agent_name: &str) -> Result<String> {
    let name: String = agent_name
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            let mut chars = chunk.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect();

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::config(format!(
            "agent_name {agent_name:?} cannot be used as a collection name"
        )));
    }
    Ok(name)
}

/// Per-agent feedback lifecycle over a vector index and an embedder.
pub struct FeedbackStore {
    index: Arc<dyn VectorIndex>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl FeedbackStore {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            index,
            embedder: Some(embedder),
        }
    }

    /// A store that can list, clear, and drop but not embed. Adding or
    /// retrieving through it is a configuration error.
    pub fn without_embedder(index: Arc<dyn VectorIndex>) -> Self {
        Self {
            index,
            embedder: None,
        }
    }

    fn embedder(&self) -> Result<&Arc<dyn Embedder>> {
        self.embedder
            .as_ref()
            .ok_or_else(|| Error::config("no embedding model configured"))
    }

    /// Create the agent's collection if absent.
    pub async fn ensure_ready(&self, agent_name: &str) -> Result<()> {
        let collection = collection_name(agent_name)?;
        self.index
            .ensure_collection(&collection, self.embedder()?.dimension())
            .await?;
        Ok(())
    }

    /// Embed and upsert a batch of feedbacks. Returns the assigned ids.
    ///
    /// Ids are generated here, one per feedback per call. They must never be
    /// computed ahead of time and reused across inserts.
    pub async fn add(&self, agent_name: &str, feedbacks: &[Feedback]) -> Result<Vec<String>> {
        if feedbacks.is_empty() {
            return Ok(Vec::new());
        }

        self.ensure_ready(agent_name).await?;
        let collection = collection_name(agent_name)?;

        let texts: Vec<String> = feedbacks.iter().map(Feedback::canonical_text).collect();
        let vectors = self.embedder()?.embed(&texts).await.map_err(Error::Provider)?;

        let mut ids = Vec::with_capacity(feedbacks.len());
        for (feedback, vector) in feedbacks.iter().zip(vectors) {
            let id = Uuid::new_v4().to_string();
            let mut stored = feedback.clone();
            stored.id = Some(id.clone());

            let properties = json!({
                "text": serde_json::to_string(&stored)?,
                "tags": stored.tags(),
            });

            self.index
                .insert(&collection, &id, properties, vector)
                .await?;
            ids.push(id);
        }

        debug!(agent = agent_name, count = ids.len(), "Stored feedbacks");
        Ok(ids)
    }

    /// Paginated scan of the agent's feedbacks.
    pub async fn list(
        &self,
        agent_name: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Feedback>> {
        let collection = collection_name(agent_name)?;
        let objects = match self.index.list(&collection, offset, limit).await {
            Ok(objects) => objects,
            Err(VectorStoreError::CollectionNotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(objects
            .iter()
            .filter_map(|o| parse_stored(&o.properties))
            .collect())
    }

    /// Semantic retrieval: embed `query_text` and return the nearest
    /// feedbacks, optionally filtered by tags. Missing collections yield an
    /// empty result rather than an error.
    pub async fn retrieve(
        &self,
        agent_name: &str,
        query_text: &str,
        top_k: usize,
        tags: &[String],
    ) -> Result<Vec<Feedback>> {
        if top_k == 0 || query_text.is_empty() {
            return Ok(Vec::new());
        }

        let collection = collection_name(agent_name)?;
        if !self.index.collection_exists(&collection).await? {
            return Ok(Vec::new());
        }

        let vectors = self
            .embedder()?
            .embed(std::slice::from_ref(&query_text.to_string()))
            .await
            .map_err(Error::Provider)?;
        let Some(query_vector) = vectors.first() else {
            return Ok(Vec::new());
        };

        let objects = self
            .index
            .query_by_vector(&collection, query_vector, top_k, tags)
            .await?;

        Ok(objects
            .iter()
            .filter_map(|o| parse_stored(&o.properties))
            .collect())
    }

    /// Remove every feedback but keep the collection.
    pub async fn clear(&self, agent_name: &str) -> Result<()> {
        let collection = collection_name(agent_name)?;
        match self.index.delete_all(&collection).await {
            Ok(()) | Err(VectorStoreError::CollectionNotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Drop the agent's collection entirely.
    pub async fn drop_collection(&self, agent_name: &str) -> Result<()> {
        let collection = collection_name(agent_name)?;
        self.index.delete_collection(&collection).await?;
        Ok(())
    }
}

fn parse_stored(properties: &Value) -> Option<Feedback> {
    let text = properties.get("text")?.as_str()?;
    match serde_json::from_str(text) {
        Ok(feedback) => Some(feedback),
        Err(e) => {
            warn!(error = %e, "Skipping unparseable feedback object");
            None
        }
    }
}
