//! Retrieval-augmented questions against one session's store.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::gemini::client::{FileSearchApi, GeminiError};
use crate::gemini::grounding::extract_query_result;
use crate::gemini::types::QueryResult;
use crate::store::StoreHandle;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum Model {
    #[default]
    #[serde(rename = "gemini-2.5-flash")]
    Flash,
    #[serde(rename = "gemini-2.5-pro")]
    Pro,
}

impl Model {
    pub const ALL: [Model; 2] = [Model::Flash, Model::Pro];

    pub fn id(self) -> &'static str {
        match self {
            Model::Flash => "gemini-2.5-flash",
            Model::Pro => "gemini-2.5-pro",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id.trim())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("{0}")]
    QueryFailed(#[from] GeminiError),
}

/// Asks `question` with retrieval scoped to `store`.
///
/// A response without text is still `Ok`; the caller decides how to present it.
pub async fn query(
    api: &impl FileSearchApi,
    question: &str,
    store: &StoreHandle,
    model: Model,
) -> Result<QueryResult, QueryError> {
    debug!(store = %store.name, model = model.id(), "querying store");
    let response = api
        .generate_with_file_search(model.id(), question, &store.name)
        .await?;
    let result = extract_query_result(&response);
    info!(
        has_answer = result.answer.is_some(),
        sources = result.sources.len(),
        "query complete"
    );
    Ok(result)
}
