//! Lifecycle of the remote File Search store backing one chat session.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::gemini::client::{FileSearchApi, GeminiError};
use crate::gemini::operation::{PollPolicy, WaitError, wait_operation};
use crate::gemini::types::{CustomMetadata, UploadConfig};

pub const STORE_PREFIX: &str = "pdf-chat-store-";
const SUFFIX_LEN: usize = 8;
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const UPLOAD_SOURCE_TAG: &str = "pdf_chat_upload";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    CreateFailed(#[source] GeminiError),

    #[error("{0}")]
    UploadFailed(#[source] GeminiError),

    #[error("indexing failed: {0}")]
    IndexingFailed(String),

    #[error("Operation timed out after {}s.", .0.as_secs())]
    Timeout(Duration),

    #[error("{0}")]
    CleanupFailed(#[source] GeminiError),
}

/// Opaque reference to a remote store owned by one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHandle {
    pub name: String,
    pub display_name: String,
}

/// Drives create → upload → poll → delete against a [`FileSearchApi`].
#[derive(Debug)]
pub struct StoreManager<A> {
    api: A,
    poll: PollPolicy,
}

impl<A: FileSearchApi> StoreManager<A> {
    pub fn new(api: A, poll: PollPolicy) -> Self {
        Self { api, poll }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn create_store(&self) -> Result<StoreHandle, StoreError> {
        let display_name = store_display_name();
        let store = self
            .api
            .create_store(&display_name)
            .await
            .map_err(StoreError::CreateFailed)?;
        info!(store = %store.name, %display_name, "store created");
        Ok(StoreHandle {
            name: store.name,
            display_name,
        })
    }

    /// Uploads `file` and blocks until indexing finishes or the poll budget runs out.
    /// Returns the operation's response payload.
    pub async fn upload_to_store(
        &self,
        file: &Path,
        store: &StoreHandle,
        display_name: &str,
    ) -> Result<serde_json::Value, StoreError> {
        let config = UploadConfig {
            display_name: display_name.to_string(),
            custom_metadata: vec![
                CustomMetadata::string("source", UPLOAD_SOURCE_TAG),
                CustomMetadata::numeric("timestamp", chrono::Utc::now().timestamp() as f64),
            ],
        };

        let op = self
            .api
            .upload_to_store(file, &store.name, &config)
            .await
            .map_err(StoreError::UploadFailed)?;

        let op = wait_operation(&self.api, op, self.poll)
            .await
            .map_err(|e| match e {
                WaitError::Timeout(waited) => StoreError::Timeout(waited),
                WaitError::Gemini(e) => StoreError::UploadFailed(e),
            })?;

        if let Some(err) = op.error {
            let message = err.message.unwrap_or_else(|| "unknown error".to_string());
            warn!(store = %store.name, %message, "indexing operation failed");
            return Err(StoreError::IndexingFailed(message));
        }

        info!(store = %store.name, document = display_name, "document indexed");
        Ok(op.response.unwrap_or(serde_json::Value::Null))
    }

    /// Force-deletes the store together with any indexed documents.
    pub async fn delete_store(&self, store: &StoreHandle) -> Result<(), StoreError> {
        self.api
            .delete_store(&store.name, true)
            .await
            .map_err(StoreError::CleanupFailed)?;
        info!(store = %store.name, "store deleted");
        Ok(())
    }
}

/// Fixed prefix plus a random suffix; unique enough within one browser session.
pub fn store_display_name() -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[fastrand::usize(..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{STORE_PREFIX}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::testing::MockApi;

    fn manager(api: MockApi) -> StoreManager<MockApi> {
        StoreManager::new(api, PollPolicy::default())
    }

    fn handle() -> StoreHandle {
        StoreHandle {
            name: "fileSearchStores/store-1".into(),
            display_name: "pdf-chat-store-abcd1234".into(),
        }
    }

    #[test]
    fn display_name_has_prefix_and_lowercase_alphanumeric_suffix() {
        let name = store_display_name();
        let suffix = name.strip_prefix(STORE_PREFIX).unwrap();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn display_names_differ() {
        assert_ne!(store_display_name(), store_display_name());
    }

    #[tokio::test]
    async fn create_store_returns_server_name() {
        let m = manager(MockApi::default());
        let store = m.create_store().await.unwrap();
        assert_eq!(store.name, "fileSearchStores/store-1");
        assert!(store.display_name.starts_with(STORE_PREFIX));
    }

    #[tokio::test]
    async fn create_failure_is_create_failed() {
        let m = manager(MockApi::default().failing_create());
        let err = m.create_store().await.unwrap_err();
        assert!(matches!(err, StoreError::CreateFailed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn upload_attaches_metadata_and_returns_response() {
        let m = manager(MockApi::default().with_polls_until_done(1));
        let response = m
            .upload_to_store(Path::new("/tmp/report.pdf"), &handle(), "report")
            .await
            .unwrap();

        assert_eq!(response["documentName"], "doc-1");
        let calls = m.api().calls();
        assert_eq!(calls.last_upload_display_name.as_deref(), Some("report"));
        assert_eq!(calls.last_upload_metadata_keys, vec!["source", "timestamp"]);
    }

    #[tokio::test(start_paused = true)]
    async fn upload_never_done_is_timeout() {
        let m = manager(MockApi::default().never_done());
        let err = m
            .upload_to_store(Path::new("/tmp/report.pdf"), &handle(), "report")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn upload_call_failure_is_upload_failed() {
        let m = manager(MockApi::default().failing_upload());
        let err = m
            .upload_to_store(Path::new("/tmp/report.pdf"), &handle(), "report")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UploadFailed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn operation_error_is_indexing_failed() {
        let m = manager(MockApi::default().with_polls_until_done(1).failing_indexing());
        let err = m
            .upload_to_store(Path::new("/tmp/report.pdf"), &handle(), "report")
            .await
            .unwrap_err();
        match err {
            StoreError::IndexingFailed(message) => {
                assert_eq!(message, "Document could not be parsed")
            }
            other => panic!("expected IndexingFailed, got {other:?}"),
        }
        assert_eq!(m.api().calls().get_operation, 1);
    }

    #[tokio::test]
    async fn delete_forces_removal_of_documents() {
        let m = manager(MockApi::default());
        m.delete_store(&handle()).await.unwrap();
        let calls = m.api().calls();
        assert_eq!(calls.delete, 1);
        assert_eq!(calls.last_delete_force, Some(true));
    }

    #[tokio::test]
    async fn delete_failure_is_cleanup_failed() {
        let m = manager(MockApi::default().failing_delete());
        let err = m.delete_store(&handle()).await.unwrap_err();
        assert!(matches!(err, StoreError::CleanupFailed(_)));
        assert_eq!(m.api().calls().delete, 1);
    }
}
