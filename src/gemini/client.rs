use std::env;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::types::{
    ApiError, Content, CreateStoreRequest, ErrorBody, FileSearch, FileSearchStore,
    GenerateContentRequest, GenerateContentResponse, Operation, Part, Tool, UploadConfig,
};

const API_BASE: &str = "https://generativelanguage.googleapis.com";
const API_VERSION: &str = "v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Uploads carry the whole document body, so they get a longer budget.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);
const PDF_MIME: &str = "application/pdf";

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("GEMINI_API_KEY not set. Get one at https://aistudio.google.com/apikey")]
    ApiKeyNotSet,

    #[error("API rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("API quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Upload session was not opened: response had no upload URL")]
    MissingUploadUrl,

    #[error("Could not read file: {0}")]
    Io(#[from] std::io::Error),
}

/// The five File Search operations the chat flow consumes.
/// Implemented by `GeminiClient` for production; mock implementations used in tests.
pub trait FileSearchApi: Send + Sync {
    fn create_store(
        &self,
        display_name: &str,
    ) -> impl Future<Output = Result<FileSearchStore, GeminiError>> + Send;

    fn upload_to_store(
        &self,
        file: &Path,
        store_name: &str,
        config: &UploadConfig,
    ) -> impl Future<Output = Result<Operation, GeminiError>> + Send;

    fn get_operation(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Operation, GeminiError>> + Send;

    fn generate_with_file_search(
        &self,
        model: &str,
        prompt: &str,
        store_name: &str,
    ) -> impl Future<Output = Result<GenerateContentResponse, GeminiError>> + Send;

    fn delete_store(
        &self,
        name: &str,
        force: bool,
    ) -> impl Future<Output = Result<(), GeminiError>> + Send;
}

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Clone, Debug)]
pub struct GeminiClient {
    http: Client,
    api_key: ApiKey,
    base_url: String,
}

impl GeminiClient {
    pub fn from_env(http: Client) -> Result<Self, GeminiError> {
        let api_key = env::var("GEMINI_API_KEY").map_err(|_| GeminiError::ApiKeyNotSet)?;
        Self::with_api_key(http, &api_key)
    }

    pub fn with_api_key(http: Client, api_key: &str) -> Result<Self, GeminiError> {
        if api_key.trim().is_empty() {
            return Err(GeminiError::ApiKeyNotSet);
        }
        Ok(Self {
            http,
            api_key: ApiKey(api_key.trim().to_string()),
            base_url: API_BASE.to_string(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey("test-key".to_string()),
            base_url: base_url.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        let url = format!("{}/{API_VERSION}/{path}", self.base_url);
        debug_assert!(
            url.starts_with("https://") || cfg!(test),
            "API key must only be sent over HTTPS"
        );
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("x-goog-api-key", &self.api_key.0)
            .header("User-Agent", crate::USER_AGENT)
    }

    /// Opens a resumable upload session and returns its upload URL.
    async fn start_upload(
        &self,
        store_name: &str,
        config: &UploadConfig,
        len: usize,
    ) -> Result<String, GeminiError> {
        let url = format!(
            "{}/upload/{API_VERSION}/{store_name}:uploadToFileSearchStore",
            self.base_url
        );
        let response = self
            .authorized(self.http.post(&url))
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", len.to_string())
            .header("X-Goog-Upload-Header-Content-Type", PDF_MIME)
            .json(config)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        let response = check_status(response).await?;

        response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(GeminiError::MissingUploadUrl)
    }
}

impl FileSearchApi for GeminiClient {
    async fn create_store(&self, display_name: &str) -> Result<FileSearchStore, GeminiError> {
        let request = CreateStoreRequest {
            display_name: display_name.to_string(),
        };
        let response = self
            .authorized(self.http.post(self.url("fileSearchStores")))
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        let store: FileSearchStore = read_json(response).await?;
        debug!(store = %store.name, display_name, "file search store created");
        Ok(store)
    }

    async fn upload_to_store(
        &self,
        file: &Path,
        store_name: &str,
        config: &UploadConfig,
    ) -> Result<Operation, GeminiError> {
        let bytes = tokio::fs::read(file).await?;
        let upload_url = self.start_upload(store_name, config, bytes.len()).await?;

        let len = bytes.len();
        let response = self
            .authorized(self.http.post(&upload_url))
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", "0")
            .header("Content-Type", PDF_MIME)
            .body(bytes)
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await?;
        let op: Operation = read_json(response).await?;
        debug!(store = %store_name, operation = %op.name, bytes = len, "upload accepted");
        Ok(op)
    }

    async fn get_operation(&self, name: &str) -> Result<Operation, GeminiError> {
        let response = self
            .authorized(self.http.get(self.url(name)))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        read_json(response).await
    }

    async fn generate_with_file_search(
        &self,
        model: &str,
        prompt: &str,
        store_name: &str,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
                role: Some("user".to_string()),
            }],
            tools: vec![Tool {
                file_search: FileSearch {
                    file_search_store_names: vec![store_name.to_string()],
                },
            }],
        };

        let response = self
            .authorized(
                self.http
                    .post(self.url(&format!("models/{model}:generateContent"))),
            )
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let body: GenerateContentResponse = read_json(response).await?;
        if let Some(err) = &body.error {
            let classified = classify_api_error(err);
            warn!(error = %classified, "Gemini API error in 200 response");
            return Err(classified);
        }
        debug!(model, store = %store_name, "file search generation complete");
        Ok(body)
    }

    async fn delete_store(&self, name: &str, force: bool) -> Result<(), GeminiError> {
        let response = self
            .authorized(self.http.delete(self.url(&format!("{name}?force={force}"))))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        check_status(response).await?;
        debug!(store = %name, force, "file search store deleted");
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, GeminiError> {
    let response = check_status(response).await?;
    Ok(response.json().await?)
}

/// Passes successful responses through and classifies everything else.
async fn check_status(response: Response) -> Result<Response, GeminiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        warn!("Gemini API rate limited");
        return Err(GeminiError::RateLimited);
    }

    let text = response.text().await.unwrap_or_default();
    if let Ok(body) = serde_json::from_str::<ErrorBody>(&text)
        && let Some(err) = &body.error
    {
        let classified = classify_api_error(err);
        warn!(error = %classified, "Gemini API error");
        return Err(classified);
    }
    let end = text.floor_char_boundary(200);
    warn!(status = %status, "Gemini API error (no structured body)");
    Err(GeminiError::Api {
        code: status.as_u16(),
        message: format!("HTTP {status}: {}", &text[..end]),
    })
}

pub(crate) fn classify_api_error(err: &ApiError) -> GeminiError {
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());

    match err.code {
        Some(429) => GeminiError::RateLimited,
        Some(403) => GeminiError::QuotaExhausted(message),
        Some(code) => GeminiError::Api { code, message },
        None => GeminiError::Api {
            code: 0,
            message: format!("Unknown error (no status code): {message}"),
        },
    }
}
