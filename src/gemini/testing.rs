//! In-memory `FileSearchApi` for exercising the flow without a network.

use std::path::Path;
use std::sync::Mutex;

use super::client::{FileSearchApi, GeminiError};
use super::types::{
    ApiError, Candidate, Content, FileSearchStore, GenerateContentResponse, GroundingChunk,
    GroundingMetadata, Operation, Part, RetrievedContext, UploadConfig,
};

#[derive(Debug, Clone, Default)]
pub struct Calls {
    pub create_store: u32,
    pub upload: u32,
    pub get_operation: u32,
    pub generate: u32,
    pub delete: u32,
    pub last_upload_display_name: Option<String>,
    pub last_upload_metadata_keys: Vec<String>,
    pub last_model: Option<String>,
    pub last_store: Option<String>,
    pub last_delete_force: Option<bool>,
}

#[derive(Debug, Clone)]
enum Answer {
    Text(String),
    Empty,
    Fail,
}

#[derive(Debug)]
pub struct MockApi {
    calls: Mutex<Calls>,
    polls_until_done: Option<u32>,
    fail_create: bool,
    fail_upload: bool,
    fail_poll: bool,
    fail_indexing: bool,
    fail_delete: bool,
    answer: Answer,
}

impl Default for MockApi {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Calls::default()),
            polls_until_done: Some(0),
            fail_create: false,
            fail_upload: false,
            fail_poll: false,
            fail_indexing: false,
            fail_delete: false,
            answer: Answer::Text("$4.2M".to_string()),
        }
    }
}

fn transport_error() -> GeminiError {
    GeminiError::Api {
        code: 503,
        message: "Service unavailable".to_string(),
    }
}

impl MockApi {
    pub fn with_polls_until_done(mut self, polls: u32) -> Self {
        self.polls_until_done = Some(polls);
        self
    }

    pub fn never_done(mut self) -> Self {
        self.polls_until_done = None;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_upload(mut self) -> Self {
        self.fail_upload = true;
        self
    }

    pub fn failing_operation_poll(mut self) -> Self {
        self.fail_poll = true;
        self.polls_until_done = Some(1);
        self
    }

    /// The operation finishes, but with an error instead of a response.
    pub fn failing_indexing(mut self) -> Self {
        self.fail_indexing = true;
        self
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn answering(mut self, text: &str) -> Self {
        self.answer = Answer::Text(text.to_string());
        self
    }

    pub fn empty_answer(mut self) -> Self {
        self.answer = Answer::Empty;
        self
    }

    pub fn failing_query(mut self) -> Self {
        self.answer = Answer::Fail;
        self
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }

    fn is_done_after(&self, polls: u32) -> bool {
        self.polls_until_done.is_some_and(|n| polls >= n)
    }

    fn operation(&self, name: String, done: bool) -> Operation {
        let failed = done && self.fail_indexing;
        Operation {
            name,
            done,
            response: (done && !failed).then(|| serde_json::json!({"documentName": "doc-1"})),
            error: failed.then(|| ApiError {
                code: Some(400),
                message: Some("Document could not be parsed".to_string()),
            }),
        }
    }
}

impl FileSearchApi for MockApi {
    async fn create_store(&self, display_name: &str) -> Result<FileSearchStore, GeminiError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.create_store += 1;
            calls.create_store
        };
        if self.fail_create {
            return Err(transport_error());
        }
        Ok(FileSearchStore {
            name: format!("fileSearchStores/store-{n}"),
            display_name: Some(display_name.to_string()),
        })
    }

    async fn upload_to_store(
        &self,
        _file: &Path,
        store_name: &str,
        config: &UploadConfig,
    ) -> Result<Operation, GeminiError> {
        {
            let mut calls = self.calls.lock().unwrap();
            calls.upload += 1;
            calls.last_upload_display_name = Some(config.display_name.clone());
            calls.last_upload_metadata_keys =
                config.custom_metadata.iter().map(|m| m.key.clone()).collect();
        }
        if self.fail_upload {
            return Err(transport_error());
        }
        Ok(self.operation(
            format!("{store_name}/upload/operations/op-1"),
            self.is_done_after(0),
        ))
    }

    async fn get_operation(&self, name: &str) -> Result<Operation, GeminiError> {
        let polls = {
            let mut calls = self.calls.lock().unwrap();
            calls.get_operation += 1;
            calls.get_operation
        };
        if self.fail_poll {
            return Err(transport_error());
        }
        Ok(self.operation(name.to_string(), self.is_done_after(polls)))
    }

    async fn generate_with_file_search(
        &self,
        model: &str,
        _prompt: &str,
        store_name: &str,
    ) -> Result<GenerateContentResponse, GeminiError> {
        {
            let mut calls = self.calls.lock().unwrap();
            calls.generate += 1;
            calls.last_model = Some(model.to_string());
            calls.last_store = Some(store_name.to_string());
        }
        let text = match &self.answer {
            Answer::Fail => return Err(transport_error()),
            Answer::Empty => String::new(),
            Answer::Text(t) => t.clone(),
        };
        Ok(GenerateContentResponse {
            candidates: Some(vec![Candidate {
                content: Some(Content {
                    parts: vec![Part { text }],
                    role: Some("model".to_string()),
                }),
                grounding_metadata: Some(GroundingMetadata {
                    grounding_chunks: Some(vec![GroundingChunk {
                        retrieved_context: Some(RetrievedContext {
                            uri: None,
                            title: Some("report".to_string()),
                            text: Some("Total revenue for the year was $4.2M.".to_string()),
                        }),
                    }]),
                }),
            }]),
            error: None,
        })
    }

    async fn delete_store(&self, _name: &str, force: bool) -> Result<(), GeminiError> {
        {
            let mut calls = self.calls.lock().unwrap();
            calls.delete += 1;
            calls.last_delete_force = Some(force);
        }
        if self.fail_delete {
            return Err(transport_error());
        }
        Ok(())
    }
}
