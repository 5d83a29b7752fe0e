//! Per-session chat state and the actions a user can take on it.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::gemini::client::FileSearchApi;
use crate::gemini::types::Source;
use crate::i18n::{Language, MessageKey, localize, localize_with};
use crate::query::{self, Model};
use crate::staging;
use crate::store::{StoreError, StoreHandle, StoreManager};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Passages the answer was grounded on, kept for the "view sources" panel.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: Role, content: String, sources: Vec<Source>) -> Self {
        Self {
            role,
            content,
            sources,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Localized inline message shown next to the control that produced it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug)]
pub enum AskOutcome {
    /// Blank input; nothing happened.
    Ignored,
    /// No document is ready. The remote service was not contacted.
    Rejected(Notice),
    Replied {
        reply: ChatMessage,
        notice: Option<Notice>,
    },
}

/// State for one browser session. Never shared between sessions.
#[derive(Debug, Clone, Default)]
pub struct Session {
    store: Option<StoreHandle>,
    chat_history: Vec<ChatMessage>,
    document_name: Option<String>,
    upload_complete: bool,
    language: Language,
    model: Model,
}

/// Owned view of a session for rendering.
#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub document_name: Option<String>,
    pub upload_complete: bool,
    pub language: Language,
    pub model: Model,
    pub status: String,
    pub chat_history: Vec<ChatMessage>,
}

impl Session {
    pub fn new(language: Language, model: Model) -> Self {
        Self {
            language,
            model,
            ..Self::default()
        }
    }

    pub fn store(&self) -> Option<&StoreHandle> {
        self.store.as_ref()
    }

    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat_history
    }

    pub fn document_name(&self) -> Option<&str> {
        self.document_name.as_deref()
    }

    pub fn upload_complete(&self) -> bool {
        self.upload_complete
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn model(&self) -> Model {
        self.model
    }

    fn text(&self, key: MessageKey) -> &'static str {
        localize(key, self.language)
    }

    fn text_with(&self, key: MessageKey, arg: &str) -> String {
        localize_with(key, self.language, arg)
    }

    /// "Current PDF" line once a document is ready, the upload prompt otherwise.
    pub fn status(&self) -> String {
        match (&self.document_name, self.upload_complete) {
            (Some(name), true) => self.text_with(MessageKey::CurrentPdf, name),
            _ => self.text(MessageKey::UploadPrompt).to_string(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            document_name: self.document_name.clone(),
            upload_complete: self.upload_complete,
            language: self.language,
            model: self.model,
            status: self.status(),
            chat_history: self.chat_history.clone(),
        }
    }

    /// Stages the file, creates a store and indexes the file into it.
    ///
    /// On failure the session is left as it was. A store created before a failed
    /// upload is abandoned, not deleted.
    pub async fn upload<A: FileSearchApi>(
        &mut self,
        stores: &StoreManager<A>,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Notice {
        if self.upload_complete {
            return Notice::error(self.text(MessageKey::UploadRejected));
        }

        let staged = match staging::stage(bytes).await {
            Ok(staged) => staged,
            Err(e) => {
                warn!(error = %e, "failed to stage upload");
                return Notice::error(self.text_with(MessageKey::ErrorSaveFile, &e.to_string()));
            }
        };

        let display_name = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(file_name);

        let outcome = async {
            let store = stores.create_store().await?;
            match stores
                .upload_to_store(staged.path(), &store, display_name)
                .await
            {
                Ok(_) => Ok::<_, StoreError>(store),
                Err(e) => {
                    warn!(store = %store.name, "upload failed; abandoning empty store");
                    Err(e)
                }
            }
        }
        .await;
        staged.discard().await;

        match outcome {
            Ok(store) => {
                info!(
                    store = %store.name,
                    display_name = %store.display_name,
                    document = file_name,
                    "document ready"
                );
                self.store = Some(store);
                self.upload_complete = true;
                self.document_name = Some(file_name.to_string());
                Notice::success(self.text_with(MessageKey::UploadSuccess, file_name))
            }
            Err(e) => {
                warn!(error = %e, document = file_name, "upload flow failed");
                let key = match &e {
                    StoreError::CreateFailed(_) => MessageKey::ErrorCreateStore,
                    _ => MessageKey::ErrorUploadStore,
                };
                Notice::error(self.text_with(key, &e.to_string()))
            }
        }
    }

    /// Appends the question and the model's reply to the transcript.
    pub async fn ask<A: FileSearchApi>(
        &mut self,
        stores: &StoreManager<A>,
        question: &str,
    ) -> AskOutcome {
        let question = question.trim();
        if question.is_empty() {
            return AskOutcome::Ignored;
        }
        let store = match (&self.store, self.upload_complete) {
            (Some(store), true) => store.clone(),
            _ => return AskOutcome::Rejected(Notice::info(self.text(MessageKey::UploadPrompt))),
        };

        self.chat_history.push(ChatMessage::new(
            Role::User,
            question.to_string(),
            Vec::new(),
        ));

        let (content, sources, notice) =
            match query::query(stores.api(), question, &store, self.model).await {
                Ok(result) => match result.answer {
                    Some(answer) => (answer, result.sources, None),
                    None => {
                        let text = self.text(MessageKey::ErrorResponse);
                        (text.to_string(), Vec::new(), Some(Notice::error(text)))
                    }
                },
                Err(e) => {
                    warn!(error = %e, store = %store.name, "query failed");
                    (
                        self.text(MessageKey::ErrorResponse).to_string(),
                        Vec::new(),
                        Some(Notice::error(
                            self.text_with(MessageKey::ErrorQuery, &e.to_string()),
                        )),
                    )
                }
            };

        let reply = ChatMessage::new(Role::Assistant, content, sources);
        self.chat_history.push(reply.clone());
        AskOutcome::Replied { reply, notice }
    }

    /// Deletes the remote store (best effort) and resets the document state.
    /// Returns `None` when there was nothing to clear.
    pub async fn clear<A: FileSearchApi>(&mut self, stores: &StoreManager<A>) -> Option<Notice> {
        if self.store.is_none()
            && !self.upload_complete
            && self.document_name.is_none()
            && self.chat_history.is_empty()
        {
            return None;
        }

        let mut notice = Notice::info(self.text(MessageKey::Cleared));
        if let Some(store) = self.store.take() {
            if let Err(e) = stores.delete_store(&store).await {
                warn!(store = %store.name, error = %e, "store cleanup failed; resetting anyway");
                notice = Notice::error(self.text_with(MessageKey::ErrorCleanup, &e.to_string()));
            }
        }

        self.chat_history.clear();
        self.document_name = None;
        self.upload_complete = false;
        Some(notice)
    }

    /// Returns true when the language changed and the page must be redrawn.
    pub fn set_language(&mut self, language: Language) -> bool {
        let changed = self.language != language;
        self.language = language;
        changed
    }

    pub fn set_model(&mut self, model: Model) {
        self.model = model;
    }
}
