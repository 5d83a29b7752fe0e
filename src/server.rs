//! HTTP surface: the chat page plus a small JSON API, one [`Session`] per browser tab.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::gemini::client::FileSearchApi;
use crate::i18n::{self, Language};
use crate::query::Model;
use crate::session::{AskOutcome, ChatMessage, Notice, Session, SessionSnapshot};
use crate::store::StoreManager;

/// Gemini File Search accepts documents up to 100 MiB.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
const PAGE: &str = include_str!("page.html");
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(60 * 60);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

type SharedSession = Arc<Mutex<Session>>;

struct SessionEntry {
    session: SharedSession,
    last_seen: Instant,
}

/// Each session sits behind its own lock, so a long upload wait only blocks
/// the tab that started it.
pub struct AppState<A> {
    stores: Arc<StoreManager<A>>,
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    default_language: Language,
    default_model: Model,
    session_idle: Duration,
}

impl<A> Clone for AppState<A> {
    fn clone(&self) -> Self {
        Self {
            stores: Arc::clone(&self.stores),
            sessions: Arc::clone(&self.sessions),
            default_language: self.default_language,
            default_model: self.default_model,
            session_idle: self.session_idle,
        }
    }
}

impl<A: FileSearchApi> AppState<A> {
    pub fn new(stores: StoreManager<A>, default_language: Language, default_model: Model) -> Self {
        Self {
            stores: Arc::new(stores),
            sessions: Arc::default(),
            default_language,
            default_model,
            session_idle: DEFAULT_SESSION_IDLE,
        }
    }

    /// Sessions untouched for this long are ended by the background sweep.
    pub fn with_session_idle(mut self, idle: Duration) -> Self {
        self.session_idle = idle;
        self
    }

    async fn insert(&self, session: Session) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.write().await.insert(
            id,
            SessionEntry {
                session: Arc::new(Mutex::new(session)),
                last_seen: Instant::now(),
            },
        );
        id
    }

    /// Looks up a session and marks it as recently used.
    async fn session(&self, id: Uuid) -> Result<SharedSession, ServerError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(&id)
            .ok_or(ServerError::SessionNotFound(id))?;
        entry.last_seen = Instant::now();
        Ok(Arc::clone(&entry.session))
    }

    /// Drops the session from the registry and deletes its store.
    async fn end_session(&self, id: Uuid) -> Result<(), ServerError> {
        let entry = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(ServerError::SessionNotFound(id))?;
        entry.session.lock().await.clear(&self.stores).await;
        Ok(())
    }

    /// Ends every session idle for at least `idle`. Sessions busy with a
    /// request are kept. Returns how many were ended.
    async fn expire_idle(&self, idle: Duration) -> usize {
        let expired: Vec<(Uuid, SharedSession)> = {
            let mut sessions = self.sessions.write().await;
            let ids: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, e)| e.last_seen.elapsed() >= idle && e.session.try_lock().is_ok())
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| sessions.remove(&id).map(|e| (id, e.session)))
                .collect()
        };

        for (id, session) in &expired {
            session.lock().await.clear(&self.stores).await;
            info!(session = %id, idle_secs = idle.as_secs(), "idle session expired");
        }
        expired.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    #[error("only PDF files are accepted")]
    NotPdf,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match self {
            ServerError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::NotPdf => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    id: Uuid,
    session: SessionSnapshot,
}

#[derive(Debug, Serialize)]
struct ActionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<Notice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<ChatMessage>,
    session: SessionSnapshot,
}

#[derive(Debug, Serialize)]
struct SettingsResponse {
    /// The page should be redrawn in the new language.
    refresh: bool,
    session: SessionSnapshot,
}

#[derive(Debug, Deserialize)]
struct UploadParams {
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SettingsPatch {
    language: Option<String>,
    model: Option<Model>,
}

#[derive(Debug, Serialize)]
struct LanguageOption {
    code: &'static str,
    label: &'static str,
}

#[derive(Debug, Serialize)]
struct OptionsResponse {
    languages: Vec<LanguageOption>,
    models: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct MessagesResponse {
    language: Language,
    messages: BTreeMap<&'static str, &'static str>,
}

async fn index() -> Html<&'static str> {
    Html(PAGE)
}

async fn options() -> Json<OptionsResponse> {
    Json(OptionsResponse {
        languages: Language::ALL
            .iter()
            .map(|l| LanguageOption {
                code: l.code(),
                label: l.label(),
            })
            .collect(),
        models: Model::ALL.iter().map(|m| m.id()).collect(),
    })
}

async fn messages(Path(code): Path<String>) -> Json<MessagesResponse> {
    let language = Language::from_code(&code);
    Json(MessagesResponse {
        language,
        messages: i18n::table(language).into_iter().collect(),
    })
}

async fn create_session<A: FileSearchApi>(
    State(state): State<AppState<A>>,
) -> (StatusCode, Json<SessionResponse>) {
    let session = Session::new(state.default_language, state.default_model);
    let snapshot = session.snapshot();
    let id = state.insert(session).await;
    info!(session = %id, "session created");
    (
        StatusCode::CREATED,
        Json(SessionResponse {
            id,
            session: snapshot,
        }),
    )
}

async fn get_session<A: FileSearchApi>(
    State(state): State<AppState<A>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ServerError> {
    let session = state.session(id).await?;
    let snapshot = session.lock().await.snapshot();
    Ok(Json(SessionResponse {
        id,
        session: snapshot,
    }))
}

/// Ends the session, deleting its store first.
async fn delete_session<A: FileSearchApi>(
    State(state): State<AppState<A>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.end_session(id).await?;
    info!(session = %id, "session ended");
    Ok(StatusCode::NO_CONTENT)
}

async fn upload<A: FileSearchApi>(
    State(state): State<AppState<A>>,
    Path(id): Path<Uuid>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<ActionResponse>, ServerError> {
    let file_name = params
        .filename
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| "document.pdf".to_string());
    if !file_name.to_ascii_lowercase().ends_with(".pdf") {
        return Err(ServerError::NotPdf);
    }

    let session = state.session(id).await?;
    let mut session = session.lock().await;
    debug!(session = %id, file = %file_name, bytes = body.len(), "upload received");
    let notice = session.upload(&state.stores, &file_name, body.into()).await;
    Ok(Json(ActionResponse {
        notice: Some(notice),
        reply: None,
        session: session.snapshot(),
    }))
}

async fn chat<A: FileSearchApi>(
    State(state): State<AppState<A>>,
    Path(id): Path<Uuid>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ActionResponse>, ServerError> {
    let session = state.session(id).await?;
    let mut session = session.lock().await;
    let (notice, reply) = match session.ask(&state.stores, &body.message).await {
        AskOutcome::Ignored => (None, None),
        AskOutcome::Rejected(notice) => (Some(notice), None),
        AskOutcome::Replied { reply, notice } => (notice, Some(reply)),
    };
    Ok(Json(ActionResponse {
        notice,
        reply,
        session: session.snapshot(),
    }))
}

async fn clear<A: FileSearchApi>(
    State(state): State<AppState<A>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, ServerError> {
    let session = state.session(id).await?;
    let mut session = session.lock().await;
    let notice = session.clear(&state.stores).await;
    Ok(Json(ActionResponse {
        notice,
        reply: None,
        session: session.snapshot(),
    }))
}

async fn update_settings<A: FileSearchApi>(
    State(state): State<AppState<A>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<SettingsResponse>, ServerError> {
    let session = state.session(id).await?;
    let mut session = session.lock().await;
    let refresh = patch
        .language
        .is_some_and(|code| session.set_language(Language::from_code(&code)));
    if let Some(model) = patch.model {
        session.set_model(model);
    }
    Ok(Json(SettingsResponse {
        refresh,
        session: session.snapshot(),
    }))
}

pub fn router<A: FileSearchApi + 'static>(state: AppState<A>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/options", get(options))
        .route("/api/i18n/:lang", get(messages))
        .route("/api/sessions", post(create_session::<A>))
        .route(
            "/api/sessions/:id",
            get(get_session::<A>).delete(delete_session::<A>),
        )
        .route(
            "/api/sessions/:id/upload",
            post(upload::<A>).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/sessions/:id/chat", post(chat::<A>))
        .route("/api/sessions/:id/clear", post(clear::<A>))
        .route("/api/sessions/:id/settings", patch(update_settings::<A>))
        .with_state(state)
}

pub async fn serve<A: FileSearchApi + 'static>(
    addr: SocketAddr,
    state: AppState<A>,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    let sweep = tokio::spawn(sweep_idle_sessions(state.clone()));
    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;
    sweep.abort();
    served
}

async fn sweep_idle_sessions<A: FileSearchApi + 'static>(state: AppState<A>) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL.min(state.session_idle));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let expired = state.expire_idle(state.session_idle).await;
        if expired > 0 {
            debug!(expired, "idle sweep finished");
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
