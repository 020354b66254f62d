#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Json, Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde_json::json;
use session_core::api::{
    API_PATH_ASK, API_PATH_CHAT, API_PATH_PREPARE, API_PATH_UPLOAD, AskRequest, ChatRequest,
    PrepareRequest, REQUEST_ID_HEADER,
};
use tokio::sync::Mutex;

const UPLOAD_FIELDS: [&str; 3] = ["pdf_file", "txt_file", "plain_text"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub field: String,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// What the mock backend has indexed and received.
#[derive(Debug, Default)]
pub struct BackendState {
    pub documents: HashMap<String, String>,
    pub prepared: Vec<String>,
    pub uploads: Vec<UploadRecord>,
    pub chats: Vec<ChatRequest>,
    pub asks: Vec<AskRequest>,
    pub request_ids: Vec<String>,
    pub upload_failure: Option<(StatusCode, String)>,
    uploads_seen: usize,
}

type SharedState = Arc<Mutex<BackendState>>;

/// In-process stand-in for the RAG backend. Answers with the first indexed
/// sentence sharing a word with the question.
pub struct MockRagBackend {
    pub base_url: String,
    state: SharedState,
    handle: tokio::task::JoinHandle<()>,
}

impl MockRagBackend {
    pub async fn start() -> Self {
        let state = SharedState::default();
        let app = Router::new()
            .route(API_PATH_PREPARE, post(prepare))
            .route(API_PATH_ASK, post(ask))
            .route(API_PATH_UPLOAD, post(upload))
            .route(API_PATH_CHAT, post(chat))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("mock backend listener should bind");
        let bind_addr = listener
            .local_addr()
            .expect("mock backend listener local address should exist");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("mock backend server should run");
        });

        Self {
            base_url: format!("http://{bind_addr}"),
            state,
            handle,
        }
    }

    pub async fn with_state<R>(&self, f: impl FnOnce(&mut BackendState) -> R) -> R {
        let mut state = self.state.lock().await;
        f(&mut state)
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for MockRagBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn record_request_id(state: &SharedState, headers: &HeaderMap) {
    if let Some(request_id) = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        state.lock().await.request_ids.push(request_id.to_string());
    }
}

async fn prepare(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<PrepareRequest>,
) -> Response {
    record_request_id(&state, &headers).await;
    if !request.youtube_url.contains("youtu") {
        return (StatusCode::UNPROCESSABLE_ENTITY, "Invalid YouTube URL").into_response();
    }

    state.lock().await.prepared.push(request.youtube_url);
    "Transcript ready".into_response()
}

async fn ask(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<AskRequest>,
) -> Response {
    record_request_id(&state, &headers).await;
    let answer = format!(
        "The video at {} covers: {}",
        request.youtube_url, request.question
    );
    state.lock().await.asks.push(request);

    Json(json!({ "answer": answer, "sources": ["", "00:00-00:30", null] })).into_response()
}

async fn upload(
    State(state): State<SharedState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    record_request_id(&state, &headers).await;

    let mut fields = Vec::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field.name().unwrap_or_default().to_string();
                let file_name = field.file_name().map(ToString::to_string);
                match field.bytes().await {
                    Ok(bytes) => fields.push(UploadRecord {
                        field: name,
                        file_name,
                        bytes: bytes.to_vec(),
                    }),
                    Err(err) => {
                        return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
                    }
                }
            }
            Ok(None) => break,
            Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        }
    }

    let mut state = state.lock().await;
    if let Some((status, body)) = state.upload_failure.clone() {
        return (status, body).into_response();
    }
    if fields.len() != 1 || !UPLOAD_FIELDS.contains(&fields[0].field.as_str()) {
        return (
            StatusCode::BAD_REQUEST,
            "Provide exactly one of pdf_file, txt_file or plain_text",
        )
            .into_response();
    }

    let record = fields.remove(0);
    state.uploads_seen += 1;
    let document_id = format!("doc-{}", state.uploads_seen);
    state.documents.insert(
        document_id.clone(),
        String::from_utf8_lossy(&record.bytes).into_owned(),
    );
    state.uploads.push(record);

    Json(json!({ "document_id": document_id })).into_response()
}

async fn chat(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Response {
    record_request_id(&state, &headers).await;

    let mut state = state.lock().await;
    let text = state.documents.get(request.document_id.as_str()).cloned();
    state.chats.push(request.clone());

    let Some(text) = text else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "index missing").into_response();
    };

    match best_sentence(&text, &request.question) {
        Some(sentence) => Json(json!({ "answer": sentence, "sources": [sentence] })).into_response(),
        None => Json(json!({ "answer": "" })).into_response(),
    }
}

fn best_sentence(text: &str, question: &str) -> Option<String> {
    let words = question
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() > 3)
        .map(str::to_lowercase)
        .collect::<Vec<_>>();

    text.split_inclusive('.')
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .find(|sentence| {
            let lower = sentence.to_lowercase();
            words.iter().any(|word| lower.contains(word.as_str()))
        })
        .map(ToString::to_string)
}
