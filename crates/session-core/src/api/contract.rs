use serde::{Deserialize, Serialize};

use crate::source::DocumentId;

pub const API_PATH_PREPARE: &str = "/prepare";
pub const API_PATH_ASK: &str = "/ask";
pub const API_PATH_UPLOAD: &str = "/upload";
pub const API_PATH_CHAT: &str = "/chat";

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub const REQUEST_FAILED_MESSAGE: &str = "Request failed.";
pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed.";
pub const CHAT_FAILED_MESSAGE: &str = "Chat request failed.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareRequest {
    pub youtube_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub youtube_url: String,
    pub question: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<Option<String>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub document_id: DocumentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    pub document_id: DocumentId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<Option<String>>>,
}
