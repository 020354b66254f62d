mod client;
mod contract;


use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::source::DocumentSource;

pub use client::RagApiClient;
pub use contract::{
    API_PATH_ASK, API_PATH_CHAT, API_PATH_PREPARE, API_PATH_UPLOAD, AskRequest, AskResponse,
    CHAT_FAILED_MESSAGE, ChatRequest, ChatResponse, PrepareRequest, REQUEST_FAILED_MESSAGE,
    REQUEST_ID_HEADER, UPLOAD_FAILED_MESSAGE, UploadResponse,
};

pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOperation {
    Prepare,
    Ask,
    Upload,
    Chat,
}

impl BackendOperation {
    pub const fn path(self) -> &'static str {
        match self {
            Self::Prepare => API_PATH_PREPARE,
            Self::Ask => API_PATH_ASK,
            Self::Upload => API_PATH_UPLOAD,
            Self::Chat => API_PATH_CHAT,
        }
    }

    /// Message shown when the backend gives no usable error text.
    pub const fn fallback_message(self) -> &'static str {
        match self {
            Self::Prepare | Self::Ask => REQUEST_FAILED_MESSAGE,
            Self::Upload => UPLOAD_FAILED_MESSAGE,
            Self::Chat => CHAT_FAILED_MESSAGE,
        }
    }
}

impl fmt::Display for BackendOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prepare => write!(f, "prepare"),
            Self::Ask => write!(f, "ask"),
            Self::Upload => write!(f, "upload"),
            Self::Chat => write!(f, "chat"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend transport unavailable for {operation}: {message}")]
    TransportUnavailable {
        operation: BackendOperation,
        message: String,
    },
    #[error("backend rejected {operation}: status={status}")]
    Rejected {
        operation: BackendOperation,
        status: u16,
        body: String,
    },
    #[error("backend response invalid for {operation}: {message}")]
    ResponseInvalid {
        operation: BackendOperation,
        message: String,
    },
    #[error("failed to build {operation} request: {message}")]
    RequestInvalid {
        operation: BackendOperation,
        message: String,
    },
}

impl BackendError {
    pub fn operation(&self) -> BackendOperation {
        match self {
            Self::TransportUnavailable { operation, .. }
            | Self::Rejected { operation, .. }
            | Self::ResponseInvalid { operation, .. }
            | Self::RequestInvalid { operation, .. } => *operation,
        }
    }

    /// The raw response body of a rejected request when it has any text,
    /// otherwise the operation's fallback message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { body, .. } if !body.trim().is_empty() => body.clone(),
            _ => self.operation().fallback_message().to_string(),
        }
    }
}

/// Backend of the per-query (video) workflow.
pub trait VideoBackend: Send + Sync {
    fn prepare<'a>(&'a self, request: PrepareRequest) -> BackendFuture<'a, ()>;
    fn ask<'a>(&'a self, request: AskRequest) -> BackendFuture<'a, AskResponse>;
}

/// Backend of the persisted-identity (document) workflow.
pub trait DocumentBackend: Send + Sync {
    fn upload<'a>(&'a self, source: DocumentSource) -> BackendFuture<'a, UploadResponse>;
    fn chat<'a>(&'a self, request: ChatRequest) -> BackendFuture<'a, ChatResponse>;
}

impl<T: VideoBackend + ?Sized> VideoBackend for Arc<T> {
    fn prepare<'a>(&'a self, request: PrepareRequest) -> BackendFuture<'a, ()> {
        (**self).prepare(request)
    }

    fn ask<'a>(&'a self, request: AskRequest) -> BackendFuture<'a, AskResponse> {
        (**self).ask(request)
    }
}

impl<T: DocumentBackend + ?Sized> DocumentBackend for Arc<T> {
    fn upload<'a>(&'a self, source: DocumentSource) -> BackendFuture<'a, UploadResponse> {
        (**self).upload(source)
    }

    fn chat<'a>(&'a self, request: ChatRequest) -> BackendFuture<'a, ChatResponse> {
        (**self).chat(request)
    }
}
