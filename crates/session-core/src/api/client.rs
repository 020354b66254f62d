use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    AskRequest, AskResponse, BackendError, BackendFuture, BackendOperation, ChatRequest,
    ChatResponse, DocumentBackend, PrepareRequest, REQUEST_ID_HEADER, UploadResponse, VideoBackend,
};
use crate::config::{ClientConfig, ConfigError};
use crate::source::{DocumentSource, SourceFile};

/// HTTP client for the RAG backend's REST contract.
#[derive(Clone)]
pub struct RagApiClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl RagApiClient {
    pub fn new(base_url: impl Into<String>, http_client: reqwest::Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.api_base_url.clone(),
            config.build_http_client()?,
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn prepare_video(&self, request: &PrepareRequest) -> Result<(), BackendError> {
        let operation = BackendOperation::Prepare;
        let builder = self.post(operation).json(request);
        // A successful prepare carries nothing the client needs.
        self.send(operation, builder).await.map(|_| ())
    }

    pub async fn ask_video(&self, request: &AskRequest) -> Result<AskResponse, BackendError> {
        let operation = BackendOperation::Ask;
        let body = self.send(operation, self.post(operation).json(request)).await?;
        parse_json(operation, &body)
    }

    pub async fn upload_document(
        &self,
        source: DocumentSource,
    ) -> Result<UploadResponse, BackendError> {
        let operation = BackendOperation::Upload;
        let form = upload_form(source)?;
        let body = self.send(operation, self.post(operation).multipart(form)).await?;
        let response: UploadResponse = parse_json(operation, &body)?;

        if response.document_id.as_str().trim().is_empty() {
            return Err(BackendError::ResponseInvalid {
                operation,
                message: "missing document_id in upload response".to_string(),
            });
        }

        Ok(response)
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError> {
        let operation = BackendOperation::Chat;
        let body = self.send(operation, self.post(operation).json(request)).await?;
        parse_json(operation, &body)
    }

    fn post(&self, operation: BackendOperation) -> reqwest::RequestBuilder {
        self.http_client
            .post(format!("{}{}", self.base_url, operation.path()))
    }

    /// Sends the request and returns the body of a 2xx response. Any other
    /// status becomes [`BackendError::Rejected`] carrying the raw body text.
    async fn send(
        &self,
        operation: BackendOperation,
        builder: reqwest::RequestBuilder,
    ) -> Result<String, BackendError> {
        let request_id = Uuid::new_v4().to_string();
        debug!(%operation, %request_id, "dispatching backend request");

        let response = builder
            .header(REQUEST_ID_HEADER, request_id.as_str())
            .send()
            .await
            .map_err(|err| {
                warn!(%operation, %request_id, error = %err, "backend transport failure");
                BackendError::TransportUnavailable {
                    operation,
                    message: err.to_string(),
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| BackendError::TransportUnavailable {
                operation,
                message: format!("failed to read response body: {err}"),
            })?;

        if !status.is_success() {
            warn!(
                %operation,
                %request_id,
                status = status.as_u16(),
                "backend rejected request"
            );
            return Err(BackendError::Rejected {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        debug!(%operation, %request_id, status = status.as_u16(), "backend request succeeded");
        Ok(body)
    }
}

impl VideoBackend for RagApiClient {
    fn prepare<'a>(&'a self, request: PrepareRequest) -> BackendFuture<'a, ()> {
        Box::pin(async move { self.prepare_video(&request).await })
    }

    fn ask<'a>(&'a self, request: AskRequest) -> BackendFuture<'a, AskResponse> {
        Box::pin(async move { self.ask_video(&request).await })
    }
}

impl DocumentBackend for RagApiClient {
    fn upload<'a>(&'a self, source: DocumentSource) -> BackendFuture<'a, UploadResponse> {
        Box::pin(self.upload_document(source))
    }

    fn chat<'a>(&'a self, request: ChatRequest) -> BackendFuture<'a, ChatResponse> {
        Box::pin(async move { RagApiClient::chat(self, &request).await })
    }
}

fn upload_form(source: DocumentSource) -> Result<Form, BackendError> {
    let field = source.kind().upload_field();
    let form = match source {
        DocumentSource::Pdf(file) => Form::new().part(field, file_part(file, "application/pdf")?),
        DocumentSource::Txt(file) => Form::new().part(field, file_part(file, "text/plain")?),
        DocumentSource::Text(text) => Form::new().text(field, text),
    };
    Ok(form)
}

fn file_part(file: SourceFile, mime: &str) -> Result<Part, BackendError> {
    Part::bytes(file.bytes)
        .file_name(file.file_name)
        .mime_str(mime)
        .map_err(|err| BackendError::RequestInvalid {
            operation: BackendOperation::Upload,
            message: format!("invalid upload mime type: {err}"),
        })
}

fn parse_json<T: DeserializeOwned>(
    operation: BackendOperation,
    body: &str,
) -> Result<T, BackendError> {
    serde_json::from_str::<T>(body).map_err(|err| BackendError::ResponseInvalid {
        operation,
        message: format!("failed to parse success response: {err}"),
    })
}
