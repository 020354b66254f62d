//! Input checks that run before any request is dispatched. Nothing here
//! performs I/O.

use thiserror::Error;

use crate::source::{DocumentId, DocumentSource, SourceFile, SourceKind, StagedSources};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a YouTube URL.")]
    MissingUrl,
    #[error("Please enter a question.")]
    MissingQuestion,
    #[error("Please select a {} file to upload.", .0.as_str().to_ascii_uppercase())]
    MissingFile(SourceKind),
    #[error("The selected {} file is empty.", .0.as_str().to_ascii_uppercase())]
    EmptyFile(SourceKind),
    #[error("Please paste some text to index.")]
    MissingText,
    #[error("Upload a document before asking questions.")]
    MissingDocument,
}

pub fn validate_url(raw: &str) -> Result<String, ValidationError> {
    non_empty_trimmed(raw).ok_or(ValidationError::MissingUrl)
}

pub fn validate_question(raw: &str) -> Result<String, ValidationError> {
    non_empty_trimmed(raw).ok_or(ValidationError::MissingQuestion)
}

/// Both fields are required because every question re-submits the URL.
pub fn validate_video_query(url: &str, question: &str) -> Result<(String, String), ValidationError> {
    let url = validate_url(url)?;
    let question = validate_question(question)?;
    Ok((url, question))
}

/// Builds the upload payload from the active tab only.
pub fn validate_document_source(staged: &StagedSources) -> Result<DocumentSource, ValidationError> {
    match staged.active {
        SourceKind::Pdf => staged_file(staged.pdf.as_ref(), SourceKind::Pdf).map(DocumentSource::Pdf),
        SourceKind::Txt => staged_file(staged.txt.as_ref(), SourceKind::Txt).map(DocumentSource::Txt),
        SourceKind::Text => non_empty_trimmed(&staged.text)
            .map(DocumentSource::Text)
            .ok_or(ValidationError::MissingText),
    }
}

pub fn validate_document_query(
    document_id: Option<&DocumentId>,
    question: &str,
) -> Result<(DocumentId, String), ValidationError> {
    let document_id = document_id.cloned().ok_or(ValidationError::MissingDocument)?;
    let question = validate_question(question)?;
    Ok((document_id, question))
}

fn staged_file(file: Option<&SourceFile>, kind: SourceKind) -> Result<SourceFile, ValidationError> {
    let file = file.ok_or(ValidationError::MissingFile(kind))?;
    if file.is_empty() {
        return Err(ValidationError::EmptyFile(kind));
    }
    Ok(file.clone())
}

fn non_empty_trimmed(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
