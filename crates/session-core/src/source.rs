use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// The source tabs of the document workflow. Each maps to one multipart
/// field of the upload endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Pdf,
    Txt,
    Text,
}

impl SourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Txt => "txt",
            Self::Text => "text",
        }
    }

    pub const fn upload_field(self) -> &'static str {
        match self {
            Self::Pdf => "pdf_file",
            Self::Txt => "txt_file",
            Self::Text => "plain_text",
        }
    }

    /// Infers a file tab from the extension. Pasted text has no file form.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file picked for upload, held in memory until submitted.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn read(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self { file_name, bytes })
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A validated upload payload. Exactly one source per submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Pdf(SourceFile),
    Txt(SourceFile),
    Text(String),
}

impl DocumentSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Pdf(_) => SourceKind::Pdf,
            Self::Txt(_) => SourceKind::Txt,
            Self::Text(_) => SourceKind::Text,
        }
    }
}

/// Opaque identifier the backend assigns to an indexed document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-tab staged input. Switching the active tab keeps the other tabs'
/// input; only the active tab is submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedSources {
    pub active: SourceKind,
    pub pdf: Option<SourceFile>,
    pub txt: Option<SourceFile>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedInput {
    SelectTab(SourceKind),
    Pdf(Option<SourceFile>),
    Txt(Option<SourceFile>),
    Text(String),
}

impl StagedSources {
    pub fn with(mut self, input: StagedInput) -> Self {
        match input {
            StagedInput::SelectTab(kind) => self.active = kind,
            StagedInput::Pdf(file) => self.pdf = file,
            StagedInput::Txt(file) => self.txt = file,
            StagedInput::Text(text) => self.text = text,
        }
        self
    }

    pub fn cleared(self) -> Self {
        Self {
            active: self.active,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{SourceFile, SourceKind, StagedInput, StagedSources};

    #[test]
    fn file_kind_is_inferred_from_extension() {
        assert_eq!(
            SourceKind::from_path(Path::new("notes/Lecture.PDF")),
            Some(SourceKind::Pdf)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("transcript.txt")),
            Some(SourceKind::Txt)
        );
        assert_eq!(SourceKind::from_path(Path::new("slides.pptx")), None);
        assert_eq!(SourceKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn switching_tabs_keeps_other_staged_input() {
        let staged = StagedSources::default()
            .with(StagedInput::Pdf(Some(SourceFile::new("a.pdf", b"%PDF".to_vec()))))
            .with(StagedInput::SelectTab(SourceKind::Text))
            .with(StagedInput::Text("pasted".to_string()));

        assert_eq!(staged.active, SourceKind::Text);
        assert!(staged.pdf.is_some());
        assert_eq!(staged.text, "pasted");
    }

    #[test]
    fn clearing_keeps_the_active_tab() {
        let staged = StagedSources::default()
            .with(StagedInput::SelectTab(SourceKind::Txt))
            .with(StagedInput::Txt(Some(SourceFile::new("a.txt", b"hi".to_vec()))))
            .cleared();

        assert_eq!(staged.active, SourceKind::Txt);
        assert!(staged.txt.is_none());
    }

    #[tokio::test]
    async fn read_missing_file_fails() {
        let err = SourceFile::read("/definitely/not/here.pdf")
            .await
            .expect_err("missing file should fail");

        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
