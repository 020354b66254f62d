use std::io::{self, Write};
use std::path::{Path, PathBuf};

use session_core::api::{DocumentBackend, VideoBackend};
use session_core::source::{SourceFile, SourceKind, StagedInput};
use session_core::{
    ClientConfig, ConfigError, DocumentSession, IngestOutcome, QueryOutcome, RagApiClient,
    SessionError, VideoSession,
};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};

use crate::cli::{CliOptions, Command, SourceArg};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to read {path}: {source}")]
    ReadSource { path: PathBuf, source: io::Error },
    #[error("failed to read questions from stdin: {0}")]
    Stdin(io::Error),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
    #[error("failed to serialize transcript: {0}")]
    Transcript(#[from] serde_json::Error),
    #[error("failed to write transcript to {path}: {source}")]
    WriteTranscript { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("ingestion failed: {0}")]
    IngestFailed(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub answered: usize,
    pub failed: usize,
    pub discarded: usize,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    fn record(&mut self, outcome: &QueryOutcome) {
        match outcome {
            QueryOutcome::Answered { .. } => self.answered += 1,
            QueryOutcome::Failed { .. } => self.failed += 1,
            QueryOutcome::Discarded => self.discarded += 1,
        }
    }
}

/// Questions given on the command line, or read line by line from stdin.
pub enum Questions {
    Listed(std::vec::IntoIter<String>),
    Stdin(Lines<BufReader<Stdin>>),
}

impl Questions {
    pub fn from_options(options: &CliOptions) -> Self {
        if options.questions.is_empty() {
            Self::Stdin(BufReader::new(tokio::io::stdin()).lines())
        } else {
            Self::Listed(options.questions.clone().into_iter())
        }
    }

    async fn next(&mut self) -> Result<Option<String>, RunError> {
        match self {
            Self::Listed(questions) => Ok(questions.find(|question| !question.trim().is_empty())),
            Self::Stdin(lines) => loop {
                match lines.next_line().await.map_err(RunError::Stdin)? {
                    Some(line) if line.trim().is_empty() => continue,
                    other => return Ok(other),
                }
            },
        }
    }
}

pub async fn run(options: &CliOptions, config: &ClientConfig) -> Result<RunSummary, RunError> {
    let client = RagApiClient::from_config(config)?;
    info!(base_url = client.base_url(), "using backend");

    let mut questions = Questions::from_options(options);
    let mut out = io::stdout();

    match &options.command {
        Command::Video { url } => {
            let session = VideoSession::new(client).with_stale_responses(config.stale_responses);
            run_video(&session, url, &mut questions, &mut out).await
        }
        Command::Document { source } => {
            let session =
                DocumentSession::new(client).with_stale_responses(config.stale_responses);
            let summary = run_document(&session, source, &mut questions, &mut out).await?;
            if let Some(path) = &options.transcript_out {
                write_transcript(&session, path).await?;
            }
            Ok(summary)
        }
    }
}

pub async fn run_video<B, W>(
    session: &VideoSession<B>,
    url: &str,
    questions: &mut Questions,
    out: &mut W,
) -> Result<RunSummary, RunError>
where
    B: VideoBackend,
    W: Write,
{
    session.set_url(url);
    if let IngestOutcome::Failed { message } = session.prepare().await? {
        return Err(RunError::IngestFailed(message));
    }

    let mut summary = RunSummary::default();
    while let Some(question) = questions.next().await? {
        let outcome = session.ask(&question).await?;
        summary.record(&outcome);
        print_outcome(out, &question, &outcome)?;
    }
    Ok(summary)
}

pub async fn run_document<B, W>(
    session: &DocumentSession<B>,
    source: &SourceArg,
    questions: &mut Questions,
    out: &mut W,
) -> Result<RunSummary, RunError>
where
    B: DocumentBackend,
    W: Write,
{
    stage_source(session, source).await?;
    match session.ingest().await? {
        IngestOutcome::Ready { document_id } => {
            if let Some(document_id) = document_id {
                info!(%document_id, "document ready");
            }
        }
        IngestOutcome::Failed { message } => return Err(RunError::IngestFailed(message)),
    }

    let mut summary = RunSummary::default();
    while let Some(question) = questions.next().await? {
        let outcome = session.query(&question).await?;
        summary.record(&outcome);
        print_outcome(out, &question, &outcome)?;
    }
    Ok(summary)
}

async fn stage_source<B: DocumentBackend>(
    session: &DocumentSession<B>,
    source: &SourceArg,
) -> Result<(), RunError> {
    match source {
        SourceArg::File { kind, path } => {
            let file = SourceFile::read(path)
                .await
                .map_err(|source| RunError::ReadSource {
                    path: path.clone(),
                    source,
                })?;
            session.stage(StagedInput::SelectTab(*kind));
            session.stage(match kind {
                SourceKind::Txt => StagedInput::Txt(Some(file)),
                _ => StagedInput::Pdf(Some(file)),
            });
        }
        SourceArg::Text(text) => {
            session.stage(StagedInput::SelectTab(SourceKind::Text));
            session.stage(StagedInput::Text(text.clone()));
        }
    }
    Ok(())
}

fn print_outcome<W: Write>(
    out: &mut W,
    question: &str,
    outcome: &QueryOutcome,
) -> Result<(), RunError> {
    writeln!(out, "Q: {}", question.trim())?;
    match outcome {
        QueryOutcome::Answered { answer, sources } => {
            writeln!(out, "A: {answer}")?;
            for (index, source) in sources.iter().enumerate() {
                writeln!(out, "  [{}] {}", index + 1, source.trim())?;
            }
        }
        QueryOutcome::Failed { message } => writeln!(out, "Error: {message}")?,
        QueryOutcome::Discarded => {
            warn!("answer discarded after the session changed");
        }
    }
    writeln!(out)?;
    Ok(())
}

async fn write_transcript<B: DocumentBackend>(
    session: &DocumentSession<B>,
    path: &Path,
) -> Result<(), RunError> {
    let transcript = session.snapshot().transcript;
    let body = serde_json::to_vec_pretty(&transcript)?;
    tokio::fs::write(path, body)
        .await
        .map_err(|source| RunError::WriteTranscript {
            path: path.to_path_buf(),
            source,
        })?;
    info!(path = %path.display(), turns = transcript.len(), "transcript written");
    Ok(())
}
