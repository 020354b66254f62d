mod document;
mod video;


use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

use crate::guard::AlreadyInFlight;
use crate::source::DocumentId;
use crate::validation::ValidationError;

pub use document::{DocumentEvent, DocumentSession, DocumentSessionState};
pub use video::{VideoAnswer, VideoEvent, VideoSession, VideoSessionState};

pub const INDEXING_STATUS: &str = "Indexing your document...";
pub const INDEXED_STATUS: &str = "Document indexed. Ask a question to get started.";
pub const PREPARING_STATUS: &str = "Preparing the video transcript...";
pub const PREPARED_STATUS: &str = "Video ready. Ask a question to get started.";
pub const THINKING_STATUS: &str = "Thinking...";

/// Coarse position in the session lifecycle:
/// `Empty -> Ingesting -> Ready <-> Querying`, with re-ingestion from `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Empty,
    Ingesting,
    Ready,
    Querying,
}

/// Reasons an operation was refused before anything was sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    AlreadyInFlight(#[from] AlreadyInFlight),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The backend accepted the source. Only the document workflow yields an id.
    Ready { document_id: Option<DocumentId> },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Answered { answer: String, sources: Vec<String> },
    Failed { message: String },
    /// The answer arrived after a newer ingestion replaced the session it
    /// was asked against, and was dropped.
    Discarded,
}

/// Applies `on_abandon` to the session state if dropped before
/// [`Settle::disarm`]. Held across an operation's backend await.
struct Settle<'a, S: Default, E> {
    state: &'a Mutex<S>,
    apply: fn(S, E) -> S,
    on_abandon: Option<E>,
}

impl<'a, S: Default, E> Settle<'a, S, E> {
    fn arm(state: &'a Mutex<S>, apply: fn(S, E) -> S, on_abandon: E) -> Self {
        Self {
            state,
            apply,
            on_abandon: Some(on_abandon),
        }
    }

    fn disarm(mut self) {
        self.on_abandon = None;
    }
}

impl<S: Default, E> Drop for Settle<'_, S, E> {
    fn drop(&mut self) {
        let Some(event) = self.on_abandon.take() else {
            return;
        };
        debug!("operation abandoned before it resolved");
        // Poisoned only while a panic unwinds.
        if let Ok(mut state) = self.state.lock() {
            let current = std::mem::take(&mut *state);
            *state = (self.apply)(current, event);
        }
    }
}
