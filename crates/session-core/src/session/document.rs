use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

use super::{
    INDEXED_STATUS, INDEXING_STATUS, IngestOutcome, QueryOutcome, SessionError, SessionPhase,
    Settle, THINKING_STATUS,
};
use crate::api::{ChatRequest, DocumentBackend};
use crate::config::StaleResponsePolicy;
use crate::guard::{AlreadyInFlight, RequestGuard};
use crate::operation::{OperationKind, OperationState};
use crate::source::{DocumentId, StagedInput, StagedSources};
use crate::transcript::{Transcript, Turn};
use crate::validation::{validate_document_query, validate_document_source};

/// Everything the document workflow shows: identity, transcript, staged
/// input and per-operation notices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSessionState {
    pub document_id: Option<DocumentId>,
    pub transcript: Transcript,
    pub staged: StagedSources,
    pub question: String,
    pub ingest: OperationState,
    pub query: OperationState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    Staged(StagedInput),
    QuestionEdited(String),
    Rejected { kind: OperationKind, message: String },
    IngestStarted,
    IngestSucceeded { document_id: DocumentId },
    IngestFailed { message: String },
    /// The ingest future was dropped before the upload resolved.
    IngestAbandoned,
    UserTurnPosted(Turn),
    AnswerResolved(Turn),
    AnswerDiscarded,
    Reset,
}

impl DocumentSessionState {
    pub fn apply(self, event: DocumentEvent) -> Self {
        match event {
            DocumentEvent::Staged(input) => Self {
                staged: self.staged.with(input),
                ..self
            },
            DocumentEvent::QuestionEdited(question) => Self { question, ..self },
            DocumentEvent::Rejected {
                kind: OperationKind::Ingest,
                message,
            } => Self {
                ingest: self.ingest.rejected(message),
                ..self
            },
            DocumentEvent::Rejected {
                kind: OperationKind::Query,
                message,
            } => Self {
                query: self.query.rejected(message),
                ..self
            },
            DocumentEvent::IngestStarted => Self {
                ingest: OperationState::started(INDEXING_STATUS),
                ..self
            },
            // A new document starts a new conversation.
            DocumentEvent::IngestSucceeded { document_id } => Self {
                document_id: Some(document_id),
                transcript: Transcript::default(),
                staged: self.staged.cleared(),
                ingest: OperationState::succeeded(Some(INDEXED_STATUS)),
                ..self
            },
            DocumentEvent::IngestFailed { message } => Self {
                ingest: OperationState::failed(message),
                ..self
            },
            DocumentEvent::IngestAbandoned => Self {
                ingest: OperationState::succeeded(None),
                ..self
            },
            DocumentEvent::UserTurnPosted(turn) => {
                let mut transcript = self.transcript;
                transcript.append(turn);
                Self {
                    transcript,
                    question: String::new(),
                    query: OperationState::started(THINKING_STATUS),
                    ..self
                }
            }
            DocumentEvent::AnswerResolved(turn) => {
                let mut transcript = self.transcript;
                transcript.append(turn);
                Self {
                    transcript,
                    query: OperationState::succeeded(None),
                    ..self
                }
            }
            DocumentEvent::AnswerDiscarded => Self {
                query: OperationState::succeeded(None),
                ..self
            },
            DocumentEvent::Reset => Self::default(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.ingest.in_flight {
            SessionPhase::Ingesting
        } else if self.query.in_flight {
            SessionPhase::Querying
        } else if self.document_id.is_some() {
            SessionPhase::Ready
        } else {
            SessionPhase::Empty
        }
    }
}

/// Drives the upload/chat workflow against a [`DocumentBackend`].
///
/// Operations take `&self` and may be started while others are pending;
/// the [`RequestGuard`] rejects a second operation of the same kind.
pub struct DocumentSession<B> {
    backend: B,
    guard: RequestGuard,
    state: Mutex<DocumentSessionState>,
    stale_responses: StaleResponsePolicy,
}

impl<B: DocumentBackend> DocumentSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            guard: RequestGuard::default(),
            state: Mutex::new(DocumentSessionState::default()),
            stale_responses: StaleResponsePolicy::default(),
        }
    }

    pub fn with_stale_responses(mut self, policy: StaleResponsePolicy) -> Self {
        self.stale_responses = policy;
        self
    }

    pub fn snapshot(&self) -> DocumentSessionState {
        self.lock_state().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock_state().phase()
    }

    pub fn stage(&self, input: StagedInput) {
        self.dispatch(DocumentEvent::Staged(input));
    }

    pub fn set_question(&self, question: impl Into<String>) {
        self.dispatch(DocumentEvent::QuestionEdited(question.into()));
    }

    /// Uploads the active tab's staged input. On success the backend's
    /// document id replaces the current one and the transcript restarts.
    pub async fn ingest(&self) -> Result<IngestOutcome, SessionError> {
        let staged = self.lock_state().staged.clone();
        let source = validate_document_source(&staged).map_err(|err| {
            debug!(error = %err, "document source rejected");
            self.dispatch(DocumentEvent::Rejected {
                kind: OperationKind::Ingest,
                message: err.to_string(),
            });
            err
        })?;

        let in_flight = self.guard.begin(OperationKind::Ingest)?;
        self.dispatch(DocumentEvent::IngestStarted);
        let settle = Settle::arm(
            &self.state,
            DocumentSessionState::apply,
            DocumentEvent::IngestAbandoned,
        );
        info!(source = %source.kind(), "indexing document");

        let result = self.backend.upload(source).await;
        settle.disarm();

        let outcome = match result {
            Ok(response) => {
                info!(document_id = %response.document_id, "document indexed");
                self.dispatch(DocumentEvent::IngestSucceeded {
                    document_id: response.document_id.clone(),
                });
                IngestOutcome::Ready {
                    document_id: Some(response.document_id),
                }
            }
            Err(err) => {
                warn!(error = %err, "document upload failed");
                let message = err.user_message();
                self.dispatch(DocumentEvent::IngestFailed {
                    message: message.clone(),
                });
                IngestOutcome::Failed { message }
            }
        };

        in_flight.end();
        Ok(outcome)
    }

    pub async fn query(&self, question: &str) -> Result<QueryOutcome, SessionError> {
        self.set_question(question);
        self.submit_question().await
    }

    /// Asks the staged question about the current document. The user turn
    /// is appended before the request resolves; the assistant turn (answer
    /// or error) after.
    pub async fn submit_question(&self) -> Result<QueryOutcome, SessionError> {
        let validated = {
            let state = self.lock_state();
            validate_document_query(state.document_id.as_ref(), &state.question)
        };
        let (document_id, question) = validated.map_err(|err| {
            debug!(error = %err, "question rejected");
            self.dispatch(DocumentEvent::Rejected {
                kind: OperationKind::Query,
                message: err.to_string(),
            });
            err
        })?;

        let in_flight = self.guard.begin(OperationKind::Query)?;
        self.dispatch(DocumentEvent::UserTurnPosted(Turn::user(question.clone())));
        let settle = Settle::arm(
            &self.state,
            DocumentSessionState::apply,
            DocumentEvent::AnswerDiscarded,
        );
        debug!(%document_id, "asking question");

        let result = self
            .backend
            .chat(ChatRequest {
                question,
                document_id: document_id.clone(),
            })
            .await;
        settle.disarm();

        let outcome = {
            let mut state = self.lock_state();
            let stale = state.document_id.as_ref() != Some(&document_id);

            if stale && self.stale_responses == StaleResponsePolicy::Discard {
                warn!(
                    %document_id,
                    "discarding answer for a document that is no longer active"
                );
                apply_in_place(&mut state, DocumentEvent::AnswerDiscarded);
                QueryOutcome::Discarded
            } else {
                let (turn, outcome) = match result {
                    Ok(response) => {
                        let turn = Turn::answer(
                            response.answer.as_deref().unwrap_or_default(),
                            response.sources.unwrap_or_default(),
                        );
                        let outcome = QueryOutcome::Answered {
                            answer: turn.content.clone(),
                            sources: turn.sources.clone(),
                        };
                        (turn, outcome)
                    }
                    Err(err) => {
                        warn!(error = %err, "chat request failed");
                        let message = err.user_message();
                        (Turn::failure(&message), QueryOutcome::Failed { message })
                    }
                };
                apply_in_place(&mut state, DocumentEvent::AnswerResolved(turn));
                outcome
            }
        };

        in_flight.end();
        Ok(outcome)
    }

    /// Returns the session to `Empty`. Refused while any operation is in
    /// flight, since its result would land in the fresh session.
    pub fn reset(&self) -> Result<(), SessionError> {
        for kind in [OperationKind::Ingest, OperationKind::Query] {
            if self.guard.is_in_flight(kind) {
                return Err(AlreadyInFlight(kind).into());
            }
        }
        self.dispatch(DocumentEvent::Reset);
        Ok(())
    }

    fn dispatch(&self, event: DocumentEvent) {
        apply_in_place(&mut self.lock_state(), event);
    }

    fn lock_state(&self) -> MutexGuard<'_, DocumentSessionState> {
        self.state
            .lock()
            .expect("document session mutex should not be poisoned")
    }
}

fn apply_in_place(state: &mut DocumentSessionState, event: DocumentEvent) {
    let current = std::mem::take(state);
    *state = current.apply(event);
}
