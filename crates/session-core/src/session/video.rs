use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{
    IngestOutcome, PREPARED_STATUS, PREPARING_STATUS, QueryOutcome, SessionError, SessionPhase,
    Settle, THINKING_STATUS,
};
use crate::api::{AskRequest, AskResponse, PrepareRequest, VideoBackend};
use crate::config::StaleResponsePolicy;
use crate::guard::{AlreadyInFlight, RequestGuard};
use crate::operation::{OperationKind, OperationState};
use crate::transcript::Turn;
use crate::validation::{validate_url, validate_video_query};

/// The most recent answer. The video workflow keeps no transcript; each
/// question replaces the previous answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoAnswer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<String>,
    pub reported_sources: usize,
}

impl VideoAnswer {
    pub fn from_response(question: impl Into<String>, response: AskResponse) -> Self {
        let turn = Turn::answer(
            response.answer.as_deref().unwrap_or_default(),
            response.sources.unwrap_or_default(),
        );
        Self {
            question: question.into(),
            answer: turn.content,
            sources: turn.sources,
            reported_sources: turn.reported_sources,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoSessionState {
    /// Staged URL. Kept after a successful prepare since every ask re-submits it.
    pub url: String,
    pub question: String,
    pub prepared_url: Option<String>,
    pub answer: Option<VideoAnswer>,
    pub ingest: OperationState,
    pub query: OperationState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoEvent {
    UrlEdited(String),
    QuestionEdited(String),
    Rejected { kind: OperationKind, message: String },
    PrepareStarted,
    PrepareSucceeded { url: String },
    PrepareFailed { message: String },
    /// The prepare future was dropped before the backend answered.
    PrepareAbandoned,
    AskStarted,
    AnswerResolved(VideoAnswer),
    AnswerDiscarded,
    AskFailed { message: String },
    Reset,
}

impl VideoSessionState {
    pub fn apply(self, event: VideoEvent) -> Self {
        match event {
            VideoEvent::UrlEdited(url) => Self { url, ..self },
            VideoEvent::QuestionEdited(question) => Self { question, ..self },
            VideoEvent::Rejected {
                kind: OperationKind::Ingest,
                message,
            } => Self {
                ingest: self.ingest.rejected(message),
                ..self
            },
            VideoEvent::Rejected {
                kind: OperationKind::Query,
                message,
            } => Self {
                query: self.query.rejected(message),
                ..self
            },
            VideoEvent::PrepareStarted => Self {
                ingest: OperationState::started(PREPARING_STATUS),
                ..self
            },
            VideoEvent::PrepareSucceeded { url } => Self {
                prepared_url: Some(url),
                ingest: OperationState::succeeded(Some(PREPARED_STATUS)),
                ..self
            },
            VideoEvent::PrepareFailed { message } => Self {
                ingest: OperationState::failed(message),
                ..self
            },
            VideoEvent::PrepareAbandoned => Self {
                ingest: OperationState::succeeded(None),
                ..self
            },
            VideoEvent::AskStarted => Self {
                question: String::new(),
                answer: None,
                query: OperationState::started(THINKING_STATUS),
                ..self
            },
            VideoEvent::AnswerResolved(answer) => Self {
                answer: Some(answer),
                query: OperationState::succeeded(None),
                ..self
            },
            VideoEvent::AnswerDiscarded => Self {
                query: OperationState::succeeded(None),
                ..self
            },
            VideoEvent::AskFailed { message } => Self {
                answer: None,
                query: OperationState::failed(message),
                ..self
            },
            VideoEvent::Reset => Self::default(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.ingest.in_flight {
            SessionPhase::Ingesting
        } else if self.query.in_flight {
            SessionPhase::Querying
        } else if self.prepared_url.is_some() {
            SessionPhase::Ready
        } else {
            SessionPhase::Empty
        }
    }
}

/// Drives the prepare/ask workflow against a [`VideoBackend`].
pub struct VideoSession<B> {
    backend: B,
    guard: RequestGuard,
    state: Mutex<VideoSessionState>,
    stale_responses: StaleResponsePolicy,
}

impl<B: VideoBackend> VideoSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            guard: RequestGuard::default(),
            state: Mutex::new(VideoSessionState::default()),
            stale_responses: StaleResponsePolicy::default(),
        }
    }

    pub fn with_stale_responses(mut self, policy: StaleResponsePolicy) -> Self {
        self.stale_responses = policy;
        self
    }

    pub fn snapshot(&self) -> VideoSessionState {
        self.lock_state().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock_state().phase()
    }

    pub fn set_url(&self, url: impl Into<String>) {
        self.dispatch(VideoEvent::UrlEdited(url.into()));
    }

    pub fn set_question(&self, question: impl Into<String>) {
        self.dispatch(VideoEvent::QuestionEdited(question.into()));
    }

    /// Asks the backend to fetch and index the staged URL's transcript.
    pub async fn prepare(&self) -> Result<IngestOutcome, SessionError> {
        let raw_url = self.lock_state().url.clone();
        let url = validate_url(&raw_url).map_err(|err| {
            debug!(error = %err, "video url rejected");
            self.dispatch(VideoEvent::Rejected {
                kind: OperationKind::Ingest,
                message: err.to_string(),
            });
            err
        })?;

        let in_flight = self.guard.begin(OperationKind::Ingest)?;
        self.dispatch(VideoEvent::PrepareStarted);
        let settle = Settle::arm(
            &self.state,
            VideoSessionState::apply,
            VideoEvent::PrepareAbandoned,
        );
        info!(youtube_url = %url, "preparing video");

        let result = self
            .backend
            .prepare(PrepareRequest {
                youtube_url: url.clone(),
            })
            .await;
        settle.disarm();

        let outcome = match result {
            Ok(()) => {
                info!(youtube_url = %url, "video prepared");
                self.dispatch(VideoEvent::PrepareSucceeded { url });
                IngestOutcome::Ready { document_id: None }
            }
            Err(err) => {
                warn!(error = %err, "video prepare failed");
                let message = err.user_message();
                self.dispatch(VideoEvent::PrepareFailed {
                    message: message.clone(),
                });
                IngestOutcome::Failed { message }
            }
        };

        in_flight.end();
        Ok(outcome)
    }

    pub async fn ask(&self, question: &str) -> Result<QueryOutcome, SessionError> {
        self.set_question(question);
        self.submit_question().await
    }

    /// Sends the staged URL together with the staged question. A prior
    /// prepare is not required.
    pub async fn submit_question(&self) -> Result<QueryOutcome, SessionError> {
        let (validated, prepared_at_dispatch) = {
            let state = self.lock_state();
            (
                validate_video_query(&state.url, &state.question),
                state.prepared_url.clone(),
            )
        };
        let (url, question) = validated.map_err(|err| {
            debug!(error = %err, "video question rejected");
            self.dispatch(VideoEvent::Rejected {
                kind: OperationKind::Query,
                message: err.to_string(),
            });
            err
        })?;

        let in_flight = self.guard.begin(OperationKind::Query)?;
        self.dispatch(VideoEvent::AskStarted);
        let settle = Settle::arm(
            &self.state,
            VideoSessionState::apply,
            VideoEvent::AnswerDiscarded,
        );
        debug!(youtube_url = %url, "asking video question");

        let result = self
            .backend
            .ask(AskRequest {
                youtube_url: url.clone(),
                question: question.clone(),
            })
            .await;
        settle.disarm();

        let outcome = {
            let mut state = self.lock_state();
            // Stale once a prepare for another URL landed while this ask was pending.
            let stale = state.prepared_url != prepared_at_dispatch
                && state.prepared_url.as_deref() != Some(url.as_str());

            if stale && self.stale_responses == StaleResponsePolicy::Discard {
                warn!(youtube_url = %url, "discarding answer for a video that is no longer active");
                apply_in_place(&mut state, VideoEvent::AnswerDiscarded);
                QueryOutcome::Discarded
            } else {
                match result {
                    Ok(response) => {
                        let answer = VideoAnswer::from_response(question, response);
                        let outcome = QueryOutcome::Answered {
                            answer: answer.answer.clone(),
                            sources: answer.sources.clone(),
                        };
                        apply_in_place(&mut state, VideoEvent::AnswerResolved(answer));
                        outcome
                    }
                    Err(err) => {
                        warn!(error = %err, "video ask failed");
                        let message = err.user_message();
                        apply_in_place(
                            &mut state,
                            VideoEvent::AskFailed {
                                message: message.clone(),
                            },
                        );
                        QueryOutcome::Failed { message }
                    }
                }
            }
        };

        in_flight.end();
        Ok(outcome)
    }

    pub fn reset(&self) -> Result<(), SessionError> {
        for kind in [OperationKind::Ingest, OperationKind::Query] {
            if self.guard.is_in_flight(kind) {
                return Err(AlreadyInFlight(kind).into());
            }
        }
        self.dispatch(VideoEvent::Reset);
        Ok(())
    }

    fn dispatch(&self, event: VideoEvent) {
        apply_in_place(&mut self.lock_state(), event);
    }

    fn lock_state(&self) -> MutexGuard<'_, VideoSessionState> {
        self.state
            .lock()
            .expect("video session mutex should not be poisoned")
    }
}

fn apply_in_place(state: &mut VideoSessionState, event: VideoEvent) {
    let current = std::mem::take(state);
    *state = current.apply(event);
}
