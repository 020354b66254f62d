use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const EMPTY_ANSWER_PLACEHOLDER: &str = "No answer was returned for this question.";
pub const FAILED_ANSWER_PREFIX: &str = "Error: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(Uuid);

impl TurnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub role: Role,
    pub content: String,
    /// Non-empty snippets cited for an answer, in backend order.
    pub sources: Vec<String>,
    /// How many source entries the backend reported, empty ones included.
    pub reported_sources: usize,
    #[serde(default)]
    pub failed: bool,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into(), Vec::new(), 0, false)
    }

    pub fn answer(answer: &str, sources: Vec<Option<String>>) -> Self {
        let reported_sources = sources.len();
        let content = if answer.trim().is_empty() {
            EMPTY_ANSWER_PLACEHOLDER.to_string()
        } else {
            answer.to_string()
        };
        Self::new(
            Role::Assistant,
            content,
            filter_sources(sources),
            reported_sources,
            false,
        )
    }

    pub fn failure(message: &str) -> Self {
        Self::new(
            Role::Assistant,
            format!("{FAILED_ANSWER_PREFIX}{message}"),
            Vec::new(),
            0,
            true,
        )
    }

    fn new(
        role: Role,
        content: String,
        sources: Vec<String>,
        reported_sources: usize,
        failed: bool,
    ) -> Self {
        Self {
            id: TurnId::new(),
            role,
            content,
            sources,
            reported_sources,
            failed,
            created_at: Utc::now(),
        }
    }
}

/// Drops missing and empty entries. Whitespace-only entries are kept as sent.
pub fn filter_sources(raw: Vec<Option<String>>) -> Vec<String> {
    raw.into_iter()
        .flatten()
        .filter(|source| !source.is_empty())
        .collect()
}

/// Append-only conversation log. Turns are never edited, reordered or
/// removed; a new ingestion starts a new transcript instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }
}
