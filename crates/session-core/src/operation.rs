use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Ingest,
    Query,
}

impl OperationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient message for one operation. A status and an error never show
/// at the same time, so setting one replaces the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Notice {
    #[default]
    Clear,
    Status(String),
    Error(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationState {
    pub in_flight: bool,
    pub notice: Notice,
}

impl OperationState {
    pub fn status(&self) -> Option<&str> {
        match &self.notice {
            Notice::Status(status) => Some(status),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.notice {
            Notice::Error(error) => Some(error),
            _ => None,
        }
    }

    pub(crate) fn started(status: &str) -> Self {
        Self {
            in_flight: true,
            notice: Notice::Status(status.to_string()),
        }
    }

    pub(crate) fn succeeded(status: Option<&str>) -> Self {
        Self {
            in_flight: false,
            notice: status
                .map(|status| Notice::Status(status.to_string()))
                .unwrap_or_default(),
        }
    }

    pub(crate) fn failed(message: String) -> Self {
        Self {
            in_flight: false,
            notice: Notice::Error(message),
        }
    }

    /// Validation rejections never start an operation, so an operation that
    /// is already running keeps its flag.
    pub(crate) fn rejected(self, message: String) -> Self {
        Self {
            in_flight: self.in_flight,
            notice: Notice::Error(message),
        }
    }
}
