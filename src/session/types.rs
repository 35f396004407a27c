use crate::scope::Scope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identity of one constructed session. A restart-by-recreation
/// produces a new id for the same root.
pub type SessionId = Uuid;

/// Lifecycle events emitted by a running session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// File processing progress
    Progress { files: Vec<FileProgress> },
    /// Worker stopped, possibly unexpectedly
    Stopped { reason: StopReason },
    /// Worker failed fatally; the session is unusable
    Failed { message: String },
}

/// Processing state of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProgress {
    pub uri: String,
    pub processing: Vec<ProcessingRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingRange {
    pub start_line: u32,
    pub end_line: u32,
    pub kind: ProcessingKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingKind {
    Processing,
    FatalError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopReason {
    pub message: String,
    pub detail: Option<String>,
}

/// Lifecycle phase of a registered session.
///
/// `Constructing` is entered as soon as the session object exists so that
/// concurrent openers observe it. It resolves to exactly one of the other
/// phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Constructing,
    Started,
    /// Constructed but not started because the toolchain is not usable yet
    AwaitingToolchain,
    /// Not kept: wrong major version, failed start, or removed while
    /// starting. The session is disposed.
    Rejected,
}

/// Everything a factory needs to construct a session
#[derive(Debug, Clone)]
pub struct SessionSpec {
    pub id: SessionId,
    pub root: Scope,
    pub default_toolchain: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionSpec {
    pub fn new(root: Scope, default_toolchain: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            root,
            default_toolchain,
            created_at: Utc::now(),
        }
    }
}

impl StopReason {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({})", self.message, detail),
            None => f.write_str(&self.message),
        }
    }
}
