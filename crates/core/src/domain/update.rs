// Diagnostic update protocol

use serde::{Deserialize, Serialize};

/// Event name every update is published under
pub const UPDATE_TOPIC: &str = "diag-output";

/// Kind of a diagnostic update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    /// Sequence begin (once per session)
    Start,
    /// One probe begins
    StepStart,
    /// A probe result or one streamed line
    StepProgress,
    /// Sequence end (once per session, always last)
    Done,
    /// A probe failed; the session continues
    Error,
}

impl UpdateType {
    /// All variants, in declaration order (for hosts that bind the enumeration)
    pub const ALL: [UpdateType; 5] = [
        UpdateType::Start,
        UpdateType::StepStart,
        UpdateType::StepProgress,
        UpdateType::Done,
        UpdateType::Error,
    ];

    /// Wire value, e.g. `step_progress`
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateType::Start => "start",
            UpdateType::StepStart => "step_start",
            UpdateType::StepProgress => "step_progress",
            UpdateType::Done => "done",
            UpdateType::Error => "error",
        }
    }

    /// Upper-case binding name, e.g. `STEP_PROGRESS`
    pub fn binding_name(&self) -> &'static str {
        match self {
            UpdateType::Start => "START",
            UpdateType::StepStart => "STEP_START",
            UpdateType::StepProgress => "STEP_PROGRESS",
            UpdateType::Done => "DONE",
            UpdateType::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for UpdateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single typed notification describing session or step progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticUpdate {
    #[serde(rename = "type")]
    pub update_type: UpdateType,
    /// Short human summary
    pub message: String,
    /// Payload, possibly multi-line or empty
    pub data: String,
}

impl DiagnosticUpdate {
    pub fn new(update_type: UpdateType, message: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            update_type,
            message: message.into(),
            data: data.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.update_type == UpdateType::Done
    }
}

/// Envelope published on the update channel
///
/// Tagged with the session id so subscribers can demultiplex overlapping sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    pub topic: String,
    pub session_id: String,
    #[serde(flatten)]
    pub update: DiagnosticUpdate,
}

impl DiagnosticEvent {
    pub fn new(session_id: impl Into<String>, update: DiagnosticUpdate) -> Self {
        Self {
            topic: UPDATE_TOPIC.to_string(),
            session_id: session_id.into(),
            update,
        }
    }
}
