// Session outcome record

use super::probe::ProbeKind;
use serde::Serialize;

/// How a single step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    Failed,
    /// Never ran because the session was cancelled first
    Skipped,
}

/// Per-step entry of a session summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub probe: ProbeKind,
    pub outcome: StepOutcome,
    /// Number of STEP_PROGRESS updates emitted for this step
    pub progress_updates: usize,
}

/// What a finished session did, returned by awaiting its handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub steps: Vec<StepReport>,
    pub cancelled: bool,
}

impl SessionSummary {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            steps: Vec::with_capacity(ProbeKind::SEQUENCE.len()),
            cancelled: false,
        }
    }

    pub fn record(&mut self, probe: ProbeKind, outcome: StepOutcome, progress_updates: usize) {
        self.steps.push(StepReport {
            probe,
            outcome,
            progress_updates,
        });
    }

    pub fn step(&self, probe: ProbeKind) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.probe == probe)
    }

    pub fn failed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.outcome == StepOutcome::Failed)
            .count()
    }
}
