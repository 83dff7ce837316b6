// Orchestrator - runs the probe sequence and emits the update stream

mod emitter;
mod session;

pub use emitter::format_for_emission;
pub use session::{cancel_channel, CancelSender, CancelToken, SessionHandle};

use emitter::SessionEmitter;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::application::channel::UpdateChannel;
use crate::application::constants::STEP_PAUSE;
use crate::application::probes::{ProbeRun, ProbeSet, StreamingProbe};
use crate::domain::{ProbeKind, SessionSummary, StepOutcome, UpdateType};
use crate::error::ProbeError;
use crate::port::{IdProvider, TimeProvider};

/// Local time with its numeric UTC offset, e.g. `+02:00`
const BANNER_TIME_FORMAT: &str = "%A, %b %-d %Y %H:%M:%S %:z";

/// Host-provided context, passed in at construction instead of living in globals
#[derive(Debug, Clone)]
pub struct DiagnosticsContext {
    /// Title printed at the top of every report
    pub app_name: String,
    pub version: String,
}

impl DiagnosticsContext {
    pub fn new(app_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            version: version.into(),
        }
    }
}

impl Default for DiagnosticsContext {
    fn default() -> Self {
        Self::new("Railway Network Diagnostics", crate::VERSION)
    }
}

/// Result of one step as seen by the sequencer
struct StepResult {
    outcome: StepOutcome,
    progress_updates: usize,
    cancelled: bool,
}

/// Orchestrator for diagnostic sessions
///
/// Each [`start`](Self::start) runs every probe once, strictly in
/// [`ProbeKind::SEQUENCE`] order, on a background task. Probe failures become
/// ERROR updates and never stop the sequence.
#[derive(Clone)]
pub struct DiagnosticsOrchestrator {
    inner: Arc<SessionRunner>,
}

#[derive(Clone)]
struct SessionRunner {
    context: DiagnosticsContext,
    probes: ProbeSet,
    channel: UpdateChannel,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
    step_pause: Duration,
}

impl DiagnosticsOrchestrator {
    /// Create a new orchestrator
    ///
    /// # Arguments
    /// * `context` - App name and version for the report banner
    /// * `probes` - The probe set (owns the target endpoint)
    /// * `channel` - Where updates are published
    /// * `time_provider` - Clock for the banner timestamp and step timings
    /// * `id_provider` - Session id generator
    pub fn new(
        context: DiagnosticsContext,
        probes: ProbeSet,
        channel: UpdateChannel,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionRunner {
                context,
                probes,
                channel,
                time_provider,
                id_provider,
                step_pause: STEP_PAUSE,
            }),
        }
    }

    /// Override the pause between steps (tests use zero)
    ///
    /// Clones of this orchestrator made earlier keep their own pause.
    pub fn with_step_pause(mut self, pause: Duration) -> Self {
        Arc::make_mut(&mut self.inner).step_pause = pause;
        self
    }

    pub fn channel(&self) -> &UpdateChannel {
        &self.inner.channel
    }

    /// Start a session on a background task and return immediately
    ///
    /// Every call starts an independent session; overlapping sessions are told
    /// apart by the session id on each event.
    pub fn start(&self) -> SessionHandle {
        let session_id = self.inner.id_provider.generate_id();
        let (cancel_tx, cancel_token) = cancel_channel();
        let runner = Arc::clone(&self.inner);
        let id = session_id.clone();

        let join = tokio::spawn(async move { runner.run(id, cancel_token).await });

        SessionHandle::new(session_id, cancel_tx, join)
    }
}

impl SessionRunner {
    async fn run(&self, session_id: String, cancel: CancelToken) -> SessionSummary {
        let emitter = SessionEmitter::new(self.channel.clone(), session_id.clone());
        let mut summary = SessionSummary::new(session_id.clone());

        info!(
            session_id = %session_id,
            target = %self.probes.target(),
            "Diagnostics session started"
        );

        emitter.emit(UpdateType::Start, "Starting diagnostics...", self.banner());

        for kind in ProbeKind::SEQUENCE {
            if summary.cancelled || !self.pause(&cancel).await {
                summary.cancelled = true;
                summary.record(kind, StepOutcome::Skipped, 0);
                continue;
            }

            let result = self.run_step(kind, &emitter, &cancel).await;
            summary.cancelled |= result.cancelled;
            summary.record(kind, result.outcome, result.progress_updates);
        }

        if summary.cancelled {
            warn!(session_id = %session_id, "Diagnostics session cancelled");
            emitter.emit(UpdateType::Done, "Diagnostics cancelled", "\nCancelled");
        } else {
            info!(
                session_id = %session_id,
                failed_steps = summary.failed_count(),
                "Diagnostics session completed"
            );
            emitter.emit(UpdateType::Done, "Diagnostics complete!", "\nCompleted");
        }

        summary
    }

    fn banner(&self) -> String {
        let generated = self.time_provider.now().format(BANNER_TIME_FORMAT);
        format!(
            "{}\nGenerated : {}\nVersion   : {}\nEndpoint  : {}\n",
            self.context.app_name,
            generated,
            self.context.version,
            self.probes.target()
        )
    }

    /// Cosmetic pacing; returns false if cancelled instead
    async fn pause(&self, cancel: &CancelToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }
        tokio::select! {
            _ = sleep(self.step_pause) => true,
            _ = cancel.cancelled() => false,
        }
    }

    async fn run_step(
        &self,
        kind: ProbeKind,
        emitter: &SessionEmitter,
        cancel: &CancelToken,
    ) -> StepResult {
        emitter.emit(UpdateType::StepStart, kind.start_message(), kind.label());
        let started = self.time_provider.now_millis();

        let result = match self.probes.start(kind) {
            ProbeRun::Captured(probe) => {
                let outcome = tokio::select! {
                    outcome = probe => outcome,
                    _ = cancel.cancelled() => Err(ProbeError::Cancelled),
                };
                Self::emit_captured(kind, outcome, emitter)
            }
            ProbeRun::Streamed(probe) => Self::forward_stream(kind, probe, emitter, cancel).await,
        };

        info!(
            probe = %kind,
            outcome = ?result.outcome,
            progress_updates = result.progress_updates,
            duration_ms = self.time_provider.now_millis() - started,
            "Step finished"
        );

        result
    }

    fn emit_captured(
        kind: ProbeKind,
        outcome: Result<String, ProbeError>,
        emitter: &SessionEmitter,
    ) -> StepResult {
        match outcome {
            Ok(text) => {
                emitter.emit(UpdateType::StepProgress, kind.success_message(), text);
                StepResult {
                    outcome: StepOutcome::Succeeded,
                    progress_updates: 1,
                    cancelled: false,
                }
            }
            Err(err) => {
                let cancelled = Self::emit_failure(kind, &err, emitter);
                let mut progress_updates = 0;
                if let Some(partial) = err.partial_output() {
                    emitter.emit(UpdateType::StepProgress, "Partial output", partial);
                    progress_updates = 1;
                }
                StepResult {
                    outcome: StepOutcome::Failed,
                    progress_updates,
                    cancelled,
                }
            }
        }
    }

    /// Re-emit each streamed line as its own STEP_PROGRESS
    async fn forward_stream(
        kind: ProbeKind,
        probe: StreamingProbe,
        emitter: &SessionEmitter,
        cancel: &CancelToken,
    ) -> StepResult {
        let StreamingProbe { tool, mut lines } = probe;
        let mut progress_updates = 0;
        let mut failure = None;

        loop {
            let item = tokio::select! {
                item = lines.next() => item,
                _ = cancel.cancelled() => {
                    failure = Some(ProbeError::Cancelled);
                    break;
                }
            };

            match item {
                Some(Ok(line)) => {
                    emitter.emit(UpdateType::StepProgress, kind.progress_message(), line.render());
                    progress_updates += 1;
                }
                Some(Err(source)) => {
                    failure = Some(ProbeError::Command {
                        tool: tool.clone(),
                        source,
                    });
                    break;
                }
                None => break,
            }
        }
        // Dropping the stream reaps (or terminates) the child
        drop(lines);

        match failure {
            None => {
                emitter.emit(UpdateType::StepProgress, kind.success_message(), "");
                StepResult {
                    outcome: StepOutcome::Succeeded,
                    progress_updates: progress_updates + 1,
                    cancelled: false,
                }
            }
            Some(err) => {
                let cancelled = Self::emit_failure(kind, &err, emitter);
                StepResult {
                    outcome: StepOutcome::Failed,
                    progress_updates,
                    cancelled,
                }
            }
        }
    }

    /// Emit the ERROR update of a step; returns whether it was a cancellation
    fn emit_failure(kind: ProbeKind, err: &ProbeError, emitter: &SessionEmitter) -> bool {
        let cancelled = matches!(err, ProbeError::Cancelled);
        let message = if cancelled {
            "Step cancelled"
        } else {
            kind.failure_message()
        };
        warn!(probe = %kind, error = %err, "Probe failed");
        emitter.emit(UpdateType::Error, message, format!("Error: {}\n", err));
        cancelled
    }
}
