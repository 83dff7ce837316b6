// Update emission: report formatting plus publication on the channel

use tracing::debug;

use crate::application::channel::UpdateChannel;
use crate::application::constants::SEPARATOR_WIDTH;
use crate::domain::{DiagnosticEvent, DiagnosticUpdate, UpdateType};

/// Apply the report layout to an update about to be published
///
/// STEP_START payloads are framed by rules; START, STEP_START and STEP_PROGRESS
/// payloads end with a newline. ERROR and DONE are left as built.
pub fn format_for_emission(mut update: DiagnosticUpdate) -> DiagnosticUpdate {
    if update.update_type == UpdateType::StepStart {
        let rule = "-".repeat(SEPARATOR_WIDTH);
        update.data = format!("\n{}\n{}\n{}", rule, update.data, rule);
    }
    if matches!(
        update.update_type,
        UpdateType::Start | UpdateType::StepStart | UpdateType::StepProgress
    ) {
        update.data.push('\n');
    }
    update
}

/// Publishes the updates of one session
pub(crate) struct SessionEmitter {
    channel: UpdateChannel,
    session_id: String,
}

impl SessionEmitter {
    pub(crate) fn new(channel: UpdateChannel, session_id: String) -> Self {
        Self {
            channel,
            session_id,
        }
    }

    pub(crate) fn emit(
        &self,
        update_type: UpdateType,
        message: impl Into<String>,
        data: impl Into<String>,
    ) {
        let update = format_for_emission(DiagnosticUpdate::new(update_type, message, data));
        debug!(
            session_id = %self.session_id,
            update_type = %update.update_type,
            message = %update.message,
            "Emitting update"
        );
        self.channel
            .publish(DiagnosticEvent::new(self.session_id.clone(), update));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_start_framed_by_rules() {
        let update = format_for_emission(DiagnosticUpdate::new(
            UpdateType::StepStart,
            "Running...",
            "Traceroute",
        ));
        let rule = "-".repeat(79);
        assert_eq!(update.data, format!("\n{}\nTraceroute\n{}\n", rule, rule));
    }

    #[test]
    fn test_newline_rules_per_type() {
        let fmt = |t| format_for_emission(DiagnosticUpdate::new(t, "", "x")).data;

        assert_eq!(fmt(UpdateType::Start), "x\n");
        assert_eq!(fmt(UpdateType::StepProgress), "x\n");
        assert_eq!(fmt(UpdateType::Error), "x");
        assert_eq!(fmt(UpdateType::Done), "x");
    }

    #[test]
    fn test_empty_progress_becomes_single_newline() {
        let update = format_for_emission(DiagnosticUpdate::new(UpdateType::StepProgress, "", ""));
        assert_eq!(update.data, "\n");
    }
}
