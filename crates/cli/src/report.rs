// Report accumulation, file export and the end-of-run summary table

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::Path;
use tabled::{Table, Tabled};

use netdiag_core::domain::{DiagnosticEvent, SessionSummary, StepOutcome};

/// Everything a session printed, in order
#[derive(Debug, Default)]
pub struct Report {
    content: String,
}

impl Report {
    pub fn push(&mut self, event: &DiagnosticEvent) {
        self.content.push_str(&event.update.data);
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }
}

/// `railway-netdiag-YYYY-MM-DD-HHMMSS.txt`
pub fn default_report_name(now: DateTime<Local>) -> String {
    format!("railway-netdiag-{}.txt", now.format("%Y-%m-%d-%H%M%S"))
}

pub fn save_report(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("error saving file {}", path.display()))
}

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "Step")]
    step: String,
    #[tabled(rename = "Outcome")]
    outcome: &'static str,
    #[tabled(rename = "Updates")]
    updates: usize,
}

pub fn summary_table(summary: &SessionSummary) -> String {
    let rows = summary.steps.iter().map(|step| StepRow {
        step: step.probe.label().to_string(),
        outcome: match step.outcome {
            StepOutcome::Succeeded => "ok",
            StepOutcome::Failed => "failed",
            StepOutcome::Skipped => "skipped",
        },
        updates: step.progress_updates,
    });
    Table::new(rows).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use netdiag_core::domain::{DiagnosticUpdate, ProbeKind, UpdateType};

    #[test]
    fn test_report_concatenates_data_in_order() {
        let mut report = Report::default();
        for (update_type, data) in [
            (UpdateType::Start, "banner\n"),
            (UpdateType::StepProgress, "line 1\n"),
            (UpdateType::Error, "Error: boom\n"),
            (UpdateType::Done, "\nCompleted"),
        ] {
            report.push(&DiagnosticEvent::new(
                "s",
                DiagnosticUpdate::new(update_type, "", data),
            ));
        }

        assert_eq!(report.as_str(), "banner\nline 1\nError: boom\n\nCompleted");
    }

    #[test]
    fn test_default_report_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(
            default_report_name(now),
            "railway-netdiag-2024-03-07-090502.txt"
        );
    }

    #[test]
    fn test_save_report_writes_file() {
        let path = std::env::temp_dir().join(format!(
            "railway-netdiag-test-{}.txt",
            std::process::id()
        ));

        save_report(&path, "report body").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "report body");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_save_report_error_has_context() {
        let path = std::env::temp_dir()
            .join("railway-netdiag-missing-dir")
            .join("nested")
            .join("report.txt");

        let err = save_report(&path, "x").unwrap_err();
        assert!(err.to_string().starts_with("error saving file"));
    }

    #[test]
    fn test_summary_table_lists_steps() {
        let mut summary = SessionSummary::new("s");
        summary.record(ProbeKind::IpInfo, StepOutcome::Succeeded, 1);
        summary.record(ProbeKind::Ping, StepOutcome::Failed, 0);

        let table = summary_table(&summary);

        assert!(table.contains("Step"));
        assert!(table.contains("Client IP Info"));
        assert!(table.contains("Ping (n=10)"));
        assert!(table.contains("failed"));
    }
}
