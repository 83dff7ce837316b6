// Terminal rendering of diagnostic events

use colored::Colorize;
use std::io::{self, Write};

use netdiag_core::domain::{DiagnosticEvent, UpdateType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Report text on stdout, status messages on stderr
    Text,
    /// One JSON event per line on stdout
    Json,
}

pub struct Renderer<O: Write, E: Write> {
    out: O,
    err: E,
    mode: OutputMode,
    last_message: Option<String>,
}

impl<O: Write, E: Write> Renderer<O, E> {
    pub fn new(out: O, err: E, mode: OutputMode) -> Self {
        Self {
            out,
            err,
            mode,
            last_message: None,
        }
    }

    pub fn render(&mut self, event: &DiagnosticEvent) -> io::Result<()> {
        match self.mode {
            OutputMode::Json => {
                serde_json::to_writer(&mut self.out, event)?;
                writeln!(self.out)?;
            }
            OutputMode::Text => {
                self.status(event)?;
                write!(self.out, "{}", event.update.data)?;
            }
        }
        self.out.flush()
    }

    /// Status line on stderr; streaming steps repeat one message per line,
    /// so a message is only shown when it changes
    fn status(&mut self, event: &DiagnosticEvent) -> io::Result<()> {
        let message = event.update.message.as_str();
        if message.is_empty() || self.last_message.as_deref() == Some(message) {
            return Ok(());
        }
        self.last_message = Some(message.to_string());

        let styled = match event.update.update_type {
            UpdateType::Start => message.cyan().bold(),
            UpdateType::StepStart => message.bold(),
            UpdateType::StepProgress => message.dimmed(),
            UpdateType::Error => message.red(),
            UpdateType::Done => message.green().bold(),
        };
        writeln!(self.err, "{}", styled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdiag_core::domain::DiagnosticUpdate;

    fn event(update_type: UpdateType, message: &str, data: &str) -> DiagnosticEvent {
        DiagnosticEvent::new("s-1", DiagnosticUpdate::new(update_type, message, data))
    }

    #[test]
    fn test_text_mode_splits_data_and_status() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        {
            let mut renderer = Renderer::new(&mut out, &mut err, OutputMode::Text);
            renderer
                .render(&event(UpdateType::StepStart, "Running ping...", "\n---\n"))
                .unwrap();
            renderer
                .render(&event(UpdateType::Error, "Ping test failed", "Error: x\n"))
                .unwrap();
        }

        assert_eq!(String::from_utf8(out).unwrap(), "\n---\nError: x\n");
        let err = String::from_utf8(err).unwrap();
        assert!(err.contains("Running ping..."));
        assert!(err.contains("Ping test failed"));
    }

    #[test]
    fn test_repeated_messages_shown_once() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        {
            let mut renderer = Renderer::new(&mut out, &mut err, OutputMode::Text);
            for line in ["a\n", "b\n", "c\n"] {
                renderer
                    .render(&event(UpdateType::StepProgress, "Running traceroute...", line))
                    .unwrap();
            }
        }

        assert_eq!(String::from_utf8(out).unwrap(), "a\nb\nc\n");
        let err = String::from_utf8(err).unwrap();
        assert_eq!(err.matches("Running traceroute...").count(), 1);
    }

    #[test]
    fn test_json_mode_writes_one_event_per_line() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        {
            let mut renderer = Renderer::new(&mut out, &mut err, OutputMode::Json);
            renderer
                .render(&event(UpdateType::Start, "Starting", "banner\n"))
                .unwrap();
            renderer
                .render(&event(UpdateType::Done, "Diagnostics complete!", "\nCompleted"))
                .unwrap();
        }

        let out = String::from_utf8(out).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["session_id"], "s-1");
        assert_eq!(first["type"], "start");
        assert_eq!(first["data"], "banner\n");
        assert!(err.is_empty());
    }
}
