// Process Runner Port
// Abstraction for running external diagnostic tools (dig, traceroute, ping)

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::time::Duration;
use thiserror::Error;

/// An external command: program name plus arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Placeholder returned instead of an error when a tool is not installed
pub fn tool_missing_placeholder(program: &str) -> String {
    format!("{} command not available on this system\n", program)
}

/// Which pipe a streamed line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    Stdout,
    Stderr,
}

/// One line of streamed process output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub source: OutputSource,
    pub text: String,
}

impl OutputLine {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            source: OutputSource::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            source: OutputSource::Stderr,
            text: text.into(),
        }
    }

    /// Report text for this line; stderr content is tagged
    pub fn render(&self) -> String {
        match self.source {
            OutputSource::Stdout => self.text.clone(),
            OutputSource::Stderr => format!("STDERR: {}", self.text),
        }
    }
}

/// When collected stderr is forwarded into the line stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StderrPolicy {
    /// Only when the run failed without producing any line
    OnFailure,
    /// Whenever stderr is non-empty, after stdout closes
    Always,
}

/// Rules a streamed run is judged by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPolicy {
    /// Swallow a nonzero exit if at least one line was produced
    pub tolerate_nonzero_exit_if_output_produced: bool,
    /// Drop whitespace-only stdout lines (they do not count as output)
    pub skip_blank_lines: bool,
    pub stderr: StderrPolicy,
    /// Kill the child if no stdout line arrives in time
    pub first_output_timeout: Option<Duration>,
}

impl Default for StreamPolicy {
    fn default() -> Self {
        Self {
            tolerate_nonzero_exit_if_output_produced: false,
            skip_blank_lines: false,
            stderr: StderrPolicy::OnFailure,
            first_output_timeout: None,
        }
    }
}

/// How the child process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitSummary {
    pub success: bool,
    /// Human description, e.g. `exit status: 1`
    pub description: String,
}

/// Tail of a streamed run, decided by [`StreamPolicy::complete`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCompletion {
    pub stderr_line: Option<OutputLine>,
    pub error: Option<ProcessError>,
}

impl StreamPolicy {
    /// Decide what follows the last stdout line
    ///
    /// `produced` counts the stdout lines delivered (after blank filtering).
    pub fn complete(&self, produced: usize, exit: &ExitSummary, stderr: &str) -> StreamCompletion {
        let tolerated = self.tolerate_nonzero_exit_if_output_produced && produced > 0;
        let failed = !exit.success && !tolerated;

        let stderr = stderr.trim_end();
        let forward_stderr = !stderr.trim().is_empty()
            && match self.stderr {
                StderrPolicy::Always => true,
                StderrPolicy::OnFailure => failed && produced == 0,
            };

        StreamCompletion {
            stderr_line: forward_stderr.then(|| OutputLine::stderr(stderr)),
            error: failed.then(|| ProcessError::ExitStatus {
                status: exit.description.clone(),
                output: String::new(),
            }),
        }
    }

    /// Whether a stdout read failure ends the run like a normal exit
    ///
    /// Only under the same condition that tolerates a nonzero exit; the
    /// exit status and stderr are then judged by [`complete`](Self::complete).
    pub fn tolerates_read_error(&self, produced: usize) -> bool {
        self.tolerate_nonzero_exit_if_output_produced && produced > 0
    }

    /// Whether a stdout line is delivered and counted
    pub fn accepts(&self, line: &str) -> bool {
        !(self.skip_blank_lines && line.trim().is_empty())
    }
}

/// Process errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("starting {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("{status}")]
    ExitStatus { status: String, output: String },

    #[error("reading output: {0}")]
    Io(String),

    #[error("no output within {0:?}")]
    NoOutputTimeout(Duration),
}

impl ProcessError {
    /// Output captured before the failure, if any
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            ProcessError::ExitStatus { output, .. } if !output.is_empty() => Some(output),
            _ => None,
        }
    }
}

/// Lazily-started line stream of a running process
///
/// A failed run ends with exactly one `Err` item.
pub type LineStream = BoxStream<'static, Result<OutputLine, ProcessError>>;

/// Process Runner trait
///
/// Implementations:
/// - SubprocessRunner: spawns real child processes (infra-system)
/// - MockProcessRunner: scripted outputs for tests
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion and return stdout followed by stderr
    ///
    /// # Errors
    /// - ProcessError::Spawn if the process cannot be started (a missing
    ///   executable is NOT an error: the placeholder text is returned)
    /// - ProcessError::ExitStatus on nonzero exit, carrying the captured output
    async fn run_captured(&self, command: &CommandSpec) -> Result<String, ProcessError>;

    /// Start streaming stdout lines; the child is spawned on first poll
    fn run_streamed(&self, command: CommandSpec, policy: StreamPolicy) -> LineStream;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use futures::stream::{self, StreamExt};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Scripted result of a captured run
    #[derive(Debug, Clone)]
    pub enum MockCapture {
        Output(String),
        Fail(ProcessError),
    }

    /// Scripted streamed run; the policy is applied as a real run would
    #[derive(Debug, Clone, Default)]
    pub struct MockStream {
        pub stdout: Vec<String>,
        pub stderr: String,
        pub exit_success: bool,
        pub spawn_error: Option<String>,
    }

    impl MockStream {
        pub fn exiting(stdout: &[&str], exit_success: bool) -> Self {
            Self {
                stdout: stdout.iter().map(|s| s.to_string()).collect(),
                exit_success,
                ..Default::default()
            }
        }

        pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
            self.stderr = stderr.into();
            self
        }

        pub fn spawn_failure(message: impl Into<String>) -> Self {
            Self {
                spawn_error: Some(message.into()),
                ..Default::default()
            }
        }
    }

    /// Mock Process Runner for testing
    ///
    /// Unknown programs behave as if they were not installed.
    #[derive(Default)]
    pub struct MockProcessRunner {
        captures: Mutex<HashMap<String, MockCapture>>,
        streams: Mutex<HashMap<String, MockStream>>,
        calls: Arc<Mutex<Vec<CommandSpec>>>,
    }

    impl MockProcessRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_capture(self, program: &str, capture: MockCapture) -> Self {
            self.captures
                .lock()
                .unwrap()
                .insert(program.to_string(), capture);
            self
        }

        pub fn with_stream(self, program: &str, script: MockStream) -> Self {
            self.streams
                .lock()
                .unwrap()
                .insert(program.to_string(), script);
            self
        }

        /// Every command seen so far, in call order
        pub fn calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessRunner for MockProcessRunner {
        async fn run_captured(&self, command: &CommandSpec) -> Result<String, ProcessError> {
            self.calls.lock().unwrap().push(command.clone());

            match self.captures.lock().unwrap().get(&command.program).cloned() {
                Some(MockCapture::Output(text)) => Ok(text),
                Some(MockCapture::Fail(err)) => Err(err),
                None => Ok(tool_missing_placeholder(&command.program)),
            }
        }

        fn run_streamed(&self, command: CommandSpec, policy: StreamPolicy) -> LineStream {
            self.calls.lock().unwrap().push(command.clone());

            let script = self
                .streams
                .lock()
                .unwrap()
                .get(&command.program)
                .cloned()
                .unwrap_or_else(|| MockStream::spawn_failure("No such file or directory"));

            if let Some(message) = script.spawn_error {
                let err = ProcessError::Spawn {
                    program: command.program,
                    message,
                };
                return stream::iter(vec![Err(err)]).boxed();
            }

            let mut items: Vec<Result<OutputLine, ProcessError>> = script
                .stdout
                .iter()
                .filter(|line| policy.accepts(line))
                .map(|line| Ok(OutputLine::stdout(line.clone())))
                .collect();

            let exit = ExitSummary {
                success: script.exit_success,
                description: if script.exit_success {
                    "exit status: 0".to_string()
                } else {
                    "exit status: 1".to_string()
                },
            };
            let completion = policy.complete(items.len(), &exit, &script.stderr);
            items.extend(completion.stderr_line.map(Ok));
            items.extend(completion.error.map(Err));

            stream::iter(items).boxed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_exit() -> ExitSummary {
        ExitSummary {
            success: false,
            description: "exit status: 1".to_string(),
        }
    }

    fn tolerant() -> StreamPolicy {
        StreamPolicy {
            tolerate_nonzero_exit_if_output_produced: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_nonzero_exit_tolerated_after_output() {
        let completion = tolerant().complete(3, &failed_exit(), "");
        assert_eq!(completion.error, None);
        assert_eq!(completion.stderr_line, None);
    }

    #[test]
    fn test_nonzero_exit_without_output_fails_and_forwards_stderr() {
        let completion = tolerant().complete(0, &failed_exit(), "unknown host\n");

        assert_eq!(
            completion.stderr_line,
            Some(OutputLine::stderr("unknown host"))
        );
        assert!(matches!(
            completion.error,
            Some(ProcessError::ExitStatus { ref status, .. }) if status == "exit status: 1"
        ));
    }

    #[test]
    fn test_read_error_tolerated_only_after_output() {
        assert!(tolerant().tolerates_read_error(4));
        assert!(!tolerant().tolerates_read_error(0));
        assert!(!StreamPolicy::default().tolerates_read_error(4));
    }

    #[test]
    fn test_strict_policy_fails_even_with_output() {
        let completion = StreamPolicy::default().complete(5, &failed_exit(), "oops");

        assert!(completion.error.is_some());
        // OnFailure only forwards stderr when nothing was produced
        assert_eq!(completion.stderr_line, None);
    }

    #[test]
    fn test_always_forwards_stderr_on_success() {
        let policy = StreamPolicy {
            stderr: StderrPolicy::Always,
            ..tolerant()
        };
        let exit = ExitSummary {
            success: true,
            description: "exit status: 0".to_string(),
        };

        let completion = policy.complete(2, &exit, "warning: ttl\n");
        assert_eq!(completion.stderr_line, Some(OutputLine::stderr("warning: ttl")));
        assert_eq!(completion.error, None);
    }

    #[test]
    fn test_blank_lines_filtered_only_when_requested() {
        let keep = StreamPolicy::default();
        let skip = StreamPolicy {
            skip_blank_lines: true,
            ..Default::default()
        };

        assert!(keep.accepts("   "));
        assert!(!skip.accepts("   "));
        assert!(skip.accepts("64 bytes from 1.2.3.4"));
    }

    #[test]
    fn test_command_display_and_render() {
        let cmd = CommandSpec::new("dig", ["@1.1.1.1", "example.com"]);
        assert_eq!(cmd.to_string(), "dig @1.1.1.1 example.com");
        assert_eq!(OutputLine::stderr("boom").render(), "STDERR: boom");
        assert_eq!(OutputLine::stdout("ok").render(), "ok");
    }

    #[test]
    fn test_partial_output() {
        let err = ProcessError::ExitStatus {
            status: "exit status: 9".to_string(),
            output: ";; connection timed out".to_string(),
        };
        assert_eq!(err.partial_output(), Some(";; connection timed out"));
        assert_eq!(ProcessError::Io("x".to_string()).partial_output(), None);
    }
}
