// Subprocess runner implementation
// reason: tokio::process for async pipes, futures::stream for lazy line streams
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use netdiag_core::application::constants::GRACEFUL_SHUTDOWN_TIMEOUT;
use netdiag_core::port::process_runner::tool_missing_placeholder;
use netdiag_core::port::{
    CommandSpec, ExitSummary, LineStream, OutputLine, ProcessError, ProcessRunner, StreamPolicy,
};

type StreamItem = Result<OutputLine, ProcessError>;

/// Subprocess runner
///
/// Spawns the diagnostic tools as child processes. Children never outlive the
/// call or stream that started them: they are reaped on every path and
/// terminated when a stream is dropped early.
pub struct SubprocessRunner {
    grace_period: Duration,
}

impl SubprocessRunner {
    pub fn new() -> Self {
        Self {
            grace_period: GRACEFUL_SHUTDOWN_TIMEOUT,
        }
    }

    /// Time a child gets between SIGTERM and SIGKILL when a stream is abandoned
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    fn command(spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for SubprocessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessRunner for SubprocessRunner {
    async fn run_captured(&self, command: &CommandSpec) -> Result<String, ProcessError> {
        info!(command = %command, "Starting captured execution");

        let output = match Self::command(command).output().await {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(program = %command.program, "Tool not installed");
                return Ok(tool_missing_placeholder(&command.program));
            }
            Err(e) => {
                return Err(ProcessError::Spawn {
                    program: command.program.clone(),
                    message: e.to_string(),
                })
            }
        };

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        info!(
            command = %command,
            exit_code = ?output.status.code(),
            output_bytes = text.len(),
            "Captured execution completed"
        );

        if output.status.success() {
            Ok(text)
        } else {
            Err(ProcessError::ExitStatus {
                status: output.status.to_string(),
                output: text,
            })
        }
    }

    fn run_streamed(&self, command: CommandSpec, policy: StreamPolicy) -> LineStream {
        let state = StreamState::Pending {
            command,
            policy,
            grace_period: self.grace_period,
        };
        stream::unfold(state, next_item).boxed()
    }
}

enum StreamState {
    /// Not spawned yet: nothing happens until the stream is polled
    Pending {
        command: CommandSpec,
        policy: StreamPolicy,
        grace_period: Duration,
    },
    Running(Box<RunningChild>),
    /// Stdout closed and the child was reaped; trailing items remain
    Finishing(VecDeque<StreamItem>),
    Done,
}

async fn next_item(mut state: StreamState) -> Option<(StreamItem, StreamState)> {
    loop {
        state = match state {
            StreamState::Pending {
                command,
                policy,
                grace_period,
            } => match RunningChild::spawn(command, policy, grace_period) {
                Ok(running) => StreamState::Running(Box::new(running)),
                Err(err) => return Some((Err(err), StreamState::Done)),
            },
            StreamState::Running(mut running) => match running.next_line().await {
                Ok(Some(line)) => {
                    return Some((Ok(OutputLine::stdout(line)), StreamState::Running(running)))
                }
                Ok(None) => StreamState::Finishing(running.finish().await),
                Err(err) => match running.recover_read_error(&err).await {
                    Some(tail) => StreamState::Finishing(tail),
                    None => {
                        running.kill_and_reap().await;
                        return Some((Err(err), StreamState::Done));
                    }
                },
            },
            StreamState::Finishing(mut tail) => {
                return tail
                    .pop_front()
                    .map(|item| (item, StreamState::Finishing(tail)))
            }
            StreamState::Done => return None,
        };
    }
}

/// A spawned child whose stdout is being read line by line
struct RunningChild {
    program: String,
    /// `None` once reaped
    child: Option<Child>,
    stdout: BufReader<ChildStdout>,
    /// Drains stderr concurrently so a chatty child cannot block on a full pipe
    stderr: Option<JoinHandle<String>>,
    policy: StreamPolicy,
    first_output_deadline: Option<Instant>,
    produced: usize,
    grace_period: Duration,
}

impl RunningChild {
    fn spawn(
        command: CommandSpec,
        policy: StreamPolicy,
        grace_period: Duration,
    ) -> Result<Self, ProcessError> {
        info!(command = %command, "Starting streamed execution");

        let mut child = SubprocessRunner::command(&command)
            .spawn()
            .map_err(|e| ProcessError::Spawn {
                program: command.program.clone(),
                message: e.to_string(),
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProcessError::Io("stdout was not captured".to_string()))?;

        let stderr = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                if let Err(e) = pipe.read_to_end(&mut buf).await {
                    debug!(error = %e, "Reading stderr failed");
                }
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        Ok(Self {
            program: command.program,
            child: Some(child),
            stdout: BufReader::new(stdout),
            stderr,
            first_output_deadline: policy.first_output_timeout.map(|t| Instant::now() + t),
            policy,
            produced: 0,
            grace_period,
        })
    }

    /// Next accepted stdout line, or `None` at end of output
    async fn next_line(&mut self) -> Result<Option<String>, ProcessError> {
        loop {
            let deadline = self.first_output_deadline.filter(|_| self.produced == 0);
            let read = match deadline {
                Some(deadline) => {
                    match tokio::time::timeout_at(deadline, read_line_lossy(&mut self.stdout))
                        .await
                    {
                        Ok(read) => read,
                        Err(_) => {
                            warn!(program = %self.program, "No output before deadline");
                            return Err(ProcessError::NoOutputTimeout(
                                self.policy.first_output_timeout.unwrap_or_default(),
                            ));
                        }
                    }
                }
                None => read_line_lossy(&mut self.stdout).await,
            };

            match read.map_err(|e| ProcessError::Io(e.to_string()))? {
                Some(line) if self.policy.accepts(&line) => {
                    self.produced += 1;
                    return Ok(Some(line));
                }
                Some(_) => continue,
                None => return Ok(None),
            }
        }
    }

    /// Reap the child and judge the run by the stream policy
    async fn finish(&mut self) -> VecDeque<StreamItem> {
        let mut tail = VecDeque::new();

        let status = match self.child.take() {
            Some(mut child) => child.wait().await,
            None => Err(io::Error::new(io::ErrorKind::Other, "child already reaped")),
        };
        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                tail.push_back(Err(ProcessError::Io(e.to_string())));
                return tail;
            }
        };

        let exit = ExitSummary {
            success: status.success(),
            description: status.to_string(),
        };
        let completion = self.policy.complete(self.produced, &exit, &stderr);

        info!(
            program = %self.program,
            exit_code = ?status.code(),
            lines = self.produced,
            failed = completion.error.is_some(),
            "Streamed execution completed"
        );

        tail.extend(completion.stderr_line.map(Ok));
        tail.extend(completion.error.map(Err));
        tail
    }

    /// Settle a stdout read failure through the stream policy
    ///
    /// Returns `None` when the failure must surface as the stream's error.
    async fn recover_read_error(&mut self, err: &ProcessError) -> Option<VecDeque<StreamItem>> {
        if !matches!(err, ProcessError::Io(_)) || !self.policy.tolerates_read_error(self.produced) {
            return None;
        }
        warn!(
            program = %self.program,
            lines = self.produced,
            error = %err,
            "Stdout unreadable after output, stopping child"
        );
        if let Some(child) = self.child.as_mut() {
            if let Err(e) = child.kill().await {
                warn!(program = %self.program, error = %e, "Failed to kill child process");
            }
        }
        Some(self.finish().await)
    }

    async fn kill_and_reap(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                warn!(program = %self.program, error = %e, "Failed to kill child process");
            }
        }
        if let Some(handle) = self.stderr.take() {
            handle.abort();
        }
    }
}

impl Drop for RunningChild {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Some(handle) = self.stderr.take() {
            handle.abort();
        }
        // Already exited: dropping reaps nothing further
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        debug!(program = %self.program, "Stream dropped while child running, terminating");
        crate::termination::terminate_in_background(child, self.grace_period);
    }
}

/// Read one line, tolerating invalid UTF-8 and stripping `\n` / `\r\n`
async fn read_line_lossy(reader: &mut BufReader<ChildStdout>) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}
