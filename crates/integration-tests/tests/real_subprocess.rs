//! Sessions driving real child processes
//!
//! The diagnostic tools are swapped for small `sh` scripts so the process
//! adapter, stream policies and orchestrator run end to end.

#![cfg(unix)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netdiag_core::application::{
    DiagnosticsContext, DiagnosticsOrchestrator, OsFamily, ProbeSet, UpdateChannel,
};
use netdiag_core::domain::{DiagnosticEvent, ProbeKind, SessionSummary, StepOutcome, UpdateType};
use netdiag_core::port::http_client::mocks::MockHttpProber;
use netdiag_core::port::id_provider::SequentialIdProvider;
use netdiag_core::port::time_provider::SystemTimeProvider;
use netdiag_core::port::{CommandSpec, LineStream, ProcessError, ProcessRunner, StreamPolicy};
use netdiag_infra_system::SubprocessRunner;
use tokio::time::timeout;
use tokio_test::assert_ok;

const TEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Replaces each tool with a shell script; tools without a script are missing
struct ScriptedTools {
    inner: SubprocessRunner,
    scripts: HashMap<&'static str, &'static str>,
}

impl ScriptedTools {
    fn new(scripts: &[(&'static str, &'static str)]) -> Self {
        Self {
            inner: SubprocessRunner::new().with_grace_period(Duration::from_millis(200)),
            scripts: scripts.iter().copied().collect(),
        }
    }

    fn rewrite(&self, command: &CommandSpec) -> CommandSpec {
        match self.scripts.get(command.program.as_str()) {
            Some(script) => CommandSpec::new("sh", ["-c", *script]),
            None => CommandSpec::new(
                format!("netdiag-test-missing-{}", command.program),
                Vec::<String>::new(),
            ),
        }
    }
}

#[async_trait]
impl ProcessRunner for ScriptedTools {
    async fn run_captured(&self, command: &CommandSpec) -> Result<String, ProcessError> {
        self.inner.run_captured(&self.rewrite(command)).await
    }

    fn run_streamed(&self, command: CommandSpec, policy: StreamPolicy) -> LineStream {
        self.inner.run_streamed(self.rewrite(&command), policy)
    }
}

async fn run_session(tools: ScriptedTools) -> (Vec<DiagnosticEvent>, SessionSummary) {
    let orch = DiagnosticsOrchestrator::new(
        DiagnosticsContext::default(),
        ProbeSet::new(
            Arc::new(tools),
            Arc::new(MockHttpProber::new()),
            "edge.example.test",
        )
        .with_os_family(OsFamily::Unix),
        UpdateChannel::default(),
        Arc::new(SystemTimeProvider),
        Arc::new(SequentialIdProvider::default()),
    )
    .with_step_pause(Duration::ZERO);

    let mut sub = orch.channel().subscribe();
    let handle = orch.start();
    let events = timeout(TEST_TIMEOUT, sub.collect_until_done())
        .await
        .unwrap();
    let summary = assert_ok!(handle.wait().await);
    (events, summary)
}

/// Data of the updates that follow the STEP_START of `kind`
fn step_data(events: &[DiagnosticEvent], kind: ProbeKind) -> Vec<(UpdateType, String)> {
    events
        .iter()
        .skip_while(|e| {
            !(e.update.update_type == UpdateType::StepStart
                && e.update.data.lines().any(|line| line == kind.label()))
        })
        .skip(1)
        .take_while(|e| !matches!(e.update.update_type, UpdateType::StepStart | UpdateType::Done))
        .map(|e| (e.update.update_type, e.update.data.clone()))
        .collect()
}

#[tokio::test]
async fn test_ping_lines_stream_and_nonzero_exit_is_tolerated() {
    let tools = ScriptedTools::new(&[(
        "ping",
        "echo 'PING edge (10.0.0.1)'; echo; echo 'seq=1 time=1.0 ms'; echo 'seq=2 time=1.1 ms'; exit 1",
    )]);
    let (events, summary) = run_session(tools).await;

    let ping = step_data(&events, ProbeKind::Ping);
    assert_eq!(
        ping,
        [
            (UpdateType::StepProgress, "PING edge (10.0.0.1)\n".to_string()),
            (UpdateType::StepProgress, "seq=1 time=1.0 ms\n".to_string()),
            (UpdateType::StepProgress, "seq=2 time=1.1 ms\n".to_string()),
            (UpdateType::StepProgress, "\n".to_string()),
        ]
    );
    assert_eq!(summary.step(ProbeKind::Ping).unwrap().outcome, StepOutcome::Succeeded);
}

#[tokio::test]
async fn test_traceroute_without_output_forwards_stderr_then_fails() {
    let tools = ScriptedTools::new(&[(
        "traceroute",
        "echo 'traceroute: unknown host edge.example.test' >&2; exit 2",
    )]);
    let (events, summary) = run_session(tools).await;

    let traceroute = step_data(&events, ProbeKind::Traceroute);
    assert_eq!(traceroute.len(), 2);
    assert_eq!(
        traceroute[0],
        (
            UpdateType::StepProgress,
            "STDERR: traceroute: unknown host edge.example.test\n".to_string()
        )
    );
    assert_eq!(traceroute[1].0, UpdateType::Error);
    assert!(traceroute[1].1.starts_with("Error: traceroute command failed"));
    assert_eq!(
        summary.step(ProbeKind::Traceroute).unwrap().outcome,
        StepOutcome::Failed
    );
}

#[tokio::test]
async fn test_dns_output_captured_and_missing_tool_reported() {
    let tools = ScriptedTools::new(&[("dig", "echo ';; ANSWER SECTION:'; echo 'edge. 60 IN A 10.0.0.1'")]);
    let (events, _) = run_session(tools).await;

    let dns = step_data(&events, ProbeKind::DnsSystem);
    assert_eq!(
        dns,
        [(
            UpdateType::StepProgress,
            ";; ANSWER SECTION:\nedge. 60 IN A 10.0.0.1\n\n".to_string()
        )]
    );

    // ping has no script, so the binary does not exist
    let ping = step_data(&events, ProbeKind::Ping);
    assert_eq!(ping.len(), 1);
    assert_eq!(ping[0].0, UpdateType::Error);
    assert!(ping[0].1.contains("netdiag-test-missing-ping"));
}
