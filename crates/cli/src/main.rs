//! Railway NetDiag CLI - runs the network diagnostics sequence in a terminal

mod logging;
mod render;
mod report;
mod settings;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use netdiag_core::application::constants::TARGET_ENDPOINT;
use netdiag_core::application::{DiagnosticsContext, DiagnosticsOrchestrator, ProbeSet, UpdateChannel};
use netdiag_core::port::id_provider::UuidProvider;
use netdiag_core::port::time_provider::{SystemTimeProvider, TimeProvider};
use netdiag_infra_http::ReqwestProber;
use netdiag_infra_system::SubprocessRunner;

use render::{OutputMode, Renderer};
use report::{default_report_name, save_report, summary_table, Report};
use settings::Settings;

#[derive(Parser)]
#[command(name = "railway-netdiag")]
#[command(about = "Network diagnostics against Railway's edge", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full diagnostics sequence (default)
    Run(RunArgs),

    /// Print the application version
    Version,
}

#[derive(Args, Default)]
struct RunArgs {
    /// Print every update as a JSON line
    #[arg(long)]
    json: bool,

    /// Save the report to PATH (default: railway-netdiag-<timestamp>.txt)
    #[arg(long, value_name = "PATH")]
    save: Option<Option<PathBuf>>,

    /// Print a per-step outcome table at the end
    #[arg(long)]
    summary: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let settings = Settings::load().context("Failed to load settings")?;

    // 2. Initialize logging
    let _log_guard = logging::init(&settings)?;

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run(args, &settings).await,
        Commands::Version => {
            let context = DiagnosticsContext::default();
            println!("{} {}", context.app_name, context.version);
            Ok(())
        }
    }
}

async fn run(args: RunArgs, settings: &Settings) -> Result<()> {
    // DI wiring
    let time_provider = Arc::new(SystemTimeProvider);
    let http = ReqwestProber::new().context("Failed to create HTTP client")?;
    let probes = ProbeSet::new(
        Arc::new(SubprocessRunner::new()),
        Arc::new(http),
        TARGET_ENDPOINT,
    );
    let channel = UpdateChannel::new(settings.channel_capacity);
    let orchestrator = DiagnosticsOrchestrator::new(
        DiagnosticsContext::default(),
        probes,
        channel.clone(),
        time_provider.clone(),
        Arc::new(UuidProvider),
    );

    // Subscribe before starting: the channel has no replay
    let subscription = channel.subscribe();
    let handle = orchestrator.start();
    let mut subscription = subscription.for_session(handle.session_id());
    info!(session_id = %handle.session_id(), target = TARGET_ENDPOINT, "Diagnostics started");

    let mode = if args.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };
    let mut renderer = Renderer::new(io::stdout(), io::stderr(), mode);
    let mut report = Report::default();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cancel_requested = false;

    loop {
        tokio::select! {
            _ = &mut ctrl_c, if !cancel_requested => {
                warn!(session_id = %handle.session_id(), "Interrupted, cancelling diagnostics");
                handle.cancel();
                cancel_requested = true;
            }
            event = subscription.recv() => {
                let Some(event) = event else { break };
                report.push(&event);
                renderer.render(&event).context("Failed to write output")?;
                if event.update.is_terminal() {
                    break;
                }
            }
        }
    }

    let summary = handle.wait().await.context("Diagnostics session failed")?;
    info!(
        session_id = %summary.session_id,
        failed_steps = summary.failed_count(),
        cancelled = summary.cancelled,
        "Diagnostics finished"
    );

    if let Some(path) = args.save {
        let path =
            path.unwrap_or_else(|| PathBuf::from(default_report_name(time_provider.now())));
        save_report(&path, report.as_str())?;
        eprintln!(
            "{}",
            format!("✓ Report saved to {}", path.display()).green().bold()
        );
    }

    if args.summary {
        println!();
        println!("{}", summary_table(&summary));
    }

    Ok(())
}
