//! MIDI Matrix - multi-port MIDI router
//!
//! Opens the configured ports, runs the polling cycle on a short interval and
//! drives the front panel from an interactive console.

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam::channel::Sender;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use midi_matrix::cli::{self, ConsoleCommand};
use midi_matrix::config::{AppConfig, ConfigWatcher, InputKind, OutputConfig};
use midi_matrix::display::ConsoleDisplay;
use midi_matrix::input::{ButtonClassifier, EncoderDecoder, PanelCommand, PanelSampler};
use midi_matrix::paths::AppPaths;
use midi_matrix::ports::{midi_io, MidiSink, MidirByteInput, MidirMessageInput, MidirOutput};
use midi_matrix::remote::RemoteListener;
use midi_matrix::router::{InputSource, Router, RoutingEngine};
use midi_matrix::selection::SelectionController;

/// MIDI Matrix - route MIDI between ports through a live-editable matrix
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Run without the interactive front panel
    #[arg(long)]
    no_panel: bool,

    /// Also write logs to a daily rolling file in the logs directory
    #[arg(long)]
    log_file: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let paths = AppPaths::resolve(args.config.as_deref());
    paths.ensure_directories()?;

    let log_dir = args.log_file.then_some(paths.logs_dir.as_path());
    let _log_guard = init_logging(&args.log_level, log_dir)?;

    if args.list_ports {
        midi_io::print_ports();
        return Ok(());
    }

    info!("Starting MIDI Matrix v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", paths.config.display());

    let (config_watcher, config) = ConfigWatcher::new(&paths.config_str()).await?;
    info!("Configuration loaded with hot-reload enabled");

    let (router, panel_tx) = build_router(&config, !args.no_panel)?;

    let (console_tx, console_rx) = mpsc::unbounded_channel();
    if let Some(panel_tx) = &panel_tx {
        cli::spawn_repl(panel_tx.clone(), console_tx).context("Failed to start front panel")?;
        info!("Front panel ready, type 'help' for commands");
    } else {
        drop(console_tx);
    }

    run_app(router, config, config_watcher, console_rx, panel_tx).await?;

    info!("MIDI Matrix shutdown complete");
    Ok(())
}

/// Open every configured port and assemble the router
fn build_router(config: &AppConfig, with_panel: bool) -> Result<(Router, Option<Sender<PanelCommand>>)> {
    let mut inputs = Vec::with_capacity(config.ports.inputs.len());
    for input in &config.ports.inputs {
        let source = match input.kind {
            InputKind::Bytes => InputSource::bytes(Box::new(
                MidirByteInput::open(&input.port)
                    .with_context(|| format!("Failed to open input '{}'", input.name))?,
            )),
            InputKind::Passthrough => InputSource::passthrough(Box::new(
                MidirByteInput::open_raw(&input.port)
                    .with_context(|| format!("Failed to open input '{}'", input.name))?,
            )),
            InputKind::Messages => InputSource::messages(Box::new(
                MidirMessageInput::open(&input.port)
                    .with_context(|| format!("Failed to open input '{}'", input.name))?,
            )),
        };
        info!("Input {} '{}' ({:?})", inputs.len(), input.name, input.kind);
        inputs.push(source);
    }

    let open_sinks = |configs: &[OutputConfig]| -> Result<Vec<Box<dyn MidiSink>>> {
        configs
            .iter()
            .map(|output| {
                let sink = MidirOutput::open(&output.port)
                    .with_context(|| format!("Failed to open output '{}'", output.name))?;
                Ok(Box::new(sink) as Box<dyn MidiSink>)
            })
            .collect()
    };

    let outputs = open_sinks(&config.ports.outputs)?;
    let mirrors = open_sinks(&config.ports.mirrors)?;
    if !mirrors.is_empty() {
        info!("Mirroring byte-stream inputs to {} transport(s)", mirrors.len());
    }
    let engine = RoutingEngine::new(outputs).with_mirrors(mirrors);

    let display = ConsoleDisplay::new(config.input_labels(), config.output_labels());
    let mut router = Router::new(inputs, engine, Box::new(display));

    if let Some(remote) = &config.remote {
        let listener = RemoteListener::bind(&remote.bind, remote.forward_addr()?)
            .with_context(|| format!("Failed to bind remote control socket {}", remote.bind))?;
        router = router.with_remote(listener);
    }

    let mut panel_tx = None;
    if with_panel {
        let (tx, rx) = crossbeam::channel::unbounded();
        let mut sampler = PanelSampler::new(rx);
        sampler.set_edges_per_detent(config.panel.encoder_threshold);

        let selection = SelectionController::new(
            EncoderDecoder::new(config.panel.encoder_threshold),
            ButtonClassifier::new(config.panel.debounce_ms, config.panel.long_press_ms),
        );
        router = router.with_panel(Box::new(sampler), selection);
        panel_tx = Some(tx);
    }

    Ok((router, panel_tx))
}

async fn run_app(
    mut router: Router,
    mut config: AppConfig,
    mut config_watcher: ConfigWatcher,
    mut console_rx: mpsc::UnboundedReceiver<ConsoleCommand>,
    panel_tx: Option<Sender<PanelCommand>>,
) -> Result<()> {
    let started = Instant::now();
    let mut tick = tokio::time::interval(Duration::from_micros(config.poll_interval_us));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    router.render();
    info!("Routing started");

    loop {
        tokio::select! {
            _ = tick.tick() => {
                router.poll_cycle(started.elapsed().as_millis() as u64);
            }
            Some(command) = console_rx.recv() => match command {
                ConsoleCommand::Show => router.render(),
                ConsoleCommand::Quit => {
                    info!("Quit requested from console");
                    break;
                }
            },
            Some(new_config) = config_watcher.next_config() => {
                if config.requires_restart(&new_config) {
                    warn!("Port, remote or poll interval changes take effect after a restart");
                }
                if new_config.panel != config.panel {
                    let panel = new_config.panel;
                    router.reconfigure_panel(panel.encoder_threshold, panel.debounce_ms, panel.long_press_ms);
                    if let Some(tx) = &panel_tx {
                        let _ = tx.send(PanelCommand::SetDetentEdges(panel.encoder_threshold));
                    }
                    info!("Front panel settings updated");
                    config.panel = panel;
                }
            }
            _ = &mut shutdown => break,
        }
    }

    debug!("Main loop exited");
    Ok(())
}

fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level: {}", level))?;

    let mut guard = None;
    let file_layer = log_dir.map(|dir| {
        let appender = tracing_appender::rolling::daily(dir, "midi-matrix.log");
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);
        guard = Some(worker_guard);
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(writer)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to install CTRL+C signal handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
