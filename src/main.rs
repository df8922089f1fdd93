use std::net::SocketAddrV4;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use netflow_collector::clock::SystemClock;
use netflow_collector::collector::Collector;
use netflow_collector::config::AppConfig;
use netflow_collector::emit::{Emitter, UdpEmitter};
use netflow_collector::exclude::ExclusionSet;
use netflow_collector::{ingest, janitor};

/// Passive NetFlow v5/v7 collector: sharded flow aggregation, age-based
/// eviction, JSON emission.
#[derive(Parser, Debug)]
#[command(name = "netflow-collector", version, about)]
struct Cli {
    /// UDP port to listen for NetFlow datagrams on. Overrides the config
    /// file's `listen_port` when given.
    #[arg(short, long)]
    listen_port: Option<u16>,

    /// UDP port evicted flow summaries are emitted to. Overrides the
    /// config file's `emit_port` when given.
    #[arg(short, long)]
    emit_port: Option<u16>,

    /// Path to a TOML configuration file (optional).
    #[arg(short, long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netflow_collector=info".into()),
        )
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal error during startup");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    info!(version = env!("CARGO_PKG_VERSION"), "starting netflow collector");

    let mut app_config = if let Some(ref path) = cli.config {
        AppConfig::from_file(path).with_context(|| format!("loading config file {path}"))?
    } else {
        AppConfig::default()
    };
    if let Some(port) = cli.listen_port {
        app_config.listen_port = port;
    }
    if let Some(port) = cli.emit_port {
        app_config.emit_port = port;
    }

    let mut exclusions = ExclusionSet::new();
    for range in &app_config.exclude {
        exclusions
            .add(u32::from(range.start), u32::from(range.end))
            .with_context(|| format!("initial exclusion range {}-{}", range.start, range.end))?;
    }
    info!(ranges = exclusions.len(), "exclusion set initialized");

    let collector = Collector::new(app_config.shards, exclusions);

    let listen_addr = SocketAddrV4::new(app_config.listen_addr, app_config.listen_port);
    let listen_socket = ingest::bind_listen_socket(listen_addr, app_config.recv_buffer_bytes)
        .with_context(|| format!("binding listen socket on {listen_addr}"))?;
    info!(addr = %listen_addr, "listening for netflow datagrams");

    let emit_src = SocketAddrV4::new(app_config.emit_src_addr, 0);
    let emit_dst = SocketAddrV4::new(app_config.emit_dst_addr, app_config.emit_port);
    let emitter: Arc<dyn Emitter> = Arc::new(
        UdpEmitter::bind(emit_src, emit_dst, app_config.send_buffer_bytes)
            .with_context(|| format!("binding emit socket towards {emit_dst}"))?,
    );
    info!(addr = %emit_dst, "emitting evicted flow summaries");

    let clock = Arc::new(SystemClock);
    let shutdown = Arc::new(AtomicBool::new(false));

    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            info!("shutdown signal received");
            shutdown.store(true, Ordering::Relaxed);
        })
        .context("installing signal handler")?;
    }

    let ingest_handle = {
        let collector = Arc::clone(&collector);
        let shutdown = Arc::clone(&shutdown);
        let clock: Arc<dyn netflow_collector::clock::Clock> = Arc::clone(&clock) as _;
        std::thread::Builder::new()
            .name("netflow-ingest".into())
            .spawn(move || ingest::run_ingest_loop(collector, listen_socket, shutdown, clock))
            .context("spawning ingest thread")?
    };

    let janitor_handle = {
        let collector = Arc::clone(&collector);
        let shutdown = Arc::clone(&shutdown);
        let clock: Arc<dyn netflow_collector::clock::Clock> = Arc::clone(&clock) as _;
        let min_flow_age_secs = app_config.min_flow_age_secs;
        let max_flow_age_secs = app_config.max_flow_age_secs;
        let sweep_interval_secs = app_config.sweep_interval_secs;
        let stats_rate_secs = app_config.stats_rate_secs;
        std::thread::Builder::new()
            .name("netflow-janitor".into())
            .spawn(move || {
                janitor::run_janitor_loop(
                    collector,
                    emitter,
                    clock,
                    shutdown,
                    min_flow_age_secs,
                    max_flow_age_secs,
                    sweep_interval_secs,
                    stats_rate_secs,
                )
            })
            .context("spawning janitor thread")?
    };

    ingest_handle.join().expect("ingest thread panicked");
    janitor_handle.join().expect("janitor thread panicked");

    info!("shutdown complete");
    Ok(())
}
