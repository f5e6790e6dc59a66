// Parley - JSON-RPC tool server that asks a human for input
// Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use parley::broker::{CorrelationBroker, DisconnectedSink, OutOfBandSink};
use parley::config::{load_config, Config};
use parley::dialog::{backend_for, InputResolver, Platform};
use parley::lifecycle::{default_endpoint_path, EndpointFile};
use parley::protocol::{Dispatcher, StdioServer};
use parley::tools::ToolRegistry;
use parley::ui_link::UiLink;

#[derive(Parser, Debug)]
#[command(name = "parley", version, about = "JSON-RPC tool server that asks a human for input")]
struct Cli {
    /// Config file (default: ~/.parley/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds to wait for the UI host before falling back
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Address the UI host listener binds to
    #[arg(long)]
    ui_addr: Option<String>,

    /// Do not listen for a UI host; ask through native dialogs only
    #[arg(long)]
    no_ui_host: bool,

    /// Do not open native dialogs when the UI host cannot answer
    #[arg(long)]
    no_fallback: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(secs) = self.timeout_secs {
            config.broker.timeout_secs = secs;
        }
        if let Some(addr) = &self.ui_addr {
            config.ui_host.bind_address = addr.clone();
        }
        if self.no_ui_host {
            config.ui_host.enabled = false;
        }
        if self.no_fallback {
            config.dialog.enabled = false;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

/// Logs go to stderr: stdout carries RPC responses only.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate().context("Invalid command-line overrides")?;

    init_logging(&config.logging.level);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting parley");

    // UI host link first: the broker needs its sink
    let (link, sink): (Option<UiLink>, Arc<dyn OutOfBandSink>) = if config.ui_host.enabled {
        UiLink::bind_or_offline(&config.ui_host.bind_address).await
    } else {
        info!("UI host link disabled");
        (None, Arc::new(DisconnectedSink))
    };

    let broker = CorrelationBroker::new(sink, config.broker.timeout());

    let mut endpoint = None;
    let mut link_task = None;
    if let Some(link) = link {
        let address = link.local_addr()?;
        info!(address = %address, "Listening for UI host");
        let path = match &config.ui_host.endpoint_file {
            Some(path) => path.clone(),
            None => default_endpoint_path()?,
        };
        match EndpointFile::publish(path, address) {
            Ok(file) => endpoint = Some(file),
            Err(e) => warn!(error = %format!("{:#}", e), "UI host discovery file not written"),
        }
        link_task = Some(tokio::spawn(link.serve(broker.clone())));
    }

    let dialogs = if config.dialog.enabled {
        let platform = Platform::current();
        let backend = backend_for(&platform);
        if backend.is_none() {
            warn!(platform = ?platform, "No native dialog back-end for this platform");
        }
        backend
    } else {
        None
    };

    let resolver = Arc::new(InputResolver::new(
        broker.clone(),
        dialogs,
        config.broker.timeout(),
        config.dialog.title.clone(),
    ));
    let registry = Arc::new(ToolRegistry::builtin(resolver)?);
    info!(tools = registry.len(), "Tools registered");

    let server = StdioServer::new(Dispatcher::new(registry, broker));
    let reason = server
        .run(tokio::io::stdin(), tokio::io::stdout(), shutdown_signal())
        .await;

    if let Some(task) = link_task {
        task.abort();
    }
    if let Some(endpoint) = endpoint {
        if let Err(e) = endpoint.cleanup() {
            warn!(error = %format!("{:#}", e), "Endpoint file cleanup failed");
        }
    }

    info!(reason = ?reason, "Stopped");
    Ok(())
}
