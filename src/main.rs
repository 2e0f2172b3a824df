//! Demo host for the interception agent.
//!
//! # Startup Sequence
//! ```text
//! --config file (optional, raw TOML)
//!     → logging, metrics
//!     → agent::install (transformer strategy, trace context)
//!     → HostValve defined (intercepted if an aspect targets it)
//!     → GET /hello/{name} served until Ctrl+C
//!     → trace pipeline flushed and shut down
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use intercept_agent::config::{self, AgentConfig};
use intercept_agent::demo::{self, AppState, GreetingService, HostValve};
use intercept_agent::observability::{logging, metrics};
use intercept_agent::Instrumentation;

#[derive(Parser)]
#[command(name = "intercept-agent")]
#[command(about = "Demo host served through the interception agent", long_about = None)]
struct Args {
    /// Agent configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address of the demo HTTP endpoint.
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let raw = match &args.config {
        Some(path) => std::fs::read_to_string(path)?,
        None => String::new(),
    };
    let bootstrap = config::parse_config(&raw).unwrap_or_else(|_| AgentConfig::default());

    logging::init_logging(&bootstrap.logging)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "intercept-agent starting");

    if bootstrap.metrics.enabled {
        match bootstrap.metrics.socket_addr() {
            Some(addr) => metrics::init_metrics(addr)?,
            None => tracing::error!(
                bind_address = %bootstrap.metrics.bind_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let instrumentation = Instrumentation::new();
    let agent = intercept_agent::install(&raw, &instrumentation);

    let valve = HostValve::define(&instrumentation, GreetingService::default())?;
    tracing::info!(
        module = %valve.host_module().name(),
        enhanced = ?valve.host_module().enhanced_members(),
        strategy = %agent.strategy(),
        "Host modules defined"
    );

    let listener = TcpListener::bind(args.bind).await?;
    demo::serve(listener, AppState::new(valve)).await?;

    if let Err(e) = agent.shutdown() {
        tracing::warn!(error = %e, "Trace pipeline did not shut down cleanly");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
