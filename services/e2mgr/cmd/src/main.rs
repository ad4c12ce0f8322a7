//! E2 manager binary.
//!
//! Connects the topology store, the message transport, the setup and
//! reconnection managers and the notification handlers, then runs the
//! receive loop until SIGTERM or SIGINT.

use anyhow::Context;
use clap::Parser;
use e2mgr_handlers::{HandlerDependencies, NotificationHandlerProvider, NotificationManager};
use e2mgr_managers::{DeleteAllManager, RanReconnectionManager, RanSetupManager};
use e2mgr_session::{E2Sessions, Messenger, RmrReceiver, RmrSender, TcpMessenger};
use e2mgr_storage::{open_store, RnibDataService};
use e2mgr_wire::{CborCodec, ProtocolCodec};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod logging;

use config::{ConfigSource, E2ManagerConfig, LoggingConfig};
use logging::E2mgrLogFormatter;

/// How long in-flight notifications may take to drain on shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// E2 manager for RAN nodes
#[derive(Parser, Debug)]
#[command(name = "e2mgr", version, about = "E2 manager for RAN nodes")]
struct Args {
    /// Configuration file path
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Port the message transport listens on
    #[arg(long)]
    rmr_port: Option<u16>,

    /// Address outbound messages are routed to, e.g. 127.0.0.1:38000
    #[arg(long)]
    route_address: Option<String>,

    /// Session retention, e.g. 5m
    #[arg(long)]
    session_ttl: Option<humantime::Duration>,

    /// Shut down every RAN node, clear all associations, and exit
    #[arg(long)]
    shutdown_all: bool,
}

impl Args {
    fn apply_to(&self, config: &mut E2ManagerConfig) {
        if let Some(level) = &self.log_level {
            config.logging.log_level = level.clone();
        }
        if let Some(port) = self.rmr_port {
            config.rmr.port = port;
        }
        if let Some(address) = &self.route_address {
            config.rmr.route_address = address.clone();
        }
        if let Some(ttl) = self.session_ttl {
            config.session_ttl_sec = Duration::from(ttl).as_secs().max(1);
        }
    }
}

fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    let level = &logging.log_level;
    let env_filter = EnvFilter::new("info")
        .add_directive(format!("e2mgr={}", level).parse()?)
        .add_directive(format!("ric_e2mgr={}", level).parse()?)
        .add_directive(format!("e2mgr_wire={}", level).parse()?)
        .add_directive(format!("e2mgr_storage={}", level).parse()?)
        .add_directive(format!("e2mgr_session={}", level).parse()?)
        .add_directive(format!("e2mgr_managers={}", level).parse()?)
        .add_directive(format!("e2mgr_handlers={}", level).parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .event_format(E2mgrLogFormatter::new("E2Manager", logging.format))
        .init();
    Ok(())
}

/// Sweep often enough that nothing outlives its TTL by more than a tenth
fn eviction_interval(ttl: Duration) -> Duration {
    (ttl / 10).max(Duration::from_secs(1))
}

async fn wait_for_signal() -> anyhow::Result<()> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("failed to install SIGTERM handler")?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
        .context("failed to install SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("Received SIGINT, shutting down"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (mut config, source) = E2ManagerConfig::load_from_file(&args.config);
    args.apply_to(&mut config);

    init_logging(&config.logging)?;
    info!("Starting e2mgr v{}", env!("CARGO_PKG_VERSION"));
    match &source {
        ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
        ConfigSource::Defaults { reason } => warn!("{}, using defaults", reason),
    }
    config.validate().context("invalid configuration")?;

    // Topology store
    let store = open_store(config.store_mode())
        .await
        .context("failed to open rnib")?;
    let rnib = RnibDataService::new(
        store,
        config.max_rnib_connection_attempts,
        config.rnib_retry_interval(),
    );
    component_info!(
        "rnib",
        "Topology store ready ({:?}, {} attempts, {:?} retry interval)",
        config.rnib.backend,
        config.max_rnib_connection_attempts,
        config.rnib_retry_interval()
    );

    // Message transport
    let messenger: Arc<dyn Messenger> = Arc::new(
        TcpMessenger::init(
            config.rmr_listen_addr(),
            config.route_addr()?,
            config.rmr.max_msg_size,
        )
        .await
        .context("failed to initialize message transport")?,
    );
    let sender = RmrSender::new(messenger.clone());

    if args.shutdown_all {
        let manager = DeleteAllManager::new(rnib, sender, config.big_red_button_timeout());
        let summary = manager.shutdown_all().await;
        messenger.close().await;
        let summary = summary.context("delete all failed")?;
        component_info!("delete-all", "Finished: {:?}", summary);
        return Ok(());
    }

    // Sessions
    let sessions = E2Sessions::new(config.session_ttl());
    let eviction = sessions.start_eviction_task(eviction_interval(config.session_ttl()));

    // Managers
    let codec: Arc<dyn ProtocolCodec> = Arc::new(CborCodec);
    let setup = RanSetupManager::new(
        rnib.clone(),
        sender.clone(),
        sessions.clone(),
        codec.as_ref(),
        &config.ric_identity(),
    )
    .context("failed to prepare setup requests")?;
    let reconnection = RanReconnectionManager::new(
        rnib.clone(),
        Arc::new(setup),
        config.max_rnib_connection_attempts,
        config.rnib_retry_interval(),
    );

    // Handlers
    let provider = NotificationHandlerProvider::new(HandlerDependencies {
        rnib,
        sender,
        sessions,
        codec,
        reconnection,
    });
    component_info!(
        "handlers",
        "Registered handlers for message types {:?}",
        provider.message_types()
    );
    let notifications = Arc::new(NotificationManager::new(
        Arc::new(provider),
        config.notification_response_buffer,
        config.max_concurrent_handlers,
    ));

    // Receive loop
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let receiver = RmrReceiver::new(messenger.clone(), notifications.clone());
    let receive_loop = tokio::spawn(async move { receiver.listen_and_handle(shutdown_rx).await });
    info!("e2mgr started");

    wait_for_signal().await?;

    shutdown_tx.send_replace(true);
    messenger.close().await;
    if tokio::time::timeout(DRAIN_TIMEOUT, notifications.shutdown())
        .await
        .is_err()
    {
        component_warn!("handlers", "Notification handlers did not drain within {:?}", DRAIN_TIMEOUT);
    }
    match receive_loop.await {
        Ok(stats) => component_info!("rmr", "Receive loop finished: {:?}", stats),
        Err(e) => component_error!("rmr", "Receive loop task failed: {}", e),
    }
    eviction.abort();

    info!("e2mgr shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "e2mgr",
            "--log-level",
            "debug",
            "--rmr-port",
            "4801",
            "--session-ttl",
            "2m",
        ]);
        let mut config = E2ManagerConfig::default();
        args.apply_to(&mut config);

        assert_eq!(config.logging.log_level, "debug");
        assert_eq!(config.rmr.port, 4801);
        assert_eq!(config.session_ttl(), Duration::from_secs(120));
        assert_eq!(config.rmr.route_address, "127.0.0.1:38000");
        assert!(!args.shutdown_all);
    }

    #[test]
    fn test_eviction_interval() {
        assert_eq!(eviction_interval(Duration::from_secs(300)), Duration::from_secs(30));
        assert_eq!(eviction_interval(Duration::from_secs(2)), Duration::from_secs(1));
    }
}
