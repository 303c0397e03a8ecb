//! Deposit Watch - real-time deposit monitoring for one wallet address
//!
//! Usage: deposit-watch [--address ADDR] [--user-id UUID]
//!
//! Loads the wallet registry for the active user, then watches the address
//! until Ctrl-C. On unix, SIGHUP triggers a manual snapshot refresh.

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use deposit_watch::config::LoggingConfig;
use deposit_watch::notifications::AlertLevel;
use deposit_watch::{
    load_default_network, AppConfig, BackendClient, MonitoringController, Notifier,
    SnapshotFetcher, WalletRegistry, WsConnector,
};

#[derive(Debug, Default)]
struct CliArgs {
    address: Option<String>,
    user_id: Option<Uuid>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--address" => {
                if i + 1 < args.len() {
                    cli.address = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    eprintln!("ERROR: --address requires a value");
                    std::process::exit(1);
                }
            }
            "--user-id" => {
                if i + 1 < args.len() {
                    match Uuid::parse_str(&args[i + 1]) {
                        Ok(id) => cli.user_id = Some(id),
                        Err(e) => {
                            eprintln!("ERROR: invalid --user-id: {}", e);
                            std::process::exit(1);
                        }
                    }
                    i += 2;
                } else {
                    eprintln!("ERROR: --user-id requires a value");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                println!("Usage: deposit-watch [--address ADDR] [--user-id UUID]");
                println!("  --address ADDR   Wallet address to monitor (default: monitor.wallet_address)");
                println!("  --user-id UUID   User whose wallets are loaded (default: monitor.user_id)");
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                std::process::exit(1);
            }
        }
    }

    cli
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = parse_args();

    // Load configuration
    let config = load_config()?;
    init_tracing(&config.logging);

    tracing::info!("Starting Deposit Watch v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        base_url = %config.api.base_url,
        push_url = %config.api.push_base_url(),
        "Configuration loaded"
    );

    let client = BackendClient::new(&config.api)?;

    match client.health().await {
        Ok(true) => tracing::info!("Backend API online"),
        Ok(false) => tracing::warn!("Backend API reports unhealthy"),
        Err(e) => tracing::warn!(error = %e, "Backend API offline"),
    }

    let notifier = Notifier::default();
    let registry = Arc::new(WalletRegistry::new());
    let source = Arc::new(SnapshotFetcher::new(client.clone(), registry.clone()));
    let connector = Arc::new(WsConnector::new(config.api.clone()));
    let controller = Arc::new(MonitoringController::from_config(
        &config,
        connector,
        source,
        notifier.clone(),
    ));

    match load_default_network(&client).await {
        Ok(network) => controller.set_default_network(network),
        Err(e) => tracing::warn!(error = %e, "Failed to load blockchain networks"),
    }

    let user_id = cli.user_id.or(config.monitor.user_id);
    if let Err(e) = registry.load_for_user(&client, user_id).await {
        tracing::warn!(error = %e, reason = e.reason(), "Wallet registry not loaded");
    }

    let address = cli
        .address
        .or_else(|| config.monitor.wallet_address.clone())
        .unwrap_or_default();

    let mut notices = notifier.subscribe();
    let mut states = controller.subscribe_state();

    if let Err(e) = controller.start(&address).await {
        return Err(anyhow::anyhow!("Monitoring not started: {}", e));
    }
    for line in controller.render_deposits() {
        tracing::info!(deposit = %line, "Snapshot");
    }

    #[cfg(unix)]
    spawn_refresh_on_sighup(controller.clone());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, stopping");
                controller.stop();
                break;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                tracing::info!(state = %state, "Connection state changed");
            }
            notice = notices.recv() => match notice {
                Ok(notice) => {
                    match notice.level() {
                        AlertLevel::Error => tracing::error!(level = %notice.level(), "{}", notice.format_message()),
                        AlertLevel::Warning => tracing::warn!(level = %notice.level(), "{}", notice.format_message()),
                        _ => tracing::info!(level = %notice.level(), "{}", notice.format_message()),
                    }
                    if let Some(latest) = controller.feed_entries().first() {
                        tracing::debug!(entry = %latest.render(), "Latest feed entry");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notice subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    for line in controller.render_feed() {
        tracing::info!(entry = %line, "Feed");
    }
    for line in controller.render_deposits() {
        tracing::info!(deposit = %line, "Snapshot");
    }

    tracing::info!("Deposit Watch stopped");
    Ok(())
}

#[cfg(unix)]
fn spawn_refresh_on_sighup(controller: Arc<MonitoringController>) {
    tokio::spawn(async move {
        let mut sighup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to register SIGHUP handler");
                return;
            }
        };

        loop {
            sighup.recv().await;
            tracing::info!("Received SIGHUP, refreshing deposit snapshot");

            match controller.refresh().await {
                Ok(count) => tracing::info!(deposit_count = count, "Manual refresh completed"),
                Err(e) => tracing::warn!(error = %e, "Manual refresh failed"),
            }
        }
    });
}

/// Initialize tracing subscriber
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "deposit_watch=info".into());

    if logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Load and validate configuration
fn load_config() -> anyhow::Result<AppConfig> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

    Ok(config)
}
