use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seedsort_core::{
    create_client, load_config, scheduler::ScanJob, validate_config, Config, DownloadClient,
    ScanService, ScanTrigger, Scheduler, SiteAliasTable, SqliteHistoryStore, StaticSiteRegistry,
    Tagger, TmdbClient, TrackerResolver, Trigger,
};

use seedsort_server::api::create_router;
use seedsort_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_tracing();

    // Determine config path
    let config_path = std::env::var("SEEDSORT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Tagger enabled: {}", config.tagger.enabled);
    info!("History database: {:?}", config.database.path);

    let clients = build_clients(&config);

    // Download history (read-only during scans)
    let history = Arc::new(
        SqliteHistoryStore::new(&config.database.path)
            .context("Failed to open download history")?,
    );
    info!("History store initialized");

    let resolver = TrackerResolver::new(
        SiteAliasTable::new(config.site_aliases.clone()),
        Arc::new(StaticSiteRegistry::new(&config.sites)),
    );
    info!(
        "Site registry: {} sites, {} aliases",
        config.sites.len(),
        config.site_aliases.len()
    );

    let mut tagger = Tagger::new(config.tagger.clone(), resolver, history);
    match &config.tmdb {
        Some(tmdb_config) => match TmdbClient::new(tmdb_config.clone()) {
            Ok(client) => {
                info!("Initializing TMDB client");
                tagger = tagger.with_metadata(Arc::new(client));
            }
            Err(e) => error!("Failed to create TMDB client: {}", e),
        },
        None => info!("TMDB not configured, scans will not set categories"),
    }

    let scans = Arc::new(ScanService::new(Arc::new(tagger), clients));

    // Scheduled scans
    let scheduler = match Trigger::from_config(&config.schedule)
        .context("Invalid schedule configuration")?
    {
        Some(trigger) if config.tagger.enabled => {
            let scheduler = Scheduler::new(trigger);
            scheduler.start(scheduled_scan(Arc::clone(&scans)));
            Some(scheduler)
        }
        Some(_) => {
            info!("Tagger disabled, scheduler not started");
            None
        }
        None => {
            info!("Scheduled scans disabled");
            None
        }
    };

    // One-shot startup scan
    if config.tagger.run_once {
        if config.tagger.enabled {
            let scans = Arc::clone(&scans);
            tokio::spawn(async move {
                match scans.run_scan(ScanTrigger::Startup).await {
                    Ok(report) => info!(
                        "Startup scan finished: {} tagged, {} failed",
                        report.tagged, report.failed
                    ),
                    Err(e) => warn!("Startup scan failed: {}", e),
                }
                info!("run_once consumed; set tagger.run_once = false to skip it on next start");
            });
        } else {
            info!("run_once set but tagger is disabled, skipping startup scan");
        }
    }

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&scans)));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    if let Some(scheduler) = &scheduler {
        info!("Stopping scheduler...");
        scheduler.stop();
    }
    if scans.cancel() {
        info!("Cancelled running scan");
    }

    Ok(())
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` sets the filter; `SEEDSORT_LOG_FORMAT=json` switches to
/// JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    let json = std::env::var("SEEDSORT_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Build one adapter per configured client. A client that cannot be built
/// is logged and left out.
fn build_clients(config: &Config) -> Vec<Arc<dyn DownloadClient>> {
    let mut clients = Vec::new();
    for client_config in &config.clients {
        match create_client(client_config) {
            Ok(client) => {
                info!(
                    "Initializing {} client '{}' at {}",
                    client_config.backend.as_str(), client_config.name, client_config.url
                );
                clients.push(client);
            }
            Err(e) => error!(
                "Failed to create download client '{}': {}",
                client_config.name, e
            ),
        }
    }
    if clients.is_empty() {
        warn!("No download clients available, scans will do nothing");
    }
    clients
}

fn scheduled_scan(scans: Arc<ScanService>) -> ScanJob {
    Arc::new(move || -> BoxFuture<'static, ()> {
        let scans = Arc::clone(&scans);
        Box::pin(async move {
            if let Err(e) = scans.run_scan(ScanTrigger::Schedule).await {
                warn!("Scheduled scan did not run: {}", e);
            }
        })
    })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
