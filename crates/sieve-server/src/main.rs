//! Invoice Anomaly Sieve HTTP server.
//!
//! Boots the axum router from `sieve-server::routes`, backed by either a
//! Postgres-backed store or an in-process one for local smoke testing.

use std::net::SocketAddr;
use std::panic;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use sieve_core::SieveSettings;
use sieve_server::{create_router, AppState, AuthConfig};
use sieve_store::{InMemoryStore, InvoiceStore, PgInvoiceStore};

#[derive(Parser, Debug)]
#[command(name = "sieve-server")]
#[command(about = "Invoice Anomaly Sieve HTTP server", long_about = None)]
struct Args {
    /// Host address to bind to.
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "SIEVE_HOST")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, default_value = "8080", env = "SIEVE_PORT")]
    port: u16,

    /// Tenant this process instance serves.
    #[arg(long, env = "SIEVE_TENANT_ID")]
    tenant_id: String,

    /// Postgres connection string. Falls back to an in-process store
    /// (data lost on restart) when omitted, for local smoke testing only.
    #[arg(long, env = "SIEVE_DATABASE_URL")]
    database_url: Option<String>,

    /// HMAC secret used to verify inbound bearer tokens.
    #[arg(long, env = "SIEVE_JWT_SECRET")]
    jwt_secret: String,

    /// Expected JWT audience.
    #[arg(long, env = "SIEVE_JWT_AUDIENCE", default_value = "invoice.sieve")]
    jwt_audience: String,

    /// Expected JWT issuer.
    #[arg(long, env = "SIEVE_JWT_ISSUER", default_value = "local.sieve")]
    jwt_issuer: String,

    /// Default HOLD threshold (0-100).
    #[arg(long, default_value = "80.0")]
    hold_threshold: f64,

    /// Default REVIEW threshold (0-100).
    #[arg(long, default_value = "50.0")]
    review_threshold: f64,

    /// Maximum candidates the retriever returns per scoring call.
    #[arg(long, default_value = "200")]
    candidate_cap: u32,

    /// Disable bearer-token verification. Only ever for local smoke tests.
    #[arg(long)]
    insecure_disable_auth: bool,

    /// Enable verbose (DEBUG) logging.
    #[arg(short, long)]
    verbose: bool,

    /// Number of worker threads (0 = automatic based on CPU cores).
    #[arg(short, long, default_value = "0")]
    worker_threads: usize,
}

/// Log panics before the default hook aborts the process.
fn setup_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        error!("server panic: {}", panic_info);
        default_hook(panic_info);
    }));
}

/// Wait for Ctrl+C or SIGTERM, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("received SIGTERM, initiating graceful shutdown..."),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    setup_panic_hook();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if args.worker_threads > 0 {
        runtime_builder.worker_threads(args.worker_threads);
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("failed to set tracing subscriber");

    let settings = SieveSettings {
        tenant_id: args.tenant_id.clone(),
        hold_threshold_default: args.hold_threshold,
        review_threshold_default: args.review_threshold,
        jwt_secret: args.jwt_secret.clone(),
        jwt_audience: args.jwt_audience.clone(),
        jwt_issuer: args.jwt_issuer.clone(),
        candidate_cap: args.candidate_cap,
    };
    settings
        .validate()
        .map_err(|errors| format!("invalid settings: {}", errors.join("; ")))?;

    let store: Arc<dyn InvoiceStore> = match &args.database_url {
        Some(url) => {
            info!("connecting to Postgres");
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await?;
            Arc::new(PgInvoiceStore::new(pool, settings.tenant_id.clone()))
        }
        None => {
            info!("no database_url configured, using in-process store (data is not durable)");
            Arc::new(InMemoryStore::new(settings.tenant_id.clone()))
        }
    };

    let auth_config = if args.insecure_disable_auth {
        info!("bearer-token verification is DISABLED");
        AuthConfig::disabled()
    } else {
        AuthConfig::from_settings(&settings)
    };

    let state = AppState {
        store,
        settings: Arc::new(settings),
    };
    let app = create_router(state, auth_config);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("starting invoice anomaly sieve server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shutdown complete");
    Ok(())
}
