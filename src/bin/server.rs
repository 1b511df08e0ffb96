use std::{fs::OpenOptions, net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use clap::{Parser, ValueEnum};
use rusqlite::Connection;
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use aurora::logging_middleware;
#[cfg(debug_assertions)]
use axum::middleware;
#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use aurora::{
    AppState, PaginationConfig, ServiceConfig, Services, build_router, graceful_shutdown,
    services::{AppwriteClient, DwollaClient, PlaidClient, SqliteBackend},
};

/// Where user accounts, sessions and documents are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// The hosted identity service and document store.
    Appwrite,
    /// A local SQLite database, for development.
    Sqlite,
}

/// The web server for Aurora.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to a directory with an SSL certificate `cert.pem` and key `key.pem`.
    #[arg(long)]
    cert_path: String,

    /// The port to serve the app from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Where to store users, banks and transfers.
    #[arg(long, value_enum, default_value_t = Backend::Appwrite)]
    backend: Backend,

    /// File path to the SQLite database, only used with `--backend sqlite`.
    #[arg(long, default_value = "aurora.db")]
    db_path: String,
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine, the variables may be set another way.
    let _ = dotenvy::dotenv();

    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let tls_config = RustlsConfig::from_pem_file(
        PathBuf::from(&args.cert_path).join("cert.pem"),
        PathBuf::from(&args.cert_path).join("key.pem"),
    )
    .await
    .expect("Could not open TLS certificates.");

    let secret = std::env::var("SECRET").expect("The environment variable 'SECRET' must be set");

    let config = ServiceConfig::from_env(args.backend == Backend::Appwrite)
        .unwrap_or_else(|error| panic!("Invalid configuration: {error}"));

    let services = build_services(config, &args);
    let state = AppState::new(&secret, PaginationConfig::default(), services);

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(state));

    #[cfg(debug_assertions)]
    let router = router
        .layer(middleware::from_fn(logging_middleware))
        .layer(LiveReloadLayer::new());

    tracing::info!("HTTPS server listening on {}", addr);
    axum_server::bind_rustls(addr, tls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("The server stopped unexpectedly");
}

fn build_services(config: ServiceConfig, args: &Args) -> Services {
    let http = reqwest::Client::new();

    let aggregator = Arc::new(PlaidClient::new(http.clone(), config.plaid));
    let payments = Arc::new(DwollaClient::new(http.clone(), config.dwolla));

    match (args.backend, config.appwrite) {
        (Backend::Appwrite, Some(appwrite_config)) => {
            let appwrite = Arc::new(AppwriteClient::new(http, appwrite_config));
            tracing::info!("Using Appwrite for identity and documents");

            Services {
                aggregator,
                payments,
                identity: appwrite.clone(),
                documents: appwrite,
            }
        }
        _ => {
            let connection =
                Connection::open(&args.db_path).expect("Could not open the SQLite database");
            let store = Arc::new(
                SqliteBackend::new(connection, bcrypt::DEFAULT_COST)
                    .expect("Could not create the SQLite tables"),
            );
            tracing::info!("Using the SQLite database {} for identity and documents", args.db_path);

            Services {
                aggregator,
                payments,
                identity: store.clone(),
                documents: store,
            }
        }
    }
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
