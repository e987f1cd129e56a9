//! Orb node binary.
//!
//! Opens the node database, starts the anchor observer and serves the
//! resolution API until the process is asked to stop. The observer is
//! drained after the HTTP server finishes.

use std::net::SocketAddr;

use orb_db::{DbPool, DbRuntimeSettings};
use orb_server::config::{Config, DatabaseConfig, LoggingConfig};
use orb_server::{app, build_node, config};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Config file location: first CLI argument, then `ORB_CONFIG_PATH`, then
/// `config.toml` in the working directory.
fn config_location() -> (String, &'static str) {
    let non_blank = |value: &String| !value.trim().is_empty();

    if let Some(path) = std::env::args().nth(1).filter(non_blank) {
        return (path, "argument");
    }
    match std::env::var("ORB_CONFIG_PATH").ok().filter(non_blank) {
        Some(path) => (path, "ORB_CONFIG_PATH"),
        None => (DEFAULT_CONFIG_PATH.to_string(), "default"),
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    if logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn open_database(database: &DatabaseConfig) -> DbPool {
    let settings = DbRuntimeSettings {
        busy_timeout_ms: database.busy_timeout_ms,
        pool_max_size: database.pool_max_size,
    };
    let pool = orb_db::create_pool(&database.path, settings)
        .expect("database pool should open at database.path");

    let conn = pool.get().expect("database should hand out a connection");
    let applied = orb_db::run_migrations(&conn).expect("node schema migrations should apply");
    tracing::info!(path = %database.path, applied, "node database ready");

    pool
}

#[tokio::main]
async fn main() {
    let (config_path, config_source) = config_location();
    let config: Config =
        config::load_config(Some(&config_path)).expect("node configuration should be valid");

    init_logging(&config.logging);
    tracing::info!(path = %config_path, source = config_source, "loaded node configuration");

    let pool = open_database(&config.database);

    let node = build_node(&config, pool)
        .await
        .expect("observer and resolver should build from configuration");
    node.observer.start();

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = TcpListener::bind(addr)
        .await
        .expect("resolution API address should be free");
    tracing::info!(%addr, "serving resolution API");

    axum::serve(listener, app(node.state))
        .with_graceful_shutdown(stop_requested())
        .await
        .expect("resolution API server failed");

    node.observer.stop().await;
    tracing::info!("orb node stopped");
}

/// Resolves on Ctrl+C, or on SIGTERM where the platform has it.
async fn stop_requested() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        () = interrupt => "interrupt",
        () = terminate => "terminate",
    };
    tracing::info!(signal, "stopping orb node");
}
