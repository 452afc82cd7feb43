#![warn(clippy::all, clippy::pedantic)]

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use nodewatch::config::methods::CONFIG_ENV_VAR;
use nodewatch::{Config, DEFAULT_SHUTDOWN_GRACE, NodeMonitor, QueryService};
use tracing::info;

mod error;
mod routes;

use error::AppError;
use logger::init_tracing;

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    init_tracing();

    let config = Config::from_config(config_path())?;
    let addr: SocketAddr = config.server_addr().parse()?;

    let monitor = NodeMonitor::from_config(&config)?;
    let poller = monitor.start();

    let served = run_server(addr, monitor.query_service()).await;

    info!("HTTP server stopped, shutting down poller");
    poller.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
    served
}

/// Runtime env first, then the value baked in from `.env` at build time
fn config_path() -> Option<PathBuf> {
    env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .or_else(|| option_env!("NODEWATCH_CONFIG").map(PathBuf::from))
}

async fn run_server(addr: SocketAddr, query: QueryService) -> Result<(), AppError> {
    let query = web::Data::new(query);

    info!(%addr, "Starting HTTP server");
    HttpServer::new(move || {
        App::new()
            .app_data(query.clone())
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .configure(routes::routes)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
