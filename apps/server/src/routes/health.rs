use actix_web::{HttpResponse, Responder, get, web};
use nodewatch::{DEFAULT_HISTORY_LIMIT, HealthHistory, HealthView, QueryService, SERVICE_NAME, StatusView};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ApiError;

/// Service info and the list of available endpoints
#[get("/")]
pub async fn index_route() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/health": "Health of the local node",
            "/health/raw": "Last health entry as reported by the local node",
            "/health/history?limit=100": "Recent entries of the local health log",
            "/status": "Overall fleet status",
            "/nodes": "All registered nodes",
            "/node/{id}": "One node with its alerts",
            "/node_alerts": "Current alerts",
            "/fork_min_version": "Minimum required node version",
        },
    }))
}

/// Health of the local node
#[get("/health")]
pub async fn health_route(query: web::Data<QueryService>) -> Result<web::Json<HealthView>, ApiError> {
    Ok(web::Json(query.health()?))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

#[get("/health/raw")]
pub async fn health_raw_route(query: web::Data<QueryService>) -> Result<web::Json<Value>, ApiError> {
    Ok(web::Json(query.health_raw()?))
}

/// Last `limit` entries of the local health log, oldest first
#[get("/health/history")]
pub async fn health_history_route(
    query: web::Data<QueryService>,
    params: web::Query<HistoryParams>,
) -> Result<web::Json<HealthHistory>, ApiError> {
    Ok(web::Json(query.health_history(params.limit).await?))
}

/// Fleet status derived from the worst current alert
#[get("/status")]
pub async fn status_route(query: web::Data<QueryService>) -> web::Json<StatusView> {
    web::Json(query.status())
}
