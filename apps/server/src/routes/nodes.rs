use actix_web::{get, web};
use nodewatch::{Alert, NodeDetail, NodeId, NodeView, QueryService};
use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct MinVersion {
    pub min_version: String,
}

#[get("/nodes")]
pub async fn list_nodes_route(query: web::Data<QueryService>) -> web::Json<Vec<NodeView>> {
    web::Json(query.list_nodes())
}

/// Unknown ids are 404 whether or not a cycle has completed
#[get("/node/{id}")]
pub async fn get_node_route(
    query: web::Data<QueryService>,
    id: web::Path<u64>,
) -> Result<web::Json<NodeDetail>, ApiError> {
    Ok(web::Json(query.get_node(NodeId(id.into_inner()))?))
}

#[get("/node_alerts")]
pub async fn list_alerts_route(query: web::Data<QueryService>) -> web::Json<Vec<Alert>> {
    web::Json(query.list_alerts())
}

#[get("/fork_min_version")]
pub async fn min_version_route(query: web::Data<QueryService>) -> web::Json<MinVersion> {
    web::Json(MinVersion { min_version: query.min_version().to_string() })
}
