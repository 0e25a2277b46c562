use crate::render;
use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header::CONTENT_TYPE, Response as HttpResponse, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use routemap_graph::ServiceGraph;
use routemap_protocol::{
    serialize_json, ErrorEnvelope, GraphQueryParams, GraphResponse, HealthReport,
};
use std::sync::Arc;

type SharedGraph = Arc<ServiceGraph>;

pub(crate) fn router(graph: SharedGraph) -> Router {
    Router::new()
        .route("/graph", get(graph_json))
        .route("/graph/html", get(graph_html))
        .route("/health", get(health))
        .with_state(graph)
}

async fn graph_json(
    State(graph): State<SharedGraph>,
    params: Result<Query<GraphQueryParams>, QueryRejection>,
) -> Result<Response, StatusCode> {
    let response = match run_query(graph, params).await {
        Ok(response) => response,
        Err(failure) => return failure.into_http(),
    };
    json_response(StatusCode::OK, &response)
}

async fn graph_html(
    State(graph): State<SharedGraph>,
    params: Result<Query<GraphQueryParams>, QueryRejection>,
) -> Result<Response, StatusCode> {
    let response = match run_query(graph, params).await {
        Ok(response) => response,
        Err(failure) => return failure.into_http(),
    };
    HttpResponse::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Body::from(render::html_page(&response.mermaid)))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

async fn health(State(graph): State<SharedGraph>) -> Result<Response, StatusCode> {
    let report = HealthReport {
        status: "ok".to_string(),
        nodes: graph.node_count(),
        edges: graph.edge_count(),
    };
    json_response(StatusCode::OK, &report)
}

struct QueryFailure {
    status: StatusCode,
    envelope: ErrorEnvelope,
}

impl QueryFailure {
    fn into_http(self) -> Result<Response, StatusCode> {
        json_response(self.status, &self.envelope)
    }
}

async fn run_query(
    graph: SharedGraph,
    params: Result<Query<GraphQueryParams>, QueryRejection>,
) -> Result<GraphResponse, QueryFailure> {
    let invalid = |message: String| QueryFailure {
        status: StatusCode::BAD_REQUEST,
        envelope: ErrorEnvelope::invalid_request(message),
    };

    let Query(params) = params.map_err(|rejection| invalid(rejection.body_text()))?;
    let query = params.to_query().map_err(|err| invalid(format!("{err:#}")))?;

    let flags = params.flags();
    // enumeration is CPU-bound; keep it off the async workers
    let response = tokio::task::spawn_blocking(move || crate::respond(&graph, &query))
        .await
        .map_err(|err| QueryFailure {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            envelope: ErrorEnvelope::internal(format!("query task failed: {err}")),
        })?;

    log::info!(
        "Graph query {:?} -> {} nodes, {} edges",
        flags,
        response.nodes.len(),
        response.edges.len()
    );

    Ok(response)
}

fn json_response<T: serde::Serialize>(
    status: StatusCode,
    value: &T,
) -> Result<Response, StatusCode> {
    let bytes = serialize_json(value)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_bytes();

    HttpResponse::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
