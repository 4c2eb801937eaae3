//! Axum HTTP handlers for the web server
//!
//! Provides the RPC endpoint, the demo page and general metadata endpoints.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::rpc::{ServiceSummary, RESPONSE_CONTENT_TYPE};
use crate::{AppState, RPC_ENDPOINT};

const INDEX_PAGE: &str = include_str!("../../static/index.html");

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub rpc_endpoint: &'static str,
    pub services: Vec<ServiceSummary>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn discovery(State(state): State<AppState>) -> Json<DiscoveryResponse> {
    Json(DiscoveryResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        rpc_endpoint: RPC_ENDPOINT,
        services: state.rpc.services(),
    })
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

pub async fn rpc_endpoint(State(state): State<AppState>, body: Bytes) -> Response {
    let (reply, audit) = state.rpc.handle_audited(&body);
    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, RESPONSE_CONTENT_TYPE)],
        reply,
    )
        .into_response();
    // Read back by the request logging middleware.
    response.extensions_mut().insert(audit);
    response
}
