use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod rpc;

use rpc::Server;

pub const RPC_ENDPOINT: &str = "/json";

#[derive(Clone)]
pub struct AppState {
    pub rpc: Arc<Server>,
}

impl AppState {
    pub fn new(rpc: Arc<Server>) -> Self {
        Self { rpc }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(http::handlers::index))
        .route("/health", get(http::handlers::health))
        .route("/.well-known/rpc", get(http::handlers::discovery))
        .route(RPC_ENDPOINT, post(http::handlers::rpc_endpoint))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
