use std::sync::Arc;

use goajax_rpc::{
    build_app, config::Config, domain::register_demo_services, logging, rpc::Server, AppState,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;

    let server = Server::new();
    register_demo_services(&server)?;

    let bind_socket = config.bind_socket()?;
    let app = build_app(AppState::new(Arc::new(server)));
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
