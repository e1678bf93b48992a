use std::net::SocketAddr;
use std::sync::Arc;

use tabkeep_api::app::{build_app, services::build_services};
use tabkeep_api::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tabkeep_observability::init();

    let config = Config::from_env()?;
    let services = Arc::new(build_services(&config).await?);
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
