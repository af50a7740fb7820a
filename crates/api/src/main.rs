use hallbook_api::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hallbook_api::observability::init();

    let config = Config::from_env();
    let services = hallbook_api::app::services::build_services(&config).await?;
    let app = hallbook_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
