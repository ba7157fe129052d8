use stockpulse_server::api::app_router;
use stockpulse_server::config::Config;
use stockpulse_server::main_lib::{build_state, init_tracing};
use stockpulse_server::scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();
    let state = build_state(&config)?;

    let _scheduler = scheduler::start_refresh_scheduler(state.clone());

    let router = app_router(state, &config);
    tracing::info!("Listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
