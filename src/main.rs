use n1s_gateway::handlers::create_app_router;
use n1s_gateway::init::app_init;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("🚀 Starting N1s assistant gateway...");
    let (config, state) = app_init().await?;
    log::info!("✅ Application state initialized");
    let app = create_app_router(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("");
    log::info!("🎉 Server started!");
    log::info!("📍 http://{}", addr);
    log::info!("💬 Talk:    http://{}/api/n1-talk", addr);
    log::info!("🗣️  Discuss: http://{}/api/discuss", addr);
    log::info!("📊 Report:  http://{}/api/create-report", addr);
    log::info!("❤️  Health:  http://{}/health", addr);
    log::info!("");
    log::info!("🔌 Upstream: {}", config.dify.api_url);
    log::info!("⏱️  Upstream timeout: {}s", config.dify.timeout.as_secs());
    log::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
