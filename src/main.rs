use std::net::SocketAddr;
use std::sync::Arc;

use content_analyzer::analysis::{AnalysisSettings, Analyzer};
use content_analyzer::telemetry::init_telemetry;
use content_analyzer::{AppState, Config, llm, routes};
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let telemetry_guard = init_telemetry(&config)?;

    tracing::info!(
        port = config.port,
        environment = %config.environment,
        json_extraction = %config.json_extraction,
        validate_schema = config.validate_schema,
        "Starting content-analyzer"
    );

    let model = llm::load_model(&config).await;

    let state = AppState {
        analyzer: Arc::new(Analyzer::new(model, AnalysisSettings::from(&config))),
    };

    let app = routes::create_app(state, &config)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    telemetry_guard.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
