mod api;
mod middleware;

use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use graphlens_analyzer::{Analyzer, AnalyzerConfig, GeminiClient, PgHistoryStore};
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, default_rate_limit_state, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = graphlens_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = graphlens_db::PoolConfig::from_app_config(&config);
    let pool = graphlens_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = graphlens_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");

    let gemini = Arc::new(GeminiClient::from_app_config(&config)?);
    let analyzer = Analyzer::new(
        gemini.clone(),
        gemini,
        Arc::new(PgHistoryStore::new(pool.clone())),
        AnalyzerConfig::from_app_config(&config),
    );

    let cors_origin = HeaderValue::from_str(&config.cors_origin)
        .with_context(|| format!("invalid GRAPHLENS_CORS_ORIGIN: {}", config.cors_origin))?;
    let app = build_app(
        AppState { pool, analyzer },
        default_rate_limit_state(),
        cors_origin,
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        env = %config.env,
        vision_model = %config.vision_model,
        text_model = %config.text_model,
        "graphlens server listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
