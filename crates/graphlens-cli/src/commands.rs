//! Command handlers for the CLI.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use graphlens_analyzer::{Analyzer, AnalyzerConfig, GeminiClient, PgHistoryStore};
use graphlens_core::{normalize_metric_name, AppConfig, ModelConfig};

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = graphlens_db::PoolConfig::from_app_config(config);
    let pool = graphlens_db::connect_pool(&config.database_url, pool_config)
        .await
        .context("could not connect to the database")?;
    Ok(pool)
}

/// Run the full analysis pipeline on one image file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the database is unreachable,
/// or the analysis fails.
pub(crate) async fn run_analyze(config: &AppConfig, path: &Path) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("could not read {}", path.display()))?;

    let pool = connect(config).await?;
    graphlens_db::run_migrations(&pool).await?;

    let gemini = Arc::new(GeminiClient::from_app_config(config)?);
    let analyzer = Analyzer::new(
        gemini.clone(),
        gemini,
        Arc::new(PgHistoryStore::new(pool)),
        AnalyzerConfig::from_app_config(config),
    );

    let outcome = analyzer.analyze(&bytes).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

/// Print recently stored data points, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_history(
    config: &AppConfig,
    metric: Option<&str>,
    limit: i64,
) -> anyhow::Result<()> {
    let metric = metric.and_then(normalize_metric_name);
    let pool = connect(config).await?;
    let rows = graphlens_db::list_history(&pool, metric.as_deref(), limit.max(1)).await?;

    if rows.is_empty() {
        println!(
            "no history found{}; run `analyze` first",
            metric
                .as_deref()
                .map(|m| format!(" for metric '{m}'"))
                .unwrap_or_default()
        );
        return Ok(());
    }

    println!(
        "{:<24}{:<20}{:<16}{:<18}SOURCE",
        "METRIC", "CATEGORY", "VALUE", "EXTRACTED"
    );
    for row in &rows {
        let extracted = row.extracted_at.format("%Y-%m-%d %H:%M").to_string();
        let source = row.source_hash.get(..12).unwrap_or(&row.source_hash);
        println!(
            "{:<24}{:<20}{:<16}{:<18}{}",
            row.metric_name, row.category, row.value, extracted, source
        );
    }

    Ok(())
}

/// Apply pending migrations and report how many ran.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub(crate) async fn run_migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let applied = graphlens_db::run_migrations(&pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Verify the configured API key and text model respond.
///
/// # Errors
///
/// Returns an error if the model call fails.
pub(crate) async fn run_check_model(config: &ModelConfig) -> anyhow::Result<()> {
    let client = GeminiClient::from_model_config(config)?;
    let reply = client
        .ping()
        .await
        .with_context(|| format!("model '{}' did not respond", config.text_model))?;
    tracing::info!(model = %config.text_model, "model check passed");
    println!("{}: {}", config.text_model, reply.trim());
    Ok(())
}
