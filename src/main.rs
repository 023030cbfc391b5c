//! Credit Risk API - Main Entry Point
//!
//! Loads the probability-of-default model once, then serves `/health`,
//! `/meta` and `/predict` over HTTP.

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use credit_risk_api::{
    config::{AppConfig, LoggingConfig},
    metrics::{MetricsReporter, PredictionMetrics},
    models::{ModelHandle, ModelLoader},
    prediction::PredictionService,
    server,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    init_logging(&config.logging)?;
    info!("Starting Credit Risk API");
    info!(
        "Risk categories: low<{:.2}, medium<{:.2}",
        config.risk.low, config.risk.medium
    );

    // Load the model; the service never starts without one
    let loader = ModelLoader::with_threads(config.model.onnx_threads);
    let model = Arc::new(ModelHandle::load(&config.model.path, &loader)?);
    info!(
        model_file = %model.model_file(),
        expected_features = ?model.expected_features().map(|f| f.len()),
        "Model ready"
    );

    let metrics = Arc::new(PredictionMetrics::new());
    let service = web::Data::new(PredictionService::new(
        model,
        config.risk.clone(),
        metrics.clone(),
    ));

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        actix_web::rt::spawn(reporter.start());
    }

    let cors_origins = config.server.cors_origins.clone();
    let mut http = HttpServer::new(move || {
        App::new()
            .wrap(server::build_cors(&cors_origins))
            .app_data(service.clone())
            .configure(server::configure)
    });
    if config.server.workers > 0 {
        http = http.workers(config.server.workers);
    }

    let (host, port) = config.bind_address();
    info!(host = %host, port, "Listening");
    http.bind((host.as_str(), port))
        .with_context(|| format!("Failed to bind {host}:{port}"))?
        .run()
        .await
        .context("HTTP server error")?;

    info!("Credit Risk API shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info")
            .add_directive(format!("credit_risk_api={}", logging.level).parse()?),
    };

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    Ok(())
}
