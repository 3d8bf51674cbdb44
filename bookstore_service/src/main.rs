use std::sync::Arc;

use actix_web::HttpServer;
use anyhow::Context;
use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::runtime::TokioCurrentThread;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use bookstore_service::app_config::build_app;
use bookstore_service::books_repository::{BookRepository, InMemoryBookRepository};
use bookstore_service::settings::Settings;

const APP_NAME: &str = "bookstore_service";

// Based on https://github.com/LukeMathWalker/tracing-actix-web/blob/main/examples/opentelemetry/src/main.rs#L15
fn init_telemetry(jaeger_enabled: bool) -> anyhow::Result<()> {
    // Spans are exported in batch to a Jaeger agent only when enabled in settings
    let telemetry = if jaeger_enabled {
        global::set_text_map_propagator(TraceContextPropagator::new());
        #[allow(deprecated)]
        let tracer = opentelemetry_jaeger::new_agent_pipeline()
            .with_service_name(APP_NAME)
            .install_batch(TokioCurrentThread)
            .context("Failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    // Filter based on level - trace, debug, info, warn, error
    // Tunable via `RUST_LOG` env variable
    let env_filter = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("info"));
    let formatting_layer = BunyanFormattingLayer::new(APP_NAME.into(), std::io::stdout);
    let subscriber = Registry::default()
        .with(env_filter)
        .with(telemetry)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install `tracing` subscriber")
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_telemetry(settings.jaeger_enabled)?;

    let books_repository: Arc<dyn BookRepository> = Arc::new(InMemoryBookRepository::default());

    tracing::info!(
        "starting HTTP server at http://{}:{}",
        settings.host,
        settings.port
    );

    HttpServer::new(move || build_app(books_repository.clone()))
        .bind((settings.host.as_str(), settings.port))
        .with_context(|| format!("Failed to bind {}:{}", settings.host, settings.port))?
        .run()
        .await
        .context("HTTP server failed")?;

    global::shutdown_tracer_provider();
    Ok(())
}
