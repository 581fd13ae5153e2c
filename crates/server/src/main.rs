use std::sync::Arc;

use anyhow::Result;
use geoscene_core::{
    attrs::{AttributeQuery, SqliteAttributeStore},
    config::AppConfig,
    index::IndexBuilder,
    portrayal::PortrayalEngine,
    registry::ModelRegistry,
    scene::SceneSource,
    store::DiskStore,
    upstream::{HttpRecordLister, HttpSceneSource},
};
use server::router;
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{compression::CompressionLayer, limit::RequestBodyLimitLayer};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system based on the configuration.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("warn,geoscene_core={level},server={level}"))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        // "pretty" and any other format default to pretty logging
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

/// Builds the engine and its collaborators from the configuration.
async fn init_engine(config: &AppConfig) -> Result<Arc<PortrayalEngine>> {
    let store = Arc::new(
        DiskStore::open(&config.cache.directory)
            .map_err(|e| anyhow::anyhow!("Cache store initialization failed: {e}"))?,
    );

    let registry = Arc::new(
        ModelRegistry::load(&config.catalog.providers_file, &store)
            .map_err(|e| anyhow::anyhow!("Model registry construction failed: {e}"))?,
    );

    let lister = Arc::new(
        HttpRecordLister::new()
            .map_err(|e| anyhow::anyhow!("Listing client initialization failed: {e}"))?,
    );
    let index = Arc::new(IndexBuilder::new(
        Arc::clone(&store),
        lister,
        config.listing.max_records,
        config.listing_timeout(),
    ));

    let attributes: Arc<dyn AttributeQuery> = Arc::new(
        SqliteAttributeStore::connect(&config.attributes.database_url)
            .await
            .map_err(|e| anyhow::anyhow!("Attribute store connection failed: {e}"))?,
    );

    let scenes: Arc<dyn SceneSource> = Arc::new(
        HttpSceneSource::new(config.assembler.url.clone(), config.assembler_timeout())
            .map_err(|e| anyhow::anyhow!("Scene assembler client failed: {e}"))?,
    );

    Ok(Arc::new(PortrayalEngine::new(registry, store, index, attributes, scenes)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("ctrl-c handler installs");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installs")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config =
        AppConfig::load().map_err(|e| anyhow::anyhow!("Configuration loading failed: {e}"))?;
    config.validate().map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    init_logging(&config);
    info!("Starting Geoscene portrayal service");
    debug!(
        catalog = %config.catalog.providers_file.display(),
        cache_dir = %config.cache.directory.display(),
        bind_port = config.server.bind_port,
        "Configuration loaded"
    );

    let engine = init_engine(&config).await?;
    info!(models = engine.model_count(), "Portrayal engine ready");

    let app = router::build_router(engine)
        .layer(ConcurrencyLimitLayer::new(config.server.max_concurrent_requests))
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes));

    let addr = config.socket_addr().map_err(|e| anyhow::anyhow!(e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "Portrayal service listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Portrayal service stopped");
    Ok(())
}
