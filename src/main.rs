//! imgserve - On-demand image resizing server with a filesystem cache.
//!
//! This binary wires configuration, logging, the cache coordinator, and
//! the HTTP server together.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imgserve::{
    cache::CacheCoordinator,
    config::Config,
    server::{create_router, RouterConfig},
    transcode::ImageTranscoder,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("imgserve v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Source dir: {}", config.source_dir.display());
    info!("  Cache dir: {}", config.cache_dir.display());
    info!(
        "  Quality: jpeg={}, png={}-{}",
        config.jpeg_quality, config.png_quality_min, config.png_quality_max
    );
    info!("  Cache max-age: {}s", config.cache_max_age);
    info!(
        "  Staleness checking: {}",
        if config.check_source_mtime { "on" } else { "off" }
    );
    if !config.enable_locking {
        warn!("  Locking: DISABLED - concurrent identical requests may each transcode");
    }

    if !config.source_dir.is_dir() {
        error!(
            "Source directory does not exist: {}",
            config.source_dir.display()
        );
        return ExitCode::FAILURE;
    }

    // Create the cache root up front so permission problems fail at startup
    if let Err(e) = tokio::fs::create_dir_all(&config.cache_dir).await {
        error!(
            "Failed to create cache directory {}: {}",
            config.cache_dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let coordinator = CacheCoordinator::new(
        config.source_dir.clone(),
        config.cache_dir.clone(),
        ImageTranscoder::new(),
    )
    .with_quality(config.quality())
    .with_check_source_mtime(config.check_source_mtime)
    .with_locking(config.enable_locking);

    let router_config = build_router_config(&config);
    let router = create_router(coordinator, router_config);

    let addr = config.bind_address();
    info!("Server listening on http://{}", addr);
    info!(
        "Request renditions as http://{}/<width>x<height>/<image path>",
        addr
    );

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "imgserve=debug,tower_http=debug"
    } else {
        "imgserve=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}
