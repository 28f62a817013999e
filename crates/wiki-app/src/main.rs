//! Binary entry point: config loading, startup wiring of every subsystem,
//! the HTTP surface, and graceful shutdown.
//!
//! Grounded on `crates/app/src/main.rs` (tracing-subscriber + `EnvFilter`
//! init under `#[tokio::main]`) and `crates/adapt/src/cli.rs` (`clap`-parsed
//! startup arguments feeding a shared context). `anyhow` flattens every
//! subsystem's `thiserror` error at this boundary, per SPEC_FULL.md §B.

mod config;

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

use wiki_coordinator::Coordinator;
use wiki_index_fm::FmIndex;
use wiki_index_text::TextIndex;
use wiki_inventory::Normalizer;
use wiki_jobs::JobSystem;
use wiki_render::{ComrakRenderer, RenderPipeline};
use wiki_service::{build_router, WikiDataSource, WikiService};
use wiki_store::{FsPageStore, PageStore};
use wiki_template::TemplateEngine;

use config::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = Subscriber::builder().with_env_filter(EnvFilter::from_default_env()).try_init();

    let cli = Cli::parse();
    let cfg = config::load(&cli)?;
    info!(data_dir = %cfg.data_dir.display(), bind_addr = %cfg.bind_addr, "starting wiki-app");

    let store: Arc<dyn PageStore> = Arc::new(FsPageStore::new(&cfg.data_dir, cfg.write_stripes)?);
    let fm_index = Arc::new(FmIndex::new());
    let text_index = Arc::new(match &cfg.text_index_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            TextIndex::create_in_dir(dir)?
        }
        None => TextIndex::create_in_ram()?,
    });
    let jobs = Arc::new(JobSystem::new());

    let coordinator = Arc::new(Coordinator::new(
        store.clone(),
        fm_index.clone(),
        text_index.clone(),
        jobs.clone(),
        cfg.queue_channel_capacity,
    )?);

    // C3/C4 are rebuilt from C2 on every cold start (spec.md §3, §4.4): they
    // are derived state, not source of truth, and start out empty.
    let ids = store.enumerate()?;
    info!(count = ids.len(), "enqueuing index rebuild for existing pages");
    coordinator.bulk_enqueue(ids)?;

    let data_source = Arc::new(WikiDataSource::new(store.clone(), fm_index.clone()));
    let template_engine = Arc::new(TemplateEngine::new(data_source));
    let render_pipeline = Arc::new(
        RenderPipeline::new()
            .with_template_engine(template_engine)
            .with_renderer(Arc::new(ComrakRenderer::new())),
    );

    let service = Arc::new(WikiService::new(
        store.clone(),
        fm_index.clone(),
        text_index.clone(),
        coordinator.clone(),
        render_pipeline,
    ));

    spawn_inventory_normalizer(
        store,
        fm_index,
        coordinator,
        cfg.inventory_normalize_interval_secs,
    );

    let router = build_router(service);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    info!(bind_addr = %cfg.bind_addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    jobs.shutdown(wiki_coordinator::FM_QUEUE).ok();
    jobs.shutdown(wiki_coordinator::TEXT_QUEUE).ok();
    info!("shutdown complete");
    Ok(())
}

/// Never runs at cold start, per spec.md's own suggestion
/// (SPEC_FULL.md §D.2): the first pass waits out a full interval before
/// the normalization job touches anything.
fn spawn_inventory_normalizer(
    store: Arc<dyn PageStore>,
    fm_index: Arc<FmIndex>,
    coordinator: Arc<Coordinator>,
    interval_secs: u64,
) {
    tokio::spawn(async move {
        let normalizer = Arc::new(Normalizer::new(store, fm_index, coordinator));
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            ticker.tick().await;
            let normalizer = normalizer.clone();
            // `run` does blocking filesystem/index I/O; offload it so it
            // never stalls the async runtime's worker threads.
            let result = tokio::task::spawn_blocking(move || normalizer.run()).await;
            match result {
                Ok(Ok(report_id)) => info!(report = %report_id, "inventory normalization pass complete"),
                Ok(Err(e)) => error!(error = %e, "inventory normalization pass failed"),
                Err(e) => error!(error = %e, "inventory normalization task panicked"),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let _ = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining connections");
}
