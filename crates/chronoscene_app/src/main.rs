// SPDX-License-Identifier: MIT OR Apache-2.0
//! Chronoscene playback host.
//!
//! Composes the configured data sources into a scene backed by synthetic
//! in-memory collaborators, then scrubs the global timeline across the
//! covered range:
//! - Per-source sample series generated at the configured cadence
//! - Camera locked to the first composed object
//! - Time listeners logging every timeline change
//!
//! Pass a RON scene description as the first argument, or run without
//! arguments for the built-in demo scene.

mod config;
mod synthetic;

use chrono::Duration;
use chronoscene_core::SceneCoordinator;
use chronoscene_render::{ResolutionLookup, SourceId};
use config::SceneConfig;
use std::path::Path;
use std::sync::Arc;
use synthetic::{
    LoggingBackend, LoggingIndicator, SyntheticModelFactory, SyntheticRenderableFactory,
    SyntheticResolutionLookup,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("chronoscene_app=debug".parse().unwrap())
        .add_directive("chronoscene_core=debug".parse().unwrap());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Chronoscene playback v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run().await {
        tracing::error!("Playback failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => SceneConfig::load(Path::new(&path))?,
        None => SceneConfig::default(),
    };

    let lookup = Arc::new(SyntheticResolutionLookup);
    let renderables = Arc::new(SyntheticRenderableFactory::default());
    let backend = Arc::new(LoggingBackend::default());
    let mut coordinator = SceneCoordinator::new(
        backend.clone(),
        Arc::new(SyntheticModelFactory::new(renderables)),
        lookup.clone(),
        Arc::new(LoggingIndicator::default()),
    );

    coordinator.register_time_listener(|time| tracing::debug!("Timeline at {time}"));

    let mut first_entry = None;
    for source in &config.sources {
        let source_id = SourceId(source.source);
        let scale = lookup.scale_for(config.resolution, source_id);
        let id = coordinator
            .add_to_scene(
                source_id,
                source.start,
                source.end,
                Duration::seconds(source.cadence_seconds),
                scale,
                source.layer_order,
            )
            .await?;
        first_entry.get_or_insert(id);
    }

    if let Some(id) = first_entry {
        coordinator.lock_camera(id)?;
    }

    let (start, end) = coordinator.get_time_range()?;
    tracing::info!("Scene covers {start} to {end}");

    let steps = config.playback_steps.max(1) as i32;
    let span = end - start;
    for step in 0..=steps {
        coordinator.set_time(start + span * step / steps).await?;
    }
    coordinator.refresh().await?;

    let ids: Vec<_> = coordinator.entries().map(|(id, _)| id).collect();
    for id in ids {
        coordinator.remove_from_scene(id).await?;
    }

    tracing::info!("Playback complete, {} models left attached", backend.model_count());
    Ok(())
}
