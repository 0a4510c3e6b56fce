// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory collaborators for GPU-less playback.
//!
//! These implement every render-boundary contract with procedural data so
//! the playback driver can exercise the full scene core: generated sample
//! series with orbiting observer positions, renderables that track their
//! displayed state, and a backend that logs scene and camera mutations.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chronoscene_core::{ModelFactory, Sample, SceneError, SceneResult, TemporalObject};
use chronoscene_render::{
    ContentMeta, LoadingIndicator, RenderResult, Renderable, RenderableFactory, RenderableHandle,
    ResolutionLookup, SceneBackend, SourceId, VisualContent,
};
use glam::Vec3;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Observer orbit radius for generated facing positions
const ORBIT_RADIUS: f32 = 50.0;

/// Side length of generated content tiles
const TILE_SIZE: u32 = 4;

/// Displayed state of a synthetic renderable.
#[derive(Debug, Default)]
struct DisplayState {
    content: Option<Uuid>,
    opacity: f32,
    layer: (usize, usize),
    facing: Option<Vec3>,
}

/// Renderable that records what it would draw.
pub struct SyntheticRenderable {
    world_position: Vec3,
    state: Mutex<DisplayState>,
}

#[async_trait]
impl Renderable for SyntheticRenderable {
    async fn set_content(
        &self,
        content: &VisualContent,
        meta: &ContentMeta,
        source: SourceId,
    ) -> RenderResult<()> {
        let mut state = self.state.lock();
        let previous = state.content.replace(content.id);
        tracing::trace!(
            "{}: content {:?} -> {} ({}x{} at scale {}, opacity {}, layer {}/{}, facing {:?})",
            source,
            previous,
            content.id,
            content.width,
            content.height,
            meta.scale,
            state.opacity,
            state.layer.0,
            state.layer.1,
            state.facing
        );
        Ok(())
    }

    async fn set_opacity(&self, value: f32) -> RenderResult<()> {
        self.state.lock().opacity = value;
        Ok(())
    }

    async fn set_layer_order(&self, index: usize, total: usize) -> RenderResult<()> {
        tracing::trace!("{}: layer {}/{}", self.world_position, index, total);
        self.state.lock().layer = (index, total);
        Ok(())
    }

    async fn orient(&self, toward: Vec3) -> RenderResult<()> {
        self.state.lock().facing = Some(toward);
        Ok(())
    }

    fn position(&self) -> Vec3 {
        self.world_position
    }
}

/// Factory spreading synthetic renderables along the x axis.
#[derive(Default)]
pub struct SyntheticRenderableFactory {
    created: AtomicUsize,
}

#[async_trait]
impl RenderableFactory for SyntheticRenderableFactory {
    async fn create(
        &self,
        content: &VisualContent,
        _meta: &ContentMeta,
    ) -> RenderResult<RenderableHandle> {
        let index = self.created.fetch_add(1, Ordering::SeqCst);
        let renderable = SyntheticRenderable {
            world_position: Vec3::new(index as f32 * 5.0, 0.0, 0.0),
            state: Mutex::new(DisplayState {
                content: Some(content.id),
                opacity: 1.0,
                ..DisplayState::default()
            }),
        };
        Ok(Arc::new(renderable))
    }
}

/// Model factory generating one procedural sample per cadence step.
pub struct SyntheticModelFactory {
    renderables: Arc<SyntheticRenderableFactory>,
}

impl SyntheticModelFactory {
    /// Create a factory building renderables through `renderables`.
    pub fn new(renderables: Arc<SyntheticRenderableFactory>) -> Self {
        Self { renderables }
    }

    fn tile(step: usize) -> VisualContent {
        let shade = (step * 16 % 256) as u8;
        let pixels: Vec<u8> = (0..TILE_SIZE * TILE_SIZE)
            .flat_map(|_| [shade, shade, 255 - shade, 255])
            .collect();
        VisualContent::new(pixels, TILE_SIZE, TILE_SIZE)
    }

    fn orbit_position(step: usize) -> Vec3 {
        let angle = step as f32 * 0.2;
        Vec3::new(
            angle.cos() * ORBIT_RADIUS,
            angle.sin() * ORBIT_RADIUS,
            30.0,
        )
    }
}

#[async_trait]
impl ModelFactory for SyntheticModelFactory {
    async fn create_object(
        &self,
        source: SourceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cadence: Duration,
        scale: f32,
    ) -> SceneResult<TemporalObject> {
        if end < start {
            return Err(SceneError::Source {
                id: source,
                message: format!("range end {end} precedes start {start}"),
            });
        }
        if cadence <= Duration::zero() {
            return Err(SceneError::Source {
                id: source,
                message: "cadence must be positive".into(),
            });
        }

        let mut samples = Vec::new();
        let mut timestamp = start;
        let mut step = 0;
        while timestamp <= end {
            samples.push(Sample::new(
                timestamp,
                Self::tile(step),
                Self::orbit_position(step),
            ));
            timestamp += cadence;
            step += 1;
        }

        tracing::debug!("{}: generated {} samples at scale {}", source, samples.len(), scale);
        Ok(TemporalObject::new(
            samples,
            source,
            ContentMeta::new(scale),
            self.renderables.clone(),
        ))
    }
}

/// Backend logging scene-graph and camera mutations.
#[derive(Default)]
pub struct LoggingBackend {
    models: Mutex<Vec<RenderableHandle>>,
}

impl LoggingBackend {
    /// Number of currently attached models.
    pub fn model_count(&self) -> usize {
        self.models.lock().len()
    }
}

impl SceneBackend for LoggingBackend {
    fn add_model(&self, model: RenderableHandle) {
        let mut models = self.models.lock();
        models.push(model);
        tracing::debug!("Scene holds {} models", models.len());
    }

    fn remove_model(&self, model: &RenderableHandle) {
        let mut models = self.models.lock();
        models.retain(|held| !Arc::ptr_eq(held, model));
        tracing::debug!("Scene holds {} models", models.len());
    }

    fn move_camera(&self, position: Vec3) {
        tracing::debug!("Camera moved to {position}");
    }

    fn point_camera(&self, target: Vec3) {
        tracing::debug!("Camera pointed at {target}");
    }
}

/// Loading indicator logging nesting depth.
#[derive(Default)]
pub struct LoggingIndicator {
    depth: AtomicUsize,
}

impl LoadingIndicator for LoggingIndicator {
    fn start(&self) {
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!("Loading started (depth {depth})");
    }

    fn stop(&self) {
        let depth = self.depth.fetch_sub(1, Ordering::SeqCst) - 1;
        tracing::debug!("Loading stopped (depth {depth})");
    }
}

/// Scale lookup proportional to the requested resolution.
pub struct SyntheticResolutionLookup;

impl ResolutionLookup for SyntheticResolutionLookup {
    fn scale_for(&self, resolution: u32, _source: SourceId) -> f32 {
        resolution as f32 / 4096.0
    }
}
