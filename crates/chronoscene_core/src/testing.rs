// SPDX-License-Identifier: MIT OR Apache-2.0
//! Recording fakes for the render boundary, shared by unit tests.

use crate::error::{SceneError, SceneResult};
use crate::object::{ModelFactory, TemporalObject};
use crate::sample::Sample;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use chronoscene_render::{
    ContentMeta, LoadingIndicator, RenderError, RenderResult, Renderable, RenderableFactory,
    RenderableHandle, ResolutionLookup, SceneBackend, SourceId, VisualContent,
};
use glam::Vec3;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Fixed base time for sample series.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Build a series with timestamps at second offsets from [`t0`].
///
/// Facing positions encode the offset so tests can tell samples apart.
pub fn samples_at_offsets(offsets: &[i64]) -> Vec<Sample> {
    offsets
        .iter()
        .map(|&secs| {
            Sample::new(
                t0() + Duration::seconds(secs),
                VisualContent::new(vec![0u8; 4], 1, 1),
                Vec3::new(secs as f32, 0.0, 100.0),
            )
        })
        .collect()
}

/// Calls recorded against a [`MockRenderable`].
#[derive(Default)]
pub struct RenderableState {
    /// Content identity tokens passed to `set_content`, in order
    pub contents: Vec<Uuid>,
    /// Orientation targets, in order
    pub orients: Vec<Vec3>,
    /// Opacity values, in order
    pub opacities: Vec<f32>,
    /// `(index, total)` stacking assignments, in order
    pub layer_orders: Vec<(usize, usize)>,
}

/// Renderable that records every call and always succeeds.
pub struct MockRenderable {
    /// Fixed world position
    pub world_position: Vec3,
    /// Recorded calls
    pub state: Mutex<RenderableState>,
}

#[async_trait]
impl Renderable for MockRenderable {
    async fn set_content(
        &self,
        content: &VisualContent,
        _meta: &ContentMeta,
        _source: SourceId,
    ) -> RenderResult<()> {
        self.state.lock().contents.push(content.id);
        Ok(())
    }

    async fn set_opacity(&self, value: f32) -> RenderResult<()> {
        self.state.lock().opacities.push(value);
        Ok(())
    }

    async fn set_layer_order(&self, index: usize, total: usize) -> RenderResult<()> {
        self.state.lock().layer_orders.push((index, total));
        Ok(())
    }

    async fn orient(&self, toward: Vec3) -> RenderResult<()> {
        self.state.lock().orients.push(toward);
        Ok(())
    }

    fn position(&self) -> Vec3 {
        self.world_position
    }
}

/// Factory producing [`MockRenderable`]s, with one-shot failure injection.
pub struct MockRenderableFactory {
    created: Mutex<Vec<Arc<MockRenderable>>>,
    fail_next: AtomicBool,
    next_position: Mutex<Vec3>,
}

impl MockRenderableFactory {
    /// Create a factory whose renderables sit at the origin.
    pub fn new() -> Self {
        Self {
            created: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
            next_position: Mutex::new(Vec3::ZERO),
        }
    }

    /// Fail the next `create` call with a creation error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// World position assigned to subsequently created renderables.
    pub fn set_next_position(&self, position: Vec3) {
        *self.next_position.lock() = position;
    }

    /// Every renderable created so far, in creation order.
    pub fn created(&self) -> Vec<Arc<MockRenderable>> {
        self.created.lock().clone()
    }
}

impl Default for MockRenderableFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RenderableFactory for MockRenderableFactory {
    async fn create(
        &self,
        _content: &VisualContent,
        _meta: &ContentMeta,
    ) -> RenderResult<RenderableHandle> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(RenderError::Creation("injected failure".into()));
        }
        let renderable = Arc::new(MockRenderable {
            world_position: *self.next_position.lock(),
            state: Mutex::new(RenderableState::default()),
        });
        self.created.lock().push(renderable.clone());
        Ok(renderable)
    }
}

/// Scene backend recording attached models and camera motion.
#[derive(Default)]
pub struct RecordingBackend {
    /// Currently attached models
    pub models: Mutex<Vec<RenderableHandle>>,
    /// `move_camera` history
    pub camera_moves: Mutex<Vec<Vec3>>,
    /// `point_camera` history
    pub camera_points: Mutex<Vec<Vec3>>,
}

impl RecordingBackend {
    /// Number of currently attached models.
    pub fn model_count(&self) -> usize {
        self.models.lock().len()
    }

    /// Last camera move target, if any.
    pub fn last_camera_move(&self) -> Option<Vec3> {
        self.camera_moves.lock().last().copied()
    }

    /// Last camera point target, if any.
    pub fn last_camera_point(&self) -> Option<Vec3> {
        self.camera_points.lock().last().copied()
    }
}

impl SceneBackend for RecordingBackend {
    fn add_model(&self, model: RenderableHandle) {
        self.models.lock().push(model);
    }

    fn remove_model(&self, model: &RenderableHandle) {
        self.models.lock().retain(|held| !Arc::ptr_eq(held, model));
    }

    fn move_camera(&self, position: Vec3) {
        self.camera_moves.lock().push(position);
    }

    fn point_camera(&self, target: Vec3) {
        self.camera_points.lock().push(target);
    }
}

/// Loading indicator counting start/stop pairs.
#[derive(Default)]
pub struct CountingIndicator {
    /// `start` call count
    pub starts: AtomicUsize,
    /// `stop` call count
    pub stops: AtomicUsize,
}

impl CountingIndicator {
    /// `(starts, stops)` observed so far.
    pub fn counts(&self) -> (usize, usize) {
        (
            self.starts.load(Ordering::SeqCst),
            self.stops.load(Ordering::SeqCst),
        )
    }
}

impl LoadingIndicator for CountingIndicator {
    fn start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Lookup mapping resolution to a scale proportional to it.
pub struct FixedResolutionLookup;

impl ResolutionLookup for FixedResolutionLookup {
    fn scale_for(&self, resolution: u32, _source: SourceId) -> f32 {
        resolution as f32 / 1024.0
    }
}

/// Model factory generating one sample per cadence step.
///
/// Renderables for a source sit at `(source * 10, 0, 0)`; sample facing
/// positions encode the second offset from `start`, so camera assertions
/// can pin the exact resolved sample.
pub struct ScriptedModelFactory {
    /// Factory handed to created objects
    pub renderables: Arc<MockRenderableFactory>,
    /// Scales requested per create call, in order
    pub requested_scales: Mutex<Vec<f32>>,
    creates: AtomicUsize,
    fail_from: Mutex<Option<usize>>,
}

impl ScriptedModelFactory {
    /// Create a factory backed by fresh mock renderables.
    pub fn new() -> Self {
        Self {
            renderables: Arc::new(MockRenderableFactory::new()),
            requested_scales: Mutex::new(Vec::new()),
            creates: AtomicUsize::new(0),
            fail_from: Mutex::new(None),
        }
    }

    /// Fail every `create_object` call starting at the given call index.
    pub fn fail_from(&self, call_index: usize) {
        *self.fail_from.lock() = Some(call_index);
    }
}

impl Default for ScriptedModelFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelFactory for ScriptedModelFactory {
    async fn create_object(
        &self,
        source: SourceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cadence: Duration,
        scale: f32,
    ) -> SceneResult<TemporalObject> {
        let call = self.creates.fetch_add(1, Ordering::SeqCst);
        if let Some(from) = *self.fail_from.lock() {
            if call >= from {
                return Err(SceneError::Source {
                    id: source,
                    message: "scripted failure".into(),
                });
            }
        }
        self.requested_scales.lock().push(scale);

        let mut samples = Vec::new();
        let mut timestamp = start;
        while timestamp <= end {
            samples.push(Sample::new(
                timestamp,
                VisualContent::new(vec![0u8; 4], 1, 1),
                Vec3::new((timestamp - start).num_seconds() as f32, source.0 as f32, 0.0),
            ));
            timestamp += cadence;
        }

        self.renderables
            .set_next_position(Vec3::new(source.0 as f32 * 10.0, 0.0, 0.0));
        Ok(TemporalObject::new(
            samples,
            source,
            ContentMeta::new(scale),
            self.renderables.clone(),
        ))
    }
}
