// SPDX-License-Identifier: MIT OR Apache-2.0
//! Time-series-backed scene objects.
//!
//! A [`TemporalObject`] wraps one non-empty series of [`Sample`]s and keeps
//! a single renderable synchronized to a queried scene time: resolve the
//! nearest sample, and when it differs from the displayed one, push the new
//! content and orientation through the render boundary.

use crate::error::{SceneError, SceneResult};
use crate::sample::Sample;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chronoscene_render::{ContentMeta, RenderableFactory, RenderableHandle, SourceId, VisualContent};
use futures::future::{BoxFuture, FutureExt, Shared};
use glam::Vec3;
use std::sync::Arc;

/// Renderable creation result shared between all waiters.
type SharedRenderable = Shared<BoxFuture<'static, SceneResult<RenderableHandle>>>;

/// Builds temporal objects for a data source.
///
/// Implementations own sample acquisition (fetch, decode, cadence
/// selection); the scene core only sees the finished object. Failures are
/// data/network errors and surface as [`SceneError::Source`].
#[async_trait]
pub trait ModelFactory: Send + Sync {
    /// Build a temporal object covering `[start, end]` at `cadence` for
    /// `source`, rendered at `scale`.
    async fn create_object(
        &self,
        source: SourceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cadence: Duration,
        scale: f32,
    ) -> SceneResult<TemporalObject>;
}

/// An animatable scene object whose displayed content is a function of the
/// nearest sample to the queried time.
pub struct TemporalObject {
    samples: Vec<Sample>,
    source: SourceId,
    meta: ContentMeta,
    current_time: DateTime<Utc>,
    resolved: usize,
    displayed: usize,
    renderable: SharedRenderable,
}

impl TemporalObject {
    /// Create an object from a non-empty sample series.
    ///
    /// Starts asynchronous creation of the renderable from the first
    /// sample's content and resolves the series against that sample's
    /// timestamp. Must be called within a tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if `samples` is empty. Callers guarantee non-empty data.
    pub fn new(
        samples: Vec<Sample>,
        source: SourceId,
        meta: ContentMeta,
        factory: Arc<dyn RenderableFactory>,
    ) -> Self {
        assert!(!samples.is_empty(), "temporal object requires samples");

        let renderable = spawn_creation(factory, samples[0].content.clone(), meta);
        let current_time = samples[0].timestamp;
        let mut object = Self {
            samples,
            source,
            meta,
            current_time,
            resolved: 0,
            displayed: 0,
            renderable,
        };
        object.resolved = object.nearest_index(current_time);
        object
    }

    /// Source this object's samples come from
    pub fn source(&self) -> SourceId {
        self.source
    }

    /// Render metadata baked in at construction
    pub fn meta(&self) -> ContentMeta {
        self.meta
    }

    /// The full sample series
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Last time requested by the coordinator
    pub fn current_time(&self) -> DateTime<Utc> {
        self.current_time
    }

    /// The sample currently resolved against the scene time
    pub fn resolved_sample(&self) -> &Sample {
        &self.samples[self.resolved]
    }

    /// Synchronize the object to a scene time.
    ///
    /// Resolves the nearest sample; when it differs from the displayed one,
    /// waits for the renderable and swaps content and orientation. Suspends
    /// until any in-flight creation and the swap complete; other objects'
    /// updates are unaffected.
    pub async fn set_time(&mut self, time: DateTime<Utc>) -> SceneResult<()> {
        self.current_time = time;
        let index = self.nearest_index(time);
        self.resolved = index;

        if index != self.displayed {
            let renderable = self.renderable().await?;
            let sample = &self.samples[index];
            renderable
                .set_content(&sample.content, &self.meta, self.source)
                .await?;
            renderable.orient(sample.facing_position).await?;
            tracing::debug!(
                "{}: displayed sample {} -> {} at {}",
                self.source,
                self.displayed,
                index,
                sample.timestamp
            );
            self.displayed = index;
        }
        Ok(())
    }

    /// Facing position of the resolved sample. Never suspends.
    pub fn observer_position(&self) -> Vec3 {
        self.samples[self.resolved].facing_position
    }

    /// World position of the renderable. Suspends until the handle exists.
    pub async fn position(&self) -> SceneResult<Vec3> {
        Ok(self.renderable().await?.position())
    }

    /// The renderable handle.
    ///
    /// Suspends until the initial creation finishes on first call; returns
    /// the same handle immediately thereafter.
    pub async fn renderable(&self) -> SceneResult<RenderableHandle> {
        self.renderable.clone().await
    }

    /// Forward an opacity change to the renderable.
    ///
    /// Rejects values outside `[0, 1]` with [`SceneError::InvalidOpacity`].
    pub async fn set_opacity(&self, value: f32) -> SceneResult<()> {
        if !(0.0..=1.0).contains(&value) {
            return Err(SceneError::InvalidOpacity(value));
        }
        self.renderable().await?.set_opacity(value).await?;
        Ok(())
    }

    /// Forward a stacking-order assignment to the renderable.
    pub async fn set_layer_order(&self, index: usize, total: usize) -> SceneResult<()> {
        self.renderable().await?.set_layer_order(index, total).await?;
        Ok(())
    }

    /// Index of the sample with minimal absolute distance to `time`.
    ///
    /// Linear scan; ties keep the earliest-encountered sample (replacement
    /// only on strictly smaller delta). Sample counts stay small relative
    /// to call frequency, so no index structure is kept.
    fn nearest_index(&self, time: DateTime<Utc>) -> usize {
        let mut best = 0;
        let mut best_delta = (time - self.samples[0].timestamp).abs();
        for (index, sample) in self.samples.iter().enumerate().skip(1) {
            let delta = (time - sample.timestamp).abs();
            if delta < best_delta {
                best = index;
                best_delta = delta;
            }
        }
        best
    }
}

/// Start renderable creation as a background task and share the result.
fn spawn_creation(
    factory: Arc<dyn RenderableFactory>,
    content: VisualContent,
    meta: ContentMeta,
) -> SharedRenderable {
    let task = tokio::spawn(async move { factory.create(&content, &meta).await });
    async move {
        match task.await {
            Ok(result) => result.map_err(SceneError::from),
            Err(join_error) => Err(SceneError::Task(join_error.to_string())),
        }
    }
    .boxed()
    .shared()
}
