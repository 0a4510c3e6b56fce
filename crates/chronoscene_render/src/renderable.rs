// SPDX-License-Identifier: MIT OR Apache-2.0
//! Capability interface of a displayed renderable and its factory.

use crate::content::{ContentMeta, SourceId, VisualContent};
use crate::error::RenderResult;
use async_trait::async_trait;
use glam::Vec3;
use std::sync::Arc;

/// Shared handle to a renderable owned by the backend.
pub type RenderableHandle = Arc<dyn Renderable>;

/// One displayed object in the scene.
///
/// Backends hand out one handle per object; the scene core drives it
/// through this interface and never mutates backend state directly.
#[async_trait]
pub trait Renderable: Send + Sync {
    /// Swap the displayed content.
    async fn set_content(
        &self,
        content: &VisualContent,
        meta: &ContentMeta,
        source: SourceId,
    ) -> RenderResult<()>;

    /// Set opacity. Callers validate the range before forwarding.
    async fn set_opacity(&self, value: f32) -> RenderResult<()>;

    /// Set the draw-order index among `total` overlapping objects.
    async fn set_layer_order(&self, index: usize, total: usize) -> RenderResult<()>;

    /// Rotate the object to face the given position.
    async fn orient(&self, toward: Vec3) -> RenderResult<()>;

    /// Current world position.
    fn position(&self) -> Vec3;
}

/// Builds renderables from content.
#[async_trait]
pub trait RenderableFactory: Send + Sync {
    /// Build a renderable displaying `content`.
    ///
    /// May involve texture upload or mesh construction; failures surface
    /// as [`crate::RenderError::Creation`].
    async fn create(&self, content: &VisualContent, meta: &ContentMeta)
        -> RenderResult<RenderableHandle>;
}
