// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene-graph, camera, resolution, and loading-indicator contracts.

use crate::content::SourceId;
use crate::renderable::RenderableHandle;
use glam::Vec3;

/// Scene-graph mutation and camera primitives.
///
/// These are fire-and-forget from the core's point of view; a backend
/// queues or applies them immediately as it sees fit.
pub trait SceneBackend: Send + Sync {
    /// Attach a renderable to the scene graph.
    fn add_model(&self, model: RenderableHandle);

    /// Detach a renderable from the scene graph.
    fn remove_model(&self, model: &RenderableHandle);

    /// Move the camera to a position.
    fn move_camera(&self, position: Vec3);

    /// Point the camera at a target.
    fn point_camera(&self, target: Vec3);
}

/// Maps a requested resolution to an image scale for a source.
pub trait ResolutionLookup: Send + Sync {
    /// World-units-per-pixel scale for `resolution` on `source`.
    fn scale_for(&self, resolution: u32, source: SourceId) -> f32;
}

/// Loading feedback shown while scene composition is in flight.
///
/// Calls are paired: every `start` is matched by a `stop`, including on
/// failure paths.
pub trait LoadingIndicator: Send + Sync {
    /// Composition work started.
    fn start(&self);

    /// Composition work finished or failed.
    fn stop(&self);
}
