// SPDX-License-Identifier: MIT OR Apache-2.0
//! Content value types handed across the render boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of an originating data source.
///
/// Opaque to the scene core; backends and lookups give it meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub u32);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source-{}", self.0)
    }
}

/// Decoded image payload for one observation.
///
/// The scene core never inspects the bytes; it only forwards them to the
/// render backend. The identity token distinguishes payloads without
/// comparing pixel data.
#[derive(Debug, Clone)]
pub struct VisualContent {
    /// Identity token for this payload
    pub id: Uuid,
    /// RGBA pixel data
    pub pixels: Arc<[u8]>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl VisualContent {
    /// Create a content payload from raw RGBA bytes
    pub fn new(pixels: impl Into<Arc<[u8]>>, width: u32, height: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            pixels: pixels.into(),
            width,
            height,
        }
    }
}

impl PartialEq for VisualContent {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for VisualContent {}

/// Metadata a backend needs to build or update a renderable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentMeta {
    /// Image scale factor (world units per pixel)
    pub scale: f32,
}

impl ContentMeta {
    /// Create metadata with the given image scale
    pub fn new(scale: f32) -> Self {
        Self { scale }
    }
}
