// SPDX-License-Identifier: MIT OR Apache-2.0
//! Discrete observation samples.

use chrono::{DateTime, Utc};
use chronoscene_render::VisualContent;
use glam::Vec3;

/// One timestamped observation.
///
/// Immutable once built; a [`crate::TemporalObject`] owns an ordered,
/// non-empty sequence of these and picks the one nearest to the queried
/// scene time.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Observation time
    pub timestamp: DateTime<Utc>,
    /// Decoded image payload for this observation
    pub content: VisualContent,
    /// Position the displayed object faces at this observation
    pub facing_position: Vec3,
}

impl Sample {
    /// Create a sample
    pub fn new(timestamp: DateTime<Utc>, content: VisualContent, facing_position: Vec3) -> Self {
        Self {
            timestamp,
            content,
            facing_position,
        }
    }
}
