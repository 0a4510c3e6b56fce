// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors crossing the render boundary.

use thiserror::Error;

/// Errors a render backend can surface to the scene core.
///
/// `Clone` is required: creation results are observed through a shared
/// future by every caller waiting on the same handle.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// Backend failed to build a renderable from content
    #[error("failed to build renderable: {0}")]
    Creation(String),
    /// Backend rejected an update against an existing renderable
    #[error("failed to update renderable: {0}")]
    Update(String),
}

/// Result type alias for render-boundary operations.
pub type RenderResult<T> = Result<T, RenderError>;
