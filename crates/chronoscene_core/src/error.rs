// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the temporal scene core.

use crate::coordinator::EntryId;
use chronoscene_render::{RenderError, SourceId};
use thiserror::Error;

/// Top-level error type for scene operations.
///
/// `Clone` is required: handle-creation results are shared between every
/// caller awaiting the same renderable.
#[derive(Debug, Clone, Error)]
pub enum SceneError {
    /// A query that requires entries was made against an empty scene
    #[error("scene has no entries")]
    EmptyScene,

    /// An operation referenced an entry id that is not registered
    #[error("unknown entry id {0}")]
    UnknownEntry(EntryId),

    /// Opacity outside the accepted `[0, 1]` range
    #[error("opacity {0} outside [0, 1]")]
    InvalidOpacity(f32),

    /// Data source failed to produce an object
    #[error("{id}: {message}")]
    Source {
        /// Source that failed
        id: SourceId,
        /// Collaborator-supplied detail
        message: String,
    },

    /// Render boundary failure
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Background handle-creation task died
    #[error("renderable creation task failed: {0}")]
    Task(String),
}

/// Result type alias for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(SceneError::EmptyScene.to_string(), "scene has no entries");
        assert_eq!(
            SceneError::UnknownEntry(EntryId(7)).to_string(),
            "unknown entry id 7"
        );
        assert_eq!(
            SceneError::InvalidOpacity(1.5).to_string(),
            "opacity 1.5 outside [0, 1]"
        );
    }

    #[test]
    fn test_render_error_converts() {
        let err: SceneError = RenderError::Creation("no device".into()).into();
        assert!(matches!(err, SceneError::Render(_)));
    }
}
