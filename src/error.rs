use std::collections::TryReserveError;

use crate::face::FaceId;

/// Errors surfaced by the layout engine.
///
/// Broken internal invariants (split index out of range, missing rect in
/// multi-line measurement, non-positive font size) are not represented here;
/// they panic.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// A face cannot shape text. The layout drops the affected block and keeps
    /// going, so this never escapes [`TextLayout::perform`](crate::text::TextLayout::perform).
    #[error("face {face:?} cannot shape text: {reason}")]
    ResourceUnavailable { face: FaceId, reason: &'static str },

    /// Growing a text, rect, glyph, run or line buffer failed.
    #[error("buffer allocation failed: {0}")]
    Allocation(#[from] TryReserveError),
}

pub type Result<T, E = LayoutError> = std::result::Result<T, E>;
