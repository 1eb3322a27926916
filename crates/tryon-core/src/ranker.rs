//! Recommendation ranking over a frame catalog.
//!
//! Pure functions: the output depends only on the catalog order and the
//! detected shape.

use crate::types::{FaceShape, Frame};

/// Order frames for display.
///
/// With no shape the catalog order is returned unchanged. With a shape,
/// frames recommended for it come first; both groups keep their original
/// relative order.
pub fn rank(frames: &[Frame], shape: Option<FaceShape>) -> Vec<&Frame> {
    let mut ordered: Vec<&Frame> = frames.iter().collect();
    if let Some(shape) = shape {
        // slice::sort_by_key is stable
        ordered.sort_by_key(|f| !f.is_recommended_for(shape));
    }
    ordered
}

/// First frame in catalog order recommended for `shape`.
///
/// Equal to the head of `rank(frames, Some(shape))` whenever any frame matches.
pub fn best_match(frames: &[Frame], shape: FaceShape) -> Option<&Frame> {
    frames.iter().find(|f| f.is_recommended_for(shape))
}

/// Whether `frame` should be flagged as a recommendation. False when no
/// shape has been detected.
pub fn is_recommended(frame: &Frame, shape: Option<FaceShape>) -> bool {
    shape.is_some_and(|s| frame.is_recommended_for(s))
}
