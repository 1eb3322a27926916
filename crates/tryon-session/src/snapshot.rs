//! Read-only view of a session for renderers.

use crate::session::Stage;
use serde::Serialize;
use tryon_core::{FaceShape, Frame};

/// One catalog row in display order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub frame: Frame,
    /// The frame suits the detected shape. Always false before detection.
    pub recommended: bool,
    pub selected: bool,
}

/// Everything a renderer needs to draw the try-on section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub stage: Stage,
    pub detected_shape: Option<FaceShape>,
    pub selected_frame: String,
    pub frames: Vec<RankedEntry>,
}

impl SessionSnapshot {
    pub fn selected(&self) -> Option<&RankedEntry> {
        self.frames.iter().find(|e| e.selected)
    }
}
