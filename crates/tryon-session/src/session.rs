use serde::Serialize;
use std::fmt;
use tryon_core::FaceShape;
use tryon_hw::Stream;

/// Where the try-on flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Idle,
    CameraActive,
    Analyzing,
    Result,
}

impl Stage {
    /// Whether a stream is held in this stage.
    pub fn holds_stream(&self) -> bool {
        !matches!(self, Stage::Idle)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Idle => "idle",
            Stage::CameraActive => "camera-active",
            Stage::Analyzing => "analyzing",
            Stage::Result => "result",
        })
    }
}

/// State of one run of the try-on flow.
///
/// Only the controller mutates a session. The stream is present exactly
/// when `stage.holds_stream()`, and `detected_shape` exactly when the
/// stage is `Result`.
#[derive(Debug)]
pub struct CaptureSession {
    pub(crate) stage: Stage,
    pub(crate) stream: Option<Stream>,
    pub(crate) detected_shape: Option<FaceShape>,
    /// Index into the catalog.
    pub(crate) selected_frame: usize,
    /// Bumped on every start, analyze and stop; analysis results carrying
    /// an older value are dropped.
    pub(crate) generation: u64,
}

impl CaptureSession {
    pub(crate) fn new(default_frame: usize) -> Self {
        Self {
            stage: Stage::Idle,
            stream: None,
            detected_shape: None,
            selected_frame: default_frame,
            generation: 0,
        }
    }

    /// Return to idle with the default selection. The caller is responsible
    /// for releasing the returned stream.
    #[must_use]
    pub(crate) fn reset(&mut self, default_frame: usize) -> Option<Stream> {
        self.stage = Stage::Idle;
        self.detected_shape = None;
        self.selected_frame = default_frame;
        self.next_generation();
        self.stream.take()
    }

    pub(crate) fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn stream(&self) -> Option<&Stream> {
        self.stream.as_ref()
    }

    pub fn detected_shape(&self) -> Option<FaceShape> {
        self.detected_shape
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
