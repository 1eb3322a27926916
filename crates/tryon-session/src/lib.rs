//! tryon-session — Capture session state machine for the virtual try-on.
//!
//! The [`Controller`] owns one [`CaptureSession`], mediates camera access
//! through a [`tryon_hw::MediaCaptureProvider`], and hands detected face
//! shapes to the ranker in `tryon-core`. Renderers observe it through
//! [`SessionSnapshot`]s and never mutate it.

pub mod config;
pub mod controller;
pub mod session;
pub mod snapshot;

pub use config::Config;
pub use controller::{AnalysisTicket, Completion, Controller, Operation, SessionError};
pub use session::{CaptureSession, Stage};
pub use snapshot::{RankedEntry, SessionSnapshot};
