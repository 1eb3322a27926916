//! tryon-hw — Camera access for the try-on session.
//!
//! Defines the media capture provider interface and a V4L2-backed
//! implementation.

pub mod camera;
pub mod capture;

pub use camera::{DeviceInfo, V4lCaptureProvider};
pub use capture::{CaptureError, MediaCaptureProvider, PixelFormat, Stream};
