//! Media capture provider interface.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
}

/// Negotiated pixel format for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed (2 bytes/pixel).
    Yuyv,
    /// Motion JPEG, the usual format for webcams at higher resolutions.
    Mjpeg,
    /// 8-bit grayscale.
    Grey,
}

/// Handle to a live video stream.
///
/// The handle is a descriptor only; the provider that issued it owns the
/// device. Handing it back through [`MediaCaptureProvider::release`] closes
/// the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub id: u64,
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
}

/// Source of live video streams.
pub trait MediaCaptureProvider {
    /// Open a stream. Denied or absent devices are reported, never retried.
    fn acquire(&mut self) -> Result<Stream, CaptureError>;

    /// Close a stream. Releasing a stream that is unknown or already
    /// released is a no-op.
    fn release(&mut self, stream: Stream);
}

impl<P: MediaCaptureProvider + ?Sized> MediaCaptureProvider for Box<P> {
    fn acquire(&mut self) -> Result<Stream, CaptureError> {
        (**self).acquire()
    }

    fn release(&mut self, stream: Stream) {
        (**self).release(stream)
    }
}
