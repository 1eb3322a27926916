//! V4L2 camera provider via the `v4l` crate.

use crate::capture::{CaptureError, MediaCaptureProvider, PixelFormat, Stream};
use std::collections::HashMap;
use std::path::Path;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

const REQUESTED_WIDTH: u32 = 640;
const REQUESTED_HEIGHT: u32 = 480;

/// Info about a discovered V4L2 device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// Opens the configured V4L2 device once per acquired stream.
///
/// Each open device is held until its stream is released; dropping the
/// provider closes anything still open.
pub struct V4lCaptureProvider {
    device_path: String,
    next_id: u64,
    open: HashMap<u64, Device>,
}

impl V4lCaptureProvider {
    pub fn new(device_path: impl Into<String>) -> Self {
        Self {
            device_path: device_path.into(),
            next_id: 1,
            open: HashMap::new(),
        }
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Number of streams currently held open.
    pub fn open_streams(&self) -> usize {
        self.open.len()
    }

    fn open_device(&self) -> Result<(Device, u32, u32, PixelFormat), CaptureError> {
        let device_path = self.device_path.as_str();
        if !Path::new(device_path).exists() {
            return Err(CaptureError::Unavailable(format!(
                "device not found: {device_path}"
            )));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            if e.to_string().contains("busy") || e.to_string().contains("EBUSY") {
                CaptureError::DeviceBusy
            } else {
                CaptureError::Unavailable(format!("{device_path}: {e}"))
            }
        })?;

        let caps = device.query_caps().map_err(|e| {
            CaptureError::Unavailable(format!("failed to query capabilities: {e}"))
        })?;

        tracing::info!(
            device = device_path,
            driver = %caps.driver,
            card = %caps.card,
            "opened camera"
        );

        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            return Err(CaptureError::Unavailable(format!(
                "{device_path} is not a video capture device"
            )));
        }

        let mut fmt = device.format().map_err(|e| {
            CaptureError::FormatNegotiationFailed(format!("failed to get format: {e}"))
        })?;

        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = REQUESTED_WIDTH;
        fmt.height = REQUESTED_HEIGHT;

        let negotiated = device.set_format(&fmt).map_err(|e| {
            CaptureError::FormatNegotiationFailed(format!("failed to set format: {e}"))
        })?;

        let fourcc = negotiated.fourcc;
        let pixel_format = if fourcc == FourCC::new(b"YUYV") {
            PixelFormat::Yuyv
        } else if fourcc == FourCC::new(b"MJPG") {
            PixelFormat::Mjpeg
        } else if fourcc == FourCC::new(b"GREY") {
            PixelFormat::Grey
        } else {
            return Err(CaptureError::FormatNegotiationFailed(format!(
                "unsupported pixel format: {fourcc:?} (need YUYV, MJPG, or GREY)"
            )));
        };

        tracing::info!(
            width = negotiated.width,
            height = negotiated.height,
            fourcc = ?fourcc,
            "negotiated format"
        );

        Ok((device, negotiated.width, negotiated.height, pixel_format))
    }

    /// Capture devices under `/dev`, ordered by node number.
    ///
    /// Nodes that cannot be opened or that only expose metadata/output
    /// interfaces are skipped.
    pub fn list_devices() -> Vec<DeviceInfo> {
        let Ok(entries) = std::fs::read_dir("/dev") else {
            return Vec::new();
        };

        let mut nodes: Vec<(u32, String)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let index = video_node_index(&name)?;
                Some((index, format!("/dev/{name}")))
            })
            .collect();
        nodes.sort_unstable_by_key(|(index, _)| *index);

        nodes
            .into_iter()
            .filter_map(|(_, path)| probe_capture_device(path))
            .collect()
    }
}

/// `video7` → `Some(7)`; anything else → `None`.
fn video_node_index(name: &str) -> Option<u32> {
    name.strip_prefix("video")?.parse().ok()
}

fn probe_capture_device(path: String) -> Option<DeviceInfo> {
    let dev = Device::with_path(&path).ok()?;
    let caps = dev.query_caps().ok()?;
    if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
        tracing::debug!(device = %path, "skipping non-capture node");
        return None;
    }
    Some(DeviceInfo {
        path,
        name: caps.card,
        driver: caps.driver,
        bus: caps.bus,
    })
}

impl MediaCaptureProvider for V4lCaptureProvider {
    fn acquire(&mut self) -> Result<Stream, CaptureError> {
        let (device, width, height, pixel_format) = self.open_device()?;

        let id = self.next_id;
        self.next_id += 1;
        self.open.insert(id, device);

        tracing::debug!(stream = id, device = %self.device_path, "stream acquired");
        Ok(Stream {
            id,
            device: self.device_path.clone(),
            width,
            height,
            pixel_format,
        })
    }

    fn release(&mut self, stream: Stream) {
        match self.open.remove(&stream.id) {
            Some(device) => {
                drop(device);
                tracing::debug!(stream = stream.id, device = %stream.device, "stream released");
            }
            None => {
                tracing::debug!(stream = stream.id, "release of unknown stream ignored");
            }
        }
    }
}
