mod jpeg;
pub mod webcam;

use base64::Engine;

pub use webcam::{list_devices, WebcamCapture};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CameraConfig {
    /// Host device index (0 = first attached camera).
    #[serde(default)]
    pub device_index: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Lossy JPEG quality in percent.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_width() -> u32 { 640 }
fn default_height() -> u32 { 480 }
fn default_jpeg_quality() -> u8 { 90 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: default_width(),
            height: default_height(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

/// One still image, JPEG-encoded, produced fresh per capture.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncodedFrame {
    /// Text-safe form used on the wire.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Device missing, busy, or permission denied.
    #[error("camera unavailable: {0}")]
    Device(String),
    #[error("camera is not open")]
    NotOpen,
    #[error("frame read failed: {0}")]
    Frame(String),
    #[error("jpeg encode failed: {0}")]
    Encode(String),
}

/// Capture seam. The session controller only sees this trait, so tests can
/// substitute a scripted source for real hardware.
pub trait FrameSource: Send {
    /// Acquire the device stream. No-op when already open.
    fn open(&mut self) -> Result<(), CaptureError>;
    /// Release the device stream. No-op when already closed.
    fn close(&mut self);
    fn is_open(&self) -> bool;
    /// Requires an open stream.
    fn capture_frame(&mut self) -> Result<EncodedFrame, CaptureError>;
}
