use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;
use tracing::{debug, info, warn};

use crate::{jpeg, CameraConfig, CaptureError, EncodedFrame, FrameSource};

/// Exclusive handle on one webcam.
///
/// `open` negotiates the configured geometry, starts the stream, and pulls a
/// warm-up frame so the camera only counts as open once it actually delivers.
/// The stream is released on `close`, on drop, or never held at all when
/// `open` fails.
pub struct WebcamCapture {
    cfg: CameraConfig,
    stream: Option<Camera>,
}

impl WebcamCapture {
    pub fn new(cfg: CameraConfig) -> Self {
        Self { cfg, stream: None }
    }
}

impl FrameSource for WebcamCapture {
    fn open(&mut self) -> Result<(), CaptureError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                Resolution::new(self.cfg.width, self.cfg.height),
                FrameFormat::YUYV,
                30,
            ),
        ));

        let mut camera = Camera::new(CameraIndex::Index(self.cfg.device_index), requested)
            .map_err(|e| CaptureError::Device(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| CaptureError::Device(e.to_string()))?;

        // Warm-up: the device is only "ready to play" once a frame arrives.
        camera
            .frame()
            .map_err(|e| CaptureError::Device(e.to_string()))?;

        info!(
            "capture: stream open (device {}, {:?})",
            self.cfg.device_index,
            camera.camera_format()
        );
        self.stream = Some(camera);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut camera) = self.stream.take() {
            if let Err(e) = camera.stop_stream() {
                warn!("capture: stop_stream failed: {}", e);
            }
            info!("capture: stream closed");
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn capture_frame(&mut self) -> Result<EncodedFrame, CaptureError> {
        let camera = self.stream.as_mut().ok_or(CaptureError::NotOpen)?;

        let raw = camera.frame().map_err(|e| CaptureError::Frame(e.to_string()))?;
        let rgb = raw
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::Frame(e.to_string()))?;

        let (width, height) = (rgb.width(), rgb.height());
        let data = jpeg::encode_rgb(&rgb, self.cfg.jpeg_quality)?;
        debug!("capture: frame {}x{} -> {} bytes", width, height, data.len());

        Ok(EncodedFrame { data, width, height })
    }
}

impl Drop for WebcamCapture {
    fn drop(&mut self) {
        self.close();
    }
}

/// Human names of the attached capture devices, in index order.
pub fn list_devices() -> Result<Vec<String>, CaptureError> {
    let devices =
        nokhwa::query(ApiBackend::Auto).map_err(|e| CaptureError::Device(e.to_string()))?;
    Ok(devices.iter().map(|d| d.human_name().to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hardware-free checks: a never-opened controller must behave per the
    // close/capture contracts without touching a device.

    #[test]
    fn capture_requires_open() {
        let mut cam = WebcamCapture::new(CameraConfig::default());
        assert!(!cam.is_open());
        assert!(matches!(cam.capture_frame(), Err(CaptureError::NotOpen)));
    }

    #[test]
    fn close_is_idempotent() {
        let mut cam = WebcamCapture::new(CameraConfig::default());
        cam.close();
        cam.close();
        assert!(!cam.is_open());
        assert!(matches!(cam.capture_frame(), Err(CaptureError::NotOpen)));
    }
}
