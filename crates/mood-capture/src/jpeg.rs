use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::CaptureError;

pub(crate) fn encode_rgb(img: &RgbImage, quality: u8) -> Result<Vec<u8>, CaptureError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(img)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(buf)
}
