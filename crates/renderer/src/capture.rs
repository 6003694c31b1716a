//! Downsampled JPEG stills handed to the gesture transport.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::error::{ParameterError, ParameterErrorKind};
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat, RgbaImage};

use crate::error::TransportError;
use crate::pixels::Frame;
use crate::types::CaptureOptions;

/// A JPEG still plus the dimensions it was encoded at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedStill {
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

impl EncodedStill {
    /// `data:image/jpeg;base64,...` form used on the wire.
    pub fn to_data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", STANDARD.encode(&self.jpeg))
    }

    pub fn decode_rgba(&self) -> Result<RgbaImage, ImageError> {
        Ok(image::load_from_memory_with_format(&self.jpeg, ImageFormat::Jpeg)?.to_rgba8())
    }
}

/// Height that keeps `frame`'s aspect ratio at `width`, never below one row.
pub fn scaled_height(frame_width: u32, frame_height: u32, width: u32) -> u32 {
    let height = u64::from(frame_height) * u64::from(width) / u64::from(frame_width.max(1));
    height.clamp(1, u64::from(u32::MAX)) as u32
}

pub fn encode_still(frame: &Frame<'_>, options: &CaptureOptions) -> Result<EncodedStill, TransportError> {
    let source = RgbaImage::from_raw(frame.width(), frame.height(), frame.pixels().to_vec())
        .ok_or_else(|| {
            ImageError::Parameter(ParameterError::from_kind(
                ParameterErrorKind::DimensionMismatch,
            ))
        })?;

    let width = options.width.max(1);
    let height = scaled_height(frame.width(), frame.height(), width);
    let resized = if (width, height) == source.dimensions() {
        source
    } else {
        image::imageops::resize(&source, width, height, FilterType::Triangle)
    };
    let rgb = DynamicImage::ImageRgba8(resized).to_rgb8();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, options.jpeg_quality.clamp(1, 100)).encode_image(&rgb)?;

    Ok(EncodedStill {
        width,
        height,
        jpeg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::testing;

    #[test]
    fn stills_keep_aspect_ratio() {
        assert_eq!(scaled_height(640, 480, 320), 240);
        assert_eq!(scaled_height(1280, 720, 320), 180);
        assert_eq!(scaled_height(1000, 1, 10), 1);
    }

    #[test]
    fn encodes_a_downsampled_jpeg() {
        let pixels = testing::gradient(64, 32);
        let frame = testing::frame(64, 32, &pixels);
        let options = CaptureOptions {
            width: 16,
            ..CaptureOptions::default()
        };

        let still = encode_still(&frame, &options).unwrap();
        assert_eq!((still.width, still.height), (16, 8));
        assert_eq!(&still.jpeg[..2], &[0xFF, 0xD8]);

        let decoded = still.decode_rgba().unwrap();
        assert_eq!(decoded.dimensions(), (16, 8));
    }

    #[test]
    fn data_url_is_base64_jpeg() {
        let still = EncodedStill {
            width: 1,
            height: 1,
            jpeg: vec![0xFF, 0xD8, 0xFF],
        };
        assert_eq!(still.to_data_url(), "data:image/jpeg;base64,/9j/");
    }
}
