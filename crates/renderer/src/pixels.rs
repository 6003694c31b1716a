//! RGBA8 frame views and the mutable destination buffer effects write into.

pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame dimensions must be non-zero (got {width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("{width}x{height} frame needs {expected} bytes, got {actual}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL
}

/// Borrowed view of one video frame. Row-major RGBA8, top-left origin.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    width: u32,
    height: u32,
    pixels: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn new(width: u32, height: u32, pixels: &'a [u8]) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Empty { width, height });
        }
        let expected = byte_len(width, height);
        if pixels.len() != expected {
            return Err(FrameError::SizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &'a [u8] {
        self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let index = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.pixels[index..index + BYTES_PER_PIXEL]);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; byte_len(width, height)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn as_frame(&self) -> Frame<'_> {
        Frame {
            width: self.width,
            height: self.height,
            pixels: &self.data,
        }
    }

    /// Reallocates when the dimensions change. Contents are unspecified afterwards.
    pub fn ensure_size(&mut self, width: u32, height: u32) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.data.resize(byte_len(width, height), 0);
        }
    }

    pub fn copy_from(&mut self, frame: &Frame<'_>) {
        self.ensure_size(frame.width, frame.height);
        self.data.copy_from_slice(frame.pixels);
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn fill(&mut self, rgba: [u8; 4]) {
        for pixel in self.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            pixel.copy_from_slice(&rgba);
        }
    }

    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let index = self.index(x, y);
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.data[index..index + BYTES_PER_PIXEL]);
        out
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let index = self.index(x, y);
        self.data[index..index + BYTES_PER_PIXEL].copy_from_slice(&rgba);
    }

    /// Source-over blend of an RGB colour at `alpha` onto one pixel.
    pub fn blend_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3], alpha: f32) {
        let index = self.index(x, y);
        blend_into(&mut self.data[index..index + BYTES_PER_PIXEL], rgb, alpha);
    }

    pub fn wash(&mut self, rgb: [u8; 3], alpha: f32) {
        for pixel in self.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            blend_into(pixel, rgb, alpha);
        }
    }

    pub fn wash_row(&mut self, y: u32, rgb: [u8; 3], alpha: f32) {
        let start = self.index(0, y);
        let end = start + self.width as usize * BYTES_PER_PIXEL;
        for pixel in self.data[start..end].chunks_exact_mut(BYTES_PER_PIXEL) {
            blend_into(pixel, rgb, alpha);
        }
    }
}

/// Canvas-style source-over compositing of a straight-alpha colour onto an RGBA8 pixel.
pub(crate) fn blend_into(dst: &mut [u8], rgb: [u8; 3], alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let dst_alpha = dst[3] as f32 / 255.0;
    let out_alpha = alpha + dst_alpha * (1.0 - alpha);
    if out_alpha <= 0.0 {
        return;
    }
    for channel in 0..3 {
        let src = rgb[channel] as f32;
        let below = dst[channel] as f32;
        let value = (src * alpha + below * dst_alpha * (1.0 - alpha)) / out_alpha;
        dst[channel] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rejects_wrong_length() {
        let pixels = vec![0u8; 10];
        let err = Frame::new(2, 2, &pixels).unwrap_err();
        assert_eq!(
            err,
            FrameError::SizeMismatch {
                width: 2,
                height: 2,
                expected: 16,
                actual: 10
            }
        );
        assert!(matches!(
            Frame::new(0, 4, &[]),
            Err(FrameError::Empty { .. })
        ));
    }

    #[test]
    fn blend_over_opaque_pixel() {
        let mut buffer = PixelBuffer::new(1, 1);
        buffer.fill([200, 100, 0, 255]);
        buffer.blend_pixel(0, 0, [0, 0, 0], 0.1);
        assert_eq!(buffer.pixel(0, 0), [180, 90, 0, 255]);
    }

    #[test]
    fn blend_over_transparent_pixel_takes_source_colour() {
        let mut buffer = PixelBuffer::new(1, 1);
        buffer.blend_pixel(0, 0, [0, 255, 255], 0.5);
        assert_eq!(buffer.pixel(0, 0), [0, 255, 255, 128]);
    }

    #[test]
    fn copy_from_resizes() {
        let pixels: Vec<u8> = (0..24).collect();
        let frame = Frame::new(3, 2, &pixels).unwrap();
        let mut buffer = PixelBuffer::new(1, 1);
        buffer.copy_from(&frame);
        assert_eq!((buffer.width(), buffer.height()), (3, 2));
        assert_eq!(buffer.as_bytes(), pixels.as_slice());
        assert_eq!(buffer.pixel(2, 1), [20, 21, 22, 23]);
    }
}
