use std::path::Path;

use anyhow::{Context, Result};
use renderer::{Frame, FramePoll, FrameSource, SourceLost};

/// Presents one decoded image as every frame.
pub struct StillImageSource {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl StillImageSource {
    pub fn open(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("failed to decode input image {}", path.display()))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        tracing::debug!(path = %path.display(), width, height, "loaded input image");
        Ok(Self {
            width,
            height,
            pixels: image.into_raw(),
        })
    }
}

impl FrameSource for StillImageSource {
    fn current_frame(&mut self) -> Result<FramePoll<'_>, SourceLost> {
        let frame = Frame::new(self.width, self.height, &self.pixels)
            .map_err(|err| SourceLost(err.to_string()))?;
        Ok(FramePoll::Ready(frame))
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

const BARS: [[u8; 3]; 7] = [
    [192, 192, 192],
    [192, 192, 0],
    [0, 192, 192],
    [0, 192, 0],
    [192, 0, 192],
    [192, 0, 0],
    [0, 0, 192],
];

/// Scrolling colour bars with a luminance ramp in the lower third.
pub struct TestPatternSource {
    width: u32,
    height: u32,
    phase: u32,
    pixels: Vec<u8>,
}

impl TestPatternSource {
    pub fn new((width, height): (u32, u32)) -> Self {
        Self {
            width,
            height,
            phase: 0,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    fn paint(&mut self) {
        let bar_width = (self.width / BARS.len() as u32).max(1);
        let ramp_start = self.height - self.height / 3;
        for y in 0..self.height {
            for x in 0..self.width {
                let index = (y as usize * self.width as usize + x as usize) * 4;
                let rgb = if y >= ramp_start {
                    let level = (x * 255 / self.width.max(1)) as u8;
                    [level, level, level]
                } else {
                    let shifted = (x + self.phase) % self.width;
                    BARS[(shifted / bar_width).min(BARS.len() as u32 - 1) as usize]
                };
                self.pixels[index..index + 3].copy_from_slice(&rgb);
                self.pixels[index + 3] = 255;
            }
        }
        self.phase = (self.phase + 1) % self.width.max(1);
    }
}

impl FrameSource for TestPatternSource {
    fn current_frame(&mut self) -> Result<FramePoll<'_>, SourceLost> {
        self.paint();
        let frame = Frame::new(self.width, self.height, &self.pixels)
            .map_err(|err| SourceLost(err.to_string()))?;
        Ok(FramePoll::Ready(frame))
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_scrolls() {
        let mut source = TestPatternSource::new((14, 6));
        let first = match source.current_frame().unwrap() {
            FramePoll::Ready(frame) => frame.pixel(3, 0),
            FramePoll::NotReady => unreachable!(),
        };
        let second = match source.current_frame().unwrap() {
            FramePoll::Ready(frame) => frame.pixel(2, 0),
            FramePoll::NotReady => unreachable!(),
        };
        assert_eq!(first, second);
        assert_eq!(source.dimensions(), (14, 6));
    }

    #[test]
    fn still_image_source_reads_pngs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let mut source = StillImageSource::open(&path).unwrap();
        assert_eq!(source.dimensions(), (3, 2));
        match source.current_frame().unwrap() {
            FramePoll::Ready(frame) => assert_eq!(frame.pixel(2, 1), [10, 20, 30, 255]),
            FramePoll::NotReady => panic!("still source is always ready"),
        }
    }

    #[test]
    fn missing_images_are_errors() {
        assert!(StillImageSource::open(Path::new("/nonexistent/still.png")).is_err());
    }
}
