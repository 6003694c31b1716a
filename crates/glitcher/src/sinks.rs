use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use renderer::{DisplaySurface, GestureEvent, Notice, PixelBuffer, RenderPath, SessionObserver};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PresentStats {
    pub presented: u64,
    pub gpu: u64,
    pub fallback: u64,
}

#[derive(Default)]
struct SinkState {
    output_dir: Option<PathBuf>,
    stats: PresentStats,
    error: Option<anyhow::Error>,
}

/// Display surface that counts presented frames and optionally writes them as PNGs.
#[derive(Clone, Default)]
pub struct FrameSink {
    state: Rc<RefCell<SinkState>>,
}

impl FrameSink {
    pub fn new(output_dir: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = output_dir.as_ref() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        }
        Ok(Self {
            state: Rc::new(RefCell::new(SinkState {
                output_dir,
                ..SinkState::default()
            })),
        })
    }

    pub fn stats(&self) -> PresentStats {
        self.state.borrow().stats
    }

    /// First write failure, if any. Presenting stops writing after it.
    pub fn take_error(&self) -> Option<anyhow::Error> {
        self.state.borrow_mut().error.take()
    }
}

impl DisplaySurface for FrameSink {
    fn present(&mut self, frame: &PixelBuffer, path: RenderPath) {
        let mut state = self.state.borrow_mut();
        let index = state.stats.presented;
        state.stats.presented += 1;
        match path {
            RenderPath::Gpu => state.stats.gpu += 1,
            RenderPath::Fallback => state.stats.fallback += 1,
        }

        if state.error.is_some() {
            return;
        }
        let Some(dir) = state.output_dir.as_ref() else {
            return;
        };
        let file = dir.join(format!("frame_{index:05}.png"));
        let written = image::save_buffer(
            &file,
            frame.as_bytes(),
            frame.width(),
            frame.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|err| anyhow!("failed to write {}: {err}", file.display()));
        if let Err(err) = written {
            tracing::warn!(error = %err, "frame output disabled");
            state.error = Some(err);
        }
    }
}

/// Reports session notices and rates through `tracing`.
#[derive(Debug, Default)]
pub struct LogObserver;

impl SessionObserver for LogObserver {
    fn fps(&mut self, fps: u32) {
        tracing::debug!(fps, "frames in the last second");
    }

    fn gestures(&mut self, event: &GestureEvent) {
        let held: Vec<&str> = event.held().collect();
        tracing::info!(?held, suggested = ?event.active_effects, "gesture event");
    }

    fn notice(&mut self, notice: &Notice) {
        match notice {
            Notice::GpuUnavailable(reason) => {
                tracing::info!(%reason, "GPU unavailable; rendering on the CPU")
            }
            Notice::GpuFallback(reason) => {
                tracing::warn!(%reason, "GPU failed; switched to the CPU for this session")
            }
            Notice::TransportDown(reason) => tracing::warn!(%reason, "gesture transport down"),
            Notice::SessionLost(reason) => tracing::warn!(%reason, "frame source lost"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_counts_and_writes_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FrameSink::new(Some(dir.path().join("frames"))).unwrap();
        let mut frame = PixelBuffer::new(4, 3);
        frame.fill([200, 10, 10, 255]);

        sink.present(&frame, RenderPath::Fallback);
        sink.present(&frame, RenderPath::Gpu);

        assert_eq!(
            sink.stats(),
            PresentStats {
                presented: 2,
                gpu: 1,
                fallback: 1
            }
        );
        let written = image::open(dir.path().join("frames/frame_00001.png"))
            .unwrap()
            .to_rgba8();
        assert_eq!(written.dimensions(), (4, 3));
        assert_eq!(written.get_pixel(0, 0).0, [200, 10, 10, 255]);
        assert!(sink.take_error().is_none());
    }
}
