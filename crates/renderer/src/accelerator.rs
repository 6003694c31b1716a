//! Seam between the render loop and whatever applies effects on the GPU.

use selector::EffectKind;
use tracing::info;

use crate::clock::AnimationClock;
use crate::effects::EffectParams;
use crate::error::EngineError;
use crate::gpu::GpuEngine;
use crate::pixels::{Frame, PixelBuffer};
use crate::shaders::ShaderPrograms;
use crate::types::{AdapterProfile, GpuOptions};

/// An initialised accelerated path. Dropping it releases its resources.
pub trait Accelerator {
    /// Rebuilds the pipeline for `effects`; takes effect on the next render.
    fn set_active_effects(&mut self, effects: &[EffectKind]) -> Result<(), EngineError>;

    /// Renders `frame` into `dest`, advancing `clock` exactly once.
    fn render_frame(
        &mut self,
        frame: &Frame<'_>,
        clock: &mut AnimationClock,
        dest: &mut PixelBuffer,
    ) -> Result<(), EngineError>;

    fn profile(&self) -> Option<&AdapterProfile> {
        None
    }
}

/// Produces accelerators on demand so each session can retry acquisition.
pub trait AcceleratorFactory {
    fn initialize(
        &mut self,
        surface: (u32, u32),
        programs: &ShaderPrograms,
    ) -> Result<Box<dyn Accelerator>, EngineError>;
}

impl Accelerator for GpuEngine {
    fn set_active_effects(&mut self, effects: &[EffectKind]) -> Result<(), EngineError> {
        GpuEngine::set_active_effects(self, effects)
    }

    fn render_frame(
        &mut self,
        frame: &Frame<'_>,
        clock: &mut AnimationClock,
        dest: &mut PixelBuffer,
    ) -> Result<(), EngineError> {
        GpuEngine::render_frame(self, frame, clock, dest)
    }

    fn profile(&self) -> Option<&AdapterProfile> {
        Some(self.adapter_profile())
    }
}

/// Factory for the wgpu-backed engine. Loads every catalog program after the device is up.
#[derive(Debug, Clone, Default)]
pub struct WgpuAccelerator {
    options: GpuOptions,
    params: EffectParams,
}

impl WgpuAccelerator {
    pub fn new(options: GpuOptions, params: EffectParams) -> Self {
        Self { options, params }
    }
}

impl AcceleratorFactory for WgpuAccelerator {
    fn initialize(
        &mut self,
        surface: (u32, u32),
        programs: &ShaderPrograms,
    ) -> Result<Box<dyn Accelerator>, EngineError> {
        let mut engine = GpuEngine::initialize(surface, &self.options, self.params)?;
        let names: Vec<&str> = EffectKind::ALL.iter().map(|kind| kind.shader_name()).collect();
        let loaded = engine.load_shader_programs(programs, names.iter().copied());
        info!(
            adapter = %engine.adapter_profile().name,
            loaded,
            available = names.len(),
            "GPU acceleration enabled"
        );
        Ok(Box::new(engine))
    }
}

/// Factory that never yields an accelerator; forces the CPU path.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuOnly;

impl AcceleratorFactory for CpuOnly {
    fn initialize(
        &mut self,
        _surface: (u32, u32),
        _programs: &ShaderPrograms,
    ) -> Result<Box<dyn Accelerator>, EngineError> {
        Err(EngineError::gpu_unavailable("GPU acceleration disabled"))
    }
}
