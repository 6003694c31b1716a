use std::path::PathBuf;

use glitchconfig::{GlitchConfig, MemorySetting, PowerSetting};

use crate::effects::EffectParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

impl GpuPowerPreference {
    pub(crate) fn to_wgpu(self) -> wgpu::PowerPreference {
        match self {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuMemoryMode {
    #[default]
    Balanced,
    Performance,
}

impl GpuMemoryMode {
    pub(crate) fn to_wgpu(self) -> wgpu::MemoryHints {
        match self {
            GpuMemoryMode::Balanced => wgpu::MemoryHints::MemoryUsage,
            GpuMemoryMode::Performance => wgpu::MemoryHints::Performance,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpuOptions {
    pub power: GpuPowerPreference,
    pub memory: GpuMemoryMode,
    /// Accept software rasterizers (llvmpipe, WARP) as a GPU path.
    pub allow_software: bool,
}

/// Parameters of the downsampled stills handed to the gesture transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    pub interval: u32,
    pub width: u32,
    pub jpeg_quality: u8,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            interval: 5,
            width: 320,
            jpeg_quality: 80,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPath {
    Gpu,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
}

impl AdapterProfile {
    pub fn from_wgpu(info: &wgpu::AdapterInfo) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub surface_size: (u32, u32),
    pub prefer_gpu: bool,
    /// Optional refresh cap; `None` renders on every callback.
    pub target_fps: Option<f32>,
    pub gpu: GpuOptions,
    pub capture: CaptureOptions,
    pub params: EffectParams,
    /// Seed for the effect noise generator; entropy when absent.
    pub noise_seed: Option<u64>,
    pub shader_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            prefer_gpu: true,
            target_fps: None,
            gpu: GpuOptions::default(),
            capture: CaptureOptions::default(),
            params: EffectParams::default(),
            noise_seed: None,
            shader_dir: None,
        }
    }
}

impl EngineConfig {
    pub fn from_config(config: &GlitchConfig) -> Self {
        let mut params = EffectParams::default();
        params.apply_overrides(&config.effects);
        Self {
            surface_size: config.engine.surface,
            prefer_gpu: config.engine.prefer_gpu,
            target_fps: config.engine.target_fps,
            gpu: GpuOptions {
                power: match config.gpu.power {
                    PowerSetting::Low => GpuPowerPreference::Low,
                    PowerSetting::High => GpuPowerPreference::High,
                },
                memory: match config.gpu.memory {
                    MemorySetting::Balanced => GpuMemoryMode::Balanced,
                    MemorySetting::Performance => GpuMemoryMode::Performance,
                },
                allow_software: config.gpu.allow_software,
            },
            capture: CaptureOptions {
                interval: config.capture.interval,
                width: config.capture.width,
                jpeg_quality: config.capture.jpeg_quality,
            },
            params,
            noise_seed: config.engine.noise_seed,
            shader_dir: config.gpu.shader_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_follows_file_settings() {
        let config = GlitchConfig::from_toml_str(
            r#"
version = 1
[engine]
prefer_gpu = false
surface = "320x240"
noise_seed = 11
[gpu]
power = "low"
allow_software = true
[capture]
interval = 3
[effects.liquify]
intensity = 0.0
"#,
        )
        .unwrap();
        let engine = EngineConfig::from_config(&config);
        assert!(!engine.prefer_gpu);
        assert_eq!(engine.surface_size, (320, 240));
        assert_eq!(engine.noise_seed, Some(11));
        assert_eq!(engine.gpu.power, GpuPowerPreference::Low);
        assert!(engine.gpu.allow_software);
        assert_eq!(engine.capture.interval, 3);
        assert_eq!(engine.capture.width, 320);
        assert_eq!(engine.params.liquify.intensity, 0.0);
        assert_eq!(engine.params.liquify.wavelength, 15.0);
    }
}
