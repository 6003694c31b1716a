use anyhow::{bail, Context as AnyhowContext, Result};

use crate::types::{AdapterProfile, GpuOptions};

pub(crate) const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Device, queue and the offscreen target every effect draws into.
pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub size: (u32, u32),
    pub adapter_profile: AdapterProfile,
    pub target: wgpu::Texture,
    pub target_view: wgpu::TextureView,
    pub readback: Readback,
}

/// Persistent map-read buffer with rows padded to the copy alignment.
pub(crate) struct Readback {
    pub buffer: wgpu::Buffer,
    pub unpadded_bytes_per_row: u32,
    pub padded_bytes_per_row: u32,
}

fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

impl GpuContext {
    pub(crate) fn new(size: (u32, u32), options: &GpuOptions) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: options.power.to_wgpu(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let adapter_info = adapter.get_info();
        let limits = adapter.limits();
        let adapter_profile = AdapterProfile::from_wgpu(&adapter_info);
        let is_software = adapter_profile.is_software();
        tracing::debug!(
            name = %adapter_profile.name,
            backend = ?adapter_profile.backend,
            device_type = ?adapter_profile.device_type,
            is_software,
            "selected GPU adapter"
        );
        if is_software && !options.allow_software {
            bail!(
                "adapter '{}' is a software rasterizer and software rendering is disabled",
                adapter_profile.name
            );
        }

        let max_dimension = limits.max_texture_dimension_2d;
        let (width, height) = (size.0.max(1), size.1.max(1));
        if width > max_dimension || height > max_dimension {
            bail!(
                "GPU max texture dimension is {max_dimension}, requested surface is {width}x{height}"
            );
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("glitch device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: options.memory.to_wgpu(),
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("effect target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let unpadded_bytes_per_row = width * 4;
        let padded_bytes_per_row =
            align_to(unpadded_bytes_per_row, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("effect readback"),
            size: u64::from(padded_bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Ok(Self {
            _instance: instance,
            device,
            queue,
            size: (width, height),
            adapter_profile,
            target,
            target_view,
            readback: Readback {
                buffer,
                unpadded_bytes_per_row,
                padded_bytes_per_row,
            },
        })
    }
}

impl Readback {
    /// Copies padded rows from `mapped` into a tightly packed RGBA destination.
    pub(crate) fn unpad_into(&self, mapped: &[u8], height: u32, dest: &mut [u8]) {
        unpad_rows(
            mapped,
            self.padded_bytes_per_row as usize,
            self.unpadded_bytes_per_row as usize,
            height as usize,
            dest,
        );
    }
}

fn unpad_rows(mapped: &[u8], padded: usize, unpadded: usize, height: usize, dest: &mut [u8]) {
    for (row, out) in dest.chunks_exact_mut(unpadded).take(height).enumerate() {
        let start = row * padded;
        out.copy_from_slice(&mapped[start..start + unpadded]);
    }
}
