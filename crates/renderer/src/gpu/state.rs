use std::collections::HashMap;

use selector::EffectKind;
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

use crate::clock::AnimationClock;
use crate::compile::{compile_effect_module, scoped, PASSTHROUGH_BODY};
use crate::effects::EffectParams;
use crate::error::EngineError;
use crate::pixels::{Frame, PixelBuffer};
use crate::shaders::ShaderPrograms;
use crate::types::{AdapterProfile, GpuOptions};

use super::context::GpuContext;
use super::pipeline::{EffectPipeline, PipelineLayouts};
use super::uniforms::EffectUniforms;

const PASSTHROUGH: &str = "passthrough";

pub struct GpuEngine {
    context: GpuContext,
    layouts: PipelineLayouts,
    uniforms: EffectUniforms,
    uniform_buffer: wgpu::Buffer,
    modules: HashMap<String, wgpu::ShaderModule>,
    passthrough: wgpu::ShaderModule,
    params: EffectParams,
    pipeline: EffectPipeline,
}

impl GpuEngine {
    pub fn initialize(
        surface: (u32, u32),
        options: &GpuOptions,
        params: EffectParams,
    ) -> Result<Self, EngineError> {
        let context = GpuContext::new(surface, options).map_err(EngineError::gpu_unavailable)?;
        let device = &context.device;

        let layouts = PipelineLayouts::new(device);
        let uniforms = EffectUniforms::new(context.size.0, context.size.1);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("effect uniforms"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let passthrough = compile_effect_module(device, PASSTHROUGH, PASSTHROUGH_BODY)
            .map_err(EngineError::gpu_unavailable)?;
        let pipeline = scoped(device, || {
            EffectPipeline::new(device, &layouts, &passthrough, PASSTHROUGH)
        })
        .map_err(EngineError::gpu_unavailable)?;

        debug!(
            adapter = %context.adapter_profile.name,
            width = context.size.0,
            height = context.size.1,
            "GPU pipeline manager ready"
        );

        Ok(Self {
            context,
            layouts,
            uniforms,
            uniform_buffer,
            modules: HashMap::new(),
            passthrough,
            params,
            pipeline,
        })
    }

    pub fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    pub fn load_shader_programs<'a>(
        &mut self,
        programs: &ShaderPrograms,
        names: impl IntoIterator<Item = &'a str>,
    ) -> usize {
        let mut loaded = 0;
        for name in names {
            let program = match programs.resolve(name) {
                Ok(program) => program,
                Err(err) => {
                    warn!(program = name, error = %err, "skipping shader program");
                    continue;
                }
            };
            match compile_effect_module(&self.context.device, name, &program.body) {
                Ok(module) => {
                    debug!(program = name, origin = ?program.origin, "loaded shader program");
                    self.modules.insert(name.to_string(), module);
                    loaded += 1;
                }
                Err(err) => warn!(program = name, error = %err, "skipping shader program"),
            }
        }
        loaded
    }

    // Falls back to passthrough when the first effect has no loaded program.
    pub fn set_active_effects(&mut self, effects: &[EffectKind]) -> Result<(), EngineError> {
        let (program, module, block) = match effects.first() {
            Some(kind) => match self.modules.get(kind.shader_name()) {
                Some(module) => (kind.shader_name(), module, self.params.shader_block(*kind)),
                None => {
                    debug!(effect = %kind, "no GPU program loaded; using passthrough");
                    (PASSTHROUGH, &self.passthrough, [[0.0; 4]; 2])
                }
            },
            None => (PASSTHROUGH, &self.passthrough, [[0.0; 4]; 2]),
        };

        let device = &self.context.device;
        let layouts = &self.layouts;
        let pipeline = scoped(device, || EffectPipeline::new(device, layouts, module, program))
            .map_err(|err| {
                EngineError::TransientRenderFailure(format!(
                    "failed to build pipeline for '{program}': {err}"
                ))
            })?;
        debug!(program, composition = ?effects, "rebuilt effect pipeline");
        self.pipeline = pipeline;
        self.uniforms.set_params(block);
        Ok(())
    }

    pub fn render_frame(
        &mut self,
        frame: &Frame<'_>,
        clock: &mut AnimationClock,
        dest: &mut PixelBuffer,
    ) -> Result<(), EngineError> {
        let time = clock.tick();
        self.uniforms.set_time(time);

        let device = &self.context.device;
        let queue = &self.context.queue;
        let (width, height) = self.context.size;

        let submitted = scoped(device, || {
            let texture = device.create_texture_with_data(
                queue,
                &wgpu::TextureDescriptor {
                    label: Some("frame texture"),
                    size: wgpu::Extent3d {
                        width: frame.width(),
                        height: frame.height(),
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                },
                wgpu::util::TextureDataOrder::LayerMajor,
                frame.pixels(),
            );
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("frame bind group"),
                layout: &self.layouts.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&self.layouts.sampler),
                    },
                ],
            });

            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("effect encoder"),
            });
            {
                let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("effect pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &self.context.target_view,
                        depth_slice: None,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });
                render_pass.set_pipeline(&self.pipeline.pipeline);
                render_pass.set_bind_group(0, &bind_group, &[]);
                render_pass.draw(0..6, 0..1);
            }

            let readback = &self.context.readback;
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    texture: &self.context.target,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &readback.buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(readback.padded_bytes_per_row),
                        rows_per_image: Some(height),
                    },
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );

            queue.submit(Some(encoder.finish()));
            // The per-frame texture only lives until its draw has been submitted.
            texture.destroy();
        });
        if let Err(err) = submitted {
            return Err(EngineError::TransientRenderFailure(err.to_string()));
        }

        self.read_target(dest)
    }

    fn read_target(&self, dest: &mut PixelBuffer) -> Result<(), EngineError> {
        let (width, height) = self.context.size;
        let readback = &self.context.readback;
        let slice = readback.buffer.slice(..);
        let (sender, receiver) = crossbeam_channel::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.context
            .device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| EngineError::TransientRenderFailure(format!("device poll failed: {err}")))?;
        receiver
            .recv()
            .map_err(|_| EngineError::TransientRenderFailure("readback callback dropped".into()))?
            .map_err(|err| EngineError::TransientRenderFailure(format!("readback failed: {err}")))?;

        dest.ensure_size(width, height);
        {
            let mapped = slice.get_mapped_range();
            readback.unpad_into(&mapped, height, dest.as_bytes_mut());
        }
        readback.buffer.unmap();
        Ok(())
    }
}
