use std::borrow::Cow;

use anyhow::{anyhow, Result};

/// Shared declarations placed ahead of every effect body.
///
/// Effect programs only define `fn effect(uv: vec2<f32>) -> vec4<f32>`; the prelude supplies
/// the uniform block, the frame texture, a 6-vertex full-screen quad and `sample_frame`.
pub(crate) const PRELUDE: &str = r#"
struct EffectUniforms {
    time: f32,
    _pad: f32,
    resolution: vec2<f32>,
    params0: vec4<f32>,
    params1: vec4<f32>,
};

@group(0) @binding(0) var<uniform> globals: EffectUniforms;
@group(0) @binding(1) var frame_texture: texture_2d<f32>;
@group(0) @binding(2) var frame_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(-1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
    );
    let xy = corners[index];
    var out: VertexOutput;
    out.position = vec4<f32>(xy, 0.0, 1.0);
    out.uv = vec2<f32>(xy.x * 0.5 + 0.5, 0.5 - xy.y * 0.5);
    return out;
}

fn sample_frame(uv: vec2<f32>) -> vec4<f32> {
    return textureSampleLevel(frame_texture, frame_sampler, uv, 0.0);
}

fn hash21(p: vec2<f32>) -> f32 {
    return fract(sin(dot(p, vec2<f32>(12.9898, 78.233))) * 43758.5453);
}
"#;

pub(crate) const FOOTER: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return effect(in.uv);
}
"#;

pub(crate) const PASSTHROUGH_BODY: &str = r#"
fn effect(uv: vec2<f32>) -> vec4<f32> {
    return sample_frame(uv);
}
"#;

/// Produces a complete WGSL module from an effect body.
pub(crate) fn wrap_effect_body(body: &str) -> String {
    let mut source = String::with_capacity(PRELUDE.len() + body.len() + FOOTER.len());
    source.push_str(PRELUDE);
    source.push_str(body);
    source.push_str(FOOTER);
    source
}

/// Wraps and compiles an effect body, surfacing validation errors instead of panicking later
/// at pipeline creation.
pub(crate) fn compile_effect_module(
    device: &wgpu::Device,
    label: &str,
    body: &str,
) -> Result<wgpu::ShaderModule> {
    let source = wrap_effect_body(body);
    scoped(device, || {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
        })
    })
    .map_err(|err| anyhow!("shader program '{label}' failed to compile: {err}"))
}

/// Runs `f` inside validation and out-of-memory error scopes and reports the first error.
pub(crate) fn scoped<T>(device: &wgpu::Device, f: impl FnOnce() -> T) -> Result<T, wgpu::Error> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());
    match validation.or(out_of_memory) {
        Some(err) => Err(err),
        None => Ok(value),
    }
}
