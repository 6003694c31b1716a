//! wgpu side of the engine.
//!
//! - `context` acquires the adapter and device and owns the offscreen target plus its readback
//!   buffer.
//! - `pipeline` holds the shared bind group layout and builds one render pipeline per
//!   composition.
//! - `uniforms` mirrors the WGSL uniform block.
//! - `state` is the pipeline manager (`GpuEngine`) used through the accelerator seam.

mod context;
mod pipeline;
mod state;
mod uniforms;

pub use state::GpuEngine;
