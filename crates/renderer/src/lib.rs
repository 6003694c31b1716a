//! Effect-rendering engine for live video.
//!
//! Each display refresh the [`RenderLoop`] pulls the current frame from a [`FrameSource`], asks
//! the [`SelectionPolicy`](selector::SelectionPolicy) for the active effect and renders it on one
//! of two paths:
//!
//! ```text
//!   FrameSource ──▶ RenderLoop::refresh ──┬─▶ Accelerator (wgpu GpuEngine) ──┐
//!                          │              └─▶ EffectLibrary (CPU)  ──────────┴─▶ DisplaySurface
//!                          └─ every Nth frame ─▶ encode_still ─▶ FrameTransport ─▶ GestureEvent
//! ```
//!
//! Both paths advance the same [`AnimationClock`] once per processed frame, so switching from the
//! GPU to the fallback mid-session keeps animations continuous. A GPU failure is never fatal: the
//! frame is skipped and the rest of the session renders on the CPU.

mod accelerator;
mod capture;
mod clock;
mod compile;
mod controller;
mod effects;
mod error;
mod gesture;
mod gpu;
mod pixels;
mod runtime;
mod shaders;
mod types;
mod wire;

pub use crossbeam_channel;

pub use accelerator::{Accelerator, AcceleratorFactory, CpuOnly, WgpuAccelerator};
pub use capture::{encode_still, scaled_height, EncodedStill};
pub use clock::{AnimationClock, TICK_SECONDS};
pub use controller::{
    CaptureThrottle, DisplaySurface, FpsCounter, FrameOutcome, FramePoll, FrameSource, Notice,
    NullObserver, RenderLoop, SessionObserver, SessionState,
};
pub use effects::{
    EffectLibrary, EffectParams, GravityParams, LiquifyParams, MatrixParams, PixelSortParams,
    RippleParams, SlowMotionParams, VhsParams,
};
pub use error::{Capability, EngineError, SourceLost, TransportError};
pub use gesture::{
    FrameTransport, GestureDetector, GestureWorker, JsonLinesTransport, ScriptedDetector,
    TransportFactory,
};
pub use gpu::GpuEngine;
pub use pixels::{Frame, FrameError, PixelBuffer, BYTES_PER_PIXEL};
pub use runtime::RefreshScheduler;
pub use shaders::{ProgramOrigin, ShaderProgram, ShaderPrograms};
pub use types::{
    AdapterProfile, CaptureOptions, EngineConfig, GpuMemoryMode, GpuOptions, GpuPowerPreference,
    RenderPath,
};
pub use wire::{parse_inbound, FrameMessage, GestureEvent};
