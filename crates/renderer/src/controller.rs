//! Render loop controller: owns the session, picks the render path each frame and feeds the
//! gesture transport.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use selector::{ActiveEffectSet, EffectKind, SelectionPolicy, SelectorError};
use tracing::{debug, info, warn};

use crate::accelerator::{Accelerator, AcceleratorFactory};
use crate::capture::encode_still;
use crate::clock::AnimationClock;
use crate::effects::EffectLibrary;
use crate::error::{EngineError, SourceLost};
use crate::gesture::{FrameTransport, TransportFactory};
use crate::pixels::{Frame, PixelBuffer};
use crate::shaders::ShaderPrograms;
use crate::types::{AdapterProfile, EngineConfig, RenderPath};
use crate::wire::GestureEvent;

const PLACEHOLDER_RGBA: [u8; 4] = [16, 16, 16, 255];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Initializing,
    Running(RenderPath),
}

/// Informational events for the UI collaborator. None of them stop the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    GpuUnavailable(String),
    GpuFallback(String),
    TransportDown(String),
    SessionLost(String),
}

pub trait SessionObserver {
    /// Frames rendered in the last one-second window.
    fn fps(&mut self, _fps: u32) {}

    fn gestures(&mut self, _event: &GestureEvent) {}

    fn notice(&mut self, _notice: &Notice) {}
}

#[derive(Debug, Default)]
pub struct NullObserver;

impl SessionObserver for NullObserver {}

pub enum FramePoll<'a> {
    Ready(Frame<'a>),
    NotReady,
}

/// Live video collaborator. The controller borrows each frame for one refresh only.
pub trait FrameSource {
    fn current_frame(&mut self) -> Result<FramePoll<'_>, SourceLost>;

    fn dimensions(&self) -> (u32, u32);
}

pub trait DisplaySurface {
    fn present(&mut self, frame: &PixelBuffer, path: RenderPath);
}

/// What a single [`RenderLoop::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered(RenderPath),
    /// The source had no frame; a placeholder was presented.
    Placeholder,
    /// The GPU failed on this frame; nothing was presented.
    Skipped,
    Inactive,
}

/// Counts frames in one-second windows.
#[derive(Debug, Clone, Default)]
pub struct FpsCounter {
    window_start: Option<Instant>,
    frames: u32,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a frame at `now` and returns the finished window's count once a second has
    /// elapsed since the window opened.
    pub fn record(&mut self, now: Instant) -> Option<u32> {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            self.frames = 1;
            return None;
        };
        if now.saturating_duration_since(start) >= Duration::from_secs(1) {
            let fps = self.frames;
            self.window_start = Some(now);
            self.frames = 1;
            Some(fps)
        } else {
            self.frames += 1;
            None
        }
    }
}

/// Fires on every `interval`-th rendered frame.
#[derive(Debug, Clone)]
pub struct CaptureThrottle {
    interval: u32,
    counter: u32,
}

impl CaptureThrottle {
    pub fn new(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
            counter: 0,
        }
    }

    pub fn tick(&mut self) -> bool {
        self.counter += 1;
        if self.counter >= self.interval {
            self.counter = 0;
            true
        } else {
            false
        }
    }
}

struct Session {
    source: Box<dyn FrameSource>,
    accelerator: Option<Box<dyn Accelerator>>,
    composition: Option<Vec<EffectKind>>,
    fps: FpsCounter,
    throttle: CaptureThrottle,
    output: PixelBuffer,
}

impl Session {
    fn path(&self) -> RenderPath {
        if self.accelerator.is_some() {
            RenderPath::Gpu
        } else {
            RenderPath::Fallback
        }
    }
}

/// Drives one session at a time: `Idle -> Initializing -> Running(path) -> Idle`.
pub struct RenderLoop {
    config: EngineConfig,
    factory: Box<dyn AcceleratorFactory>,
    display: Box<dyn DisplaySurface>,
    observer: Box<dyn SessionObserver>,
    transports: Option<Box<dyn TransportFactory>>,
    transport: Option<Box<dyn FrameTransport>>,
    events: Option<Receiver<GestureEvent>>,
    policy: SelectionPolicy,
    programs: ShaderPrograms,
    library: EffectLibrary,
    clock: AnimationClock,
    state: SessionState,
    session: Option<Session>,
}

impl RenderLoop {
    pub fn new(
        config: EngineConfig,
        factory: Box<dyn AcceleratorFactory>,
        display: Box<dyn DisplaySurface>,
    ) -> Self {
        let library = EffectLibrary::new(config.params.clone(), config.noise_seed);
        let programs = ShaderPrograms::new(config.shader_dir.clone());
        Self {
            config,
            factory,
            display,
            observer: Box::new(NullObserver),
            transports: None,
            transport: None,
            events: None,
            policy: SelectionPolicy::default(),
            programs,
            library,
            clock: AnimationClock::new(),
            state: SessionState::Idle,
            session: None,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Source of the per-session gesture transport, opened on every [`start`](Self::start).
    pub fn with_transports(mut self, factory: impl TransportFactory + 'static) -> Self {
        self.transports = Some(Box::new(factory));
        self
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_programs(mut self, programs: ShaderPrograms) -> Self {
        self.programs = programs;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn clock_time(&self) -> f32 {
        self.clock.time()
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    pub fn adapter_profile(&self) -> Option<&AdapterProfile> {
        self.session
            .as_ref()
            .and_then(|session| session.accelerator.as_deref())
            .and_then(|accelerator| accelerator.profile())
    }

    pub fn toggle_effect(&mut self, id: &str) -> Result<ActiveEffectSet, SelectorError> {
        self.policy.toggle_effect(id).cloned()
    }

    /// Begins a session on `source`, replacing any running one.
    pub fn start(&mut self, source: Box<dyn FrameSource>) {
        self.end_session();
        self.state = SessionState::Initializing;
        self.clock.reset();

        let accelerator = if self.config.prefer_gpu {
            match self.factory.initialize(self.config.surface_size, &self.programs) {
                Ok(accelerator) => Some(accelerator),
                Err(err) => {
                    info!(error = %err, "GPU unavailable; using the CPU renderer");
                    self.observer.notice(&Notice::GpuUnavailable(err.to_string()));
                    None
                }
            }
        } else {
            debug!("GPU disabled by configuration");
            None
        };

        let (width, height) = source.dimensions();
        let session = Session {
            source,
            accelerator,
            composition: None,
            fps: FpsCounter::new(),
            throttle: CaptureThrottle::new(self.config.capture.interval),
            output: PixelBuffer::new(width, height),
        };
        let path = session.path();
        self.session = Some(session);
        self.transport = match self.transports.as_mut().map(|factory| factory.open()) {
            Some(Ok(transport)) => Some(transport),
            Some(Err(err)) => {
                warn!(error = %err, "gesture transport unavailable; running without stills");
                self.observer.notice(&Notice::TransportDown(err.to_string()));
                None
            }
            None => None,
        };
        self.events = self.transport.as_ref().and_then(|transport| transport.events());
        self.state = SessionState::Running(path);
        info!(?path, width, height, "render session started");
    }

    /// Ends the session. No render happens after this returns.
    pub fn stop(&mut self) {
        self.end_session();
    }

    /// Shared teardown for `stop`, restarts and a lost source. The transport is closed before
    /// GPU resources are released.
    fn end_session(&mut self) {
        self.state = SessionState::Idle;
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.events = None;
        if self.session.take().is_some() {
            info!("render session ended");
        }
    }

    pub fn refresh(&mut self, now: Instant) -> Result<FrameOutcome, EngineError> {
        if self.session.is_none() {
            return Ok(FrameOutcome::Inactive);
        }
        self.drain_gesture_events();

        let Some(session) = self.session.as_mut() else {
            return Ok(FrameOutcome::Inactive);
        };
        let outcome = render_one(
            session,
            now,
            &self.policy,
            &mut self.library,
            &mut self.clock,
            self.display.as_mut(),
            self.observer.as_mut(),
            self.transport.as_deref_mut(),
            &self.config,
        );

        match outcome {
            Ok(outcome) => {
                if let Some(session) = self.session.as_ref() {
                    self.state = SessionState::Running(session.path());
                }
                Ok(outcome)
            }
            Err(lost) => {
                warn!(error = %lost, "frame source lost; ending session");
                self.observer.notice(&Notice::SessionLost(lost.0.clone()));
                self.end_session();
                Err(lost.into())
            }
        }
    }

    fn drain_gesture_events(&mut self) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        loop {
            match events.try_recv() {
                Ok(event) => {
                    self.policy
                        .observe_gestures(event.gestures.iter());
                    debug!(suggested = ?self.policy.suggested(), "gesture event");
                    self.observer.gestures(&event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("gesture transport disconnected");
                    self.observer
                        .notice(&Notice::TransportDown("gesture events disconnected".into()));
                    self.events = None;
                    break;
                }
            }
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[allow(clippy::too_many_arguments)]
fn render_one(
    session: &mut Session,
    now: Instant,
    policy: &SelectionPolicy,
    library: &mut EffectLibrary,
    clock: &mut AnimationClock,
    display: &mut dyn DisplaySurface,
    observer: &mut dyn SessionObserver,
    transport: Option<&mut (dyn FrameTransport + 'static)>,
    config: &EngineConfig,
) -> Result<FrameOutcome, SourceLost> {
    let Session {
        source,
        accelerator,
        composition,
        fps,
        throttle,
        output,
    } = session;

    let (width, height) = source.dimensions();
    let frame = match source.current_frame()? {
        FramePoll::Ready(frame) => frame,
        FramePoll::NotReady => {
            output.ensure_size(width, height);
            output.fill(PLACEHOLDER_RGBA);
            let path = if accelerator.is_some() {
                RenderPath::Gpu
            } else {
                RenderPath::Fallback
            };
            display.present(output, path);
            return Ok(FrameOutcome::Placeholder);
        }
    };

    if let Some(count) = fps.record(now) {
        debug!(fps = count, "frame rate");
        observer.fps(count);
    }

    let selected = policy.select();
    let mut path = RenderPath::Fallback;
    if let Some(gpu) = accelerator.as_mut() {
        let wanted: Vec<EffectKind> = if policy.manual().is_empty() {
            selected.into_iter().collect()
        } else {
            policy.manual().as_slice().to_vec()
        };
        let ticks_before = clock.ticks();
        let mut result = Ok(());
        if composition.as_ref() != Some(&wanted) {
            result = gpu.set_active_effects(&wanted);
            if result.is_ok() {
                *composition = Some(wanted);
            }
        }
        if result.is_ok() {
            result = gpu.render_frame(&frame, clock, output);
        }

        match result {
            Ok(()) => path = RenderPath::Gpu,
            Err(err) => {
                warn!(error = %err, "GPU render failed; switching to the CPU renderer");
                observer.notice(&Notice::GpuFallback(err.to_string()));
                // A skipped frame still counts as one step of animation time.
                if clock.ticks() == ticks_before {
                    clock.tick();
                }
                *accelerator = None;
                *composition = None;
                return Ok(FrameOutcome::Skipped);
            }
        }
    } else {
        library.apply(selected, &frame, output, clock.tick());
    }

    display.present(output, path);

    if throttle.tick() {
        if let Some(transport) = transport {
            match encode_still(&frame, &config.capture) {
                Ok(still) => {
                    if let Err(err) = transport.send_frame(still) {
                        warn!(error = %err, "failed to hand still to gesture transport");
                    }
                }
                Err(err) => warn!(error = %err, "failed to encode still"),
            }
        }
    }

    Ok(FrameOutcome::Rendered(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_counter_reports_once_per_window() {
        let mut counter = FpsCounter::new();
        let start = Instant::now();
        assert_eq!(counter.record(start), None);
        for i in 1..30 {
            assert_eq!(counter.record(start + Duration::from_millis(i * 30)), None);
        }
        assert_eq!(counter.record(start + Duration::from_millis(1000)), Some(30));
        assert_eq!(counter.record(start + Duration::from_millis(1500)), None);
        assert_eq!(counter.record(start + Duration::from_millis(2000)), Some(2));
    }

    #[test]
    fn throttle_fires_every_interval() {
        let mut throttle = CaptureThrottle::new(5);
        let fired: Vec<bool> = (0..10).map(|_| throttle.tick()).collect();
        assert_eq!(
            fired,
            vec![false, false, false, false, true, false, false, false, false, true]
        );
    }

    #[test]
    fn zero_interval_fires_every_frame() {
        let mut throttle = CaptureThrottle::new(0);
        assert!(throttle.tick());
        assert!(throttle.tick());
    }
}
