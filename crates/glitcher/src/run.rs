use std::path::Path;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use glitchconfig::GlitchConfig;
use renderer::{
    AcceleratorFactory, CpuOnly, EngineConfig, FrameOutcome, FrameSource, RefreshScheduler,
    RenderLoop, WgpuAccelerator,
};
use selector::{SelectionPolicy, CATALOG};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, RunArgs};
use crate::sinks::{FrameSink, LogObserver};
use crate::sources::{StillImageSource, TestPatternSource};
use crate::transports::{self, SessionTransports};

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    match cli.command {
        Some(Command::Effects) => {
            print_catalog();
            Ok(())
        }
        None => run_session(cli.run),
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn print_catalog() {
    for descriptor in &CATALOG {
        println!(
            "{:<14} {:<14} gesture: {:<14} shader: {}",
            descriptor.id, descriptor.display_name, descriptor.trigger_gesture, descriptor.shader
        );
    }
}

fn load_config(path: Option<&Path>) -> Result<GlitchConfig> {
    match path {
        Some(path) => GlitchConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(GlitchConfig::default()),
    }
}

fn engine_config(config: &GlitchConfig, args: &RunArgs) -> EngineConfig {
    let mut engine = EngineConfig::from_config(config);
    if let Some(size) = args.size {
        engine.surface_size = size;
    }
    if let Some(fps) = args.fps {
        engine.target_fps = (fps > 0.0).then_some(fps);
    }
    if args.cpu {
        engine.prefer_gpu = false;
    }
    engine
}

fn session_transports(
    args: &RunArgs,
    config: &GlitchConfig,
    policy: &SelectionPolicy,
) -> Result<Option<SessionTransports>> {
    let script = if args.gestures {
        if config.gestures.script.is_empty() {
            tracing::warn!("--gestures given but the config has no [[gestures.script]] steps");
        }
        Some((config.gestures.script.clone(), policy.table().clone()))
    } else {
        None
    };
    let feed = args
        .gesture_feed
        .as_deref()
        .map(transports::spawn_feed)
        .transpose()?;
    SessionTransports::new(args.transport_log.clone(), script, feed)
}

fn run_session(args: RunArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let engine = engine_config(&config, &args);
    let policy =
        SelectionPolicy::from_config(&config.gestures).context("invalid gesture mappings")?;

    let source: Box<dyn FrameSource> = match args.input.as_ref() {
        Some(path) => Box::new(StillImageSource::open(path)?),
        None => Box::new(TestPatternSource::new(engine.surface_size)),
    };
    let transports = session_transports(&args, &config, &policy)?;
    let sink = FrameSink::new(args.output.clone())?;
    let factory: Box<dyn AcceleratorFactory> = if engine.prefer_gpu {
        Box::new(WgpuAccelerator::new(engine.gpu.clone(), engine.params))
    } else {
        Box::new(CpuOnly)
    };

    let target_fps = engine.target_fps;
    let mut render_loop = RenderLoop::new(engine, factory, Box::new(sink.clone()))
        .with_policy(policy)
        .with_observer(Box::new(LogObserver));
    if let Some(transports) = transports {
        render_loop = render_loop.with_transports(transports);
    }
    for id in &args.effects {
        render_loop
            .toggle_effect(id)
            .with_context(|| format!("cannot enable effect '{id}'"))?;
    }

    render_loop.start(source);
    tracing::info!(
        state = ?render_loop.state(),
        adapter = render_loop.adapter_profile().map(|profile| profile.name.as_str()),
        frames = args.frames,
        "glitcher running"
    );

    let mut scheduler = RefreshScheduler::new(target_fps);
    let mut rendered = 0;
    let mut result = Ok(());
    while rendered < args.frames {
        let now = Instant::now();
        if !scheduler.ready_for_frame(now) {
            thread::sleep(scheduler.time_until_next(now));
            continue;
        }
        match render_loop.refresh(now) {
            Ok(FrameOutcome::Rendered(_)) => rendered += 1,
            Ok(FrameOutcome::Inactive) => break,
            Ok(FrameOutcome::Placeholder | FrameOutcome::Skipped) => {}
            Err(err) => {
                result = Err(err).context("render session ended early");
                break;
            }
        }
        scheduler.mark_rendered(now);
        if let Some(err) = sink.take_error() {
            result = Err(err);
            break;
        }
    }
    render_loop.stop();

    let stats = sink.stats();
    tracing::info!(
        rendered,
        presented = stats.presented,
        gpu = stats.gpu,
        cpu = stats.fallback,
        clock = render_loop.clock_time(),
        "glitcher finished"
    );
    println!(
        "rendered {rendered} frames ({} gpu, {} cpu)",
        stats.gpu, stats.fallback
    );
    result
}
