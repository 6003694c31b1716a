use std::fmt;

/// Optional capability the engine can run without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Gpu,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Gpu => f.write_str("GPU acceleration"),
        }
    }
}

/// Failures surfaced by the engine. None of them terminate the process.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A capability could not be acquired; the engine degrades instead.
    #[error("{capability} unavailable: {reason}")]
    Unavailable {
        capability: Capability,
        reason: String,
    },
    /// One frame failed to render; the next frame may succeed on another path.
    #[error("frame render failed: {0}")]
    TransientRenderFailure(String),
    /// The frame source went away; the session cannot continue.
    #[error("session failed: {0}")]
    SessionFailure(String),
}

impl EngineError {
    pub fn gpu_unavailable(reason: impl fmt::Display) -> Self {
        EngineError::Unavailable {
            capability: Capability::Gpu,
            reason: reason.to_string(),
        }
    }
}

/// Raised by a frame source that can no longer produce frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("frame source lost: {0}")]
pub struct SourceLost(pub String);

impl From<SourceLost> for EngineError {
    fn from(value: SourceLost) -> Self {
        EngineError::SessionFailure(value.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport is closed")]
    Closed,
    #[error("still queue is full; dropping still")]
    QueueFull,
    #[error("failed to encode still: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to serialise frame message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write frame message: {0}")]
    Io(#[from] std::io::Error),
}
