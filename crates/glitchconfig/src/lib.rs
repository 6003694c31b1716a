use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlitchConfig {
    pub version: u32,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub capture: CaptureSection,
    #[serde(default)]
    pub gpu: GpuSection,
    #[serde(default)]
    pub gestures: GestureSection,
    #[serde(default)]
    pub effects: EffectsSection,
}

impl Default for GlitchConfig {
    fn default() -> Self {
        Self {
            version: 1,
            engine: EngineSection::default(),
            capture: CaptureSection::default(),
            gpu: GpuSection::default(),
            gestures: GestureSection::default(),
            effects: EffectsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSection {
    #[serde(default = "default_prefer_gpu")]
    pub prefer_gpu: bool,
    #[serde(
        default = "default_surface",
        deserialize_with = "deserialize_surface"
    )]
    pub surface: (u32, u32),
    #[serde(default)]
    pub target_fps: Option<f32>,
    #[serde(default)]
    pub noise_seed: Option<u64>,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            prefer_gpu: default_prefer_gpu(),
            surface: default_surface(),
            target_fps: None,
            noise_seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureSection {
    #[serde(default = "default_capture_interval")]
    pub interval: u32,
    #[serde(default = "default_capture_width")]
    pub width: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for CaptureSection {
    fn default() -> Self {
        Self {
            interval: default_capture_interval(),
            width: default_capture_width(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSetting {
    Low,
    #[default]
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemorySetting {
    #[default]
    Balanced,
    Performance,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GpuSection {
    #[serde(default)]
    pub power: PowerSetting,
    #[serde(default)]
    pub memory: MemorySetting,
    #[serde(default)]
    pub allow_software: bool,
    #[serde(default)]
    pub shader_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureMode {
    #[default]
    Advisory,
    Authoritative,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GestureSection {
    #[serde(default)]
    pub mode: GestureMode,
    /// Gesture label to effect ids. Empty means "use the built-in catalog triggers".
    #[serde(default)]
    pub mappings: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub script: Vec<ScriptStep>,
}

/// One step of a scripted gesture timeline, keyed by still index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScriptStep {
    pub still: u64,
    #[serde(default)]
    pub gestures: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EffectsSection {
    pub liquify: LiquifyOverrides,
    pub vhs: VhsOverrides,
    pub pixel_sort: PixelSortOverrides,
    pub matrix: MatrixOverrides,
    #[serde(rename = "flipGravity", alias = "flip_gravity")]
    pub flip_gravity: GravityOverrides,
    pub slow_motion: SlowMotionOverrides,
    pub portal_ripple: RippleOverrides,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LiquifyOverrides {
    pub radius_factor: Option<f32>,
    pub wavelength: Option<f32>,
    pub speed: Option<f32>,
    pub intensity: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct VhsOverrides {
    pub scanline_opacity: Option<f32>,
    pub channel_shift: Option<u32>,
    pub speck_count: Option<u32>,
    pub speck_opacity: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PixelSortOverrides {
    pub threshold: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatrixOverrides {
    pub column_spacing: Option<u32>,
    pub fall_speed: Option<f32>,
    pub wash_opacity: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GravityOverrides {
    pub strength: Option<f32>,
    pub frequency: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlowMotionOverrides {
    pub offset: Option<i32>,
    pub ghost_opacity: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RippleOverrides {
    pub frequency: Option<f32>,
    pub speed: Option<f32>,
    pub amplitude: Option<f32>,
    pub glow_radius: Option<f32>,
    pub glow_blur: Option<f32>,
    pub glow_opacity: Option<f32>,
}

fn default_prefer_gpu() -> bool {
    true
}

fn default_surface() -> (u32, u32) {
    (1280, 720)
}

fn default_capture_interval() -> u32 {
    5
}

fn default_capture_width() -> u32 {
    320
}

fn default_jpeg_quality() -> u8 {
    80
}

fn deserialize_surface<'de, D>(deserializer: D) -> Result<(u32, u32), D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Pair([u32; 2]),
    }

    match Helper::deserialize(deserializer)? {
        Helper::Str(raw) => parse_surface_size(&raw).map_err(de::Error::custom),
        Helper::Pair([width, height]) => Ok((width, height)),
    }
}

/// Parses `WIDTHxHEIGHT` (also accepts `X` and `×` as separators).
pub fn parse_surface_size(raw: &str) -> Result<(u32, u32), String> {
    let trimmed = raw.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| format!("expected WxH format, e.g. 640x480 (got '{trimmed}')"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in size specification '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in size specification '{trimmed}'"))?;
    Ok((width, height))
}

impl GlitchConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: GlitchConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let (width, height) = self.engine.surface;
        if width == 0 || height == 0 {
            return Err(ConfigError::Invalid(
                "engine.surface dimensions must be greater than zero".into(),
            ));
        }

        if let Some(fps) = self.engine.target_fps {
            if fps.is_nan() || fps <= 0.0 {
                return Err(ConfigError::Invalid(
                    "engine.target_fps must be greater than zero".into(),
                ));
            }
        }

        if self.capture.interval == 0 {
            return Err(ConfigError::Invalid(
                "capture.interval must be at least 1".into(),
            ));
        }

        if self.capture.width == 0 {
            return Err(ConfigError::Invalid(
                "capture.width must be greater than zero".into(),
            ));
        }

        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "capture.jpeg_quality must be within 1..=100 (got {})",
                self.capture.jpeg_quality
            )));
        }

        for (gesture, effects) in &self.gestures.mappings {
            if gesture.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "gesture label in gestures.mappings may not be empty".into(),
                ));
            }
            if effects.iter().any(|id| id.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "gesture '{gesture}' maps to an empty effect id"
                )));
            }
        }

        let mut last_still = None;
        for step in &self.gestures.script {
            if last_still.is_some_and(|last| step.still <= last) {
                return Err(ConfigError::Invalid(format!(
                    "gestures.script steps must have strictly increasing still indices (at {})",
                    step.still
                )));
            }
            last_still = Some(step.still);
        }

        if let Some(factor) = self.effects.liquify.radius_factor {
            if factor < 0.0 {
                return Err(ConfigError::Invalid(
                    "effects.liquify.radius_factor must be >= 0".into(),
                ));
            }
        }

        if self.effects.matrix.column_spacing == Some(0) {
            return Err(ConfigError::Invalid(
                "effects.matrix.column_spacing must be at least 1".into(),
            ));
        }

        for (name, opacity) in [
            ("effects.vhs.scanline_opacity", self.effects.vhs.scanline_opacity),
            ("effects.vhs.speck_opacity", self.effects.vhs.speck_opacity),
            ("effects.matrix.wash_opacity", self.effects.matrix.wash_opacity),
            (
                "effects.slow_motion.ghost_opacity",
                self.effects.slow_motion.ghost_opacity,
            ),
            (
                "effects.portal_ripple.glow_opacity",
                self.effects.portal_ripple.glow_opacity,
            ),
        ] {
            if let Some(value) = opacity {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::Invalid(format!(
                        "{name} must be within 0.0..=1.0"
                    )));
                }
            }
        }

        Ok(())
    }
}
