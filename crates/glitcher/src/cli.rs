use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "glitcher",
    author,
    version,
    about = "Live video distortion effects with a GPU path and a CPU fallback"
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Engine configuration file (TOML).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Still image (PNG, JPEG, BMP or GIF) used as the video frame; a test pattern is used otherwise.
    #[arg(long, value_name = "IMAGE")]
    pub input: Option<PathBuf>,

    /// Override the surface resolution (e.g. `640x480`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Number of frames to render before exiting.
    #[arg(long, value_name = "N", default_value_t = 120)]
    pub frames: u64,

    /// Refresh rate cap (0 = uncapped).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Enable an effect by id; repeat to enable several (the first one renders).
    #[arg(long = "effect", value_name = "ID")]
    pub effects: Vec<String>,

    /// Skip GPU initialisation and render on the CPU.
    #[arg(long)]
    pub cpu: bool,

    /// Write every presented frame as a numbered PNG into this directory.
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Append one JSON frame message per captured still to this file.
    #[arg(long, value_name = "PATH")]
    pub transport_log: Option<PathBuf>,

    /// Run the scripted gesture detector from `[[gestures.script]]`.
    #[arg(long)]
    pub gestures: bool,

    /// Read `gesture_event` JSON lines from an external recogniser (`-` for stdin).
    #[arg(long, value_name = "PATH", conflicts_with = "gestures")]
    pub gesture_feed: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the effect catalog.
    Effects,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = glitchconfig::parse_surface_size(value)?;
    if width == 0 || height == 0 {
        return Err(format!("surface dimensions must be non-zero (got {width}x{height})"));
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("640x480"), Ok((640, 480)));
        assert!(parse_size("0x480").is_err());
        assert!(parse_size("wide").is_err());
    }

    #[test]
    fn effect_flag_repeats_in_order() {
        let cli = Cli::try_parse_from([
            "glitcher", "--effect", "vhs", "--effect", "matrix", "--cpu", "--frames", "3",
        ])
        .unwrap();
        assert_eq!(cli.run.effects, vec!["vhs", "matrix"]);
        assert!(cli.run.cpu);
        assert_eq!(cli.run.frames, 3);
        assert!(cli.command.is_none());
    }

    #[test]
    fn gesture_sources_are_exclusive() {
        assert!(Cli::try_parse_from(["glitcher", "--gestures", "--gesture-feed", "-"]).is_err());
        let cli = Cli::try_parse_from(["glitcher", "--gesture-feed", "-"]).unwrap();
        assert_eq!(cli.run.gesture_feed.as_deref(), Some(std::path::Path::new("-")));
    }

    #[test]
    fn effects_subcommand_parses() {
        let cli = Cli::try_parse_from(["glitcher", "effects"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Effects)));
    }
}
