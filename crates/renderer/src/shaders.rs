use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

const BUILTIN_PROGRAMS: [(&str, &str); 7] = [
    ("liquify", include_str!("../shaders/liquify.wgsl")),
    ("vhs", include_str!("../shaders/vhs.wgsl")),
    ("pixel_sort", include_str!("../shaders/pixel_sort.wgsl")),
    ("matrix", include_str!("../shaders/matrix.wgsl")),
    ("gravity", include_str!("../shaders/gravity.wgsl")),
    ("portal", include_str!("../shaders/portal.wgsl")),
    ("slow_motion", include_str!("../shaders/slow_motion.wgsl")),
];

/// Where a resolved program came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramOrigin {
    Override(PathBuf),
    BuiltIn,
}

/// WGSL effect body ready to be wrapped and compiled.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    pub name: String,
    pub body: String,
    pub origin: ProgramOrigin,
}

/// Resolves effect programs by plain name: `<override_dir>/<name>.wgsl` first, then the
/// programs compiled into the crate.
#[derive(Debug, Clone, Default)]
pub struct ShaderPrograms {
    override_dir: Option<PathBuf>,
}

impl ShaderPrograms {
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        Self { override_dir }
    }

    pub fn resolve(&self, name: &str) -> Result<ShaderProgram> {
        if let Some(dir) = &self.override_dir {
            let path = dir.join(format!("{name}.wgsl"));
            if path.is_file() {
                let body = fs::read_to_string(&path)
                    .with_context(|| format!("failed to read shader at {}", path.display()))?;
                return Ok(ShaderProgram {
                    name: name.to_string(),
                    body,
                    origin: ProgramOrigin::Override(path),
                });
            }
        }

        BUILTIN_PROGRAMS
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(builtin, body)| ShaderProgram {
                name: builtin.to_string(),
                body: body.to_string(),
                origin: ProgramOrigin::BuiltIn,
            })
            .ok_or_else(|| anyhow!("no shader program named '{name}'"))
    }
}
