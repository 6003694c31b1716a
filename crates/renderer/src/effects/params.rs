use glitchconfig::EffectsSection;
use selector::EffectKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquifyParams {
    /// Radius of the warped disc as a fraction of the shorter frame side.
    pub radius_factor: f32,
    pub wavelength: f32,
    pub speed: f32,
    pub intensity: f32,
}

impl Default for LiquifyParams {
    fn default() -> Self {
        Self {
            radius_factor: 0.4,
            wavelength: 15.0,
            speed: 3.0,
            intensity: 15.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RippleParams {
    pub frequency: f32,
    pub speed: f32,
    pub amplitude: f32,
    pub glow_radius: f32,
    pub glow_blur: f32,
    pub glow_opacity: f32,
}

impl Default for RippleParams {
    fn default() -> Self {
        Self {
            frequency: 0.1,
            speed: 3.0,
            amplitude: 10.0,
            glow_radius: 50.0,
            glow_blur: 20.0,
            glow_opacity: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VhsParams {
    pub scanline_opacity: f32,
    /// Horizontal red/blue offset in pixels.
    pub channel_shift: u32,
    pub speck_count: u32,
    pub speck_opacity: f32,
}

impl Default for VhsParams {
    fn default() -> Self {
        Self {
            scanline_opacity: 0.1,
            channel_shift: 2,
            speck_count: 100,
            speck_opacity: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSortParams {
    /// Pixels brighter than this luminance take part in the sort.
    pub threshold: f32,
}

impl Default for PixelSortParams {
    fn default() -> Self {
        Self { threshold: 200.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixParams {
    pub column_spacing: u32,
    /// Glyph fall speed in pixels per virtual second.
    pub fall_speed: f32,
    pub wash_opacity: f32,
}

impl Default for MatrixParams {
    fn default() -> Self {
        Self {
            column_spacing: 20,
            fall_speed: 50.0,
            wash_opacity: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityParams {
    pub strength: f32,
    pub frequency: f32,
}

impl Default for GravityParams {
    fn default() -> Self {
        Self {
            strength: 5.0,
            frequency: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlowMotionParams {
    pub offset: i32,
    pub ghost_opacity: f32,
}

impl Default for SlowMotionParams {
    fn default() -> Self {
        Self {
            offset: 2,
            ghost_opacity: 0.3,
        }
    }
}

/// Tunables for every effect in the library.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EffectParams {
    pub liquify: LiquifyParams,
    pub vhs: VhsParams,
    pub pixel_sort: PixelSortParams,
    pub matrix: MatrixParams,
    pub gravity: GravityParams,
    pub slow_motion: SlowMotionParams,
    pub ripple: RippleParams,
}

fn set<T: Copy>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

impl EffectParams {
    /// Applies the `[effects.*]` tables on top of the current values.
    pub fn apply_overrides(&mut self, section: &EffectsSection) {
        let liquify = &section.liquify;
        set(&mut self.liquify.radius_factor, liquify.radius_factor);
        set(&mut self.liquify.wavelength, liquify.wavelength);
        set(&mut self.liquify.speed, liquify.speed);
        set(&mut self.liquify.intensity, liquify.intensity);

        let vhs = &section.vhs;
        set(&mut self.vhs.scanline_opacity, vhs.scanline_opacity);
        set(&mut self.vhs.channel_shift, vhs.channel_shift);
        set(&mut self.vhs.speck_count, vhs.speck_count);
        set(&mut self.vhs.speck_opacity, vhs.speck_opacity);

        set(&mut self.pixel_sort.threshold, section.pixel_sort.threshold);

        let matrix = &section.matrix;
        set(&mut self.matrix.column_spacing, matrix.column_spacing);
        set(&mut self.matrix.fall_speed, matrix.fall_speed);
        set(&mut self.matrix.wash_opacity, matrix.wash_opacity);

        set(&mut self.gravity.strength, section.flip_gravity.strength);
        set(&mut self.gravity.frequency, section.flip_gravity.frequency);

        set(&mut self.slow_motion.offset, section.slow_motion.offset);
        set(
            &mut self.slow_motion.ghost_opacity,
            section.slow_motion.ghost_opacity,
        );

        let ripple = &section.portal_ripple;
        set(&mut self.ripple.frequency, ripple.frequency);
        set(&mut self.ripple.speed, ripple.speed);
        set(&mut self.ripple.amplitude, ripple.amplitude);
        set(&mut self.ripple.glow_radius, ripple.glow_radius);
        set(&mut self.ripple.glow_blur, ripple.glow_blur);
        set(&mut self.ripple.glow_opacity, ripple.glow_opacity);
    }

    /// Packs the tunables of `kind` into the two `vec4` slots of the shader uniform block.
    pub fn shader_block(&self, kind: EffectKind) -> [[f32; 4]; 2] {
        match kind {
            EffectKind::Liquify => {
                let p = self.liquify;
                [[p.radius_factor, p.wavelength, p.speed, p.intensity], [0.0; 4]]
            }
            EffectKind::Vhs => {
                let p = self.vhs;
                [
                    [
                        p.scanline_opacity,
                        p.channel_shift as f32,
                        p.speck_count as f32,
                        p.speck_opacity,
                    ],
                    [0.0; 4],
                ]
            }
            EffectKind::PixelSort => [[self.pixel_sort.threshold, 0.0, 0.0, 0.0], [0.0; 4]],
            EffectKind::Matrix => {
                let p = self.matrix;
                [[p.column_spacing as f32, p.fall_speed, p.wash_opacity, 0.0], [0.0; 4]]
            }
            EffectKind::FlipGravity => {
                [[self.gravity.strength, self.gravity.frequency, 0.0, 0.0], [0.0; 4]]
            }
            EffectKind::SlowMotion => {
                let p = self.slow_motion;
                [[p.offset as f32, p.ghost_opacity, 0.0, 0.0], [0.0; 4]]
            }
            EffectKind::PortalRipple => {
                let p = self.ripple;
                [
                    [p.frequency, p.speed, p.amplitude, p.glow_radius],
                    [p.glow_blur, p.glow_opacity, 0.0, 0.0],
                ]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glitchconfig::GlitchConfig;

    #[test]
    fn overrides_reach_the_shader_block() {
        let config = GlitchConfig::from_toml_str(
            r#"
version = 1
[effects.liquify]
intensity = 0.0
[effects.portal_ripple]
amplitude = 4.0
glow_opacity = 0.5
"#,
        )
        .unwrap();
        let mut params = EffectParams::default();
        params.apply_overrides(&config.effects);

        assert_eq!(
            params.shader_block(EffectKind::Liquify),
            [[0.4, 15.0, 3.0, 0.0], [0.0; 4]]
        );
        assert_eq!(
            params.shader_block(EffectKind::PortalRipple),
            [[0.1, 3.0, 4.0, 50.0], [20.0, 0.5, 0.0, 0.0]]
        );
        assert_eq!(params.shader_block(EffectKind::PixelSort)[0][0], 200.0);
    }
}
