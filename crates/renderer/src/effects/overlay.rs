use rand::Rng;

use crate::pixels::{blend_into, Frame, PixelBuffer, BYTES_PER_PIXEL};

use super::glyphs::{lit_cells, GLYPHS, GLYPH_HEIGHT, GLYPH_SCALE};
use super::EffectContext;

const WASH_RGB: [u8; 3] = [0, 0, 0];
const RAIN_RGB: [u8; 3] = [0, 255, 0];

/// Digital rain: the frame under a dark wash with one falling green glyph per column.
pub(super) fn matrix(frame: &Frame<'_>, dest: &mut PixelBuffer, ctx: &mut EffectContext<'_>) {
    let params = ctx.params.matrix;
    dest.copy_from(frame);
    dest.wash(WASH_RGB, params.wash_opacity);

    let height = frame.height() as f32;
    let spacing = params.column_spacing.max(1) as usize;
    for x in (0..frame.width()).step_by(spacing) {
        let y = (ctx.time * params.fall_speed + x as f32 * 0.1).rem_euclid(height + 100.0) - 50.0;
        if y <= 0.0 || y >= height {
            continue;
        }
        let glyph = &GLYPHS[ctx.rng.gen_range(0..GLYPHS.len())];
        let alpha = 1.0 - (y / height) * 0.5;
        draw_glyph(dest, x, y as u32, glyph, alpha);
    }
}

/// Draws a glyph with its left edge at `left` and its baseline on row `baseline`.
fn draw_glyph(dest: &mut PixelBuffer, left: u32, baseline: u32, glyph: &[u8; 7], alpha: f32) {
    let top = baseline as i64 - (GLYPH_HEIGHT * GLYPH_SCALE) as i64;
    for (column, row) in lit_cells(glyph) {
        for dy in 0..GLYPH_SCALE {
            for dx in 0..GLYPH_SCALE {
                let x = left + column * GLYPH_SCALE + dx;
                let y = top + (row * GLYPH_SCALE + dy) as i64;
                if x < dest.width() && y >= 0 && (y as u32) < dest.height() {
                    dest.blend_pixel(x, y as u32, RAIN_RGB, alpha);
                }
            }
        }
    }
}

/// Ghosted motion: the frame drawn opaque, then two translucent copies shifted left and right.
/// Uses only the current frame.
pub(super) fn slow_motion(
    frame: &Frame<'_>,
    dest: &mut PixelBuffer,
    ctx: &mut EffectContext<'_>,
) {
    let params = ctx.params.slow_motion;
    dest.copy_from(frame);
    if params.ghost_opacity <= 0.0 || params.offset == 0 {
        return;
    }

    let width = frame.width() as i64;
    for shift in [params.offset as i64, -(params.offset as i64)] {
        for y in 0..frame.height() {
            for x in 0..width {
                let source_x = x - shift;
                if source_x < 0 || source_x >= width {
                    continue;
                }
                let source = frame.pixel(source_x as u32, y);
                let alpha = params.ghost_opacity * source[3] as f32 / 255.0;
                let index = dest.index(x as u32, y);
                let target = &mut dest.as_bytes_mut()[index..index + BYTES_PER_PIXEL];
                blend_into(target, [source[0], source[1], source[2]], alpha);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::{EffectLibrary, EffectParams};

    #[test]
    fn matrix_washes_frame_before_rain() {
        // At t = 0 every column sits above the frame (y = 0.1 * x - 50 < 0).
        let pixels = uniform(64, 48, [100, 100, 100, 255]);
        let frame = frame(64, 48, &pixels);
        let mut library = EffectLibrary::new(EffectParams::default(), Some(2));
        let out = render(&mut library, "matrix", &frame, 0.0);
        for pixel in out.as_bytes().chunks_exact(4) {
            assert_eq!(pixel, &[70, 70, 70, 255]);
        }
    }

    #[test]
    fn matrix_draws_green_glyph_above_baseline() {
        // Column 0 lands at y = 1.4 * 50 - 50 = 20.
        let pixels = uniform(64, 48, [0, 0, 0, 255]);
        let frame = frame(64, 48, &pixels);
        let mut library = EffectLibrary::new(EffectParams::default(), Some(2));
        let out = render(&mut library, "matrix", &frame, 1.4);

        let mut lit_rows = Vec::new();
        for y in 0..48 {
            for x in 0..10 {
                let pixel = out.pixel(x, y);
                if pixel[1] > 0 {
                    assert_eq!(pixel[0], 0);
                    lit_rows.push(y);
                }
            }
        }
        assert!(!lit_rows.is_empty());
        assert!(lit_rows.iter().all(|y| (6..20).contains(y)));
    }

    #[test]
    fn slow_motion_keeps_uniform_frames() {
        let pixels = uniform(16, 8, [40, 120, 220, 255]);
        let frame = frame(16, 8, &pixels);
        let mut library = EffectLibrary::new(EffectParams::default(), Some(0));
        let out = render(&mut library, "slow_motion", &frame, 0.3);
        assert_eq!(out.as_bytes(), pixels.as_slice());
    }

    #[test]
    fn slow_motion_spreads_a_bright_column() {
        let mut pixels = uniform(9, 1, [0, 0, 0, 255]);
        let centre = 4 * 4;
        pixels[centre..centre + 3].copy_from_slice(&[255, 255, 255]);
        let frame = frame(9, 1, &pixels);
        let mut library = EffectLibrary::new(EffectParams::default(), Some(0));
        let out = render(&mut library, "slow_motion", &frame, 0.0);

        // The right-shifted ghost lands on x = 6 and is then dimmed by the left-shifted ghost of
        // the black pixel at x = 8. The left-shifted ghost lands on x = 2 last.
        assert_eq!(out.pixel(2, 0), [77, 77, 77, 255]);
        assert_eq!(out.pixel(6, 0), [54, 54, 54, 255]);
        assert!(out.pixel(4, 0)[0] > out.pixel(2, 0)[0]);
        assert_eq!(out.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(out.pixel(8, 0), [0, 0, 0, 255]);
    }
}
