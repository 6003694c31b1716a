use crate::pixels::{Frame, PixelBuffer};

use super::{sample_coord, EffectContext};

const GLOW_RGB: [u8; 3] = [0, 255, 255];

/// Radial sine ripple inside a centred disc. Pixels outside the disc, or whose displaced
/// sample falls off the frame, keep the source value.
pub(super) fn liquify(frame: &Frame<'_>, dest: &mut PixelBuffer, ctx: &mut EffectContext<'_>) {
    let params = ctx.params.liquify;
    dest.copy_from(frame);

    let (width, height) = (frame.width(), frame.height());
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let radius = width.min(height) as f32 * params.radius_factor;
    if radius <= 0.0 || params.intensity == 0.0 {
        return;
    }

    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - center_x;
            let dy = y as f32 - center_y;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist >= radius {
                continue;
            }
            let angle = dy.atan2(dx);
            let wave = (dist / params.wavelength - ctx.time * params.speed).sin()
                * (1.0 - dist / radius)
                * params.intensity;
            let sample_x = sample_coord(x as f32 + wave * angle.cos(), width);
            let sample_y = sample_coord(y as f32 + wave * angle.sin(), height);
            if let (Some(sx), Some(sy)) = (sample_x, sample_y) {
                dest.set_pixel(x, y, frame.pixel(sx, sy));
            }
        }
    }
}

/// Whole-frame radial ripple over a transparent background, finished with a cyan glow disc.
/// Samples that fall off the frame stay transparent.
pub(super) fn portal_ripple(
    frame: &Frame<'_>,
    dest: &mut PixelBuffer,
    ctx: &mut EffectContext<'_>,
) {
    let params = ctx.params.ripple;
    dest.clear();

    let (width, height) = (frame.width(), frame.height());
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;

    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - center_x;
            let dy = y as f32 - center_y;
            let dist = (dx * dx + dy * dy).sqrt();
            let angle = dy.atan2(dx);
            let wave = (dist * params.frequency - ctx.time * params.speed).sin() * params.amplitude;
            let sample_x = sample_coord(x as f32 + wave * angle.cos(), width);
            let sample_y = sample_coord(y as f32 + wave * angle.sin(), height);
            if let (Some(sx), Some(sy)) = (sample_x, sample_y) {
                dest.set_pixel(x, y, frame.pixel(sx, sy));
            }
        }
    }

    draw_glow(dest, center_x, center_y, params.glow_radius, params.glow_blur, params.glow_opacity);
}

/// Soft disc: full opacity inside `radius`, fading linearly to zero across `blur` pixels.
fn draw_glow(
    dest: &mut PixelBuffer,
    center_x: f32,
    center_y: f32,
    radius: f32,
    blur: f32,
    opacity: f32,
) {
    if opacity <= 0.0 || radius + blur <= 0.0 {
        return;
    }
    let reach = radius.max(0.0) + blur.max(0.0);
    let min_x = (center_x - reach).floor().max(0.0) as u32;
    let min_y = (center_y - reach).floor().max(0.0) as u32;
    let max_x = ((center_x + reach).ceil().max(0.0) as u32).min(dest.width());
    let max_y = ((center_y + reach).ceil().max(0.0) as u32).min(dest.height());

    for y in min_y..max_y {
        for x in min_x..max_x {
            let dx = x as f32 + 0.5 - center_x;
            let dy = y as f32 + 0.5 - center_y;
            let dist = (dx * dx + dy * dy).sqrt();
            let coverage = if dist <= radius {
                1.0
            } else if blur > 0.0 {
                1.0 - (dist - radius) / blur
            } else {
                0.0
            };
            if coverage > 0.0 {
                dest.blend_pixel(x, y, GLOW_RGB, opacity * coverage);
            }
        }
    }
}

/// Vertical mirror followed by a per-row horizontal sine shear that fades toward the bottom.
/// Shifted samples that fall off the row keep the mirrored value.
pub(super) fn flip_gravity(
    frame: &Frame<'_>,
    dest: &mut PixelBuffer,
    ctx: &mut EffectContext<'_>,
) {
    let params = ctx.params.gravity;
    let (width, height) = (frame.width(), frame.height());
    let row_bytes = width as usize * 4;

    let flipped = &mut *ctx.scratch;
    flipped.ensure_size(width, height);
    let source = frame.pixels();
    for (y, row) in flipped
        .as_bytes_mut()
        .chunks_exact_mut(row_bytes)
        .enumerate()
    {
        let mirrored = (height as usize - 1 - y) * row_bytes;
        row.copy_from_slice(&source[mirrored..mirrored + row_bytes]);
    }
    dest.copy_from(&flipped.as_frame());

    for y in 0..height {
        let strength = (1.0 - y as f32 / height as f32) * params.strength;
        let shift = (y as f32 * params.frequency).sin() * strength;
        if shift == 0.0 {
            continue;
        }
        for x in 0..width {
            if let Some(sx) = sample_coord(x as f32 + shift, width) {
                dest.set_pixel(x, y, flipped.pixel(sx, y));
            }
        }
    }
}
