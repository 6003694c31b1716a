use rand::Rng;

use crate::pixels::{Frame, PixelBuffer, BYTES_PER_PIXEL};

use super::EffectContext;

const SCANLINE_RGB: [u8; 3] = [0, 0, 0];
const SPECK_RGB: [u8; 3] = [255, 255, 255];

/// Tape look: darkened even scanlines, red/blue channel split and sparse white noise.
///
/// The channel split reads from a snapshot of the scanlined image using flat buffer offsets,
/// so it bleeds across row boundaries at the frame edges.
pub(super) fn vhs(frame: &Frame<'_>, dest: &mut PixelBuffer, ctx: &mut EffectContext<'_>) {
    let params = ctx.params.vhs;
    let (width, height) = (frame.width(), frame.height());

    let snapshot = &mut *ctx.scratch;
    snapshot.copy_from(frame);
    for y in (0..height).step_by(2) {
        snapshot.wash_row(y, SCANLINE_RGB, params.scanline_opacity);
    }

    dest.copy_from(&snapshot.as_frame());
    let offset = params.channel_shift as usize * BYTES_PER_PIXEL;
    let source = snapshot.as_bytes();
    let target = dest.as_bytes_mut();
    let len = target.len();
    for index in (0..len).step_by(BYTES_PER_PIXEL) {
        if index + offset < len {
            target[index] = source[index + offset];
        }
        if index >= offset {
            target[index + 2] = source[index - offset + 2];
        }
    }

    for _ in 0..params.speck_count {
        let x = ctx.rng.gen_range(0..width);
        let y = ctx.rng.gen_range(0..height);
        dest.blend_pixel(x, y, SPECK_RGB, params.speck_opacity);
    }
}

fn luminance(pixel: &[u8]) -> f32 {
    (pixel[0] as f32 + pixel[1] as f32 + pixel[2] as f32) / 3.0
}

/// Per-row stable sort of the bright pixels by luminance, written back into the slots the bright
/// pixels came from. Pixels at or below the threshold never move.
pub(super) fn pixel_sort(frame: &Frame<'_>, dest: &mut PixelBuffer, ctx: &mut EffectContext<'_>) {
    let threshold = ctx.params.pixel_sort.threshold;
    dest.copy_from(frame);

    let row_bytes = frame.width() as usize * BYTES_PER_PIXEL;
    let mut bright: Vec<(f32, [u8; 4])> = Vec::with_capacity(frame.width() as usize);
    let mut slots: Vec<usize> = Vec::with_capacity(frame.width() as usize);

    for (source_row, target_row) in frame
        .pixels()
        .chunks_exact(row_bytes)
        .zip(dest.as_bytes_mut().chunks_exact_mut(row_bytes))
    {
        bright.clear();
        slots.clear();
        for (slot, pixel) in source_row.chunks_exact(BYTES_PER_PIXEL).enumerate() {
            let value = luminance(pixel);
            if value > threshold {
                bright.push((value, [pixel[0], pixel[1], pixel[2], pixel[3]]));
                slots.push(slot);
            }
        }
        if bright.len() < 2 {
            continue;
        }
        bright.sort_by(|a, b| a.0.total_cmp(&b.0));
        for (&slot, (_, rgba)) in slots.iter().zip(&bright) {
            let start = slot * BYTES_PER_PIXEL;
            target_row[start..start + BYTES_PER_PIXEL].copy_from_slice(rgba);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::{EffectLibrary, EffectParams};
    use super::luminance;

    fn sorted_pixels(row: &[u8]) -> Vec<[u8; 4]> {
        let mut pixels: Vec<[u8; 4]> = row
            .chunks_exact(4)
            .map(|p| [p[0], p[1], p[2], p[3]])
            .collect();
        pixels.sort();
        pixels
    }

    fn bright_row_frame() -> (u32, u32, Vec<u8>) {
        let width = 12;
        let height = 3;
        let mut pixels = Vec::new();
        for y in 0..height {
            for x in 0..width {
                // Alternate dark and bright pixels with descending brightness.
                if x % 2 == 0 {
                    pixels.extend_from_slice(&[10 + x as u8, 20, 30 + y as u8, 255]);
                } else {
                    let level = 250 - (x as u8) * 4;
                    pixels.extend_from_slice(&[level, level, level - y as u8, 200 + x as u8]);
                }
            }
        }
        (width, height, pixels)
    }

    #[test]
    fn pixel_sort_rows_are_permutations() {
        let (width, height, pixels) = bright_row_frame();
        let frame = frame(width, height, &pixels);
        let mut library = EffectLibrary::new(EffectParams::default(), Some(0));
        let out = render(&mut library, "pixel_sort", &frame, 0.0);

        let row_bytes = (width * 4) as usize;
        for (source_row, out_row) in pixels
            .chunks_exact(row_bytes)
            .zip(out.as_bytes().chunks_exact(row_bytes))
        {
            assert_eq!(sorted_pixels(source_row), sorted_pixels(out_row));
        }
    }

    #[test]
    fn pixel_sort_keeps_dim_pixels_in_place_and_orders_bright_ones() {
        let (width, height, pixels) = bright_row_frame();
        let frame = frame(width, height, &pixels);
        let mut library = EffectLibrary::new(EffectParams::default(), Some(0));
        let out = render(&mut library, "pixel_sort", &frame, 0.0);

        for y in 0..height {
            let mut previous = f32::MIN;
            for x in 0..width {
                let source = frame.pixel(x, y);
                let rendered = out.pixel(x, y);
                if luminance(&source) <= 200.0 {
                    assert_eq!(rendered, source, "dim pixel moved at ({x}, {y})");
                } else {
                    let value = luminance(&rendered);
                    assert!(value > 200.0);
                    assert!(value >= previous, "row {y} not ascending");
                    previous = value;
                }
            }
        }
    }

    #[test]
    fn pixel_sort_is_stable_for_equal_luminance() {
        // Three bright pixels with equal luminance but distinct colours.
        let pixels = vec![
            230, 220, 210, 255, //
            220, 230, 210, 255, //
            210, 220, 230, 255, //
        ];
        let frame = frame(3, 1, &pixels);
        let mut library = EffectLibrary::new(EffectParams::default(), Some(0));
        let out = render(&mut library, "pixel_sort", &frame, 0.0);
        assert_eq!(out.as_bytes(), pixels.as_slice());
    }

    #[test]
    fn vhs_darkens_even_scanlines() {
        let pixels = uniform(30, 10, [100, 100, 100, 255]);
        let frame = frame(30, 10, &pixels);
        let mut params = EffectParams::default();
        params.vhs.speck_count = 0;
        let mut library = EffectLibrary::new(params, Some(9));
        let out = render(&mut library, "vhs", &frame, 0.0);
        for y in 0..10 {
            for x in 0..30 {
                // Green is never channel-shifted.
                let green = out.pixel(x, y)[1];
                if y % 2 == 0 {
                    assert!(green <= 98, "even row {y} green {green}");
                } else {
                    assert!(green >= 100, "odd row {y} green {green}");
                }
            }
        }
    }

    #[test]
    fn vhs_shifts_red_and_blue_channels() {
        let width = 8;
        let mut pixels = Vec::new();
        for x in 0..width {
            pixels.extend_from_slice(&[x as u8 * 10, 50, x as u8 * 20, 255]);
        }
        // Row 1 is not scanlined.
        let mut both = pixels.clone();
        both.extend_from_slice(&pixels);
        let frame = frame(width, 2, &both);

        let mut params = EffectParams::default();
        params.vhs.speck_count = 0;
        let mut library = EffectLibrary::new(params, Some(0));
        let out = render(&mut library, "vhs", &frame, 0.0);

        // Row 1, x = 3: red from x = 5, blue from x = 1 of the same row.
        assert_eq!(out.pixel(3, 1), [50, 50, 20, 255]);
        // Nothing lies ahead of the last pixel, so it keeps its own red.
        assert_eq!(out.pixel(7, 1)[0], 70);
    }

    #[test]
    fn vhs_specks_only_brighten() {
        let pixels = uniform(20, 20, [0, 0, 0, 255]);
        let frame = frame(20, 20, &pixels);
        let mut params = EffectParams::default();
        params.vhs.scanline_opacity = 0.0;
        let mut library = EffectLibrary::new(params, Some(5));
        let out = render(&mut library, "vhs", &frame, 0.0);
        let lit = out
            .as_bytes()
            .chunks_exact(4)
            .filter(|pixel| pixel[1] > 0)
            .count();
        assert!(lit > 0 && lit <= 100, "lit pixels {lit}");
        assert!(out.as_bytes().chunks_exact(4).all(|pixel| pixel[3] == 255));
    }
}
