//! 5x7 bitmap glyphs for the digital rain: two binary digits and ten katakana-like shapes.
//! Each row keeps its five pixels in the low bits, leftmost pixel in bit 4.

pub(super) const GLYPH_WIDTH: u32 = 5;
pub(super) const GLYPH_HEIGHT: u32 = 7;
/// Drawn at 2x, giving a 14 px tall character.
pub(super) const GLYPH_SCALE: u32 = 2;

pub(super) type Glyph = [u8; GLYPH_HEIGHT as usize];

pub(super) const GLYPHS: [Glyph; 12] = [
    // 0
    [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
    // 1
    [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
    // a
    [0b11111, 0b00001, 0b00110, 0b00100, 0b00100, 0b01000, 0b10000],
    // i
    [0b00001, 0b00010, 0b00100, 0b01100, 0b10100, 0b00100, 0b00100],
    // u
    [0b00100, 0b11111, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000],
    // e
    [0b00000, 0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b11111],
    // o
    [0b00010, 0b11111, 0b00110, 0b01010, 0b10010, 0b00010, 0b00110],
    // ka
    [0b01000, 0b11111, 0b01001, 0b01001, 0b01001, 0b10001, 0b10110],
    // ki
    [0b01000, 0b11111, 0b00100, 0b11111, 0b00010, 0b00010, 0b00010],
    // ku
    [0b01000, 0b01111, 0b10001, 0b00001, 0b00010, 0b00100, 0b11000],
    // ke
    [0b01000, 0b01111, 0b10010, 0b00010, 0b00010, 0b00100, 0b01000],
    // ko
    [0b00000, 0b11111, 0b00001, 0b00001, 0b00001, 0b11111, 0b00000],
];

/// Yields the lit cells of `glyph` as (column, row) in glyph space.
pub(super) fn lit_cells(glyph: &Glyph) -> impl Iterator<Item = (u32, u32)> + '_ {
    glyph.iter().enumerate().flat_map(|(row, bits)| {
        (0..GLYPH_WIDTH).filter_map(move |column| {
            let mask = 1u8 << (GLYPH_WIDTH - 1 - column);
            (bits & mask != 0).then_some((column, row as u32))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyphs_fit_five_columns() {
        for glyph in &GLYPHS {
            assert!(glyph.iter().all(|row| *row < 0b100000));
            assert!(lit_cells(glyph).count() > 0);
        }
    }

    #[test]
    fn lit_cells_reads_left_to_right() {
        let cells: Vec<_> = lit_cells(&GLYPHS[1]).take(2).collect();
        assert_eq!(cells, vec![(2, 0), (1, 1)]);
    }
}
