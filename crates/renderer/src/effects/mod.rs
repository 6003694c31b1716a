//! CPU pixel effects used by the fallback path.
//!
//! Each effect reads the borrowed source [`Frame`] and writes the full destination
//! [`PixelBuffer`]. Warping effects gather from the untouched source (or from a snapshot taken
//! before the pass starts) so no pass reads pixels it has already written. Dispatch goes through
//! a table indexed by [`EffectKind`]; a missing selection or an unknown id is an identity copy.

mod glitch;
mod glyphs;
mod overlay;
mod params;
mod warp;

use rand::rngs::StdRng;
use rand::SeedableRng;
use selector::EffectKind;

use crate::pixels::{Frame, PixelBuffer};

pub use params::{
    EffectParams, GravityParams, LiquifyParams, MatrixParams, PixelSortParams, RippleParams,
    SlowMotionParams, VhsParams,
};

/// Per-call inputs shared by every effect.
pub(crate) struct EffectContext<'a> {
    pub time: f32,
    pub params: &'a EffectParams,
    pub rng: &'a mut StdRng,
    /// Reusable buffer for effects that need a snapshot of an intermediate image.
    pub scratch: &'a mut PixelBuffer,
}

type EffectFn = fn(&Frame<'_>, &mut PixelBuffer, &mut EffectContext<'_>);

/// Indexed by `EffectKind as usize`, matching the catalog order.
const RENDERERS: [EffectFn; 7] = [
    warp::liquify,
    glitch::vhs,
    glitch::pixel_sort,
    overlay::matrix,
    warp::flip_gravity,
    overlay::slow_motion,
    warp::portal_ripple,
];

pub struct EffectLibrary {
    params: EffectParams,
    rng: StdRng,
    scratch: PixelBuffer,
}

impl EffectLibrary {
    /// `seed` fixes the noise used by VHS specks and matrix glyphs; entropy when `None`.
    pub fn new(params: EffectParams, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            params,
            rng,
            scratch: PixelBuffer::new(0, 0),
        }
    }

    /// Renders `frame` into `dest` with `effect`, or copies it unchanged for `None`.
    pub fn apply(
        &mut self,
        effect: Option<EffectKind>,
        frame: &Frame<'_>,
        dest: &mut PixelBuffer,
        time: f32,
    ) {
        let Some(kind) = effect else {
            dest.copy_from(frame);
            return;
        };
        dest.ensure_size(frame.width(), frame.height());
        let mut context = EffectContext {
            time,
            params: &self.params,
            rng: &mut self.rng,
            scratch: &mut self.scratch,
        };
        RENDERERS[kind as usize](frame, dest, &mut context);
    }

    /// Same as [`apply`](Self::apply) but keyed by effect id. Unknown ids render the identity.
    pub fn apply_id(&mut self, id: &str, frame: &Frame<'_>, dest: &mut PixelBuffer, time: f32) {
        self.apply(EffectKind::from_id(id), frame, dest, time);
    }
}

/// Rounds a displaced coordinate and returns it when it lies inside `0..limit`.
pub(crate) fn sample_coord(value: f32, limit: u32) -> Option<u32> {
    let rounded = value.round();
    if rounded >= 0.0 && rounded < limit as f32 {
        Some(rounded as u32)
    } else {
        None
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn unknown_ids_render_identity() {
        let pixels = gradient(16, 12);
        let frame = frame(16, 12, &pixels);
        let mut library = EffectLibrary::new(EffectParams::default(), Some(1));
        for id in ["", "sepia", "LIQUIFY", "glitch"] {
            let out = render(&mut library, id, &frame, 1.0);
            assert_eq!(out.as_bytes(), pixels.as_slice(), "id {id:?}");
        }
    }

    #[test]
    fn no_selection_is_identity() {
        let pixels = gradient(8, 8);
        let frame = frame(8, 8, &pixels);
        let mut library = EffectLibrary::new(EffectParams::default(), Some(1));
        let mut dest = PixelBuffer::new(2, 2);
        library.apply(None, &frame, &mut dest, 0.5);
        assert_eq!(dest.as_bytes(), pixels.as_slice());
    }

    #[test]
    fn every_effect_fills_a_frame_sized_buffer() {
        let pixels = gradient(40, 30);
        let frame = frame(40, 30, &pixels);
        let mut library = EffectLibrary::new(EffectParams::default(), Some(3));
        for kind in EffectKind::ALL {
            let mut dest = PixelBuffer::new(1, 1);
            library.apply(Some(kind), &frame, &mut dest, 2.0);
            assert_eq!((dest.width(), dest.height()), (40, 30), "{kind}");
        }
    }

    #[test]
    fn seeded_libraries_agree() {
        let pixels = gradient(64, 48);
        let frame = frame(64, 48, &pixels);
        let mut first = EffectLibrary::new(EffectParams::default(), Some(42));
        let mut second = EffectLibrary::new(EffectParams::default(), Some(42));
        for id in ["vhs", "matrix"] {
            let a = render(&mut first, id, &frame, 1.2);
            let b = render(&mut second, id, &frame, 1.2);
            assert_eq!(a, b, "{id}");
        }
    }

    #[test]
    fn sample_coord_rounds_and_bounds() {
        assert_eq!(sample_coord(2.4, 4), Some(2));
        assert_eq!(sample_coord(2.6, 4), Some(3));
        assert_eq!(sample_coord(3.6, 4), None);
        assert_eq!(sample_coord(-0.4, 4), Some(0));
        assert_eq!(sample_coord(-0.6, 4), None);
    }
}
