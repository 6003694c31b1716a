use bytemuck::{Pod, Zeroable};

/// Mirrors `EffectUniforms` in the WGSL prelude.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct EffectUniforms {
    pub time: f32,
    pub _pad: f32,
    pub resolution: [f32; 2],
    pub params: [[f32; 4]; 2],
}

impl EffectUniforms {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            time: 0.0,
            _pad: 0.0,
            resolution: [width as f32, height as f32],
            params: [[0.0; 4]; 2],
        }
    }

    pub fn set_time(&mut self, time: f32) {
        self.time = time;
    }

    pub fn set_params(&mut self, params: [[f32; 4]; 2]) {
        self.params = params;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_wgsl_block() {
        assert_eq!(std::mem::size_of::<EffectUniforms>(), 48);
        let mut uniforms = EffectUniforms::new(640, 480);
        uniforms.set_time(0.5);
        uniforms.set_params([[0.4, 15.0, 3.0, 0.0], [1.0, 0.0, 0.0, 0.0]]);
        let bytes = bytemuck::bytes_of(&uniforms);
        assert_eq!(&bytes[0..4], &0.5f32.to_ne_bytes());
        assert_eq!(&bytes[8..12], &640.0f32.to_ne_bytes());
        assert_eq!(&bytes[12..16], &480.0f32.to_ne_bytes());
        assert_eq!(&bytes[16..20], &0.4f32.to_ne_bytes());
        assert_eq!(&bytes[28..32], &0.0f32.to_ne_bytes());
        assert_eq!(&bytes[32..36], &1.0f32.to_ne_bytes());
    }
}
