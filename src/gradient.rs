use std::sync::{Arc, OnceLock};
use three_d::*;

use crate::log; // macro import


/// Number of entries in the lookup table
pub const GRADIENT_SIZE: usize = 256;

/// Step count used for the session's gradient texture
pub const GRADIENT_STEPS: u32 = 3;

static SESSION_LUT: OnceLock<Vec<u8>> = OnceLock::new();


/// Builds a stepped grayscale lookup table with `steps` evenly spaced levels
///
/// Entry `i` is `floor((i / size) * steps) / (steps - 1)` scaled to [0, 255].
pub fn gradient_lut(steps: u32) -> Result<Vec<u8>, String> {
    if steps < 2 {
        return Err(format!("gradient_lut(): ERROR: need at least 2 steps, got {}", steps));
    }
    let n = steps as usize;
    let lut = (0..GRADIENT_SIZE)
        .map(|i| {
            let level = (i * n) / GRADIENT_SIZE; // floor
            let gray = level as f32 / (n - 1) as f32;
            (gray * 255.0).round() as u8
        })
        .collect();
    Ok(lut)
}


/// Lookup table for [GRADIENT_STEPS], computed on first use
pub fn session_lut() -> &'static [u8] {
    SESSION_LUT
        .get_or_init(|| gradient_lut(GRADIENT_STEPS).unwrap_or_else(|_| vec![255; GRADIENT_SIZE]))
        .as_slice()
}


/// Uploads the session lookup table as a 256x1 single channel texture
pub fn create_gradient_texture(context: &Context) -> Arc<Texture2D> {
    let lut = session_lut();
    log!("create_gradient_texture(): steps={}, size={}", GRADIENT_STEPS, lut.len());
    let cpu_texture = CpuTexture {
        data: TextureData::RU8(lut.to_vec()),
        width: GRADIENT_SIZE as u32,
        height: 1,
        min_filter: Interpolation::Nearest,
        mag_filter: Interpolation::Nearest,
        wrap_s: Wrapping::ClampToEdge,
        wrap_t: Wrapping::ClampToEdge,
        ..Default::default()
    };
    Arc::new(Texture2D::new(context, &cpu_texture))
}


#[cfg(test)]
mod tests {
    use super::*;

    fn distinct(lut: &[u8]) -> Vec<u8> {
        let mut levels = lut.to_vec();
        levels.dedup();
        levels
    }

    #[test]
    fn three_steps() {
        let lut = gradient_lut(3).unwrap();
        assert_eq!(lut.len(), GRADIENT_SIZE);
        assert!(lut.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(distinct(&lut), vec![0, 128, 255]);
        assert_eq!(lut[0], 0);
        assert_eq!(lut[85], 0);
        assert_eq!(lut[86], 128);
        assert_eq!(lut[255], 255);
    }

    #[test]
    fn two_steps_is_a_hard_split() {
        let lut = gradient_lut(2).unwrap();
        assert_eq!(distinct(&lut), vec![0, 255]);
        assert_eq!(lut[127], 0);
        assert_eq!(lut[128], 255);
    }

    #[test]
    fn step_count_matches_levels() {
        for steps in 2..=8 {
            let lut = gradient_lut(steps).unwrap();
            assert_eq!(distinct(&lut).len(), steps as usize);
            assert_eq!(*lut.last().unwrap(), 255);
        }
    }

    #[test]
    fn too_few_steps() {
        assert!(gradient_lut(0).is_err());
        assert!(gradient_lut(1).is_err());
    }

    #[test]
    fn session_table_is_cached() {
        let a = session_lut();
        let b = session_lut();
        assert_eq!(a.as_ptr(), b.as_ptr());
        assert_eq!(a, gradient_lut(GRADIENT_STEPS).unwrap().as_slice());
    }
}
