use std::sync::Arc;
use three_d::*;

use crate::utils::*;


/// Thresholds used by every palette in the scenes
pub const T1: f32 = 0.33;
pub const T2: f32 = 0.66;

/// World-space direction towards the key light
pub const LIGHT_DIRECTION: Vec3 = Vec3 { x: 5.0, y: 5.0, z: 5.0 };

const MATERIAL_ID_BANDS: u16 = 0x0701;
const MATERIAL_ID_GRADIENT: u16 = 0x0702;


const fn rgb(r: u8, g: u8, b: u8) -> Srgba {
    Srgba { r, g, b, a: 255 }
}


/// Unvalidated palette parameters, usable in constants
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PaletteDef {
    pub shadow: Srgba,
    pub mid: Srgba,
    pub lit: Srgba,
    pub t1: f32,
    pub t2: f32,
    pub light_direction: Vec3,
}
impl PaletteDef {
    pub const fn new(shadow: Srgba, mid: Srgba, lit: Srgba) -> Self {
        Self {
            shadow,
            mid,
            lit,
            t1: T1,
            t2: T2,
            light_direction: LIGHT_DIRECTION,
        }
    }
}


pub const LAPTOP_SHELL: PaletteDef = PaletteDef::new(rgb(0x4a, 0x4e, 0x69), rgb(0x8d, 0x93, 0xab), rgb(0xd6, 0xdb, 0xe9));
pub const LAPTOP_KEYS: PaletteDef = PaletteDef::new(rgb(0x1c, 0x1c, 0x24), rgb(0x3a, 0x3a, 0x48), rgb(0x5c, 0x5c, 0x70));
pub const LAPTOP_TRACKPAD: PaletteDef = PaletteDef::new(rgb(0x5b, 0x61, 0x7a), rgb(0xa4, 0xaa, 0xc0), rgb(0xe4, 0xe8, 0xf2));
pub const METAL: PaletteDef = PaletteDef::new(rgb(0x3b, 0x3f, 0x46), rgb(0x6e, 0x74, 0x7d), rgb(0xa9, 0xb0, 0xb8));
pub const BRICK: PaletteDef = PaletteDef::new(rgb(0x6b, 0x2e, 0x24), rgb(0xa8, 0x4a, 0x35), rgb(0xd9, 0x6c, 0x4f));
pub const ROOF: PaletteDef = PaletteDef::new(rgb(0x2d, 0x33, 0x3b), rgb(0x4d, 0x57, 0x63), rgb(0x78, 0x84, 0x91));
pub const CONCRETE: PaletteDef = PaletteDef::new(rgb(0x6c, 0x6a, 0x63), rgb(0x9e, 0x9b, 0x91), rgb(0xcf, 0xcb, 0xbf));
pub const WINDOW_FRAME: PaletteDef = PaletteDef::new(rgb(0x1f, 0x3a, 0x4d), rgb(0x2f, 0x5d, 0x7a), rgb(0x4a, 0x8a, 0xb0));
pub const WINDOW_GLASS: PaletteDef = PaletteDef::new(rgb(0x1d, 0x4e, 0x6e), rgb(0x3f, 0x8e, 0xbf), rgb(0x9f, 0xd8, 0xf5));
pub const DOOR: PaletteDef = PaletteDef::new(rgb(0x3a, 0x2a, 0x1c), rgb(0x63, 0x47, 0x2e), rgb(0x8c, 0x66, 0x43));


/// Which of the three bands a fragment falls into
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Band { Shadow, Mid, Lit }


/// A validated three-band palette
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToonPalette {
    def: PaletteDef,
    light_direction: Vec3,
}
impl ToonPalette {
    /// Validates the thresholds and normalizes the light direction
    pub fn new(def: PaletteDef) -> Result<Self, String> {
        if !(0.0 <= def.t1 && def.t1 < def.t2 && def.t2 <= 1.0) {
            return Err(format!(
                "ToonPalette::new(): ERROR: thresholds must satisfy 0 <= t1 < t2 <= 1, got t1={}, t2={}",
                def.t1, def.t2
            ));
        }
        let length = def.light_direction.magnitude();
        if !length.is_finite() || is_float_zero(length, f32::EPSILON) {
            return Err(format!(
                "ToonPalette::new(): ERROR: light direction must be non-zero, got {:?}",
                def.light_direction
            ));
        }
        Ok(Self {
            def,
            light_direction: def.light_direction / length,
        })
    }

    pub fn thresholds(&self) -> (f32, f32) {
        (self.def.t1, self.def.t2)
    }

    /// Normalized light direction
    pub fn light_direction(&self) -> Vec3 {
        self.light_direction
    }

    pub fn color(&self, band: Band) -> Srgba {
        match band {
            Band::Shadow => self.def.shadow,
            Band::Mid => self.def.mid,
            Band::Lit => self.def.lit,
        }
    }

    /// Half-open intervals: [0, t1) shadow, [t1, t2) mid, [t2, 1] lit
    pub fn band(&self, ndl: f32) -> Band {
        if ndl < self.def.t1 {
            Band::Shadow
        } else if ndl < self.def.t2 {
            Band::Mid
        } else {
            Band::Lit
        }
    }

    /// CPU version of `toon.frag` in band mode
    pub fn shade(&self, normal: Vec3, light_direction: Vec3) -> Srgba {
        self.color(self.band(n_dot_l(normal, light_direction)))
    }
}


/// `max(0, dot(normalize(n), normalize(l)))`; degenerate vectors count as unlit
pub fn n_dot_l(normal: Vec3, light_direction: Vec3) -> f32 {
    let n = normal.magnitude();
    let l = light_direction.magnitude();
    if is_float_zero(n, f32::EPSILON) || is_float_zero(l, f32::EPSILON) {
        return 0.0;
    }
    (normal.dot(light_direction) / (n * l)).max(0.0)
}


/// Shading variant used by [ToonMaterial]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShadingMode { Bands, Gradient }


/// Colors are passed through untouched so the framebuffer receives the exact palette
#[inline(always)]
fn srgba_to_vec4(c: Srgba) -> Vec4 {
    vec4(
        c.r as f32 / 255.0,
        c.g as f32 / 255.0,
        c.b as f32 / 255.0,
        c.a as f32 / 255.0,
    )
}


/// Cel-shading material driven by `toon.frag`
#[derive(Clone)]
pub struct ToonMaterial {
    pub palette: ToonPalette,
    pub mode: ShadingMode,
    /// Lookup table sampled in [ShadingMode::Gradient]
    pub gradient: Option<Arc<Texture2D>>,
    pub render_states: RenderStates,
}
impl ToonMaterial {
    pub fn new(palette: ToonPalette, gradient: Option<Arc<Texture2D>>) -> Self {
        Self {
            palette,
            mode: ShadingMode::Bands,
            gradient,
            render_states: RenderStates {
                cull: Cull::Back,
                ..Default::default()
            },
        }
    }

    fn uses_gradient(&self) -> bool {
        self.mode == ShadingMode::Gradient && self.gradient.is_some()
    }
}
impl Material for ToonMaterial {
    fn id(&self) -> u16 {
        if self.uses_gradient() { MATERIAL_ID_GRADIENT } else { MATERIAL_ID_BANDS }
    }

    fn fragment_shader_source(&self, _lights: &[&dyn Light]) -> String {
        let mut source = String::new();
        if self.uses_gradient() {
            source.push_str("#define GRADIENT_SHADING\n");
        }
        source.push_str(include_str!("toon.frag"));
        source
    }

    fn fragment_attributes(&self) -> FragmentAttributes {
        FragmentAttributes {
            normal: true,
            ..FragmentAttributes::NONE
        }
    }

    fn use_uniforms(&self, program: &Program, _camera: &Camera, _lights: &[&dyn Light]) {
        let (t1, t2) = self.palette.thresholds();
        program.use_uniform_if_required("colorA", srgba_to_vec4(self.palette.color(Band::Shadow)));
        program.use_uniform_if_required("colorB", srgba_to_vec4(self.palette.color(Band::Mid)));
        program.use_uniform_if_required("colorC", srgba_to_vec4(self.palette.color(Band::Lit)));
        program.use_uniform_if_required("thresholds", vec2(t1, t2));
        program.use_uniform_if_required("lightDirection", self.palette.light_direction());
        if self.uses_gradient() {
            if let Some(texture) = self.gradient.as_ref() {
                program.use_texture("gradientMap", texture);
            }
        }
    }

    fn render_states(&self) -> RenderStates {
        self.render_states
    }

    fn material_type(&self) -> MaterialType {
        MaterialType::Opaque
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> ToonPalette {
        ToonPalette::new(LAPTOP_SHELL).unwrap()
    }

    #[test]
    fn band_boundaries_are_half_open() {
        let p = palette();
        assert_eq!(p.band(0.0), Band::Shadow);
        assert_eq!(p.band(0.32), Band::Shadow);
        assert_eq!(p.band(0.33), Band::Mid);
        assert_eq!(p.band(0.65), Band::Mid);
        assert_eq!(p.band(0.66), Band::Lit);
        assert_eq!(p.band(1.0), Band::Lit);
    }

    #[test]
    fn shade_picks_one_of_three_colors() {
        let p = palette();
        let light = vec3(0.0, 1.0, 0.0);
        let colors = [LAPTOP_SHELL.shadow, LAPTOP_SHELL.mid, LAPTOP_SHELL.lit];
        for i in 0..64 {
            let angle = i as f32 * 0.1;
            let normal = vec3(angle.cos(), angle.sin(), 0.3 * angle.sin());
            let c = p.shade(normal, light);
            assert!(colors.contains(&c));
            assert_eq!(c, p.shade(normal, light));
        }
    }

    #[test]
    fn shade_ignores_vector_length() {
        let p = palette();
        let light = vec3(0.0, 2.0, 0.0);
        assert_eq!(p.shade(vec3(0.0, 10.0, 0.0), light), LAPTOP_SHELL.lit);
        // cos(60deg) = 0.5 lands in the middle band
        let n = vec3(3f32.sqrt() / 2.0, 0.5, 0.0) * 7.0;
        assert_eq!(p.shade(n, light), LAPTOP_SHELL.mid);
        assert_eq!(p.shade(vec3(0.0, -1.0, 0.0), light), LAPTOP_SHELL.shadow);
    }

    #[test]
    fn n_dot_l_is_clamped() {
        assert_eq!(n_dot_l(vec3(0.0, -1.0, 0.0), vec3(0.0, 1.0, 0.0)), 0.0);
        assert_eq!(n_dot_l(Vec3::zero(), vec3(0.0, 1.0, 0.0)), 0.0);
        assert!(are_floats_equal(n_dot_l(vec3(1.0, 1.0, 1.0), LIGHT_DIRECTION), 1.0, 1e-6));
    }

    #[test]
    fn invalid_palettes_are_rejected() {
        let mut def = LAPTOP_SHELL;
        def.t1 = 0.66;
        def.t2 = 0.33;
        assert!(ToonPalette::new(def).is_err());

        let mut def = LAPTOP_SHELL;
        def.t1 = 0.5;
        def.t2 = 0.5;
        assert!(ToonPalette::new(def).is_err());

        let mut def = LAPTOP_SHELL;
        def.t2 = 1.5;
        assert!(ToonPalette::new(def).is_err());

        let mut def = LAPTOP_SHELL;
        def.light_direction = Vec3::zero();
        assert!(ToonPalette::new(def).is_err());
    }

    #[test]
    fn light_direction_is_normalized() {
        let d = palette().light_direction();
        assert!(are_floats_equal(d.magnitude(), 1.0, 1e-6));
    }

    #[test]
    fn shader_switches_on_mode() {
        let mut m = ToonMaterial::new(palette(), None);
        assert!(!m.fragment_shader_source(&[]).contains("#define GRADIENT_SHADING"));
        // without a lookup table the gradient mode falls back to bands
        m.mode = ShadingMode::Gradient;
        assert_eq!(m.id(), MATERIAL_ID_BANDS);
        assert!(matches!(m.render_states().cull, Cull::Back));
    }
}
