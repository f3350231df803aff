use std::sync::Arc;
use three_d::*;

use crate::log; // macro import
use crate::assembler;
use crate::structure::*;
use crate::toon::*;


/// Image shown on the laptop screen, relative to the page
pub const SCREEN_TEXTURE_PATH: &str = "assets/screen.png";

/// Screen color used when the image could not be loaded
const SCREEN_FALLBACK: Srgba = Srgba { r: 0x22, g: 0x27, b: 0x33, a: 255 };


/// Idle yaw oscillation of the root: `sin(t * frequency) * amplitude`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IdleAnimation {
    pub frequency: f32,
    pub amplitude: f32,
}
impl IdleAnimation {
    /// Root yaw in radians after `elapsed` seconds
    pub fn yaw(&self, elapsed: f32) -> f32 {
        (elapsed * self.frequency).sin() * self.amplitude
    }
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraSetup {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
}


/// Limits handed to the orbit control
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitLimits {
    pub min_distance: f32,
    pub max_distance: f32,
    pub enable_pan: bool,
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightSetup {
    pub ambient_intensity: f32,
    pub directional_intensity: f32,
    /// Direction the light travels in
    pub direction: Vec3,
    pub shadow_map_size: u32,
}


/// Everything but the geometry of a scene
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneSetup {
    pub camera: CameraSetup,
    pub orbit: OrbitLimits,
    pub lights: LightSetup,
    pub background: Srgba,
    pub idle: IdleAnimation,
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneKind { Laptop, Building }
impl SceneKind {
    pub const ALL: [SceneKind; 2] = [SceneKind::Laptop, SceneKind::Building];

    pub fn label(&self) -> &'static str {
        match self {
            SceneKind::Laptop => "Laptop",
            SceneKind::Building => "Building",
        }
    }

    pub fn setup(&self) -> SceneSetup {
        let lights = LightSetup {
            ambient_intensity: 0.6,
            directional_intensity: 1.0,
            direction: -LIGHT_DIRECTION,
            shadow_map_size: 2048,
        };
        match self {
            SceneKind::Laptop => SceneSetup {
                camera: CameraSetup {
                    position: vec3(0.0, 3.5, 6.0),
                    target: vec3(0.0, 0.8, 0.0),
                    fov_degrees: 45.0,
                    z_near: 0.1,
                    z_far: 100.0,
                },
                orbit: OrbitLimits { min_distance: 3.0, max_distance: 12.0, enable_pan: false },
                lights,
                background: Srgba { r: 0xf3, g: 0xec, b: 0xdf, a: 255 },
                idle: IdleAnimation { frequency: 0.2, amplitude: 0.3 },
            },
            SceneKind::Building => SceneSetup {
                camera: CameraSetup {
                    position: vec3(0.0, 6.0, 16.0),
                    target: vec3(0.0, 2.5, 0.0),
                    fov_degrees: 50.0,
                    z_near: 0.1,
                    z_far: 200.0,
                },
                orbit: OrbitLimits { min_distance: 8.0, max_distance: 30.0, enable_pan: true },
                lights,
                background: Srgba { r: 0xbf, g: 0xdc, b: 0xe8, a: 255 },
                idle: IdleAnimation { frequency: 0.15, amplitude: 0.1 },
            },
        }
    }

    pub fn structure(&self) -> Node {
        match self {
            SceneKind::Laptop => assembler::laptop(),
            SceneKind::Building => assembler::building(),
        }
    }

    pub fn camera(&self, viewport: Viewport) -> Camera {
        let c = self.setup().camera;
        Camera::new_perspective(
            viewport,
            c.position,
            c.target,
            vec3(0.0, 1.0, 0.0),
            degrees(c.fov_degrees),
            c.z_near,
            c.z_far,
        )
    }
}


/// A mesh plus its transform in the root's frame
struct Placed<M: Material> {
    gm: Gm<Mesh, M>,
    local: Mat4,
}
impl<M: Material> Placed<M> {
    fn new(context: &Context, cpu_mesh: &CpuMesh, local: Mat4, material: M) -> Self {
        let mut gm = Gm::new(Mesh::new(context, cpu_mesh), material);
        gm.geometry.set_transformation(local);
        Self { gm, local }
    }

    fn apply_root(&mut self, root: Mat4) {
        self.gm.geometry.set_transformation(root * self.local);
    }
}


/// GPU side of an assembled structure
pub struct ComposedScene {
    pub kind: SceneKind,
    pub setup: SceneSetup,
    /// Root-space primitives, used for picking
    pub parts: Vec<PlacedPart>,
    toon: Vec<Placed<ToonMaterial>>,
    flat: Vec<Placed<ColorMaterial>>,
    lit: Vec<Placed<PhysicalMaterial>>,
    yaw: f32,
}
impl ComposedScene {
    /// Builds meshes for every primitive plus back-face outline shells
    pub fn compose(
        context: &Context,
        kind: SceneKind,
        gradient: Option<Arc<Texture2D>>,
        screen: Option<Texture2DRef>,
    ) -> Result<Self, String> {
        let parts = kind.structure().flatten();
        let outline = outline_material();

        let mut toon = Vec::new();
        let mut flat = Vec::new();
        let mut lit = Vec::new();
        for placed in parts.iter() {
            let cpu_mesh = placed.shape.unit_mesh();
            let local = placed.mesh_matrix();
            match placed.part.surface {
                Surface::Toon(def) => {
                    let palette = ToonPalette::new(def)
                        .map_err(|e| format!("{} ({})", e, placed.path))?;
                    toon.push(Placed::new(context, &cpu_mesh, local, ToonMaterial::new(palette, gradient.clone())));
                },
                Surface::Flat(color) => {
                    flat.push(Placed::new(context, &cpu_mesh, local, ColorMaterial { color, ..Default::default() }));
                },
                Surface::Screen => {
                    let material = match screen.as_ref() {
                        Some(texture) => ColorMaterial {
                            color: Srgba::WHITE,
                            texture: Some(texture.clone()),
                            ..Default::default()
                        },
                        None => ColorMaterial { color: SCREEN_FALLBACK, ..Default::default() },
                    };
                    flat.push(Placed::new(context, &cpu_mesh, local, material));
                },
                Surface::Ground(albedo) => {
                    let material = PhysicalMaterial::new_opaque(context, &CpuMaterial {
                        albedo,
                        roughness: 1.0,
                        metallic: 0.0,
                        ..Default::default()
                    });
                    lit.push(Placed::new(context, &cpu_mesh, local, material));
                },
            }
            if placed.part.outline {
                flat.push(Placed::new(context, &cpu_mesh, placed.outline_matrix(), outline.clone()));
            }
        }

        log!(
            "ComposedScene::compose(): {}: parts={}, toon={}, flat={}, lit={}",
            kind.label(), parts.len(), toon.len(), flat.len(), lit.len()
        );

        Ok(Self {
            kind,
            setup: kind.setup(),
            parts,
            toon,
            flat,
            lit,
            yaw: 0.0,
        })
    }

    /// Recomputes the root yaw from the elapsed time in seconds
    pub fn animate(&mut self, elapsed: f32) {
        self.yaw = self.setup.idle.yaw(elapsed);
        let root = Mat4::from_angle_y(radians(self.yaw));
        self.toon.iter_mut().for_each(|p| p.apply_root(root));
        self.flat.iter_mut().for_each(|p| p.apply_root(root));
        self.lit.iter_mut().for_each(|p| p.apply_root(root));
    }

    pub fn root_yaw(&self) -> f32 {
        self.yaw
    }

    pub fn set_shading_mode(&mut self, mode: ShadingMode) {
        self.toon.iter_mut().for_each(|p| p.gm.material.mode = mode);
    }

    pub fn mesh_count(&self) -> usize {
        self.toon.len() + self.flat.len() + self.lit.len()
    }

    pub fn objects(&self) -> Vec<&dyn Object> {
        let mut objects: Vec<&dyn Object> = Vec::with_capacity(self.mesh_count());
        objects.extend(self.lit.iter().map(|p| &p.gm as &dyn Object));
        objects.extend(self.toon.iter().map(|p| &p.gm as &dyn Object));
        objects.extend(self.flat.iter().map(|p| &p.gm as &dyn Object));
        objects
    }

    /// Solid geometry for the directional light's shadow map
    pub fn shadow_casters(&self) -> Vec<&Mesh> {
        self.toon.iter().map(|p| &p.gm.geometry).collect()
    }
}


/// Unlit white material sampling the screen image with clamped edges
pub fn screen_material_source(mut cpu_texture: CpuTexture) -> CpuMaterial {
    cpu_texture.wrap_s = Wrapping::ClampToEdge;
    cpu_texture.wrap_t = Wrapping::ClampToEdge;
    CpuMaterial {
        albedo: Srgba::WHITE,
        albedo_texture: Some(cpu_texture),
        ..Default::default()
    }
}


/// Loads the laptop screen image once; failures are logged and leave the panel untextured
pub async fn load_screen_texture(context: &Context) -> Option<Texture2DRef> {
    let mut assets = match three_d_asset::io::load_async(&[SCREEN_TEXTURE_PATH]).await {
        Ok(assets) => assets,
        Err(e) => {
            log!("load_screen_texture(): ERROR: {:?}", e);
            return None;
        },
    };
    match assets.deserialize::<CpuTexture>(SCREEN_TEXTURE_PATH) {
        Ok(cpu_texture) => {
            log!(
                "load_screen_texture(): {}x{}",
                cpu_texture.width, cpu_texture.height
            );
            // new_opaque linearises the sRGB bytes before upload
            ColorMaterial::new_opaque(context, &screen_material_source(cpu_texture)).texture
        },
        Err(e) => {
            log!("load_screen_texture(): ERROR: {:?}", e);
            None
        },
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::*;

    #[test]
    fn laptop_yaw() {
        let idle = SceneKind::Laptop.setup().idle;
        for t in [0.0_f32, 0.5, 3.0, 7.85, 100.0] {
            assert!(are_floats_equal(idle.yaw(t), (t*0.2).sin()*0.3, 1e-6));
        }
    }

    #[test]
    fn building_yaw() {
        let idle = SceneKind::Building.setup().idle;
        for t in [0.0_f32, 1.0, 10.47, 42.0] {
            assert!(are_floats_equal(idle.yaw(t), (t*0.15).sin()*0.1, 1e-6));
        }
    }

    #[test]
    fn yaw_is_bounded_and_starts_at_zero() {
        for kind in SceneKind::ALL {
            let idle = kind.setup().idle;
            assert_eq!(idle.yaw(0.0), 0.0);
            for i in 0..2000 {
                let yaw = idle.yaw(i as f32 * 0.05);
                assert!(yaw.abs() <= idle.amplitude + 1e-6);
            }
        }
    }

    #[test]
    fn yaw_depends_on_time_only() {
        let idle = SceneKind::Laptop.setup().idle;
        let a = idle.yaw(12.5);
        let _ = idle.yaw(3.0);
        assert_eq!(idle.yaw(12.5), a);
    }

    #[test]
    fn setups_are_consistent() {
        for kind in SceneKind::ALL {
            let setup = kind.setup();
            assert!(setup.orbit.min_distance < setup.orbit.max_distance);
            let distance = (setup.camera.position - setup.camera.target).magnitude();
            assert!(distance >= setup.orbit.min_distance && distance <= setup.orbit.max_distance);
            assert!(setup.camera.z_near < setup.camera.z_far);
            assert!(setup.lights.direction.magnitude() > 0.0);
        }
    }

    #[test]
    fn screen_image_is_clamped_and_untinted() {
        let cpu_texture = CpuTexture {
            data: TextureData::RgbaU8(vec![[0x80, 0x80, 0x80, 0xff]; 4]),
            width: 2,
            height: 2,
            ..Default::default()
        };
        let source = screen_material_source(cpu_texture);
        assert_eq!(source.albedo, Srgba::WHITE);
        let texture = source.albedo_texture.expect("screen texture");
        assert!(matches!(texture.wrap_s, Wrapping::ClampToEdge));
        assert!(matches!(texture.wrap_t, Wrapping::ClampToEdge));
        assert!(matches!(texture.data, TextureData::RgbaU8(ref bytes) if bytes[0] == [0x80, 0x80, 0x80, 0xff]));
    }

    #[test]
    fn every_scene_palette_is_valid() {
        for kind in SceneKind::ALL {
            for part in kind.structure().flatten() {
                if let Surface::Toon(def) = part.part.surface {
                    assert!(ToonPalette::new(def).is_ok(), "{}", part.path);
                }
            }
        }
    }
}
