use three_d::*;

use crate::bridge::WindowTag;
use crate::toon::PaletteDef;


/// Outline duplicates are this much larger than their source
pub const OUTLINE_SCALE: f32 = 0.04;

/// Color of the back-face outline shells
pub const OUTLINE_COLOR: Srgba = Srgba { r: 0x14, g: 0x12, b: 0x1c, a: 255 };

/// Unlit material of an outline shell; only its back faces are drawn
pub fn outline_material() -> ColorMaterial {
    ColorMaterial {
        color: OUTLINE_COLOR,
        render_states: RenderStates {
            cull: Cull::Front,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Segments around a cylinder
pub const CYLINDER_SEGMENTS: u32 = 24;


/// Position, Euler rotation (radians, applied X then Y then Z) and scale of a node
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}
impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zero(),
            rotation: Vec3::zero(),
            scale: vec3(1.0, 1.0, 1.0),
        }
    }
}
impl Transform {
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: vec3(x, y, z),
            ..Default::default()
        }
    }

    pub fn rotated(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = vec3(x, y, z);
        self
    }

    /// T * Rx * Ry * Rz * S
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_angle_x(radians(self.rotation.x))
            * Mat4::from_angle_y(radians(self.rotation.y))
            * Mat4::from_angle_z(radians(self.rotation.z))
            * Mat4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}


/// How a primitive is painted
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Surface {
    /// Three-band cel shading
    Toon(PaletteDef),
    /// Unlit single color
    Flat(Srgba),
    /// Lit, shadow receiving floor
    Ground(Srgba),
    /// Panel showing the external screen texture
    Screen,
}


/// Painting and interaction settings of a primitive
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Part {
    pub surface: Surface,
    pub tag: Option<WindowTag>,
    pub outline: bool,
}
impl Part {
    pub fn toon(palette: PaletteDef) -> Self {
        Self { surface: Surface::Toon(palette), tag: None, outline: true }
    }

    pub fn surface(surface: Surface) -> Self {
        Self { surface, tag: None, outline: false }
    }

    pub fn interactive(mut self, tag: WindowTag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn without_outline(mut self) -> Self {
        self.outline = false;
        self
    }
}


/// Primitive dimensions
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Box { size: Vec3 },
    /// Upright along local Y, centered on the origin
    Cylinder { radius: f32, height: f32 },
    /// In the local XY plane, facing +Z
    Plane { width: f32, height: f32 },
}
impl Shape {
    /// Maps the unit mesh from [Shape::unit_mesh] onto these dimensions
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Shape::Box { size } => Mat4::from_nonuniform_scale(0.5*size.x, 0.5*size.y, 0.5*size.z),
            Shape::Cylinder { radius, height } => {
                // three-d's cylinder runs from x=0 to x=1
                Mat4::from_angle_z(degrees(90.0))
                    * Mat4::from_translation(vec3(-0.5*height, 0.0, 0.0))
                    * Mat4::from_nonuniform_scale(height, radius, radius)
            },
            Shape::Plane { width, height } => Mat4::from_nonuniform_scale(0.5*width, 0.5*height, 1.0),
        }
    }

    /// Local bounds centered on the node origin
    pub fn half_extents(&self) -> Vec3 {
        match *self {
            Shape::Box { size } => size * 0.5,
            Shape::Cylinder { radius, height } => vec3(radius, 0.5*height, radius),
            Shape::Plane { width, height } => vec3(0.5*width, 0.5*height, 0.0),
        }
    }

    pub fn unit_mesh(&self) -> CpuMesh {
        let mut mesh = match self {
            Shape::Box { .. } => CpuMesh::cube(),
            Shape::Cylinder { .. } => CpuMesh::cylinder(CYLINDER_SEGMENTS),
            Shape::Plane { .. } => CpuMesh::square(),
        };
        if mesh.normals.is_none() {
            mesh.compute_normals();
        }
        mesh
    }
}


/// One of the tagged node variants
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Group(Vec<Node>),
    Box { size: Vec3, part: Part },
    Cylinder { radius: f32, height: f32, part: Part },
    Plane { width: f32, height: f32, part: Part },
}


/// A named node of a structure tree
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
}
impl Node {
    pub fn group(name: impl Into<String>, transform: Transform, children: Vec<Node>) -> Self {
        Self { name: name.into(), transform, kind: NodeKind::Group(children) }
    }

    pub fn cuboid(name: impl Into<String>, transform: Transform, size: Vec3, part: Part) -> Self {
        Self { name: name.into(), transform, kind: NodeKind::Box { size, part } }
    }

    pub fn cylinder(name: impl Into<String>, transform: Transform, radius: f32, height: f32, part: Part) -> Self {
        Self { name: name.into(), transform, kind: NodeKind::Cylinder { radius, height, part } }
    }

    pub fn plane(name: impl Into<String>, transform: Transform, width: f32, height: f32, part: Part) -> Self {
        Self { name: name.into(), transform, kind: NodeKind::Plane { width, height, part } }
    }

    /// Direct child by name
    pub fn child(&self, name: &str) -> Option<&Node> {
        match &self.kind {
            NodeKind::Group(children) => children.iter().find(|c| c.name == name),
            _ => None,
        }
    }

    /// Resolves the tree into primitives with root-space transforms, depth first
    pub fn flatten(&self) -> Vec<PlacedPart> {
        let mut parts = Vec::new();
        self.flatten_into(Mat4::identity(), "", &mut parts);
        parts
    }

    fn flatten_into(&self, parent: Mat4, parent_path: &str, parts: &mut Vec<PlacedPart>) {
        let world = parent * self.transform.matrix();
        let path = if parent_path.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", parent_path, self.name)
        };
        let (shape, part) = match &self.kind {
            NodeKind::Group(children) => {
                for child in children {
                    child.flatten_into(world, &path, parts);
                }
                return;
            },
            NodeKind::Box { size, part } => (Shape::Box { size: *size }, *part),
            NodeKind::Cylinder { radius, height, part } => (Shape::Cylinder { radius: *radius, height: *height }, *part),
            NodeKind::Plane { width, height, part } => (Shape::Plane { width: *width, height: *height }, *part),
        };
        parts.push(PlacedPart {
            path,
            shape,
            part,
            node_matrix: world,
            bounds: Aabb::from_transformed(shape.half_extents(), world),
        });
    }
}


/// A primitive placed in the root's local frame
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedPart {
    /// Slash separated names from the root
    pub path: String,
    pub shape: Shape,
    pub part: Part,
    /// Root-space transform of the node origin
    pub node_matrix: Mat4,
    pub bounds: Aabb,
}
impl PlacedPart {
    /// Transform applied to the unit mesh
    pub fn mesh_matrix(&self) -> Mat4 {
        self.node_matrix * self.shape.matrix()
    }

    /// Same transform as the source, scaled about the local origin
    pub fn outline_matrix(&self) -> Mat4 {
        self.node_matrix * Mat4::from_scale(1.0 + OUTLINE_SCALE) * self.shape.matrix()
    }
}


/// Axis aligned bounding box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}
impl Aabb {
    /// Bounds of the box `[-half, half]` after `m`
    pub fn from_transformed(half: Vec3, m: Mat4) -> Self {
        let mut min = vec3(f32::MAX, f32::MAX, f32::MAX);
        let mut max = vec3(f32::MIN, f32::MIN, f32::MIN);
        for i in 0..8 {
            let corner = vec3(
                if i & 1 == 0 { -half.x } else { half.x },
                if i & 2 == 0 { -half.y } else { half.y },
                if i & 4 == 0 { -half.z } else { half.z },
            );
            let p = (m * corner.extend(1.0)).truncate();
            min = vec3(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = vec3(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Distance along the ray to the first intersection (slab test), if any
    pub fn ray_distance(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let mut t_near = f32::MIN;
        let mut t_far = f32::MAX;
        for axis in 0..3 {
            let (o, d, lo, hi) = (origin[axis], direction[axis], self.min[axis], self.max[axis]);
            if d.abs() < 1e-8 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let t0 = (lo - o) / d;
            let t1 = (hi - o) / d;
            t_near = t_near.max(t0.min(t1));
            t_far = t_far.min(t0.max(t1));
            if t_near > t_far {
                return None;
            }
        }
        if t_far < 0.0 {
            return None;
        }
        Some(t_near.max(0.0))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::toon::METAL;
    use crate::utils::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        are_floats_equal(a.x, b.x, 1e-5) && are_floats_equal(a.y, b.y, 1e-5) && are_floats_equal(a.z, b.z, 1e-5)
    }

    fn sample_tree() -> Node {
        Node::group("root", Transform::at(1.0, 0.0, 0.0), vec![
            Node::cuboid("block", Transform::at(0.0, 1.0, 0.0), vec3(2.0, 2.0, 2.0), Part::toon(METAL)),
            Node::group("arm", Transform::at(0.0, 0.0, 3.0).rotated(0.0, std::f32::consts::FRAC_PI_2, 0.0), vec![
                Node::cylinder("rod", Transform::default(), 0.5, 4.0, Part::toon(METAL)),
            ]),
        ])
    }

    #[test]
    fn flatten_visits_primitives_only() {
        let parts = sample_tree().flatten();
        let paths: Vec<&str> = parts.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["root/block", "root/arm/rod"]);
    }

    #[test]
    fn transforms_accumulate() {
        let parts = sample_tree().flatten();
        assert!(close(parts[0].bounds.center(), vec3(1.0, 1.0, 0.0)));
        assert!(close(parts[0].bounds.min, vec3(0.0, 0.0, -1.0)));
        assert!(close(parts[1].bounds.center(), vec3(1.0, 0.0, 3.0)));
        assert!(close(parts[1].bounds.max - parts[1].bounds.min, vec3(1.0, 4.0, 1.0)));
    }

    #[test]
    fn cylinder_mesh_is_upright_and_centered() {
        let m = Shape::Cylinder { radius: 0.5, height: 4.0 }.matrix();
        let bottom = (m * vec4(0.0, 0.0, 0.0, 1.0)).truncate();
        let top = (m * vec4(1.0, 0.0, 0.0, 1.0)).truncate();
        assert!(close(bottom, vec3(0.0, -2.0, 0.0)));
        assert!(close(top, vec3(0.0, 2.0, 0.0)));
    }

    #[test]
    fn outline_shares_the_source_transform() {
        for part in sample_tree().flatten() {
            let expected = part.node_matrix * Mat4::from_scale(1.0 + OUTLINE_SCALE) * part.shape.matrix();
            assert_eq!(part.outline_matrix(), expected);
            // the node origin stays put
            let o = (part.outline_matrix() * vec4(0.0, 0.0, 0.0, 1.0)).truncate();
            let s = (part.mesh_matrix() * vec4(0.0, 0.0, 0.0, 1.0)).truncate();
            if let Shape::Box { .. } = part.shape {
                assert!(close(o, s));
            }
        }
    }

    #[test]
    fn outline_draws_back_faces_only() {
        let material = outline_material();
        assert!(matches!(material.render_states.cull, Cull::Front));
        assert_eq!(material.color, OUTLINE_COLOR);
        assert!(material.texture.is_none());
    }

    #[test]
    fn ray_hits_box() {
        let b = Aabb { min: vec3(-1.0, -1.0, -1.0), max: vec3(1.0, 1.0, 1.0) };
        let t = b.ray_distance(vec3(0.0, 0.0, 10.0), vec3(0.0, 0.0, -1.0));
        assert!(are_floats_equal(t.unwrap(), 9.0, 1e-5));
        assert_eq!(b.ray_distance(vec3(3.0, 0.0, 10.0), vec3(0.0, 0.0, -1.0)), None);
        // pointing away
        assert_eq!(b.ray_distance(vec3(0.0, 0.0, 10.0), vec3(0.0, 0.0, 1.0)), None);
        // starting inside
        assert_eq!(b.ray_distance(Vec3::zero(), vec3(1.0, 0.0, 0.0)), Some(0.0));
    }

    #[test]
    fn flat_plane_can_be_hit() {
        let plane = Aabb::from_transformed(vec3(1.0, 1.0, 0.0), Mat4::identity());
        assert!(plane.ray_distance(vec3(0.5, 0.5, 5.0), vec3(0.0, 0.0, -1.0)).is_some());
    }
}
