use std::f32::consts::{FRAC_PI_2, PI};
use three_d::*;

use crate::bridge::WindowTag;
use crate::structure::*;
use crate::structure::Transform;
use crate::toon::*;


const LAPTOP_LOGO: Srgba = Srgba { r: 0xf4, g: 0xf1, b: 0xea, a: 255 };
const GROUND: Srgba = Srgba { r: 0x9c, g: 0xa8, b: 0x8a, a: 255 };

// laptop chassis
const BASE_SIZE: Vec3 = Vec3 { x: 3.0, y: 0.12, z: 2.0 };
const HINGE_RADIUS: f32 = 0.06;
const HINGE_LENGTH: f32 = 2.8;
/// Hinge axis height and depth; the lid pivots about this line
pub const HINGE_LINE: Vec3 = Vec3 { x: 0.0, y: 0.12, z: -1.0 };
/// Lid tilt away from upright, radians
const LID_TILT: f32 = -0.26;
const LID_SIZE: Vec3 = Vec3 { x: 3.0, y: 2.0, z: 0.08 };
const SCREEN_SIZE: (f32, f32) = (2.7, 1.75);

// keyboard grid
const KEY_COLUMNS: usize = 12;
const KEY_ROWS: usize = 4;
const KEY_PITCH: f32 = 0.22;
const KEY_SIZE: Vec3 = Vec3 { x: 0.19, y: 0.04, z: 0.19 };
const SPACEBAR_KEYS: usize = 5;

// building
const HALL_SIZE: Vec3 = Vec3 { x: 8.0, y: 5.0, z: 5.0 };
const COLUMN_RADIUS: f32 = 0.3;
const WINDOW_SIZE: (f32, f32) = (1.6, 1.2);
const FRAME_BAR: f32 = 0.12;
const FRAME_DEPTH: f32 = 0.14;


/// The laptop: chassis, keyboard, trackpad, hinge and a lid pivoting on the hinge line
pub fn laptop() -> Node {
    Node::group("laptop", Transform::default(), vec![
        Node::cuboid(
            "base",
            Transform::at(0.0, 0.5*BASE_SIZE.y, 0.0),
            BASE_SIZE,
            Part::toon(LAPTOP_SHELL),
        ),
        keyboard(),
        Node::cuboid(
            "trackpad",
            Transform::at(0.0, BASE_SIZE.y + 0.005, 0.62),
            vec3(0.9, 0.01, 0.55),
            Part::toon(LAPTOP_TRACKPAD).without_outline(),
        ),
        Node::cylinder(
            "hinge",
            Transform::at(HINGE_LINE.x, HINGE_LINE.y, HINGE_LINE.z).rotated(0.0, 0.0, FRAC_PI_2),
            HINGE_RADIUS,
            HINGE_LENGTH,
            Part::toon(METAL),
        ),
        lid(),
    ])
}


/// Key grid plus a spacebar, laid out on top of the chassis
fn keyboard() -> Node {
    let x0 = -0.5 * (KEY_COLUMNS - 1) as f32 * KEY_PITCH;
    let z0 = -0.75;
    let mut keys = Vec::with_capacity(KEY_ROWS*KEY_COLUMNS + 1);
    for row in 0..KEY_ROWS {
        for col in 0..KEY_COLUMNS {
            keys.push(Node::cuboid(
                format!("key-{}-{}", row, col),
                Transform::at(x0 + col as f32 * KEY_PITCH, 0.0, z0 + row as f32 * KEY_PITCH),
                KEY_SIZE,
                Part::toon(LAPTOP_KEYS).without_outline(),
            ));
        }
    }
    let spacebar_width = SPACEBAR_KEYS as f32 * KEY_PITCH - (KEY_PITCH - KEY_SIZE.x);
    keys.push(Node::cuboid(
        "spacebar",
        Transform::at(0.0, 0.0, z0 + KEY_ROWS as f32 * KEY_PITCH),
        vec3(spacebar_width, KEY_SIZE.y, KEY_SIZE.z),
        Part::toon(LAPTOP_KEYS).without_outline(),
    ));
    Node::group("keyboard", Transform::at(0.0, BASE_SIZE.y + 0.5*KEY_SIZE.y, 0.0), keys)
}


/// Lid group with its origin on the hinge line; children are placed upright and the group is tilted
fn lid() -> Node {
    let half_height = 0.5*LID_SIZE.y;
    Node::group(
        "lid",
        Transform::at(HINGE_LINE.x, HINGE_LINE.y, HINGE_LINE.z).rotated(LID_TILT, 0.0, 0.0),
        vec![
            Node::cuboid(
                "shell",
                Transform::at(0.0, half_height, -0.5*LID_SIZE.z),
                LID_SIZE,
                Part::toon(LAPTOP_SHELL),
            ),
            Node::plane(
                "screen",
                Transform::at(0.0, half_height + 0.05, 0.002),
                SCREEN_SIZE.0,
                SCREEN_SIZE.1,
                Part::surface(Surface::Screen),
            ),
            Node::plane(
                "logo",
                Transform::at(0.0, half_height, -LID_SIZE.z - 0.002).rotated(0.0, PI, 0.0),
                0.3,
                0.3,
                Part::surface(Surface::Flat(LAPTOP_LOGO)),
            ),
        ],
    )
}


/// The industrial building with four clickable windows on its front face
pub fn building() -> Node {
    let half = HALL_SIZE * 0.5;
    let front = half.z;

    let mut children = vec![
        Node::plane(
            "ground",
            Transform::default().rotated(-FRAC_PI_2, 0.0, 0.0),
            30.0,
            30.0,
            Part::surface(Surface::Ground(GROUND)),
        ),
        Node::cuboid("hall", Transform::at(0.0, half.y, 0.0), HALL_SIZE, Part::toon(BRICK)),
        Node::cuboid(
            "roof",
            Transform::at(0.0, HALL_SIZE.y + 0.2, 0.0),
            vec3(HALL_SIZE.x + 0.6, 0.4, HALL_SIZE.z + 0.6),
            Part::toon(ROOF),
        ),
        Node::cuboid(
            "door",
            Transform::at(0.0, 1.1, front + 0.05),
            vec3(1.4, 2.2, 0.1),
            Part::toon(DOOR),
        ),
        Node::cylinder(
            "smokestack",
            Transform::at(2.8, HALL_SIZE.y + 1.9, -1.2),
            0.45,
            3.0,
            Part::toon(METAL),
        ),
    ];

    for (i, (sx, sz)) in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)].into_iter().enumerate() {
        children.push(Node::cylinder(
            format!("column-{}", i),
            Transform::at(sx * (half.x + 0.1), half.y, sz * (half.z + 0.1)),
            COLUMN_RADIUS,
            HALL_SIZE.y,
            Part::toon(CONCRETE),
        ));
    }

    for tag in WindowTag::ALL {
        let (x, y) = match tag {
            WindowTag::TopLeft => (-2.4, 3.6),
            WindowTag::TopRight => (2.4, 3.6),
            WindowTag::BottomLeft => (-2.4, 1.5),
            WindowTag::BottomRight => (2.4, 1.5),
        };
        children.push(window(tag, Transform::at(x, y, front)));
    }

    Node::group("building", Transform::default(), children)
}


/// A framed window whose pane emits `tag`; the origin sits on the wall surface
pub fn window(tag: WindowTag, transform: Transform) -> Node {
    let (w, h) = WINDOW_SIZE;
    let bar_z = 0.5*FRAME_DEPTH;
    let frame = Part::toon(WINDOW_FRAME);
    Node::group(format!("window-{}", tag), transform, vec![
        Node::cuboid(
            "pane",
            Transform::at(0.0, 0.0, 0.03),
            vec3(w, h, 0.04),
            Part::toon(WINDOW_GLASS).without_outline().interactive(tag),
        ),
        Node::cuboid("frame-top", Transform::at(0.0, 0.5*(h + FRAME_BAR), bar_z), vec3(w + 2.0*FRAME_BAR, FRAME_BAR, FRAME_DEPTH), frame),
        Node::cuboid("frame-bottom", Transform::at(0.0, -0.5*(h + FRAME_BAR), bar_z), vec3(w + 2.0*FRAME_BAR, FRAME_BAR, FRAME_DEPTH), frame),
        Node::cuboid("frame-left", Transform::at(-0.5*(w + FRAME_BAR), 0.0, bar_z), vec3(FRAME_BAR, h, FRAME_DEPTH), frame),
        Node::cuboid("frame-right", Transform::at(0.5*(w + FRAME_BAR), 0.0, bar_z), vec3(FRAME_BAR, h, FRAME_DEPTH), frame),
        Node::cuboid(
            "sill",
            Transform::at(0.0, -0.5*h - FRAME_BAR - 0.05, 0.15),
            vec3(w + 0.4, 0.1, 0.3),
            Part::toon(CONCRETE),
        ),
    ])
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).magnitude() < 1e-4
    }

    #[test]
    fn lid_pivot_lies_on_the_hinge_line() {
        let laptop = laptop();
        let lid = laptop.child("lid").unwrap();
        let hinge = laptop.child("hinge").unwrap();
        assert_eq!(lid.transform.position, HINGE_LINE);
        assert_eq!(hinge.transform.position, HINGE_LINE);

        // the shell's bottom edge stays on the hinge whatever the tilt
        let parts = laptop.flatten();
        let shell = parts.iter().find(|p| p.path == "laptop/lid/shell").unwrap();
        let bottom_front = shell.node_matrix * vec4(0.0, -0.5*LID_SIZE.y, 0.5*LID_SIZE.z, 1.0);
        assert!(close(bottom_front.truncate(), HINGE_LINE));
    }

    #[test]
    fn lid_leans_back() {
        let parts = laptop().flatten();
        let screen = parts.iter().find(|p| p.path == "laptop/lid/screen").unwrap();
        let c = screen.bounds.center();
        assert!(c.y > HINGE_LINE.y);
        assert!(c.z < HINGE_LINE.z);
    }

    #[test]
    fn hinge_runs_along_x() {
        let parts = laptop().flatten();
        let hinge = parts.iter().find(|p| p.path == "laptop/hinge").unwrap();
        let extent = hinge.bounds.max - hinge.bounds.min;
        assert!(are_floats_equal(extent.x, HINGE_LENGTH, 1e-4));
        assert!(are_floats_equal(extent.y, 2.0*HINGE_RADIUS, 1e-4));
    }

    #[test]
    fn keys_sit_on_the_chassis() {
        let parts = laptop().flatten();
        let keys: Vec<_> = parts.iter().filter(|p| p.path.starts_with("laptop/keyboard/")).collect();
        assert_eq!(keys.len(), KEY_ROWS*KEY_COLUMNS + 1);
        for key in keys {
            assert!(are_floats_equal(key.bounds.min.y, BASE_SIZE.y, 1e-5));
            assert!(key.bounds.min.x >= -0.5*BASE_SIZE.x && key.bounds.max.x <= 0.5*BASE_SIZE.x);
            assert!(key.bounds.min.z >= -0.5*BASE_SIZE.z && key.bounds.max.z <= 0.5*BASE_SIZE.z);
        }
    }

    #[test]
    fn laptop_has_one_screen_and_no_windows() {
        let parts = laptop().flatten();
        assert_eq!(parts.iter().filter(|p| p.part.surface == Surface::Screen).count(), 1);
        assert!(parts.iter().all(|p| p.part.tag.is_none()));
    }

    #[test]
    fn building_has_one_pane_per_tag() {
        let parts = building().flatten();
        for tag in WindowTag::ALL {
            let panes: Vec<_> = parts.iter().filter(|p| p.part.tag == Some(tag)).collect();
            assert_eq!(panes.len(), 1);
            assert!(panes[0].path.ends_with("/pane"));
        }
    }

    #[test]
    fn windows_stand_proud_of_the_wall() {
        let parts = building().flatten();
        let hall = parts.iter().find(|p| p.path == "building/hall").unwrap();
        for pane in parts.iter().filter(|p| p.part.tag.is_some()) {
            assert!(pane.bounds.min.z >= hall.bounds.max.z);
            assert!(pane.bounds.min.y > 0.0 && pane.bounds.max.y < HALL_SIZE.y);
        }
    }

    #[test]
    fn ground_is_horizontal() {
        let parts = building().flatten();
        let ground = parts.iter().find(|p| p.path == "building/ground").unwrap();
        assert!(are_floats_equal(ground.bounds.min.y, 0.0, 1e-5));
        assert!(are_floats_equal(ground.bounds.max.y, 0.0, 1e-5));
        assert!(!ground.part.outline);
    }
}
