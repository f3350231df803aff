use std::{fmt, str::FromStr};
use three_d::*;
use bus::{Bus, BusReader};

use crate::log; // macro import
use crate::structure::PlacedPart;


/// Pending notifications a subscriber may fall behind by before new ones are dropped
const NOTIFICATION_CAPACITY: usize = 16;

/// Pointer travel (logical pixels) that still counts as a click
pub const CLICK_TOLERANCE: f32 = 4.0;


/// Identifier of an interactive window pane
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WindowTag {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}
impl WindowTag {
    pub const ALL: [WindowTag; 4] = [
        WindowTag::TopLeft,
        WindowTag::TopRight,
        WindowTag::BottomLeft,
        WindowTag::BottomRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WindowTag::TopLeft => "top-left",
            WindowTag::TopRight => "top-right",
            WindowTag::BottomLeft => "bottom-left",
            WindowTag::BottomRight => "bottom-right",
        }
    }
}
impl fmt::Display for WindowTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl FromStr for WindowTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WindowTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| format!("WindowTag::from_str(): ERROR: unknown window tag '{}'", s))
    }
}


/// Publishing side of the window notification channel
pub struct Notifier {
    bus: Bus<WindowTag>,
}
impl Notifier {
    pub fn new() -> Self {
        Self {
            bus: Bus::new(NOTIFICATION_CAPACITY),
        }
    }

    /// Attaches a new listener; it only sees notifications sent after this call
    pub fn subscribe(&mut self) -> Subscription {
        Subscription {
            rx: self.bus.add_rx(),
        }
    }

    /// Best-effort, non-blocking delivery
    pub fn notify(&mut self, tag: WindowTag) {
        if let Err(dropped) = self.bus.try_broadcast(tag) {
            log!("Notifier::notify(): dropped '{}'", dropped);
        }
    }
}
impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}


/// Receiving side of the window notification channel
pub struct Subscription {
    rx: BusReader<WindowTag>,
}
impl Subscription {
    /// Takes every pending notification, oldest first
    pub fn drain(&mut self) -> Vec<WindowTag> {
        let mut tags = Vec::new();
        while let Ok(tag) = self.rx.try_recv() {
            tags.push(tag);
        }
        tags
    }
}


/// Tells clicks apart from orbit drags
#[derive(Default)]
pub struct ClickTracker {
    pressed_at: Option<(f32, f32)>,
}
impl ClickTracker {
    pub fn press(&mut self, x: f32, y: f32) {
        self.pressed_at = Some((x, y));
    }

    /// True when the release ends a press that stayed within [CLICK_TOLERANCE]
    pub fn release(&mut self, x: f32, y: f32) -> bool {
        match self.pressed_at.take() {
            Some((px, py)) => {
                let (dx, dy) = (x - px, y - py);
                (dx*dx + dy*dy).sqrt() <= CLICK_TOLERANCE
            },
            None => false,
        }
    }

    pub fn cancel(&mut self) {
        self.pressed_at = None;
    }
}


/// A pick ray
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}
impl Ray {
    /// Moves a world-space ray into the frame of a root turned by `yaw` radians about Y
    pub fn into_root(&self, yaw: f32) -> Ray {
        let inverse = Mat4::from_angle_y(radians(-yaw));
        Ray {
            origin: (inverse * self.origin.extend(1.0)).truncate(),
            direction: (inverse * self.direction.extend(0.0)).truncate(),
        }
    }
}


/// Nearest part along the ray, interactive or not
pub fn pick<'a>(parts: &'a [PlacedPart], ray: &Ray) -> Option<&'a PlacedPart> {
    parts
        .iter()
        .filter_map(|part| part.bounds.ray_distance(ray.origin, ray.direction).map(|t| (t, part)))
        .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, part)| part)
}


/// Connects clicks on 3D parts to the notification channel
pub struct InteractionBridge {
    notifier: Notifier,
    clicks: ClickTracker,
}
impl InteractionBridge {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            notifier,
            clicks: ClickTracker::default(),
        }
    }

    pub fn subscribe(&mut self) -> Subscription {
        self.notifier.subscribe()
    }

    /// Picks along a root-space ray and notifies if an interactive part is hit first
    pub fn activate(&mut self, parts: &[PlacedPart], ray: &Ray) -> Option<WindowTag> {
        let tag = pick(parts, ray).and_then(|part| part.part.tag)?;
        log!("InteractionBridge::activate(): {}", tag);
        self.notifier.notify(tag);
        Some(tag)
    }

    /// Handles left clicks that the GUI did not consume. Must be called each frame.
    pub fn handle_events(
        &mut self,
        camera: &Camera,
        events: &[Event],
        parts: &[PlacedPart],
        root_yaw: f32,
        pointer_over_gui: bool,
    ) -> Option<WindowTag> {
        let mut activated = None;
        for event in events.iter() {
            match event {
                Event::MousePress { button, position, handled, .. } => {
                    if *button == MouseButton::Left && !*handled && !pointer_over_gui {
                        self.clicks.press(position.x, position.y);
                    } else {
                        self.clicks.cancel();
                    }
                },
                Event::MouseRelease { button, position, .. } => {
                    if *button != MouseButton::Left || !self.clicks.release(position.x, position.y) {
                        continue;
                    }
                    let ray = Ray {
                        origin: camera.position_at_pixel(*position),
                        direction: camera.view_direction_at_pixel(*position),
                    };
                    if let Some(tag) = self.activate(parts, &ray.into_root(root_yaw)) {
                        activated = Some(tag);
                    }
                },
                _ => {},
            }
        }
        activated
    }
}
