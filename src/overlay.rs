use three_d::*;

use crate::log; // macro import
use crate::bridge::{Subscription, WindowTag};


/// Static contents of a window's popup
#[derive(Debug, PartialEq)]
pub struct PopupConfig {
    pub tag: WindowTag,
    pub title: &'static str,
    pub file_name: &'static str,
    pub accent: [u8; 3],
    pub initial_code: &'static str,
}


static POPUPS: [PopupConfig; 4] = [
    PopupConfig {
        tag: WindowTag::TopLeft,
        title: "Control Room",
        file_name: "boiler.rs",
        accent: [0xe0, 0x6c, 0x4f],
        initial_code: r#"fn main() {
    let pressure = read_gauge("boiler-1");
    if pressure > 8.5 {
        open_valve("relief");
    }
    println!("pressure: {:.1} bar", pressure);
}
"#,
    },
    PopupConfig {
        tag: WindowTag::TopRight,
        title: "Drafting Office",
        file_name: "blueprint.rs",
        accent: [0x4a, 0x8a, 0xb0],
        initial_code: r#"struct Beam {
    length: f32,
    load: f32,
}

fn deflection(beam: &Beam) -> f32 {
    beam.load * beam.length.powi(3) / 48.0
}
"#,
    },
    PopupConfig {
        tag: WindowTag::BottomLeft,
        title: "Workshop",
        file_name: "conveyor.rs",
        accent: [0xd9, 0xa4, 0x41],
        initial_code: r#"fn advance(belt: &mut Vec<Crate>, speed: f32) {
    for item in belt.iter_mut() {
        item.position += speed;
    }
    belt.retain(|item| item.position < 12.0);
}
"#,
    },
    PopupConfig {
        tag: WindowTag::BottomRight,
        title: "Loading Dock",
        file_name: "shipping.rs",
        accent: [0x6a, 0xa8, 0x5c],
        initial_code: r#"fn manifest(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("{} x{}", o.sku, o.quantity))
        .collect::<Vec<_>>()
        .join("\n")
}
"#,
    },
];


/// Looks up the static popup contents for a window
pub fn popup_config(tag: WindowTag) -> &'static PopupConfig {
    match tag {
        WindowTag::TopLeft => &POPUPS[0],
        WindowTag::TopRight => &POPUPS[1],
        WindowTag::BottomLeft => &POPUPS[2],
        WindowTag::BottomRight => &POPUPS[3],
    }
}


#[derive(Clone, Debug, PartialEq)]
pub enum PopupState {
    Closed,
    Open { tag: WindowTag, buffer: String },
}


/// At most one popup, opened by notifications and closed by the user
pub struct PopupOverlay {
    state: PopupState,
    subscription: Subscription,
}
impl PopupOverlay {
    pub fn new(subscription: Subscription) -> Self {
        Self {
            state: PopupState::Closed,
            subscription,
        }
    }

    pub fn state(&self) -> &PopupState {
        &self.state
    }

    pub fn active(&self) -> Option<WindowTag> {
        match &self.state {
            PopupState::Open { tag, .. } => Some(*tag),
            PopupState::Closed => None,
        }
    }

    pub fn buffer(&self) -> Option<&str> {
        match &self.state {
            PopupState::Open { buffer, .. } => Some(buffer.as_str()),
            PopupState::Closed => None,
        }
    }

    /// Editable text of the open popup; edits are local only
    pub fn buffer_mut(&mut self) -> Option<&mut String> {
        match &mut self.state {
            PopupState::Open { buffer, .. } => Some(buffer),
            PopupState::Closed => None,
        }
    }

    /// Opens `tag` with its initial text, replacing whatever was open
    pub fn notify(&mut self, tag: WindowTag) {
        self.state = PopupState::Open {
            tag,
            buffer: popup_config(tag).initial_code.to_string(),
        };
    }

    pub fn close(&mut self) {
        self.state = PopupState::Closed;
    }

    /// Applies pending notifications in order; the latest wins
    pub fn receive(&mut self) {
        for tag in self.subscription.drain() {
            self.notify(tag);
        }
    }

    /// Draws the open popup, if any
    pub fn show(&mut self, gui_context: &egui::Context) {
        let Some(tag) = self.active() else {
            return;
        };
        let config = popup_config(tag);
        let [r, g, b] = config.accent;
        let accent = egui::Color32::from_rgb(r, g, b);
        let mut close = false;
        let Some(buffer) = self.buffer_mut() else {
            return;
        };

        egui::Window::new(config.title)
            .id(egui::Id::new("popup-overlay"))
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .collapsible(false)
            .resizable(false)
            .show(gui_context, |ui| {
                ui.horizontal(|ui| {
                    ui.colored_label(accent, config.file_name);
                    ui.label(format!("({})", tag));
                });
                ui.separator();
                ui.add(
                    egui::TextEdit::multiline(buffer)
                        .code_editor()
                        .desired_rows(12)
                        .desired_width(420.0),
                );
                ui.horizontal(|ui| {
                    // placeholders: nothing is executed or stored
                    if ui.button("Run").clicked() {
                        log!("PopupOverlay::show(): run is not available");
                    }
                    if ui.button("Save").clicked() {
                        log!("PopupOverlay::show(): save is not available");
                    }
                    if ui.button("Close").clicked() {
                        close = true;
                    }
                });
            });

        if close {
            self.close();
        }
    }
}
