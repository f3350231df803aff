use std::sync::{Arc, Mutex, atomic::{AtomicBool, Ordering}};

use three_d::*;
use num_format::{Locale, ToFormattedString};

use crate::log; // macro import
use crate::utils::*;
use crate::bridge::*;
use crate::composer::*;
use crate::gradient::*;
use crate::overlay::*;
use crate::toon::ShadingMode;


/// Re-implementation of three_d::OrbitControl with optional right mouse button panning
pub struct SceneOrbitControl {
    control: CameraControl,
    enable_pan: bool,
}
impl SceneOrbitControl {
    /// Creates a new orbit control around `target` within the given zoom and pan limits.
    pub fn new(target: Vec3, limits: OrbitLimits) -> Self {
        let (right_drag_horizontal, right_drag_vertical) = if limits.enable_pan {
            (CameraAction::Left { speed: 0.01 }, CameraAction::Up { speed: 0.01 })
        } else {
            (CameraAction::None, CameraAction::None)
        };
        Self {
            control: CameraControl {
                left_drag_horizontal: CameraAction::OrbitLeft { target, speed: 0.1 },
                left_drag_vertical: CameraAction::OrbitUp { target, speed: 0.1 },
                scroll_vertical: CameraAction::Zoom {
                    min: limits.min_distance,
                    max: limits.max_distance,
                    speed: 0.001,
                    target,
                },
                right_drag_horizontal,
                right_drag_vertical,
                ..Default::default()
            },
            enable_pan: limits.enable_pan,
        }
    }

    /// Handles the events. Must be called each frame.
    pub fn handle_events(&mut self, camera: &mut Camera, events: &mut [Event]) -> bool {

        // panning moves the orbit target along with the camera
        let mut change = Vec3::zero();
        if self.enable_pan {
            for event in events.iter() {
                if let Event::MouseMotion { delta, button: Some(MouseButton::Right), .. } = event {
                    if let CameraAction::Left { speed } = &self.control.right_drag_horizontal {
                        change += -camera.right_direction() * delta.0 * (*speed);
                    }
                    if let CameraAction::Up { speed } = &self.control.right_drag_vertical {
                        let right = camera.right_direction();
                        let up = right.cross(camera.view_direction());
                        change += up * delta.1 * (*speed);
                    }
                    break;
                }
            }
        }

        if let CameraAction::Zoom { speed, target, .. } = &mut self.control.scroll_vertical {
            let x = target.distance(*camera.position());
            *speed = 0.001 * x + 0.001;
            *target += change;
        }
        if let CameraAction::OrbitLeft { speed, target } = &mut self.control.left_drag_horizontal {
            let x = target.distance(*camera.position());
            *speed = 0.01 * x + 0.001;
            *target += change;
        }
        if let CameraAction::OrbitUp { speed, target } = &mut self.control.left_drag_vertical {
            let x = target.distance(*camera.position());
            *speed = 0.01 * x + 0.001;
            *target += change;
        }

        self.control.handle_events(camera, events)
    }
}


fn create_lights(gl: &Context, setup: &LightSetup) -> (AmbientLight, DirectionalLight) {
    let ambient = AmbientLight::new(gl, setup.ambient_intensity, Srgba::WHITE);
    let directional = DirectionalLight::new(gl, setup.directional_intensity, Srgba::WHITE, &setup.direction);
    (ambient, directional)
}


pub async fn main() {
    let error_flag = Arc::new(AtomicBool::new(false));
    let error_msg = Arc::new(Mutex::new(String::new()));

    let canvas_w = get_canvas_width();
    let canvas_h = get_canvas_height();
    log!("main(): canvas size: {}x{}", canvas_w, canvas_h);

    let window = match Window::new(WindowSettings {
        title: "Toonscape".to_string(),
        max_size: Some((canvas_w, canvas_h)),
        ..Default::default()
    }) {
        Ok(window) => window,
        Err(e) => {
            log!("main(): ERROR: could not create a WebGL2 window: {:?}", e);
            return;
        },
    };

    let gl = window.gl();
    log!("main(): OpenGL version: {:?}", gl.version());

    let gradient = create_gradient_texture(&gl);
    let screen_texture = load_screen_texture(&gl).await;

    let mut scenes = Vec::<ComposedScene>::new();
    for kind in SceneKind::ALL {
        match ComposedScene::compose(&gl, kind, Some(gradient.clone()), screen_texture.clone()) {
            Ok(scene) => scenes.push(scene),
            Err(e) => set_error_for_egui(&error_flag, &error_msg, e),
        }
    }

    let mut active_kind = SceneKind::Laptop;
    let mut selected_kind = active_kind;
    let mut setup = active_kind.setup();
    let mut camera = active_kind.camera(window.viewport());
    let mut orbit_control = SceneOrbitControl::new(*camera.target(), setup.orbit);
    let (mut ambient, mut directional) = create_lights(&gl, &setup.lights);

    // the 3D layer publishes window tags, the overlay is the only subscriber
    let mut bridge = InteractionBridge::new(Notifier::new());
    let mut overlay = PopupOverlay::new(bridge.subscribe());

    let mut gui = three_d::GUI::new(&gl);
    let mut pointer_over_gui = false;
    let mut shading_mode = ShadingMode::Bands;
    let mut frame_prev = get_time_milliseconds();
    let mut fps_ma = IncrementalMA::new(100);

    window.render_loop(move |mut frame_input| {
        let now = get_time_milliseconds();
        let fps = fps_ma.add(1000.0 / (now - frame_prev));
        frame_prev = now;

        if selected_kind != active_kind {
            log!("main(): switching to {}", selected_kind.label());
            active_kind = selected_kind;
            setup = active_kind.setup();
            camera = active_kind.camera(frame_input.viewport);
            orbit_control = SceneOrbitControl::new(*camera.target(), setup.orbit);
            (ambient, directional) = create_lights(&gl, &setup.lights);
            overlay.close();
        }

        camera.set_viewport(frame_input.viewport);
        let elapsed = (frame_input.accumulated_time / 1000.0) as f32;

        let mut mesh_count = 0;
        let mut root_yaw = 0.0_f32;
        if !error_flag.load(Ordering::Relaxed) {
            if let Some(scene) = scenes.iter_mut().find(|s| s.kind == active_kind) {
                bridge.handle_events(
                    &camera,
                    &frame_input.events,
                    &scene.parts,
                    scene.root_yaw(),
                    pointer_over_gui,
                );
                if !pointer_over_gui {
                    orbit_control.handle_events(&mut camera, &mut frame_input.events);
                }

                scene.set_shading_mode(shading_mode);
                scene.animate(elapsed);
                directional.generate_shadow_map(setup.lights.shadow_map_size, scene.shadow_casters());

                mesh_count = scene.mesh_count();
                root_yaw = scene.root_yaw();
            }
        }
        overlay.receive();

        gui.update(
            &mut frame_input.events,
            frame_input.accumulated_time,
            frame_input.viewport,
            frame_input.device_pixel_ratio,
            |gui_context| {
                pointer_over_gui = gui_context.is_using_pointer() || gui_context.is_pointer_over_area();

                if error_flag.load(Ordering::Relaxed) {
                    egui::Window::new("Error")
                        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                        .show(gui_context, |ui| {
                            if let Ok(mutex) = error_msg.lock() {
                                ui.colored_label(egui::Color32::RED, &(*mutex));
                            }
                        });
                    return;
                }

                egui::Window::new("Toonscape")
                    .anchor(egui::Align2::LEFT_TOP, [8.0, 8.0])
                    .show(gui_context, |ui| {
                        egui::Grid::new("settings_grid")
                            .num_columns(2)
                            .spacing([40.0, 4.0])
                            .striped(true)
                            .show(ui, |ui| {
                                ui.add(egui::Label::new("FPS"));
                                ui.label(format!("{:.2}", fps));
                                ui.end_row();

                                ui.add(egui::Label::new("Meshes"));
                                ui.label(mesh_count.to_formatted_string(&Locale::en));
                                ui.end_row();

                                ui.add(egui::Label::new("GL Version"));
                                ui.label(format!("{:?}", gl.version()));
                                ui.end_row();

                                ui.add(egui::Label::new("Scene"));
                                ui.horizontal(|ui| {
                                    for kind in SceneKind::ALL {
                                        ui.radio_value(&mut selected_kind, kind, kind.label());
                                    }
                                });
                                ui.end_row();

                                ui.add(egui::Label::new("Shading"));
                                ui.horizontal(|ui| {
                                    ui.radio_value(&mut shading_mode, ShadingMode::Bands, "Bands");
                                    ui.radio_value(&mut shading_mode, ShadingMode::Gradient, "Gradient");
                                });
                                ui.end_row();

                                ui.add(egui::Label::new("Root Yaw"));
                                ui.label(format!("{:.3} rad", root_yaw));
                                ui.end_row();

                                ui.add(egui::Label::new("Popup"));
                                ui.label(overlay.active().map(|tag| tag.as_str()).unwrap_or("none"));
                                ui.end_row();
                            });
                    });

                overlay.show(gui_context);
            },
        );

        let bg = setup.background;
        let screen = frame_input.screen();
        screen.clear(ClearState::color_and_depth(
            bg.r as f32 / 255.0,
            bg.g as f32 / 255.0,
            bg.b as f32 / 255.0,
            1.0,
            1.0,
        ));
        if !error_flag.load(Ordering::Relaxed) {
            if let Some(scene) = scenes.iter().find(|s| s.kind == active_kind) {
                screen.render(&camera, scene.objects(), &[&ambient, &directional]);
            }
        }
        gui.render();

        // Returns default frame output to end the frame
        FrameOutput::default()
    });
}
