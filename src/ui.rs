// ui.rs — egui 菜单栏、状态栏与悬停提示框

use panorama_tour::i18n::{tr, tr_with};
use panorama_tour::{AssetProvider, FeedbackSink, ProjectionMode, Session};

/// 提示框相对指针的偏移（物理像素）
const TOOLTIP_OFFSET: f32 = 15.0;

const LANGUAGES: [(&str, &str); 2] = [("zh-Hans", "简体中文"), ("en", "English")];

/// Hover feedback as last reported by the session; drawn every frame.
#[derive(Debug, Default)]
pub struct Tooltip {
    pub text: String,
    /// Pointer position in physical pixels.
    pub pos: (f32, f32),
    pub visible: bool,
    pub highlight: bool,
}

impl FeedbackSink for Tooltip {
    fn show_tooltip(&mut self, x: f32, y: f32, text: &str) {
        self.text.clear();
        self.text.push_str(text);
        self.pos = (x, y);
        self.visible = true;
    }

    fn hide_tooltip(&mut self) {
        self.visible = false;
    }

    fn set_highlight_active(&mut self, active: bool) {
        self.highlight = active;
    }
}

/// What the user asked for this frame; applied by the event loop after rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    OpenTour,
    Exit,
    SwitchRoom(String),
    SetMode(ProjectionMode),
    ResetView,
    ToggleFullscreen,
    SetShowIdMap(bool),
    SetLanguage(String),
}

pub struct UiState {
    pub tooltip: Tooltip,
    pub show_fps: bool,
    pub fps: f32,
    pub is_fullscreen: bool,
    pub current_lang: String,
}

impl UiState {
    pub fn new(lang: String) -> Self {
        Self {
            tooltip: Tooltip::default(),
            show_fps: false,
            fps: 0.0,
            is_fullscreen: false,
            current_lang: lang,
        }
    }
}

pub fn draw_ui<A: AssetProvider>(
    ctx: &egui::Context,
    session: &Session<A>,
    state: &mut UiState,
    pixels_per_point: f32,
) -> Vec<UiAction> {
    let mut actions = Vec::new();

    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button(tr("menu.file"), |ui| {
                if ui.button(tr("menu.open_tour")).clicked() {
                    actions.push(UiAction::OpenTour);
                    ui.close_menu();
                }
                if ui.button(tr("menu.exit")).clicked() {
                    actions.push(UiAction::Exit);
                }
            });

            ui.menu_button(tr("menu.view"), |ui| {
                if ui.button(tr("view.reset")).clicked() {
                    actions.push(UiAction::ResetView);
                    ui.close_menu();
                }
                let fullscreen_label = if state.is_fullscreen {
                    tr("view.fullscreen.exit")
                } else {
                    tr("view.fullscreen.enter")
                };
                if ui.button(fullscreen_label).clicked() {
                    actions.push(UiAction::ToggleFullscreen);
                    ui.close_menu();
                }

                ui.separator();
                ui.menu_button(tr("view.projection_mode"), |ui| {
                    for (mode, key) in [
                        (ProjectionMode::Spherical, "projection.spherical"),
                        (ProjectionMode::Flat, "projection.flat"),
                    ] {
                        if ui.radio(session.mode() == mode, tr(key)).clicked() {
                            actions.push(UiAction::SetMode(mode));
                            ui.close_menu();
                        }
                    }
                });

                ui.separator();
                let mut show_id = session.show_id_map();
                if ui.checkbox(&mut show_id, tr("view.show_id_map")).clicked() {
                    actions.push(UiAction::SetShowIdMap(show_id));
                    ui.close_menu();
                }
                if ui.checkbox(&mut state.show_fps, tr("view.show_fps")).clicked() {
                    ui.close_menu();
                }
            });

            // 对应原来页面上的空间切换按钮
            ui.menu_button(tr("menu.rooms"), |ui| {
                for room in &session.config().rooms {
                    let current = room.key == session.current_room_key();
                    if ui.radio(current, room.name.as_str()).clicked() {
                        actions.push(UiAction::SwitchRoom(room.key.clone()));
                        ui.close_menu();
                    }
                }
            });

            ui.menu_button(tr("menu.language"), |ui| {
                for (code, name) in LANGUAGES {
                    if ui.radio(state.current_lang == code, name).clicked() {
                        state.current_lang = code.to_string();
                        actions.push(UiAction::SetLanguage(code.to_string()));
                        ui.close_menu();
                    }
                }
            });
        });
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if session.is_loading() {
                ui.label(egui::RichText::new(tr("status.loading")).color(egui::Color32::YELLOW));
                ui.label("|");
            }
            if let Some(err) = session.last_error() {
                ui.label(
                    egui::RichText::new(tr_with("status.load_failed", &[("err", err.to_string())]))
                        .color(egui::Color32::LIGHT_RED),
                );
                ui.label("|");
            }

            ui.label(format!("{} {}", tr("status.room_prefix"), session.current_room_name()));
            ui.label("|");
            let mode_key = match session.mode() {
                ProjectionMode::Spherical => "projection.spherical",
                ProjectionMode::Flat => "projection.flat",
            };
            ui.label(format!("{} {}", tr("status.mode_prefix"), tr(mode_key)));
            ui.label("|");

            let view = session.view();
            match session.mode() {
                ProjectionMode::Spherical => {
                    ui.label(format!("FOV: {:.1}°", view.fov));
                    ui.label("|");
                    ui.label(format!("Lon: {:.1}°", view.lon));
                    ui.label("|");
                    ui.label(format!("Lat: {:.1}°", view.lat));
                }
                ProjectionMode::Flat => {
                    ui.label(format!("Pan: {:.0}px", view.pan_offset));
                }
            }

            if state.show_fps {
                ui.label("|");
                ui.label(egui::RichText::new(format!("FPS: {:.1}", state.fps)).color(egui::Color32::GREEN));
            }
        });
    });

    if state.tooltip.visible {
        let (x, y) = state.tooltip.pos;
        let pos = egui::pos2(
            (x + TOOLTIP_OFFSET) / pixels_per_point,
            (y + TOOLTIP_OFFSET) / pixels_per_point,
        );
        egui::Area::new("hover_tooltip")
            .fixed_pos(pos)
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.label(state.tooltip.text.as_str());
                });
            });
    }

    actions
}
