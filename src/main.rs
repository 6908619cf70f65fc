// main.rs — 环景导览：窗口、事件循环、异步资源回传

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // 在 Release 模式下隐藏控制台窗口

mod fonts;
mod renderer;
mod ui;

use panorama_tour::i18n::{self, tr, tr_with};
use panorama_tour::{ConfigError, FsAssetProvider, LoadResult, ProjectionMode, Session, TourConfig};
use renderer::Renderer;
use ui::{Tooltip, UiAction, UiState};

use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, WindowBuilder},
};

type TourSession = Session<FsAssetProvider>;

fn main() {
    env_logger::init();

    let lang = i18n::resolve_lang_from_args();
    i18n::init(lang.clone());

    let config = match i18n::resolve_tour_from_args() {
        Some(path) => TourConfig::load(&path),
        None => TourConfig::builtin(),
    };
    // --mode 对之后打开的导览同样生效
    let mode_override = i18n::arg_value("mode").and_then(|m| ProjectionMode::parse(&m));
    let (mut session, mut rx) = match config.and_then(|c| start_session(c, mode_override)) {
        Ok(started) => started,
        Err(e) => {
            log::error!("{}", tr_with("error.load_tour", &[("err", e.to_string())]));
            std::process::exit(1);
        }
    };

    let event_loop = EventLoop::new();
    let window = match WindowBuilder::new()
        .with_title(tr("app.title"))
        .with_inner_size(LogicalSize::new(1280, 720))
        .build(&event_loop)
    {
        Ok(w) => Arc::new(w),
        Err(e) => {
            log::error!("Cannot create window: {}", e);
            std::process::exit(1);
        }
    };

    let mut renderer = match pollster::block_on(Renderer::new(window.clone())) {
        Ok(r) => r,
        Err(e) => {
            log::error!("Cannot initialise renderer: {}", e);
            std::process::exit(1);
        }
    };

    let mut ui_state = UiState::new(lang);

    let mut cursor: Option<PhysicalPosition<f64>> = None;

    // FPS 计算
    let mut last_frame_time = Instant::now();
    let mut frame_count = 0;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        // 后台加载完成的资源
        while let Ok(done) = rx.try_recv() {
            session.complete_load(done, &mut renderer, &mut ui_state.tooltip);
        }
        session.poll_timeouts(Instant::now());

        match event {
            Event::WindowEvent { event, .. } => {
                // 先让 egui 处理事件
                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.consumed {
                    // 指针移到菜单/状态栏上：拖拽照常继续，否则悬停结束
                    match event {
                        WindowEvent::CursorMoved { position, .. } => {
                            cursor = Some(position);
                            if session.is_dragging() {
                                session.pointer_move(
                                    position.x as f32,
                                    position.y as f32,
                                    &mut renderer,
                                    &mut ui_state.tooltip,
                                );
                            } else {
                                session.pointer_left(&mut renderer, &mut ui_state.tooltip);
                            }
                        }
                        WindowEvent::MouseInput {
                            state: ElementState::Released,
                            button: MouseButton::Left,
                            ..
                        } => session.pointer_cancel(),
                        _ => {}
                    }
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                    }

                    WindowEvent::KeyboardInput { input, .. } if input.state == ElementState::Pressed => {
                        match input.virtual_keycode {
                            Some(VirtualKeyCode::O) => {
                                if let Some(next) = pick_tour(mode_override) {
                                    install(next, &mut session, &mut rx, &mut renderer, &mut ui_state.tooltip);
                                }
                            }
                            Some(VirtualKeyCode::F11) => toggle_fullscreen(&window, &mut ui_state),
                            Some(VirtualKeyCode::M) => {
                                let mode = session.mode().toggled();
                                session.set_mode(mode, &mut renderer, &mut ui_state.tooltip);
                            }
                            Some(VirtualKeyCode::D) => {
                                let show = !session.show_id_map();
                                session.set_show_id_map(show);
                            }
                            Some(VirtualKeyCode::R) => session.reset_view(),
                            _ => {}
                        }
                    }

                    WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                        let pos = cursor.map(|p| (p.x as f32, p.y as f32));
                        match state {
                            ElementState::Pressed => {
                                if let Some((x, y)) = pos {
                                    session.pointer_down(x, y);
                                }
                            }
                            // 拖出窗口后松开时位置未知，按取消处理
                            ElementState::Released => {
                                let outcome = session.pointer_release(pos, &mut renderer, &mut ui_state.tooltip);
                                log::debug!("Release at {:?}: {:?}", pos, outcome);
                            }
                        }
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        cursor = Some(position);
                        session.pointer_move(
                            position.x as f32,
                            position.y as f32,
                            &mut renderer,
                            &mut ui_state.tooltip,
                        );
                    }

                    WindowEvent::CursorLeft { .. } => {
                        cursor = None;
                        session.pointer_left(&mut renderer, &mut ui_state.tooltip);
                    }

                    WindowEvent::Touch(touch) => {
                        let (x, y) = (touch.location.x as f32, touch.location.y as f32);
                        match touch.phase {
                            TouchPhase::Started => session.pointer_down(x, y),
                            TouchPhase::Moved => session.pointer_move(x, y, &mut renderer, &mut ui_state.tooltip),
                            TouchPhase::Ended => {
                                session.pointer_up(x, y, &mut renderer, &mut ui_state.tooltip);
                            }
                            TouchPhase::Cancelled => session.pointer_cancel(),
                        }
                    }

                    WindowEvent::MouseWheel { delta, .. } => {
                        let lines = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
                        };
                        session.wheel(lines);
                    }

                    WindowEvent::DroppedFile(path) => {
                        if let Some(next) = open_tour(&path, mode_override) {
                            install(next, &mut session, &mut rx, &mut renderer, &mut ui_state.tooltip);
                        }
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                frame_count += 1;
                let now = Instant::now();
                let elapsed = now.duration_since(last_frame_time).as_secs_f32();
                if elapsed >= 1.0 {
                    ui_state.fps = frame_count as f32 / elapsed;
                    frame_count = 0;
                    last_frame_time = now;
                }

                renderer.update_camera(
                    session.view(),
                    session.mode(),
                    session.show_id_map(),
                    ui_state.tooltip.highlight,
                );

                let pixels_per_point = window.scale_factor() as f32;
                let mut actions = Vec::new();
                let render_result = renderer.render_with_ui(&window, |ctx| {
                    actions = ui::draw_ui(ctx, &session, &mut ui_state, pixels_per_point);
                });

                for action in actions {
                    match action {
                        UiAction::OpenTour => {
                            if let Some(next) = pick_tour(mode_override) {
                                install(next, &mut session, &mut rx, &mut renderer, &mut ui_state.tooltip);
                            }
                        }
                        UiAction::Exit => *control_flow = ControlFlow::Exit,
                        UiAction::SwitchRoom(key) => {
                            session.switch_room(&key, &mut renderer, &mut ui_state.tooltip);
                        }
                        UiAction::SetMode(mode) => session.set_mode(mode, &mut renderer, &mut ui_state.tooltip),
                        UiAction::ResetView => session.reset_view(),
                        UiAction::ToggleFullscreen => toggle_fullscreen(&window, &mut ui_state),
                        UiAction::SetShowIdMap(show) => session.set_show_id_map(show),
                        UiAction::SetLanguage(code) => {
                            i18n::init(code);
                            window.set_title(&tr("app.title"));
                        }
                    }
                }

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                    Err(e) => log::error!("Render error: {:?}", e),
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    });
}

fn start_session(
    mut config: TourConfig,
    mode_override: Option<ProjectionMode>,
) -> Result<(TourSession, Receiver<LoadResult>), ConfigError> {
    config.override_projection(mode_override);
    let (assets, rx) = FsAssetProvider::new();
    let mut session = Session::new(config, assets)?;
    session.start();
    Ok((session, rx))
}

/// 换一个导览文件；旧会话的在途加载随旧通道一起丢弃
fn open_tour(path: &Path, mode_override: Option<ProjectionMode>) -> Option<(TourSession, Receiver<LoadResult>)> {
    match TourConfig::load(path).and_then(|c| start_session(c, mode_override)) {
        Ok(started) => Some(started),
        Err(e) => {
            log::error!("{}", tr_with("error.load_tour", &[("err", e.to_string())]));
            None
        }
    }
}

fn pick_tour(mode_override: Option<ProjectionMode>) -> Option<(TourSession, Receiver<LoadResult>)> {
    let path: PathBuf = rfd::FileDialog::new()
        .add_filter(&tr("file.filter.tour"), &["json"])
        .pick_file()?;
    open_tour(&path, mode_override)
}

/// 切换到新会话，并清掉旧会话留下的提示框与高光
fn install(
    next: (TourSession, Receiver<LoadResult>),
    session: &mut TourSession,
    rx: &mut Receiver<LoadResult>,
    renderer: &mut Renderer,
    tooltip: &mut Tooltip,
) {
    (*session, *rx) = next;
    session.sync_feedback(renderer, tooltip);
}

fn toggle_fullscreen(window: &winit::window::Window, state: &mut UiState) {
    state.is_fullscreen = !state.is_fullscreen;
    if state.is_fullscreen {
        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
    } else {
        window.set_fullscreen(None);
    }
}
