// session.rs — 交互状态机：拖拽/点击判定、悬停、空间切换、物件变体轮换
//
// 所有会话状态（当前空间、视角、各物件当前变体、悬停目标、待完成的加载）
// 都在这里，由事件循环单线程驱动。资源加载是唯一的异步边界：
// 每次请求带 (空间, 代号)，只有该空间最新一代的结果会被提交。

use std::time::{Duration, Instant};

use crate::assets::{AssetProvider, AssetRequest, LoadResult, LoadTicket};
use crate::config::TourConfig;
use crate::error::ConfigError;
use crate::highlight::Overlay;
use crate::matcher::{match_color, reference_color, HitTarget};
use crate::projector::{project, Viewport};
use crate::raster::RasterPair;
use crate::registry::ColorRegistry;
use crate::view::{ProjectionMode, ViewTransform};

/// Tooltip and highlight feedback, implemented by the UI layer.
pub trait FeedbackSink {
    fn show_tooltip(&mut self, x: f32, y: f32, text: &str);
    fn hide_tooltip(&mut self);
    fn set_highlight_active(&mut self, active: bool);
}

/// Where rasters end up on screen.
pub trait RenderSurface {
    fn viewport(&self) -> Viewport;
    fn show_rasters(&mut self, pair: &RasterPair);
    fn show_overlay(&mut self, overlay: &Overlay);
}

/// Result of a confirmed click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Nothing,
    /// A press that travelled too far; treated as the end of a drag.
    Suppressed,
    RoomSwitched { room: String },
    VariantCycled { object: String, variant: String },
}

#[derive(Debug, Clone)]
struct PendingLoad {
    ticket: LoadTicket,
    started: Instant,
}

/// Per-room mutable state.
#[derive(Debug, Clone, Default)]
pub struct RoomState {
    /// Selected variant index per object, in declaration order.
    variants: Vec<usize>,
    displayed: Option<RasterPair>,
    pending: Option<PendingLoad>,
}

impl RoomState {
    pub fn variants(&self) -> &[usize] {
        &self.variants
    }

    pub fn displayed(&self) -> Option<&RasterPair> {
        self.displayed.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    start: (f32, f32),
    last: (f32, f32),
    origin: ViewTransform,
    travelled: f32,
}

#[derive(Debug, Clone, Copy)]
enum Pointer {
    Idle,
    Dragging(Drag),
}

pub struct Session<A: AssetProvider> {
    config: TourConfig,
    assets: A,
    rooms: Vec<RoomState>,
    current: usize,
    view: ViewTransform,
    mode: ProjectionMode,
    pointer: Pointer,
    hover: Option<HitTarget>,
    next_generation: u64,
    last_error: Option<String>,
    show_id_map: bool,
}

impl<A: AssetProvider> Session<A> {
    /// Build a session. The config is validated again here since its fields are public.
    /// Nothing is requested until [`Session::start`].
    pub fn new(config: TourConfig, assets: A) -> Result<Self, ConfigError> {
        config.validate()?;
        let rooms = config
            .rooms
            .iter()
            .map(|r| RoomState {
                variants: vec![0; r.objects.len()],
                ..Default::default()
            })
            .collect();
        let start = config.start_room().to_string();
        let current = config.rooms.iter().position(|r| r.key == start).unwrap_or(0);
        let view = config.rooms.get(current).map(|r| r.default_view).unwrap_or_default();

        Ok(Self {
            mode: config.projection,
            show_id_map: config.debug_id_overlay,
            config,
            assets,
            rooms,
            current,
            view,
            pointer: Pointer::Idle,
            hover: None,
            next_generation: 0,
            last_error: None,
        })
    }

    /// Request the start room's rasters.
    pub fn start(&mut self) {
        log::info!("Starting tour in room '{}'", self.current_room_key());
        self.request_room_assets(self.current);
    }

    // ------------------------------------------------------------------
    // 指针事件
    // ------------------------------------------------------------------

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.pointer = Pointer::Dragging(Drag {
            start: (x, y),
            last: (x, y),
            origin: self.view,
            travelled: 0.0,
        });
    }

    pub fn pointer_move(
        &mut self,
        x: f32,
        y: f32,
        surface: &mut dyn RenderSurface,
        feedback: &mut dyn FeedbackSink,
    ) {
        if let Pointer::Dragging(drag) = &mut self.pointer {
            drag.travelled += distance(drag.last, (x, y));
            drag.last = (x, y);
            self.view = ViewTransform::dragged(
                &drag.origin,
                x - drag.start.0,
                y - drag.start.1,
                self.mode,
                self.config.drag_sensitivity,
                self.config.flat_pan_sensitivity,
            );
            return;
        }
        self.update_hover(x, y, surface, feedback);
    }

    /// Release. Counts as a click only if the pointer barely moved since it went down.
    pub fn pointer_up(
        &mut self,
        x: f32,
        y: f32,
        surface: &mut dyn RenderSurface,
        feedback: &mut dyn FeedbackSink,
    ) -> ClickOutcome {
        let Pointer::Dragging(drag) = std::mem::replace(&mut self.pointer, Pointer::Idle) else {
            return ClickOutcome::Nothing;
        };
        let travelled = drag.travelled + distance(drag.last, (x, y));
        if travelled > self.config.drag_threshold {
            log::debug!("Release after {:.1}px of travel, not a click", travelled);
            return ClickOutcome::Suppressed;
        }
        self.click(x, y, surface, feedback)
    }

    /// Interrupted press (e.g. a cancelled touch): back to idle without a click.
    pub fn pointer_cancel(&mut self) {
        self.pointer = Pointer::Idle;
    }

    /// Release where the pointer position may be unknown (it left the window
    /// mid-drag). Without a position the press is cancelled instead of clicked.
    pub fn pointer_release(
        &mut self,
        pos: Option<(f32, f32)>,
        surface: &mut dyn RenderSurface,
        feedback: &mut dyn FeedbackSink,
    ) -> ClickOutcome {
        match pos {
            Some((x, y)) => self.pointer_up(x, y, surface, feedback),
            None => {
                self.pointer_cancel();
                ClickOutcome::Nothing
            }
        }
    }

    /// Pointer left the viewport.
    pub fn pointer_left(&mut self, surface: &mut dyn RenderSurface, feedback: &mut dyn FeedbackSink) {
        if matches!(self.pointer, Pointer::Idle) {
            self.set_hover(None, 0.0, 0.0, surface, feedback);
        }
    }

    /// Resolve a click at a viewport position.
    pub fn click(
        &mut self,
        x: f32,
        y: f32,
        surface: &mut dyn RenderSurface,
        feedback: &mut dyn FeedbackSink,
    ) -> ClickOutcome {
        if matches!(self.pointer, Pointer::Dragging(_)) {
            return ClickOutcome::Suppressed;
        }
        match self.hit_test(x, y, surface.viewport()) {
            Some(HitTarget::Hotspot(i)) => {
                let room = self.config.hotspots[i].room.clone();
                log::info!("Hotspot clicked: {}", self.config.hotspots[i].name);
                self.switch_room(&room, surface, feedback);
                ClickOutcome::RoomSwitched { room }
            }
            Some(HitTarget::Object(i)) => self.cycle_variant(i),
            None => ClickOutcome::Nothing,
        }
    }

    /// Mouse wheel, in lines; positive scrolls up (zooms in).
    pub fn wheel(&mut self, lines: f32) {
        if self.mode == ProjectionMode::Spherical {
            self.view = self.view.zoomed(-lines * self.config.zoom_step);
        }
    }

    // ------------------------------------------------------------------
    // 命中检测
    // ------------------------------------------------------------------

    /// Pointer → ID-map pixel → registry target, against the current room's displayed pair.
    pub fn hit_test(&self, x: f32, y: f32, viewport: Viewport) -> Option<HitTarget> {
        let pair = self.rooms[self.current].displayed.as_ref()?;
        let point = project(x, y, &self.view, viewport, self.mode, &pair.id_map)?;
        let color = pair.id_map.sample(point)?;
        match_color(&self.registry(), color)
    }

    fn registry(&self) -> ColorRegistry<'_> {
        ColorRegistry::for_room(&self.config, &self.config.rooms[self.current])
    }

    fn update_hover(&mut self, x: f32, y: f32, surface: &mut dyn RenderSurface, feedback: &mut dyn FeedbackSink) {
        let target = self.hit_test(x, y, surface.viewport());
        self.set_hover(target, x, y, surface, feedback);
    }

    fn set_hover(
        &mut self,
        target: Option<HitTarget>,
        x: f32,
        y: f32,
        surface: &mut dyn RenderSurface,
        feedback: &mut dyn FeedbackSink,
    ) {
        if target != self.hover {
            log::debug!("Hover {:?} -> {:?}", self.hover, target);
            self.hover = target;
            self.refresh_highlight(surface);
            feedback.set_highlight_active(target.is_some());
            if target.is_none() {
                feedback.hide_tooltip();
            }
        }
        // 同一目标时提示框跟随指针
        if let Some(text) = target.and_then(|t| self.tooltip_text(t)) {
            feedback.show_tooltip(x, y, &text);
        }
    }

    fn tooltip_text(&self, target: HitTarget) -> Option<String> {
        let registry = self.registry();
        match target {
            HitTarget::Hotspot(i) => registry
                .hotspot(i)
                .map(|h| crate::i18n::tr_with("tooltip.goto_room", &[("name", h.name.clone())])),
            HitTarget::Object(i) => registry
                .object(i)
                .map(|o| crate::i18n::tr_with("tooltip.cycle_object", &[("name", o.name.clone())])),
        }
    }

    /// Rebuild the overlay for the current hover target from the displayed ID map.
    fn refresh_highlight(&self, surface: &mut dyn RenderSurface) {
        let Some(pair) = self.rooms[self.current].displayed.as_ref() else {
            return;
        };
        let (w, h) = pair.id_map.dimensions();
        let registry = self.registry();
        let overlay = match self.hover.and_then(|t| reference_color(&registry, t)) {
            Some(key) => Overlay::build(&pair.id_map, key, self.config.tolerance, self.config.highlight),
            None => Overlay::cleared(w, h),
        };
        surface.show_overlay(&overlay);
    }

    // ------------------------------------------------------------------
    // 状态迁移
    // ------------------------------------------------------------------

    /// Enter a room (also when it is already current): default view, all variants
    /// back to 0, hover cleared, rasters re-requested.
    pub fn switch_room(&mut self, key: &str, surface: &mut dyn RenderSurface, feedback: &mut dyn FeedbackSink) -> bool {
        let Some(index) = self.config.rooms.iter().position(|r| r.key == key) else {
            log::warn!("Switch to unknown room '{}' ignored", key);
            return false;
        };

        // 离开的空间若还在加载，取消
        if index != self.current {
            self.cancel_pending(self.current);
        }

        self.current = index;
        self.pointer = Pointer::Idle;
        self.view = self.config.rooms[index].default_view;
        self.rooms[index].variants.iter_mut().for_each(|v| *v = 0);
        log::info!("Switched to room '{}' ({})", key, self.config.rooms[index].name);

        if let Some(pair) = &self.rooms[index].displayed {
            surface.show_rasters(pair);
        }
        self.set_hover(None, 0.0, 0.0, surface, feedback);
        self.request_room_assets(index);
        true
    }

    fn cycle_variant(&mut self, object: usize) -> ClickOutcome {
        let room = self.current;
        let Some(def) = self.config.rooms[room].objects.get(object) else {
            return ClickOutcome::Nothing;
        };
        let count = def.variants.len();
        if count == 0 {
            return ClickOutcome::Nothing;
        }
        let slot = &mut self.rooms[room].variants[object];
        *slot = (*slot + 1) % count;
        let variant = def.variants[*slot].clone();
        let object_id = def.id.clone();
        log::info!("Object '{}' -> variant '{}'", def.name, variant);

        self.request_room_assets(room);
        ClickOutcome::VariantCycled {
            object: object_id,
            variant,
        }
    }

    fn request_room_assets(&mut self, room: usize) {
        let def = &self.config.rooms[room];
        let name = self.config.asset_name(def, &self.rooms[room].variants);
        let (panorama, id_map) = self.config.asset_paths(&name);

        self.next_generation += 1;
        let ticket = LoadTicket {
            room,
            generation: self.next_generation,
        };
        // 同一空间的旧请求被新请求取代
        if let Some(old) = self.rooms[room].pending.replace(PendingLoad {
            ticket,
            started: Instant::now(),
        }) {
            log::debug!("Load {:?} superseded by {:?}", old.ticket, ticket);
            self.assets.cancel(old.ticket);
        }
        self.assets.request(AssetRequest {
            ticket,
            name,
            panorama,
            id_map,
        });
    }

    fn cancel_pending(&mut self, room: usize) {
        if let Some(old) = self.rooms[room].pending.take() {
            log::debug!("Cancelling load {:?} for room left behind", old.ticket);
            self.assets.cancel(old.ticket);
        }
    }

    /// Apply a finished load. Returns `false` when the result was stale and dropped.
    pub fn complete_load(
        &mut self,
        done: LoadResult,
        surface: &mut dyn RenderSurface,
        feedback: &mut dyn FeedbackSink,
    ) -> bool {
        let room = done.ticket.room;
        let is_latest = self
            .rooms
            .get(room)
            .and_then(|r| r.pending.as_ref())
            .is_some_and(|p| p.ticket == done.ticket);
        if !is_latest {
            log::debug!("Discarding stale load {:?}", done.ticket);
            return false;
        }
        self.rooms[room].pending = None;

        match done.result {
            Ok(pair) => {
                log::info!("Committed {} for room '{}'", pair.name, self.config.rooms[room].key);
                self.rooms[room].displayed = Some(pair);
                self.last_error = None;
                if room == self.current {
                    if let Some(pair) = &self.rooms[room].displayed {
                        surface.show_rasters(pair);
                    }
                    // ID 图换了，高光按新图重算
                    if self.hover.is_some() {
                        self.refresh_highlight(surface);
                        feedback.set_highlight_active(true);
                    }
                }
            }
            Err(e) => {
                log::warn!("Asset load failed for room '{}': {}", self.config.rooms[room].key, e);
                self.last_error = Some(e.to_string());
            }
        }
        true
    }

    /// Expire loads that have been pending longer than the configured timeout.
    pub fn poll_timeouts(&mut self, now: Instant) {
        let timeout = self.config.load_timeout();
        for room in 0..self.rooms.len() {
            let expired = self.rooms[room]
                .pending
                .as_ref()
                .is_some_and(|p| now.saturating_duration_since(p.started) >= timeout);
            if expired {
                self.cancel_pending(room);
                let e = crate::error::AssetError::Timeout(timeout);
                log::warn!("Asset load for room '{}' {}", self.config.rooms[room].key, e);
                self.last_error = Some(e.to_string());
            }
        }
    }

    // ------------------------------------------------------------------
    // 查询 / 设置
    // ------------------------------------------------------------------

    pub fn config(&self) -> &TourConfig {
        &self.config
    }

    pub fn assets(&self) -> &A {
        &self.assets
    }

    pub fn current_room_key(&self) -> &str {
        &self.config.rooms[self.current].key
    }

    pub fn current_room_name(&self) -> &str {
        &self.config.rooms[self.current].name
    }

    pub fn room_state(&self, key: &str) -> Option<&RoomState> {
        let index = self.config.rooms.iter().position(|r| r.key == key)?;
        self.rooms.get(index)
    }

    /// Selected variant index of an object in a room.
    pub fn variant(&self, room: &str, object: &str) -> Option<usize> {
        let index = self.config.rooms.iter().position(|r| r.key == room)?;
        let obj = self.config.rooms[index].objects.iter().position(|o| o.id == object)?;
        self.rooms[index].variants.get(obj).copied()
    }

    pub fn displayed(&self) -> Option<&RasterPair> {
        self.rooms[self.current].displayed.as_ref()
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn reset_view(&mut self) {
        self.view = self.config.rooms[self.current].default_view;
    }

    pub fn mode(&self) -> ProjectionMode {
        self.mode
    }

    /// Change projection mode. Hover is cleared since the same pointer now hits elsewhere.
    pub fn set_mode(&mut self, mode: ProjectionMode, surface: &mut dyn RenderSurface, feedback: &mut dyn FeedbackSink) {
        if mode != self.mode {
            log::info!("Projection mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
            self.pointer = Pointer::Idle;
            self.set_hover(None, 0.0, 0.0, surface, feedback);
        }
    }

    /// Bring tooltip, highlight and overlay in line with this session, whatever a
    /// previous session left on them.
    pub fn sync_feedback(&mut self, surface: &mut dyn RenderSurface, feedback: &mut dyn FeedbackSink) {
        self.hover = None;
        feedback.hide_tooltip();
        feedback.set_highlight_active(false);
        if let Some(pair) = &self.rooms[self.current].displayed {
            surface.show_rasters(pair);
        }
        self.refresh_highlight(surface);
    }

    pub fn hover(&self) -> Option<HitTarget> {
        self.hover
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.pointer, Pointer::Dragging(_))
    }

    pub fn is_loading(&self) -> bool {
        self.rooms.iter().any(RoomState::is_loading)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn show_id_map(&self) -> bool {
        self.show_id_map
    }

    pub fn set_show_id_map(&mut self, show: bool) {
        self.show_id_map = show;
    }

    pub fn load_timeout(&self) -> Duration {
        self.config.load_timeout()
    }
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssetError;
    use image::{Rgba, RgbaImage};

    #[derive(Default)]
    struct Recorder {
        requests: Vec<AssetRequest>,
        cancelled: Vec<LoadTicket>,
    }

    impl AssetProvider for Recorder {
        fn request(&mut self, request: AssetRequest) {
            self.requests.push(request);
        }
        fn cancel(&mut self, ticket: LoadTicket) {
            self.cancelled.push(ticket);
        }
    }

    #[derive(Default)]
    struct Screen {
        shown: Vec<String>,
        overlays: Vec<usize>,
        tooltip: Option<String>,
        highlight: bool,
    }

    impl RenderSurface for Screen {
        fn viewport(&self) -> Viewport {
            Viewport::new(100.0, 10.0)
        }
        fn show_rasters(&mut self, pair: &RasterPair) {
            self.shown.push(pair.name.clone());
        }
        fn show_overlay(&mut self, overlay: &Overlay) {
            self.overlays.push(overlay.coverage());
        }
    }

    impl FeedbackSink for Screen {
        fn show_tooltip(&mut self, _x: f32, _y: f32, text: &str) {
            self.tooltip = Some(text.to_string());
        }
        fn hide_tooltip(&mut self) {
            self.tooltip = None;
        }
        fn set_highlight_active(&mut self, active: bool) {
            self.highlight = active;
        }
    }

    const TOUR: &str = r##"{
        "projection": "flat",
        "hotspots": [{ "room": "master", "name": "主卧室", "color": [255, 255, 0] }],
        "rooms": [
            { "key": "living", "name": "客餐厅", "asset_template": "living_{sofa}",
              "objects": [{ "id": "sofa", "name": "沙发", "color": "#00FF00", "variants": ["A", "B", "C"] }] },
            { "key": "master", "name": "主卧室" }
        ]
    }"##;

    /// 100x10 ID map: columns 0..10 sofa green, 50..60 hotspot yellow, rest black.
    fn pair(name: &str) -> RasterPair {
        let mut id = RgbaImage::from_pixel(100, 10, Rgba([0, 0, 0, 255]));
        for y in 0..10 {
            for x in 0..10 {
                id.put_pixel(x, y, Rgba([3, 250, 2, 255]));
            }
            for x in 50..60 {
                id.put_pixel(x, y, Rgba([255, 255, 0, 255]));
            }
        }
        RasterPair::new(name, RgbaImage::new(100, 10), id).unwrap()
    }

    fn session() -> Session<Recorder> {
        let config = TourConfig::from_json_str(TOUR).unwrap();
        let mut s = Session::new(config, Recorder::default()).unwrap();
        s.start();
        s
    }

    fn finish_latest(s: &mut Session<Recorder>, screen: &mut Screen) {
        let req = s.assets.requests.last().unwrap().clone();
        let done = LoadResult {
            ticket: req.ticket,
            result: Ok(pair(&req.name)),
        };
        let mut fb = Screen::default();
        assert!(s.complete_load(done, screen, &mut fb));
    }

    fn click(s: &mut Session<Recorder>, screen: &mut Screen, x: f32, y: f32) -> ClickOutcome {
        let mut fb = Screen::default();
        s.pointer_down(x, y);
        s.pointer_up(x, y, screen, &mut fb)
    }

    #[test]
    fn start_requests_start_room() {
        let s = session();
        assert_eq!(s.assets.requests.len(), 1);
        assert_eq!(s.assets.requests[0].name, "living_A");
        assert!(s.is_loading());
        assert_eq!(s.current_room_key(), "living");
    }

    #[test]
    fn no_target_before_first_load() {
        let s = session();
        assert_eq!(s.hit_test(5.0, 5.0, Viewport::new(100.0, 10.0)), None);
    }

    #[test]
    fn clicking_object_cycles_and_requests_composite() {
        let mut s = session();
        let mut screen = Screen::default();
        finish_latest(&mut s, &mut screen);
        assert_eq!(screen.shown, vec!["living_A"]);

        let out = click(&mut s, &mut screen, 5.0, 5.0);
        assert_eq!(
            out,
            ClickOutcome::VariantCycled {
                object: "sofa".into(),
                variant: "B".into()
            }
        );
        assert_eq!(s.variant("living", "sofa"), Some(1));
        assert_eq!(s.assets.requests.last().unwrap().name, "living_B");
    }

    #[test]
    fn cycling_k_times_returns_to_start() {
        let mut s = session();
        let mut screen = Screen::default();
        finish_latest(&mut s, &mut screen);
        for n in 1..=6 {
            click(&mut s, &mut screen, 5.0, 5.0);
            assert_eq!(s.variant("living", "sofa"), Some(n % 3));
        }
    }

    #[test]
    fn hotspot_click_switches_and_resets() {
        let mut s = session();
        let mut screen = Screen::default();
        finish_latest(&mut s, &mut screen);
        click(&mut s, &mut screen, 5.0, 5.0);
        assert_eq!(s.variant("living", "sofa"), Some(1));

        let out = click(&mut s, &mut screen, 55.0, 5.0);
        assert_eq!(out, ClickOutcome::RoomSwitched { room: "master".into() });
        assert_eq!(s.current_room_key(), "master");
        assert_eq!(s.assets.requests.last().unwrap().name, "master");
        // 离开 living 时其未完成的加载被取消
        assert_eq!(s.assets.cancelled.len(), 1);
        assert_eq!(s.hover(), None);
    }

    #[test]
    fn reentering_a_room_resets_its_variants() {
        let mut s = session();
        let mut screen = Screen::default();
        let mut fb = Screen::default();
        finish_latest(&mut s, &mut screen);
        click(&mut s, &mut screen, 5.0, 5.0);
        click(&mut s, &mut screen, 5.0, 5.0);
        assert_eq!(s.variant("living", "sofa"), Some(2));

        assert!(s.switch_room("living", &mut screen, &mut fb));
        assert!(s.switch_room("living", &mut screen, &mut fb));
        assert_eq!(s.variant("living", "sofa"), Some(0));
        assert_eq!(s.assets.requests.last().unwrap().name, "living_A");
        assert!(!s.switch_room("attic", &mut screen, &mut fb));
    }

    #[test]
    fn drag_release_over_target_is_suppressed() {
        let mut s = session();
        let mut screen = Screen::default();
        let mut fb = Screen::default();
        finish_latest(&mut s, &mut screen);
        let before = s.assets.requests.len();

        s.pointer_down(2.0, 5.0);
        s.pointer_move(6.0, 5.0, &mut screen, &mut fb);
        s.pointer_move(2.0, 5.0, &mut screen, &mut fb);
        // 位移累计 8px，回到起点松开
        let out = s.pointer_up(2.0, 5.0, &mut screen, &mut fb);
        assert_eq!(out, ClickOutcome::Suppressed);
        assert_eq!(s.variant("living", "sofa"), Some(0));
        assert_eq!(s.assets.requests.len(), before);
    }

    #[test]
    fn small_jitter_still_clicks() {
        let mut s = session();
        let mut screen = Screen::default();
        let mut fb = Screen::default();
        finish_latest(&mut s, &mut screen);

        s.pointer_down(5.0, 5.0);
        s.pointer_move(7.0, 5.0, &mut screen, &mut fb);
        let out = s.pointer_up(8.0, 5.0, &mut screen, &mut fb);
        assert!(matches!(out, ClickOutcome::VariantCycled { .. }));
    }

    #[test]
    fn dragging_pans_without_hit_testing() {
        let mut s = session();
        let mut screen = Screen::default();
        let mut fb = Screen::default();
        finish_latest(&mut s, &mut screen);

        s.pointer_down(50.0, 5.0);
        s.pointer_move(30.0, 5.0, &mut screen, &mut fb);
        assert!(s.is_dragging());
        assert_eq!(s.view().pan_offset, 20.0);
        assert_eq!(s.hover(), None);
        assert!(fb.tooltip.is_none());
    }

    #[test]
    fn hover_drives_tooltip_and_overlay() {
        let mut s = session();
        let mut screen = Screen::default();
        let mut fb = Screen::default();
        finish_latest(&mut s, &mut screen);

        s.pointer_move(5.0, 5.0, &mut screen, &mut fb);
        assert_eq!(s.hover(), Some(HitTarget::Object(0)));
        assert!(fb.highlight);
        assert!(fb.tooltip.as_deref().unwrap().contains("沙发"));
        assert_eq!(screen.overlays, vec![100]);

        // 同一目标：不重算遮罩
        s.pointer_move(6.0, 5.0, &mut screen, &mut fb);
        assert_eq!(screen.overlays.len(), 1);

        s.pointer_move(55.0, 5.0, &mut screen, &mut fb);
        assert_eq!(s.hover(), Some(HitTarget::Hotspot(0)));
        assert!(fb.tooltip.as_deref().unwrap().contains("主卧室"));

        s.pointer_move(30.0, 5.0, &mut screen, &mut fb);
        assert_eq!(s.hover(), None);
        assert!(!fb.highlight);
        assert!(fb.tooltip.is_none());
        assert_eq!(screen.overlays.last(), Some(&0));
    }

    #[test]
    fn superseded_load_is_discarded() {
        let mut s = session();
        let mut screen = Screen::default();
        let mut fb = Screen::default();
        finish_latest(&mut s, &mut screen);

        click(&mut s, &mut screen, 5.0, 5.0); // request A (living_B)
        click(&mut s, &mut screen, 5.0, 5.0); // request B (living_C)
        let a = s.assets.requests[s.assets.requests.len() - 2].clone();
        let b = s.assets.requests.last().unwrap().clone();

        assert!(s.complete_load(
            LoadResult {
                ticket: b.ticket,
                result: Ok(pair(&b.name))
            },
            &mut screen,
            &mut fb
        ));
        assert!(!s.complete_load(
            LoadResult {
                ticket: a.ticket,
                result: Ok(pair(&a.name))
            },
            &mut screen,
            &mut fb
        ));
        assert_eq!(s.displayed().unwrap().name, "living_C");
        assert_eq!(screen.shown.last().map(String::as_str), Some("living_C"));
    }

    #[test]
    fn failed_load_keeps_previous_pair() {
        let mut s = session();
        let mut screen = Screen::default();
        let mut fb = Screen::default();
        finish_latest(&mut s, &mut screen);
        click(&mut s, &mut screen, 5.0, 5.0);
        let req = s.assets.requests.last().unwrap().clone();

        let err = AssetError::IdMapMissing {
            path: req.id_map.clone(),
            reason: "not found".into(),
        };
        assert!(s.complete_load(
            LoadResult {
                ticket: req.ticket,
                result: Err(err)
            },
            &mut screen,
            &mut fb
        ));
        assert_eq!(s.displayed().unwrap().name, "living_A");
        assert!(s.last_error().unwrap().contains("ID map"));
        assert!(!s.is_loading());
    }

    #[test]
    fn pending_load_times_out() {
        let mut s = session();
        let mut screen = Screen::default();
        let mut fb = Screen::default();
        let req = s.assets.requests[0].clone();

        s.poll_timeouts(Instant::now());
        assert!(s.is_loading());

        s.poll_timeouts(Instant::now() + s.load_timeout() + Duration::from_secs(1));
        assert!(!s.is_loading());
        assert_eq!(s.assets.cancelled, vec![req.ticket]);
        assert!(s.last_error().is_some());

        // 超时后迟到的结果不再提交
        assert!(!s.complete_load(
            LoadResult {
                ticket: req.ticket,
                result: Ok(pair(&req.name))
            },
            &mut screen,
            &mut fb
        ));
        assert!(s.displayed().is_none());
    }

    #[test]
    fn mode_switch_clears_hover() {
        let mut s = session();
        let mut screen = Screen::default();
        let mut fb = Screen::default();
        finish_latest(&mut s, &mut screen);
        s.pointer_move(5.0, 5.0, &mut screen, &mut fb);
        assert!(s.hover().is_some());

        s.set_mode(ProjectionMode::Spherical, &mut screen, &mut fb);
        assert_eq!(s.mode(), ProjectionMode::Spherical);
        assert_eq!(s.hover(), None);
        assert!(fb.tooltip.is_none());
    }

    #[test]
    fn unvalidated_config_is_rejected() {
        let err = Session::new(TourConfig::default(), Recorder::default()).err();
        assert!(matches!(err, Some(ConfigError::NoRooms)));
    }

    #[test]
    fn release_without_position_ends_drag() {
        let mut s = session();
        let mut screen = Screen::default();
        let mut fb = Screen::default();
        finish_latest(&mut s, &mut screen);

        s.pointer_down(30.0, 5.0);
        s.pointer_move(40.0, 5.0, &mut screen, &mut fb);
        // 指针拖出窗口后松开
        let out = s.pointer_release(None, &mut screen, &mut fb);
        assert_eq!(out, ClickOutcome::Nothing);
        assert!(!s.is_dragging());

        let pan = s.view().pan_offset;
        assert_eq!(pan, -10.0);
        // 平移 -10 后，视口 x=15 落在 ID 图第 5 列（沙发）
        s.pointer_move(15.0, 5.0, &mut screen, &mut fb);
        assert_eq!(s.view().pan_offset, pan);
        assert!(s.hover().is_some());
        assert!(fb.tooltip.is_some());
    }

    #[test]
    fn release_with_position_still_clicks() {
        let mut s = session();
        let mut screen = Screen::default();
        let mut fb = Screen::default();
        finish_latest(&mut s, &mut screen);

        s.pointer_down(5.0, 5.0);
        let out = s.pointer_release(Some((5.0, 5.0)), &mut screen, &mut fb);
        assert!(matches!(out, ClickOutcome::VariantCycled { .. }));
    }

    #[test]
    fn leaving_onto_ui_clears_hover() {
        let mut s = session();
        let mut screen = Screen::default();
        let mut fb = Screen::default();
        finish_latest(&mut s, &mut screen);

        s.pointer_move(5.0, 5.0, &mut screen, &mut fb);
        assert!(fb.highlight);
        s.pointer_left(&mut screen, &mut fb);
        assert_eq!(s.hover(), None);
        assert!(!fb.highlight);
        assert!(fb.tooltip.is_none());
        assert_eq!(screen.overlays.last(), Some(&0));
    }

    #[test]
    fn fresh_session_clears_stale_feedback() {
        let mut screen = Screen::default();
        let mut fb = Screen {
            tooltip: Some("前往主卧室".into()),
            highlight: true,
            ..Default::default()
        };

        let mut s = session();
        s.sync_feedback(&mut screen, &mut fb);
        assert!(fb.tooltip.is_none());
        assert!(!fb.highlight);
        // 尚未加载，不推送图像
        assert!(screen.shown.is_empty());

        finish_latest(&mut s, &mut screen);
        s.pointer_move(5.0, 5.0, &mut screen, &mut fb);
        s.sync_feedback(&mut screen, &mut fb);
        assert_eq!(s.hover(), None);
        assert_eq!(screen.shown.last().map(String::as_str), Some("living_A"));
        assert_eq!(screen.overlays.last(), Some(&0));
    }

    #[test]
    fn wheel_zooms_only_in_spherical_mode() {
        let mut s = session();
        let fov = s.view().fov;
        s.wheel(1.0);
        assert_eq!(s.view().fov, fov);

        let mut screen = Screen::default();
        let mut fb = Screen::default();
        s.set_mode(ProjectionMode::Spherical, &mut screen, &mut fb);
        s.wheel(1.0);
        assert!(s.view().fov < fov);
    }
}
