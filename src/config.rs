// config.rs — 导览配置：空间、热点、物件与资源命名
//
// 配置文件为 JSON，启动时加载一次并校验，之后只读（物件当前变体除外，见 session.rs）。
// 未指定 --config 时使用内置的 assets/tour.json。

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::color::ColorKey;
use crate::error::ConfigError;
use crate::view::{ProjectionMode, ViewTransform};

const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

const BUILTIN_TOUR: &str = include_str!("../assets/tour.json");

/// Room-switch hotspot, clickable from every room.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HotspotDef {
    /// Key of the room this hotspot leads to.
    pub room: String,
    pub name: String,
    pub color: ColorKey,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObjectDef {
    pub id: String,
    pub name: String,
    pub color: ColorKey,
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoomDef {
    pub key: String,
    pub name: String,
    /// Asset base name; `{object_id}` is replaced by that object's selected variant.
    /// Empty means the room key.
    #[serde(default)]
    pub asset_template: String,
    #[serde(default)]
    pub default_view: ViewTransform,
    #[serde(default)]
    pub objects: Vec<ObjectDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct HighlightStyle {
    pub color: ColorKey,
    pub alpha: u8,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            color: ColorKey::new(255, 255, 255),
            alpha: 96,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TourConfig {
    /// Per-channel slack when matching ID-map colors (0 = exact).
    pub tolerance: u8,
    pub projection: ProjectionMode,
    /// Max cumulative pointer travel (px) for a press to still count as a click.
    pub drag_threshold: f32,
    /// Degrees of rotation per dragged pixel.
    pub drag_sensitivity: f32,
    /// ID-map pixels of pan per dragged pixel (flat mode).
    pub flat_pan_sensitivity: f32,
    /// Degrees of FOV per wheel line.
    pub zoom_step: f32,
    pub start_room: Option<String>,
    pub asset_dir: PathBuf,
    pub panorama_ext: String,
    pub id_suffix: String,
    pub load_timeout_secs: f64,
    pub highlight: HighlightStyle,
    pub debug_id_overlay: bool,
    pub hotspots: Vec<HotspotDef>,
    pub rooms: Vec<RoomDef>,

    /// Directory the config was read from; `asset_dir` is relative to it.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            tolerance: 15,
            projection: ProjectionMode::Spherical,
            drag_threshold: 5.0,
            drag_sensitivity: 0.1,
            flat_pan_sensitivity: 1.0,
            zoom_step: 5.0,
            start_room: None,
            asset_dir: PathBuf::from("panorama"),
            panorama_ext: "jpg".to_string(),
            id_suffix: "_ID".to_string(),
            load_timeout_secs: DEFAULT_LOAD_TIMEOUT.as_secs_f64(),
            highlight: HighlightStyle::default(),
            debug_id_overlay: false,
            hotspots: Vec::new(),
            rooms: Vec::new(),
            base_dir: PathBuf::new(),
        }
    }
}

impl TourConfig {
    /// Parse and validate a tour definition.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: TourConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json_str(&text)?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        log::info!("Loaded tour {:?}: {} rooms, {} hotspots", path, config.rooms.len(), config.hotspots.len());
        Ok(config)
    }

    /// The tour bundled with the binary.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json_str(BUILTIN_TOUR)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rooms.is_empty() {
            return Err(ConfigError::NoRooms);
        }
        // 超出 Duration 范围的值在计时时会 panic
        match Duration::try_from_secs_f64(self.load_timeout_secs) {
            Ok(timeout) if !timeout.is_zero() => {}
            _ => return Err(ConfigError::InvalidTimeout(self.load_timeout_secs)),
        }

        let mut keys = HashSet::new();
        for room in &self.rooms {
            if !keys.insert(room.key.as_str()) {
                return Err(ConfigError::DuplicateRoom(room.key.clone()));
            }
        }
        if let Some(start) = &self.start_room {
            if !keys.contains(start.as_str()) {
                return Err(ConfigError::UnknownRoom(start.clone()));
            }
        }
        for hotspot in &self.hotspots {
            if !keys.contains(hotspot.room.as_str()) {
                return Err(ConfigError::UnknownRoom(hotspot.room.clone()));
            }
        }

        for room in &self.rooms {
            self.validate_room(room)?;
        }
        Ok(())
    }

    fn validate_room(&self, room: &RoomDef) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        for obj in &room.objects {
            if !ids.insert(obj.id.as_str()) {
                return Err(ConfigError::DuplicateObject {
                    room: room.key.clone(),
                    object: obj.id.clone(),
                });
            }
            if obj.variants.is_empty() {
                return Err(ConfigError::EmptyVariants {
                    room: room.key.clone(),
                    object: obj.id.clone(),
                });
            }
        }

        for placeholder in placeholders(&room.asset_template) {
            if !ids.contains(placeholder) {
                return Err(ConfigError::UnknownPlaceholder {
                    room: room.key.clone(),
                    placeholder: placeholder.to_string(),
                });
            }
        }

        // 热点全局可见，所以与本空间物件放在一起检查
        let targets: Vec<(&str, ColorKey)> = self
            .hotspots
            .iter()
            .map(|h| (h.name.as_str(), h.color))
            .chain(room.objects.iter().map(|o| (o.name.as_str(), o.color)))
            .collect();

        for (i, &(name, color)) in targets.iter().enumerate() {
            if color.matches(ColorKey::BACKGROUND, self.tolerance) {
                return Err(ConfigError::ReservedColor {
                    target: name.to_string(),
                    color,
                });
            }
            for &(other, other_color) in &targets[i + 1..] {
                if color.matches(other_color, self.tolerance) {
                    return Err(ConfigError::ColorRegistryCollision {
                        room: room.key.clone(),
                        first: name.to_string(),
                        first_color: color,
                        second: other.to_string(),
                        second_color: other_color,
                        tolerance: self.tolerance,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn room(&self, key: &str) -> Option<&RoomDef> {
        self.rooms.iter().find(|r| r.key == key)
    }

    pub fn start_room(&self) -> &str {
        self.start_room
            .as_deref()
            .or_else(|| self.rooms.first().map(|r| r.key.as_str()))
            .unwrap_or_default()
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.load_timeout_secs).unwrap_or(DEFAULT_LOAD_TIMEOUT)
    }

    /// Command-line projection override; applies to every tour opened in this run.
    pub fn override_projection(&mut self, mode: Option<ProjectionMode>) {
        if let Some(mode) = mode {
            self.projection = mode;
        }
    }

    /// Composite asset name for a room given each object's selected variant index
    /// (indices in object declaration order).
    pub fn asset_name(&self, room: &RoomDef, selections: &[usize]) -> String {
        if room.asset_template.is_empty() {
            return room.key.clone();
        }
        let mut name = room.asset_template.clone();
        for (obj, &index) in room.objects.iter().zip(selections) {
            let variant = obj.variants.get(index).or_else(|| obj.variants.first());
            if let Some(variant) = variant {
                name = name.replace(&format!("{{{}}}", obj.id), variant);
            }
        }
        name
    }

    /// (panorama, ID map) file paths for an asset name.
    pub fn asset_paths(&self, name: &str) -> (PathBuf, PathBuf) {
        let dir = self.base_dir.join(&self.asset_dir);
        (
            dir.join(format!("{}.{}", name, self.panorama_ext)),
            dir.join(format!("{}{}.{}", name, self.id_suffix, self.panorama_ext)),
        )
    }
}

/// `{name}` placeholders of an asset template.
fn placeholders(template: &str) -> impl Iterator<Item = &str> {
    template.split('{').skip(1).filter_map(|part| part.split_once('}').map(|(name, _)| name))
}
