// error.rs — 配置与资源加载的错误类型

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::color::ColorKey;

/// Errors raised while loading or validating a tour configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two targets visible from the same room are within tolerance of each other.
    #[error("color collision in room '{room}': '{first}' {first_color} and '{second}' {second_color} are within tolerance {tolerance}")]
    ColorRegistryCollision {
        room: String,
        first: String,
        first_color: ColorKey,
        second: String,
        second_color: ColorKey,
        tolerance: u8,
    },

    /// A target color is within tolerance of the reserved background.
    #[error("'{target}' color {color} collides with the reserved background color")]
    ReservedColor { target: String, color: ColorKey },

    #[error("object '{object}' in room '{room}' has no variants")]
    EmptyVariants { room: String, object: String },

    #[error("unknown room '{0}'")]
    UnknownRoom(String),

    #[error("duplicate room key '{0}'")]
    DuplicateRoom(String),

    #[error("duplicate object id '{object}' in room '{room}'")]
    DuplicateObject { room: String, object: String },

    #[error("asset template of room '{room}' references unknown object '{placeholder}'")]
    UnknownPlaceholder { room: String, placeholder: String },

    #[error("tour has no rooms")]
    NoRooms,

    #[error("load_timeout_secs must be a positive number of seconds, got {0}")]
    InvalidTimeout(f64),
}

/// Errors raised while fetching or decoding a panorama / ID-map pair.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetError {
    #[error("panorama missing: {path:?} ({reason})")]
    PanoramaMissing { path: PathBuf, reason: String },

    #[error("panorama could not be decoded: {path:?} ({reason})")]
    PanoramaDecode { path: PathBuf, reason: String },

    #[error("ID map missing: {path:?} ({reason})")]
    IdMapMissing { path: PathBuf, reason: String },

    #[error("ID map could not be decoded: {path:?} ({reason})")]
    IdMapDecode { path: PathBuf, reason: String },

    #[error("panorama is {panorama:?} but ID map is {id_map:?}")]
    DimensionMismatch {
        panorama: (u32, u32),
        id_map: (u32, u32),
    },

    #[error("load timed out after {0:?}")]
    Timeout(Duration),

    #[error("asset loader disconnected")]
    Disconnected,
}

impl AssetError {
    /// True when the failing half of the pair is the ID map.
    pub fn is_id_map(&self) -> bool {
        matches!(self, Self::IdMapMissing { .. } | Self::IdMapDecode { .. })
    }
}
