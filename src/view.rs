// view.rs — 视角参数与投影模式

use serde::Deserialize;

pub const MIN_LAT: f32 = -85.0;
pub const MAX_LAT: f32 = 85.0;
pub const MIN_FOV: f32 = 10.0;
pub const MAX_FOV: f32 = 75.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    /// 球面透视（相机在球心，射线求交）
    #[default]
    Spherical,
    /// 平铺横向卷动（水平无限循环）
    Flat,
}

impl ProjectionMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Spherical => Self::Flat,
            Self::Flat => Self::Spherical,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spherical" | "sphere" | "3d" => Some(Self::Spherical),
            "flat" | "2d" | "canvas" => Some(Self::Flat),
            _ => None,
        }
    }
}

/// Orientation, zoom and pan of the current view. Angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewTransform {
    /// 经度（水平转角）
    pub lon: f32,
    /// 纬度，正值向上看
    pub lat: f32,
    /// 垂直视场角
    pub fov: f32,
    /// 平铺模式下的水平偏移（ID 图像素）
    pub pan_offset: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            lon: 0.0,
            lat: 0.0,
            fov: MAX_FOV,
            pan_offset: 0.0,
        }
    }
}

impl ViewTransform {
    /// View after dragging from `origin` by the total pointer delta since pointer-down.
    ///
    /// Dragging moves the picture with the pointer, so the camera turns the
    /// opposite way horizontally.
    pub fn dragged(
        origin: &ViewTransform,
        dx: f32,
        dy: f32,
        mode: ProjectionMode,
        degrees_per_px: f32,
        pan_per_px: f32,
    ) -> ViewTransform {
        let mut view = *origin;
        match mode {
            ProjectionMode::Spherical => {
                view.lon = origin.lon - dx * degrees_per_px;
                view.lat = origin.lat + dy * degrees_per_px;
            }
            ProjectionMode::Flat => {
                view.pan_offset = origin.pan_offset - dx * pan_per_px;
            }
        }
        view.clamped()
    }

    /// Wheel zoom; positive `delta` zooms out.
    pub fn zoomed(&self, delta: f32) -> ViewTransform {
        let mut view = *self;
        view.fov = self.fov + delta;
        view.clamped()
    }

    pub fn clamped(mut self) -> ViewTransform {
        self.lat = self.lat.clamp(MIN_LAT, MAX_LAT);
        self.fov = self.fov.clamp(MIN_FOV, MAX_FOV);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_is_relative_to_origin() {
        let origin = ViewTransform {
            lon: 30.0,
            ..Default::default()
        };
        let a = ViewTransform::dragged(&origin, 10.0, 0.0, ProjectionMode::Spherical, 0.1, 1.0);
        let b = ViewTransform::dragged(&origin, 20.0, 0.0, ProjectionMode::Spherical, 0.1, 1.0);
        assert!((a.lon - 29.0).abs() < 1e-4);
        assert!((b.lon - 28.0).abs() < 1e-4);
    }

    #[test]
    fn latitude_and_fov_are_clamped() {
        let view = ViewTransform::dragged(
            &ViewTransform::default(),
            0.0,
            10_000.0,
            ProjectionMode::Spherical,
            0.1,
            1.0,
        );
        assert_eq!(view.lat, MAX_LAT);
        assert_eq!(view.zoomed(-500.0).fov, MIN_FOV);
        assert_eq!(view.zoomed(500.0).fov, MAX_FOV);
    }

    #[test]
    fn flat_drag_only_pans() {
        let view =
            ViewTransform::dragged(&ViewTransform::default(), -40.0, 25.0, ProjectionMode::Flat, 0.1, 1.0);
        assert_eq!(view.pan_offset, 40.0);
        assert_eq!(view.lon, 0.0);
        assert_eq!(view.lat, 0.0);
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!(ProjectionMode::parse("Flat"), Some(ProjectionMode::Flat));
        assert_eq!(ProjectionMode::parse("spherical"), Some(ProjectionMode::Spherical));
        assert_eq!(ProjectionMode::parse("cube"), None);
        assert_eq!(ProjectionMode::Flat.toggled(), ProjectionMode::Spherical);
    }
}
