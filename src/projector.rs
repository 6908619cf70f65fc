// projector.rs — 屏幕坐标 -> ID 图像素坐标
//
// 球面模式：相机位于球心，射线与球求交，交点的球面 UV 即采样坐标。
// 平铺模式：水平方向加上平移量后对图宽取模（无限循环），垂直方向按高度线性缩放。
// 两种模式输出同一种 SamplePoint（行号自上而下），颜色匹配不关心当前模式。

use glam::Vec3;
use std::f32::consts::{PI, TAU};

use crate::raster::{IdMap, SamplePoint};
use crate::view::{ProjectionMode, ViewTransform};

pub const SPHERE_RADIUS: f32 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    fn contains(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width && y < self.height
    }
}

/// Texture coordinate on the sphere. `v` runs bottom-up (1.0 = zenith),
/// the opposite of raster row order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereUv {
    pub u: f32,
    pub v: f32,
}

impl SphereUv {
    /// Continuous raster coordinate, rows top-down.
    pub fn to_raster(self, width: u32, height: u32) -> (f32, f32) {
        (self.u * width as f32, (1.0 - self.v) * height as f32)
    }
}

/// Map a viewport-relative pointer position to an ID-map pixel.
pub fn project(
    x: f32,
    y: f32,
    view: &ViewTransform,
    viewport: Viewport,
    mode: ProjectionMode,
    id_map: &IdMap,
) -> Option<SamplePoint> {
    if !viewport.contains(x, y) {
        return None;
    }
    let (rx, ry) = match mode {
        ProjectionMode::Spherical => {
            let dir = camera_ray(x, y, view, viewport)?;
            let hit = intersect_sphere(Vec3::ZERO, dir, SPHERE_RADIUS)?;
            sphere_uv(hit).to_raster(id_map.width(), id_map.height())
        }
        ProjectionMode::Flat => flat_coordinate(x, y, view, viewport, id_map.width(), id_map.height())?,
    };
    id_map.locate(rx, ry)
}

/// Camera look direction for a longitude/latitude pair (degrees).
pub fn look_direction(lon: f32, lat: f32) -> Vec3 {
    let phi = (90.0 - lat).to_radians();
    let theta = lon.to_radians();
    Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin())
}

/// Unit world-space ray through a viewport pixel.
pub fn camera_ray(x: f32, y: f32, view: &ViewTransform, viewport: Viewport) -> Option<Vec3> {
    if viewport.width <= 0.0 || viewport.height <= 0.0 {
        return None;
    }
    let ndc_x = x / viewport.width * 2.0 - 1.0;
    let ndc_y = -(y / viewport.height * 2.0 - 1.0);

    let forward = look_direction(view.lon, view.lat);
    // 纬度已限制在 ±85°，forward 不会与 Y 轴平行
    let right = forward.cross(Vec3::Y).try_normalize()?;
    let up = right.cross(forward);

    let half_h = (view.fov.to_radians() * 0.5).tan();
    let half_w = half_h * viewport.aspect();

    (forward + right * (ndc_x * half_w) + up * (ndc_y * half_h)).try_normalize()
}

/// Far intersection of a ray with a sphere centred at the origin.
/// `dir` must be normalized.
pub fn intersect_sphere(origin: Vec3, dir: Vec3, radius: f32) -> Option<Vec3> {
    let b = origin.dot(dir);
    let c = origin.length_squared() - radius * radius;
    let disc = b * b - c;
    if !(disc >= 0.0) {
        return None;
    }
    let t = -b + disc.sqrt();
    (t > 0.0).then(|| origin + dir * t)
}

pub fn sphere_uv(point: Vec3) -> SphereUv {
    let n = point.normalize_or_zero();
    let u = (n.z.atan2(n.x) / TAU).rem_euclid(1.0);
    let colatitude = n.y.clamp(-1.0, 1.0).acos();
    SphereUv {
        u: if u >= 1.0 { 0.0 } else { u },
        v: 1.0 - colatitude / PI,
    }
}

fn flat_coordinate(
    x: f32,
    y: f32,
    view: &ViewTransform,
    viewport: Viewport,
    width: u32,
    height: u32,
) -> Option<(f32, f32)> {
    if viewport.height <= 0.0 || width == 0 {
        return None;
    }
    let w = width as f32;
    let mut rx = (x + view.pan_offset).rem_euclid(w);
    if rx >= w {
        rx = 0.0;
    }
    Some((rx, y * height as f32 / viewport.height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn id_map(w: u32, h: u32) -> IdMap {
        IdMap::new(RgbaImage::new(w, h))
    }

    fn view(lon: f32, lat: f32) -> ViewTransform {
        ViewTransform {
            lon,
            lat,
            ..Default::default()
        }
    }

    #[test]
    fn screen_centre_follows_look_direction() {
        let vp = Viewport::new(200.0, 100.0);
        let map = id_map(10, 5);

        // lon 90 -> u = 0.25 -> 2.5 列；水平线 -> 2.5 行
        let p = project(100.0, 50.0, &view(90.0, 0.0), vp, ProjectionMode::Spherical, &map);
        assert_eq!(p, Some(SamplePoint { x: 2, y: 2 }));

        let uv = sphere_uv(look_direction(90.0, 0.0));
        assert!((uv.u - 0.25).abs() < 1e-5);
        assert!((uv.v - 0.5).abs() < 1e-5);
    }

    #[test]
    fn looking_up_samples_upper_rows() {
        let vp = Viewport::new(200.0, 100.0);
        let map = id_map(10, 10);
        let p = project(100.0, 50.0, &view(90.0, 45.0), vp, ProjectionMode::Spherical, &map);
        assert_eq!(p, Some(SamplePoint { x: 2, y: 2 }));

        // 屏幕上半部分对应更小的行号
        let top = project(100.0, 5.0, &view(90.0, 0.0), vp, ProjectionMode::Spherical, &map).unwrap();
        let bottom = project(100.0, 95.0, &view(90.0, 0.0), vp, ProjectionMode::Spherical, &map).unwrap();
        assert!(top.y < bottom.y);
    }

    #[test]
    fn camera_ray_spans_field_of_view() {
        let vp = Viewport::new(100.0, 100.0);
        let v = ViewTransform {
            fov: 60.0,
            ..view(0.0, 0.0)
        };
        let top = camera_ray(50.0, 0.0, &v, vp).unwrap();
        let centre = camera_ray(50.0, 50.0, &v, vp).unwrap();
        let angle = top.angle_between(centre).to_degrees();
        assert!((angle - 30.0).abs() < 1e-3);
        assert!(top.y > 0.0);
    }

    #[test]
    fn ray_from_centre_always_hits_enclosing_sphere() {
        let dir = Vec3::new(0.3, -0.2, 0.9).normalize();
        let hit = intersect_sphere(Vec3::ZERO, dir, SPHERE_RADIUS).unwrap();
        assert!((hit.length() - SPHERE_RADIUS).abs() < 1e-2);

        // 球外且背离球心，无交点
        assert_eq!(intersect_sphere(Vec3::new(0.0, 0.0, 1000.0), Vec3::Z, 1.0), None);
    }

    #[test]
    fn flat_mode_wraps_horizontally() {
        let map = id_map(64, 32);
        let vp = Viewport::new(300.0, 32.0);
        for x in [0.0, 10.0, 63.0, 64.0, 100.0, 200.5] {
            let p = project(x, 0.0, &ViewTransform::default(), vp, ProjectionMode::Flat, &map).unwrap();
            assert_eq!(p.x, (x as u32) % 64);
            assert_eq!(p.y, 0);
        }

        let panned = ViewTransform {
            pan_offset: -10.0,
            ..Default::default()
        };
        let p = project(4.0, 0.0, &panned, vp, ProjectionMode::Flat, &map).unwrap();
        assert_eq!(p.x, 58);
    }

    #[test]
    fn flat_mode_scales_vertically() {
        let map = id_map(64, 32);
        let vp = Viewport::new(100.0, 320.0);
        let p = project(0.0, 319.0, &ViewTransform::default(), vp, ProjectionMode::Flat, &map).unwrap();
        assert_eq!(p.y, 31);
        let p = project(0.0, 15.0, &ViewTransform::default(), vp, ProjectionMode::Flat, &map).unwrap();
        assert_eq!(p.y, 1);
    }

    #[test]
    fn outside_viewport_or_degenerate_is_none() {
        let map = id_map(64, 32);
        let vp = Viewport::new(100.0, 32.0);
        for mode in [ProjectionMode::Flat, ProjectionMode::Spherical] {
            let v = ViewTransform::default();
            assert_eq!(project(-1.0, 0.0, &v, vp, mode, &map), None);
            assert_eq!(project(0.0, 32.0, &v, vp, mode, &map), None);
            assert_eq!(project(0.0, 0.0, &v, Viewport::new(0.0, 0.0), mode, &map), None);
            assert_eq!(project(1.0, 1.0, &v, vp, mode, &id_map(0, 0)), None);
        }
    }
}
