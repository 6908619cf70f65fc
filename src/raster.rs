// raster.rs — 全景图 / ID 图像素数据

use image::RgbaImage;
use std::sync::Arc;

use crate::color::ColorKey;
use crate::error::AssetError;

/// Integer pixel address inside a raster. Always in bounds of the raster it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplePoint {
    pub x: u32,
    pub y: u32,
}

/// Picking buffer: an invisible image whose pixel colors identify targets.
#[derive(Debug, Clone)]
pub struct IdMap {
    image: RgbaImage,
}

impl IdMap {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Truncate a continuous pixel coordinate and range-check it.
    /// Negative, NaN or past-the-edge coordinates yield `None`.
    pub fn locate(&self, x: f32, y: f32) -> Option<SamplePoint> {
        let (w, h) = self.dimensions();
        if !(x >= 0.0 && y >= 0.0 && x < w as f32 && y < h as f32) {
            return None;
        }
        let (px, py) = (x as u32, y as u32);
        // f32 精度在超大图上可能把 w-0.5 舍入到 w
        (px < w && py < h).then_some(SamplePoint { x: px, y: py })
    }

    pub fn sample(&self, point: SamplePoint) -> Option<ColorKey> {
        if point.x >= self.width() || point.y >= self.height() {
            return None;
        }
        Some(ColorKey::from(*self.image.get_pixel(point.x, point.y)))
    }

    pub fn pixels(&self) -> impl Iterator<Item = ColorKey> + '_ {
        self.image.pixels().map(|px| ColorKey::from(*px))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// A decoded panorama together with its pixel-aligned ID map.
#[derive(Debug, Clone)]
pub struct RasterPair {
    /// Name the pair was loaded under (see `TourConfig::asset_name`).
    pub name: String,
    pub panorama: Arc<RgbaImage>,
    pub id_map: Arc<IdMap>,
}

impl RasterPair {
    pub fn new(name: impl Into<String>, panorama: RgbaImage, id_map: RgbaImage) -> Result<Self, AssetError> {
        if panorama.dimensions() != id_map.dimensions() {
            return Err(AssetError::DimensionMismatch {
                panorama: panorama.dimensions(),
                id_map: id_map.dimensions(),
            });
        }
        Ok(Self {
            name: name.into(),
            panorama: Arc::new(panorama),
            id_map: Arc::new(IdMap::new(id_map)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn locate_truncates_and_rejects_out_of_bounds() {
        let map = IdMap::new(RgbaImage::new(4, 2));
        assert_eq!(map.locate(3.99, 1.99), Some(SamplePoint { x: 3, y: 1 }));
        assert_eq!(map.locate(0.0, 0.0), Some(SamplePoint { x: 0, y: 0 }));
        assert_eq!(map.locate(4.0, 0.0), None);
        assert_eq!(map.locate(0.0, 2.0), None);
        assert_eq!(map.locate(-0.25, 0.0), None);
        assert_eq!(map.locate(f32::NAN, 0.0), None);
    }

    #[test]
    fn sample_ignores_alpha() {
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(1, 0, Rgba([0, 255, 0, 17]));
        let map = IdMap::new(img);
        assert_eq!(map.sample(SamplePoint { x: 1, y: 0 }), Some(ColorKey::new(0, 255, 0)));
        assert_eq!(map.sample(SamplePoint { x: 2, y: 0 }), None);
    }

    #[test]
    fn pair_requires_matching_dimensions() {
        let err = RasterPair::new("x", RgbaImage::new(4, 2), RgbaImage::new(2, 1)).unwrap_err();
        assert_eq!(
            err,
            AssetError::DimensionMismatch {
                panorama: (4, 2),
                id_map: (2, 1)
            }
        );
        assert!(RasterPair::new("x", RgbaImage::new(4, 2), RgbaImage::new(4, 2)).is_ok());
    }
}
