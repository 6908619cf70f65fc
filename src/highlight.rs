// highlight.rs — 悬停高光遮罩
//
// 悬停目标变化时整张 ID 图扫描一次：颜色在容差内的像素标为高光色，其余全透明。
// 只在目标变化时执行，不是逐帧。

use image::{Rgba, RgbaImage};

use crate::color::ColorKey;
use crate::config::HighlightStyle;
use crate::raster::IdMap;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Overlay raster aligned pixel-for-pixel with the ID map it was built from.
#[derive(Debug, Clone)]
pub struct Overlay {
    image: RgbaImage,
    /// Number of highlighted pixels.
    coverage: usize,
}

impl Overlay {
    pub fn cleared(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, TRANSPARENT),
            coverage: 0,
        }
    }

    /// Mark every pixel of `id_map` within `tolerance` of `key`.
    pub fn build(id_map: &IdMap, key: ColorKey, tolerance: u8, style: HighlightStyle) -> Self {
        let mark = Rgba(style.color.to_rgba(style.alpha));
        let mut coverage = 0;
        let pixels: Vec<u8> = id_map
            .pixels()
            .flat_map(|px| {
                if px.matches(key, tolerance) {
                    coverage += 1;
                    mark.0
                } else {
                    TRANSPARENT.0
                }
            })
            .collect();

        let (w, h) = id_map.dimensions();
        let image = RgbaImage::from_raw(w, h, pixels).unwrap_or_else(|| RgbaImage::from_pixel(w, h, TRANSPARENT));
        Self { image, coverage }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn coverage(&self) -> usize {
        self.coverage
    }

    pub fn is_clear(&self) -> bool {
        self.coverage == 0
    }
}
