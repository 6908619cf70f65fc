// registry.rs — 颜色登记表：语义目标 -> 参考颜色，分两层（全局热点 / 空间物件）

use crate::color::ColorKey;
use crate::config::{HotspotDef, ObjectDef, RoomDef, TourConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Hotspot,
    Object,
}

impl Tier {
    /// 固定顺序：热点优先于物件
    pub const PRIORITY: [Tier; 2] = [Tier::Hotspot, Tier::Object];
}

/// The colors visible from one room: every global hotspot plus that room's objects.
#[derive(Debug, Clone, Copy)]
pub struct ColorRegistry<'a> {
    hotspots: &'a [HotspotDef],
    objects: &'a [ObjectDef],
    tolerance: u8,
}

impl<'a> ColorRegistry<'a> {
    pub fn new(hotspots: &'a [HotspotDef], objects: &'a [ObjectDef], tolerance: u8) -> Self {
        Self {
            hotspots,
            objects,
            tolerance,
        }
    }

    pub fn for_room(config: &'a TourConfig, room: &'a RoomDef) -> Self {
        Self::new(&config.hotspots, &room.objects, config.tolerance)
    }

    pub fn tolerance(&self) -> u8 {
        self.tolerance
    }

    /// Index of the first entry of `tier` within tolerance of `color`, in declaration order.
    pub fn lookup(&self, color: ColorKey, tier: Tier) -> Option<usize> {
        let tolerance = self.tolerance;
        match tier {
            Tier::Hotspot => self.hotspots.iter().position(|h| color.matches(h.color, tolerance)),
            Tier::Object => self.objects.iter().position(|o| color.matches(o.color, tolerance)),
        }
    }

    pub fn hotspot(&self, index: usize) -> Option<&'a HotspotDef> {
        self.hotspots.get(index)
    }

    pub fn object(&self, index: usize) -> Option<&'a ObjectDef> {
        self.objects.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hotspot(room: &str, rgb: [u8; 3]) -> HotspotDef {
        HotspotDef {
            room: room.to_string(),
            name: room.to_string(),
            color: rgb.into(),
        }
    }

    fn object(id: &str, rgb: [u8; 3]) -> ObjectDef {
        ObjectDef {
            id: id.to_string(),
            name: id.to_string(),
            color: rgb.into(),
            variants: vec!["A".to_string()],
        }
    }

    #[test]
    fn lookup_per_tier() {
        let hotspots = [hotspot("master", [255, 255, 0]), hotspot("second", [0, 0, 255])];
        let objects = [object("sofa", [0, 255, 0]), object("table", [255, 0, 0])];
        let registry = ColorRegistry::new(&hotspots, &objects, 15);

        assert_eq!(registry.lookup(ColorKey::new(3, 2, 250), Tier::Hotspot), Some(1));
        assert_eq!(registry.lookup(ColorKey::new(3, 2, 250), Tier::Object), None);
        assert_eq!(registry.lookup(ColorKey::new(250, 4, 0), Tier::Object), Some(1));
        assert_eq!(registry.lookup(ColorKey::BACKGROUND, Tier::Object), None);
        assert_eq!(registry.object(0).map(|o| o.id.as_str()), Some("sofa"));
    }

    #[test]
    fn first_declared_entry_wins() {
        // 配置校验会拒绝这种重叠，这里只验证查表顺序
        let objects = [object("a", [100, 100, 100]), object("b", [110, 100, 100])];
        let registry = ColorRegistry::new(&[], &objects, 15);
        assert_eq!(registry.lookup(ColorKey::new(105, 100, 100), Tier::Object), Some(0));
    }
}
