// matcher.rs — 采样颜色 -> 语义目标

use crate::color::ColorKey;
use crate::registry::{ColorRegistry, Tier};

/// What a pointer resolved to. Indices point into the global hotspot list
/// or the current room's object list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Hotspot(usize),
    Object(usize),
}

/// Resolve a sampled color, checking tiers in priority order.
pub fn match_color(registry: &ColorRegistry<'_>, color: ColorKey) -> Option<HitTarget> {
    Tier::PRIORITY.iter().find_map(|&tier| {
        registry.lookup(color, tier).map(|index| match tier {
            Tier::Hotspot => HitTarget::Hotspot(index),
            Tier::Object => HitTarget::Object(index),
        })
    })
}

/// Reference color of a resolved target.
pub fn reference_color(registry: &ColorRegistry<'_>, target: HitTarget) -> Option<ColorKey> {
    match target {
        HitTarget::Hotspot(i) => registry.hotspot(i).map(|h| h.color),
        HitTarget::Object(i) => registry.object(i).map(|o| o.color),
    }
}
