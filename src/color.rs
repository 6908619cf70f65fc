// color.rs — ID 图颜色键（RGB 指纹，忽略 alpha）

use serde::{de, Deserialize, Deserializer};
use std::fmt;

/// An opaque RGB fingerprint read from an ID map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorKey {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorKey {
    /// 纯黑保留给背景（不可点击区域）
    pub const BACKGROUND: ColorKey = ColorKey::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Largest absolute per-channel difference.
    pub fn max_channel_diff(self, other: ColorKey) -> u8 {
        self.r
            .abs_diff(other.r)
            .max(self.g.abs_diff(other.g))
            .max(self.b.abs_diff(other.b))
    }

    /// Every channel differs by at most `tolerance`. Tolerance 0 is exact equality.
    pub fn matches(self, reference: ColorKey, tolerance: u8) -> bool {
        self.max_channel_diff(reference) <= tolerance
    }

    /// Parse `#RRGGBB` (the leading `#` is optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_rgba(self, alpha: u8) -> [u8; 4] {
        [self.r, self.g, self.b, alpha]
    }
}

impl From<[u8; 3]> for ColorKey {
    fn from(rgb: [u8; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }
}

impl From<image::Rgba<u8>> for ColorKey {
    fn from(px: image::Rgba<u8>) -> Self {
        Self::new(px.0[0], px.0[1], px.0[2])
    }
}

impl fmt::Display for ColorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

// 配置里既可以写 [0, 255, 0] 也可以写 "#00FF00"
impl<'de> Deserialize<'de> for ColorKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Rgb([u8; 3]),
            Hex(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Rgb(rgb) => Ok(rgb.into()),
            Repr::Hex(s) => ColorKey::from_hex(&s)
                .ok_or_else(|| de::Error::custom(format!("invalid color \"{}\", expected #RRGGBB", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_boundary_is_inclusive() {
        let sofa = ColorKey::new(0, 255, 0);
        assert!(ColorKey::new(5, 250, 3).matches(sofa, 15));
        assert!(ColorKey::new(0, 240, 0).matches(sofa, 15));
        assert!(!ColorKey::new(0, 239, 0).matches(sofa, 15));
    }

    #[test]
    fn zero_tolerance_is_exact() {
        let red = ColorKey::new(255, 0, 0);
        assert!(red.matches(red, 0));
        assert!(!ColorKey::new(254, 0, 0).matches(red, 0));
    }

    #[test]
    fn parses_hex_and_array_forms() {
        assert_eq!(ColorKey::from_hex("#00FF00"), Some(ColorKey::new(0, 255, 0)));
        assert_eq!(ColorKey::from_hex("ff00ff"), Some(ColorKey::new(255, 0, 255)));
        assert_eq!(ColorKey::from_hex("#0F0"), None);
        assert_eq!(ColorKey::from_hex("#GG0000"), None);

        let a: ColorKey = serde_json::from_str("[1, 2, 3]").unwrap();
        let b: ColorKey = serde_json::from_str("\"#010203\"").unwrap();
        assert_eq!(a, b);
        assert!(serde_json::from_str::<ColorKey>("\"red\"").is_err());
    }

    #[test]
    fn display_is_uppercase_hex() {
        assert_eq!(ColorKey::new(255, 128, 0).to_string(), "#FF8000");
    }
}
