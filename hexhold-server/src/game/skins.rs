//! Skin catalogue.
//!
//! Loaded once at startup from a JSON file; base colors are parsed from hex
//! into RGB during the load. Players without a skin color draw from a fixed
//! palette.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SkinError {
    #[error("failed to read skin catalogue: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse skin catalogue: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Deserialize)]
pub struct SkinData {
    pub id: u8,
    pub name: String,
    #[serde(rename = "base_color", default)]
    pub base_color_hex: String,
    #[serde(skip)]
    pub base_color: Option<[u8; 3]>,
    #[serde(default)]
    pub required_level: u32,
    #[serde(default)]
    pub cost: u32,
}

/// All skins grouped by acquisition tier.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SkinCatalog {
    #[serde(default)]
    pub default: Vec<SkinData>,
    #[serde(default)]
    pub veteran: Vec<SkinData>,
    #[serde(default)]
    pub premium: Vec<SkinData>,
}

impl SkinCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<SkinCatalog, SkinError> {
        let data = std::fs::read_to_string(path)?;
        let mut catalog: SkinCatalog = serde_json::from_str(&data)?;
        for skin in catalog.iter_mut() {
            skin.base_color = parse_hex_color(&skin.base_color_hex);
        }
        info!(
            default = catalog.default.len(),
            veteran = catalog.veteran.len(),
            premium = catalog.premium.len(),
            "skin catalogue loaded"
        );
        Ok(catalog)
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut SkinData> {
        self.default
            .iter_mut()
            .chain(self.veteran.iter_mut())
            .chain(self.premium.iter_mut())
    }

    fn iter(&self) -> impl Iterator<Item = &SkinData> {
        self.default
            .iter()
            .chain(self.veteran.iter())
            .chain(self.premium.iter())
    }

    pub fn by_id(&self, id: u8) -> Option<&SkinData> {
        self.iter().find(|s| s.id == id)
    }

    /// Default skins are claimed by playing under their name.
    pub fn default_by_name(&self, name: &str) -> Option<&SkinData> {
        self.default
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

/// `#rrggbb` → RGB. `transparent`, short and malformed strings yield `None`
/// (the caller falls back to the palette).
pub fn parse_hex_color(hex: &str) -> Option<[u8; 3]> {
    if hex.is_empty() || hex == "transparent" {
        return None;
    }
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}

/// Base colors for players whose skin has none.
pub fn fallback_palette() -> Vec<[u8; 3]> {
    const RAW: [&str; 15] = [
        "#60eaff", "#c0d7f6", "#61b0ff", "#ae97f6", "#61ffb0", "#a6ff60", "#a1cd84", "#3fc6a8",
        "#fff070", "#ffb061", "#d88166", "#ff794f", "#ff605f", "#f697b0", "#ff6ef1",
    ];
    RAW.iter()
        .filter_map(|hex| parse_hex_color(hex))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing() {
        assert_eq!(parse_hex_color("#ff0080"), Some([0xff, 0x00, 0x80]));
        assert_eq!(parse_hex_color("00ff00"), Some([0, 255, 0]));
        assert_eq!(parse_hex_color("transparent"), None);
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn palette_has_fifteen_entries() {
        assert_eq!(fallback_palette().len(), 15);
    }

    #[test]
    fn catalogue_lookups() {
        let mut catalog: SkinCatalog = serde_json::from_str(
            r##"{
                "default": [{"id": 0, "name": "Classic", "base_color": "#60eaff"}],
                "veteran": [{"id": 10, "name": "Vanguard", "base_color": "#ff605f", "required_level": 5}],
                "premium": [{"id": 20, "name": "Nebula", "base_color": "transparent", "cost": 500}]
            }"##,
        )
        .unwrap();
        for skin in catalog.iter_mut() {
            skin.base_color = parse_hex_color(&skin.base_color_hex);
        }

        assert!(catalog.default_by_name("classic").is_some());
        assert!(catalog.default_by_name("Vanguard").is_none());
        assert_eq!(catalog.by_id(10).unwrap().required_level, 5);
        // Transparent premium skin falls back to the palette.
        assert!(catalog.by_id(20).unwrap().base_color.is_none());
        assert_eq!(catalog.by_id(0).unwrap().base_color, Some([0x60, 0xea, 0xff]));
    }
}
