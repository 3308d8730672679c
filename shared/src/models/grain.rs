//! Grain types traded on settlements

use serde::{Deserialize, Serialize};

/// Grain type selecting the rule table and base humidity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrainType {
    Wheat,
    Corn,
    Soybean,
    Sorghum,
    Sunflower,
}

impl GrainType {
    pub const ALL: [GrainType; 5] = [
        GrainType::Wheat,
        GrainType::Corn,
        GrainType::Soybean,
        GrainType::Sorghum,
        GrainType::Sunflower,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GrainType::Wheat => "WHEAT",
            GrainType::Corn => "CORN",
            GrainType::Soybean => "SOYBEAN",
            GrainType::Sorghum => "SORGHUM",
            GrainType::Sunflower => "SUNFLOWER",
        }
    }

    /// Parse a raw grain name as written on a settlement document.
    ///
    /// Accepts the English names and the Spanish trade names printed on
    /// Argentine liquidations (`TRIGO`, `MAIZ`, `SOJA`, `SORGO`, `GIRASOL`).
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_grain_name(raw).as_str() {
            "WHEAT" | "TRIGO" | "TRIGO PAN" => Some(GrainType::Wheat),
            "CORN" | "MAIZE" | "MAIZ" | "MAÍZ" | "MAíZ" => Some(GrainType::Corn),
            "SOYBEAN" | "SOYBEANS" | "SOY" | "SOJA" => Some(GrainType::Soybean),
            "SORGHUM" | "SORGO" => Some(GrainType::Sorghum),
            "SUNFLOWER" | "GIRASOL" => Some(GrainType::Sunflower),
            _ => None,
        }
    }
}

impl std::fmt::Display for GrainType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trim, collapse inner whitespace and uppercase using ASCII rules only.
///
/// ASCII folding keeps the result independent of the process locale
/// (no Turkish dotless-i surprises).
pub fn normalize_grain_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}
