use super::Level;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SoilTexture {
    Clay,
    ClayLoam,
    Loam,
    SiltLoam,
    SandyLoam,
    Sandy,
    #[default]
    Unknown,
}

impl SoilTexture {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoilTexture::Clay => "Clay",
            SoilTexture::ClayLoam => "Clay Loam",
            SoilTexture::Loam => "Loam",
            SoilTexture::SiltLoam => "Silt Loam",
            SoilTexture::SandyLoam => "Sandy Loam",
            SoilTexture::Sandy => "Sandy",
            SoilTexture::Unknown => "Unknown",
        }
    }

    /// Multiplicative yield adjustment relative to a loam reference.
    pub fn yield_factor(&self) -> f64 {
        match self {
            SoilTexture::Clay => 0.90,
            SoilTexture::ClayLoam => 0.97,
            SoilTexture::Loam => 1.0,
            SoilTexture::SiltLoam => 1.05,
            SoilTexture::SandyLoam => 0.92,
            SoilTexture::Sandy => 0.85,
            SoilTexture::Unknown => 1.0,
        }
    }

    /// Multiplier on nitrate leaching hazard; coarse soils drain faster.
    pub fn leaching_factor(&self) -> f64 {
        match self {
            SoilTexture::Clay => 0.8,
            SoilTexture::ClayLoam => 0.9,
            SoilTexture::Loam | SoilTexture::SiltLoam | SoilTexture::Unknown => 1.0,
            SoilTexture::SandyLoam => 1.2,
            SoilTexture::Sandy => 1.4,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_'], " ").as_str() {
            "clay" => Some(SoilTexture::Clay),
            "clayloam" | "clay loam" => Some(SoilTexture::ClayLoam),
            "loam" => Some(SoilTexture::Loam),
            "siltloam" | "silt loam" => Some(SoilTexture::SiltLoam),
            "sandyloam" | "sandy loam" => Some(SoilTexture::SandyLoam),
            "sandy" | "sand" => Some(SoilTexture::Sandy),
            "unknown" => Some(SoilTexture::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for SoilTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DrainageClass {
    WellDrained,
    ModeratelyWell,
    SomewhatPoor,
    Poor,
    Excessive,
    #[default]
    Unknown,
}

impl DrainageClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrainageClass::WellDrained => "Well Drained",
            DrainageClass::ModeratelyWell => "Moderately Well Drained",
            DrainageClass::SomewhatPoor => "Somewhat Poorly Drained",
            DrainageClass::Poor => "Poorly Drained",
            DrainageClass::Excessive => "Excessively Drained",
            DrainageClass::Unknown => "Unknown",
        }
    }

    pub fn yield_factor(&self) -> f64 {
        match self {
            DrainageClass::WellDrained => 1.0,
            DrainageClass::ModeratelyWell => 0.97,
            DrainageClass::SomewhatPoor => 0.92,
            DrainageClass::Poor => 0.85,
            DrainageClass::Excessive => 0.90,
            DrainageClass::Unknown => 1.0,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "welldrained" | "well" => Some(DrainageClass::WellDrained),
            "moderatelywell" | "moderatelywelldrained" => Some(DrainageClass::ModeratelyWell),
            "somewhatpoor" | "somewhatpoorlydrained" => Some(DrainageClass::SomewhatPoor),
            "poor" | "poorlydrained" => Some(DrainageClass::Poor),
            "excessive" | "excessivelydrained" => Some(DrainageClass::Excessive),
            "unknown" => Some(DrainageClass::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for DrainageClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClimateZone {
    Tropical,
    Subtropical,
    Arid,
    SemiArid,
    Temperate,
    Continental,
    Boreal,
}

impl ClimateZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClimateZone::Tropical => "Tropical",
            ClimateZone::Subtropical => "Subtropical",
            ClimateZone::Arid => "Arid",
            ClimateZone::SemiArid => "Semi-Arid",
            ClimateZone::Temperate => "Temperate",
            ClimateZone::Continental => "Continental",
            ClimateZone::Boreal => "Boreal",
        }
    }

    /// Typical season-to-season weather volatility for the zone.
    pub fn volatility(&self) -> Level {
        match self {
            ClimateZone::Temperate | ClimateZone::Subtropical => Level::Low,
            ClimateZone::Tropical | ClimateZone::Continental => Level::Medium,
            ClimateZone::Arid | ClimateZone::SemiArid | ClimateZone::Boreal => Level::High,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "tropical" => Some(ClimateZone::Tropical),
            "subtropical" => Some(ClimateZone::Subtropical),
            "arid" => Some(ClimateZone::Arid),
            "semiarid" => Some(ClimateZone::SemiArid),
            "temperate" => Some(ClimateZone::Temperate),
            "continental" => Some(ClimateZone::Continental),
            "boreal" => Some(ClimateZone::Boreal),
            _ => None,
        }
    }
}

impl std::fmt::Display for ClimateZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub year: i32,
    pub crop: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldProfile {
    pub field_id: String,
    #[serde(default)]
    pub name: String,
    pub acreage: f64,
    #[serde(default)]
    pub soil_texture: SoilTexture,
    #[serde(default)]
    pub drainage: DrainageClass,
    #[serde(default)]
    pub slope_percent: f64,
    /// Baseline soil-health index, 0-100
    #[serde(default = "default_soil_health_index")]
    pub soil_health_index: f64,
    pub climate_zone: ClimateZone,
    #[serde(default)]
    pub climate_volatility: Option<Level>,
    /// Prior crops, oldest first
    #[serde(default)]
    pub crop_history: Vec<HistoryEntry>,
}

fn default_soil_health_index() -> f64 {
    50.0
}

impl FieldProfile {
    pub fn new(field_id: impl Into<String>, acreage: f64, climate_zone: ClimateZone) -> Self {
        let field_id = field_id.into();
        Self {
            name: field_id.clone(),
            field_id,
            acreage,
            soil_texture: SoilTexture::Unknown,
            drainage: DrainageClass::Unknown,
            slope_percent: 0.0,
            soil_health_index: default_soil_health_index(),
            climate_zone,
            climate_volatility: None,
            crop_history: Vec::new(),
        }
    }

    pub fn with_soil(mut self, texture: SoilTexture, drainage: DrainageClass) -> Self {
        self.soil_texture = texture;
        self.drainage = drainage;
        self
    }

    pub fn with_slope(mut self, slope_percent: f64) -> Self {
        self.slope_percent = slope_percent;
        self
    }

    pub fn with_soil_health(mut self, index: f64) -> Self {
        self.soil_health_index = index;
        self
    }

    pub fn with_history(mut self, year: i32, crop: &str) -> Self {
        self.crop_history.push(HistoryEntry {
            year,
            crop: crop.to_string(),
        });
        self.crop_history.sort_by_key(|h| h.year);
        self
    }

    /// Effective weather volatility: explicit override, else the zone default.
    pub fn weather_volatility(&self) -> Level {
        self.climate_volatility
            .unwrap_or_else(|| self.climate_zone.volatility())
    }

    pub fn last_crop(&self) -> Option<&str> {
        self.crop_history.last().map(|h| h.crop.as_str())
    }
}

/// Caller-supplied field measurements that take precedence over the stored
/// profile for a single risk assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldCharacteristics {
    pub climate_volatility: Option<Level>,
    pub slope_percent: Option<f64>,
    pub soil_health_index: Option<f64>,
    pub soil_texture: Option<SoilTexture>,
    pub drainage: Option<DrainageClass>,
    /// Observed coefficient of variation of past yields on this field
    pub historical_yield_cv: Option<f64>,
}

impl FieldCharacteristics {
    pub fn apply_to(&self, field: &FieldProfile) -> FieldProfile {
        let mut merged = field.clone();
        if let Some(volatility) = self.climate_volatility {
            merged.climate_volatility = Some(volatility);
        }
        if let Some(slope) = self.slope_percent {
            merged.slope_percent = slope;
        }
        if let Some(index) = self.soil_health_index {
            merged.soil_health_index = index;
        }
        if let Some(texture) = self.soil_texture {
            merged.soil_texture = texture;
        }
        if let Some(drainage) = self.drainage {
            merged.drainage = drainage;
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soil_texture_from_str_valid() {
        assert_eq!(SoilTexture::from_str("loam"), Some(SoilTexture::Loam));
        assert_eq!(SoilTexture::from_str("Silt Loam"), Some(SoilTexture::SiltLoam));
        assert_eq!(SoilTexture::from_str("SiltLoam"), Some(SoilTexture::SiltLoam));
        assert_eq!(SoilTexture::from_str("sandy_loam"), Some(SoilTexture::SandyLoam));
        assert_eq!(SoilTexture::from_str("CLAY"), Some(SoilTexture::Clay));
    }

    #[test]
    fn soil_texture_from_str_invalid() {
        assert_eq!(SoilTexture::from_str("dirt"), None);
        assert_eq!(SoilTexture::from_str(""), None);
    }

    #[test]
    fn unknown_texture_and_drainage_are_neutral() {
        assert!((SoilTexture::Unknown.yield_factor() - 1.0).abs() < f64::EPSILON);
        assert!((DrainageClass::Unknown.yield_factor() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn drainage_from_str_valid() {
        assert_eq!(
            DrainageClass::from_str("well-drained"),
            Some(DrainageClass::WellDrained)
        );
        assert_eq!(
            DrainageClass::from_str("Somewhat Poorly Drained"),
            Some(DrainageClass::SomewhatPoor)
        );
        assert_eq!(DrainageClass::from_str("swampy"), None);
    }

    #[test]
    fn climate_zone_round_trip() {
        for zone in [
            ClimateZone::Tropical,
            ClimateZone::Subtropical,
            ClimateZone::Arid,
            ClimateZone::SemiArid,
            ClimateZone::Temperate,
            ClimateZone::Continental,
            ClimateZone::Boreal,
        ] {
            let debug_str = format!("{:?}", zone);
            assert_eq!(
                ClimateZone::from_str(&debug_str),
                Some(zone),
                "Round-trip failed for {:?}",
                zone
            );
        }
    }

    #[test]
    fn volatility_override_wins() {
        let mut field = FieldProfile::new("f1", 40.0, ClimateZone::Temperate);
        assert_eq!(field.weather_volatility(), Level::Low);
        field.climate_volatility = Some(Level::High);
        assert_eq!(field.weather_volatility(), Level::High);
    }

    #[test]
    fn history_is_kept_in_year_order() {
        let field = FieldProfile::new("f1", 40.0, ClimateZone::Temperate)
            .with_history(2023, "soybean")
            .with_history(2022, "corn");
        assert_eq!(field.crop_history[0].crop, "corn");
        assert_eq!(field.last_crop(), Some("soybean"));
    }

    #[test]
    fn field_profile_from_yaml_uses_defaults() {
        let yaml = r#"
field_id: north-40
acreage: 40
climate_zone: Temperate
soil_texture: Loam
"#;
        let field: FieldProfile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(field.field_id, "north-40");
        assert_eq!(field.drainage, DrainageClass::Unknown);
        assert!((field.soil_health_index - 50.0).abs() < f64::EPSILON);
        assert!(field.crop_history.is_empty());
    }

    #[test]
    fn characteristics_override_only_given_values() {
        let field = FieldProfile::new("f1", 40.0, ClimateZone::Temperate)
            .with_soil(SoilTexture::Loam, DrainageClass::WellDrained)
            .with_slope(2.0);
        let overrides = FieldCharacteristics {
            climate_volatility: Some(Level::High),
            slope_percent: Some(12.0),
            ..Default::default()
        };
        let merged = overrides.apply_to(&field);
        assert_eq!(merged.weather_volatility(), Level::High);
        assert!((merged.slope_percent - 12.0).abs() < f64::EPSILON);
        assert_eq!(merged.soil_texture, SoilTexture::Loam);
        assert_eq!(merged.drainage, DrainageClass::WellDrained);
    }
}
