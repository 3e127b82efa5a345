use serde::{Deserialize, Serialize};

/// Coarse three-step class used for crop traits and field conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "Low",
            Level::Medium => "Medium",
            Level::High => "High",
        }
    }

    /// Fraction used when the trait is desirable (carbon, water efficiency, organic matter).
    pub fn benefit(&self) -> f64 {
        match self {
            Level::Low => 0.35,
            Level::Medium => 0.70,
            Level::High => 1.0,
        }
    }

    /// Fraction used when the trait is a hazard (erosion, leaching, volatility, inputs).
    pub fn hazard(&self) -> f64 {
        match self {
            Level::Low => 0.10,
            Level::Medium => 0.45,
            Level::High => 0.80,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Level::Low),
            "medium" | "moderate" => Some(Level::Medium),
            "high" => Some(Level::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CropFamily {
    Poaceae,
    Fabaceae,
    Brassicaceae,
    Solanaceae,
    Asteraceae,
    Amaranthaceae,
    Cucurbitaceae,
    Polygonaceae,
}

impl CropFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            CropFamily::Poaceae => "Grasses (Poaceae)",
            CropFamily::Fabaceae => "Legumes (Fabaceae)",
            CropFamily::Brassicaceae => "Brassicas (Brassicaceae)",
            CropFamily::Solanaceae => "Nightshades (Solanaceae)",
            CropFamily::Asteraceae => "Composites (Asteraceae)",
            CropFamily::Amaranthaceae => "Beets (Amaranthaceae)",
            CropFamily::Cucurbitaceae => "Cucurbits (Cucurbitaceae)",
            CropFamily::Polygonaceae => "Buckwheats (Polygonaceae)",
        }
    }

    pub fn all() -> &'static [CropFamily] {
        &[
            CropFamily::Poaceae,
            CropFamily::Fabaceae,
            CropFamily::Brassicaceae,
            CropFamily::Solanaceae,
            CropFamily::Asteraceae,
            CropFamily::Amaranthaceae,
            CropFamily::Cucurbitaceae,
            CropFamily::Polygonaceae,
        ]
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "poaceae" | "grass" | "grasses" | "cereal" => Some(CropFamily::Poaceae),
            "fabaceae" | "legume" | "legumes" => Some(CropFamily::Fabaceae),
            "brassicaceae" | "brassica" | "brassicas" => Some(CropFamily::Brassicaceae),
            "solanaceae" | "nightshade" | "nightshades" => Some(CropFamily::Solanaceae),
            "asteraceae" | "composite" => Some(CropFamily::Asteraceae),
            "amaranthaceae" | "beet" => Some(CropFamily::Amaranthaceae),
            "cucurbitaceae" | "cucurbit" | "cucurbits" => Some(CropFamily::Cucurbitaceae),
            "polygonaceae" | "buckwheat" => Some(CropFamily::Polygonaceae),
            _ => None,
        }
    }
}

impl std::fmt::Display for CropFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FixerClass {
    None,
    Moderate,
    High,
}

/// Biological nitrogen fixation of a crop, in lbs N/acre per season.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NitrogenFixation {
    pub class: FixerClass,
    pub min_lbs: f64,
    pub max_lbs: f64,
}

impl NitrogenFixation {
    pub fn none() -> Self {
        Self {
            class: FixerClass::None,
            min_lbs: 0.0,
            max_lbs: 0.0,
        }
    }

    pub fn moderate(min_lbs: f64, max_lbs: f64) -> Self {
        Self {
            class: FixerClass::Moderate,
            min_lbs,
            max_lbs,
        }
    }

    pub fn high(min_lbs: f64, max_lbs: f64) -> Self {
        Self {
            class: FixerClass::High,
            min_lbs,
            max_lbs,
        }
    }

    pub fn is_fixer(&self) -> bool {
        self.class != FixerClass::None && self.max_lbs > 0.0
    }

    pub fn midpoint(&self) -> f64 {
        (self.min_lbs + self.max_lbs) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldRange {
    pub low: f64,
    pub high: f64,
    pub unit: String,
}

impl YieldRange {
    pub fn new(low: f64, high: f64, unit: &str) -> Self {
        Self {
            low,
            high,
            unit: unit.to_string(),
        }
    }

    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }
}

/// Pest and disease pressure carried by a crop. Shared tags between
/// consecutive years mean the pressure is carried over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PestTag {
    Rootworm,
    Nematode,
    FungalDisease,
    BacterialDisease,
    SoilborneDisease,
    Aphid,
    Wireworm,
    WeedPressure,
}

impl PestTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PestTag::Rootworm => "Rootworm",
            PestTag::Nematode => "Nematode",
            PestTag::FungalDisease => "Fungal Disease",
            PestTag::BacterialDisease => "Bacterial Disease",
            PestTag::SoilborneDisease => "Soilborne Disease",
            PestTag::Aphid => "Aphid",
            PestTag::Wireworm => "Wireworm",
            PestTag::WeedPressure => "Weed Pressure",
        }
    }
}

impl std::fmt::Display for PestTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target of a compatibility rule: either a single crop or a whole family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatTarget {
    Crop(String),
    Family(CropFamily),
}

impl CompatTarget {
    pub fn matches(&self, crop: &CropProfile) -> bool {
        match self {
            CompatTarget::Crop(name) => name.eq_ignore_ascii_case(&crop.name),
            CompatTarget::Family(family) => *family == crop.family,
        }
    }
}

impl std::fmt::Display for CompatTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompatTarget::Crop(name) => write!(f, "{}", name),
            CompatTarget::Family(family) => write!(f, "{}", family),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropProfile {
    pub name: String,
    pub family: CropFamily,
    pub nitrogen_fixation: NitrogenFixation,
    pub base_yield: YieldRange,
    /// Price per yield unit in USD
    pub price_per_unit: f64,
    /// Production cost in USD/acre before nitrogen credits
    pub cost_per_acre: f64,
    /// Fertilizer nitrogen demand in lbs N/acre
    pub nitrogen_demand_lbs: f64,
    #[serde(default)]
    pub pests: Vec<PestTag>,
    pub water_use_efficiency: Level,
    pub carbon_sequestration: Level,
    pub organic_matter: Level,
    pub erosion_hazard: Level,
    pub leaching_hazard: Level,
    pub price_volatility: Level,
    pub input_intensity: Level,
    #[serde(default)]
    pub weather_sensitive: bool,
    /// Default coefficient of variation of yield
    pub yield_cv: f64,
    #[serde(default)]
    pub perennial: bool,
    /// Agronomic limit on consecutive years of this crop
    #[serde(default)]
    pub max_consecutive_years: Option<u32>,
    #[serde(default)]
    pub incompatible_predecessors: Vec<CompatTarget>,
}

impl CropProfile {
    pub fn is_fixer(&self) -> bool {
        self.nitrogen_fixation.is_fixer()
    }

    /// True if `previous` may not be grown immediately before this crop.
    pub fn rejects_predecessor(&self, previous: &CropProfile) -> Option<&CompatTarget> {
        self.incompatible_predecessors
            .iter()
            .find(|target| target.matches(previous))
    }

    pub fn shared_pests(&self, other: &CropProfile) -> usize {
        self.pests.iter().filter(|p| other.pests.contains(p)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_from_str_valid() {
        assert_eq!(Level::from_str("low"), Some(Level::Low));
        assert_eq!(Level::from_str("Moderate"), Some(Level::Medium));
        assert_eq!(Level::from_str("HIGH"), Some(Level::High));
        assert_eq!(Level::from_str("extreme"), None);
    }

    #[test]
    fn level_fractions_are_ordered() {
        assert!(Level::Low.benefit() < Level::Medium.benefit());
        assert!(Level::Medium.benefit() < Level::High.benefit());
        assert!(Level::Low.hazard() < Level::Medium.hazard());
        assert!(Level::Medium.hazard() < Level::High.hazard());
    }

    #[test]
    fn crop_family_round_trip() {
        for family in CropFamily::all() {
            let debug_str = format!("{:?}", family);
            assert_eq!(
                CropFamily::from_str(&debug_str),
                Some(*family),
                "Round-trip failed for {:?}",
                family
            );
        }
    }

    #[test]
    fn nitrogen_fixation_midpoint() {
        assert!((NitrogenFixation::moderate(25.0, 60.0).midpoint() - 42.5).abs() < 0.001);
        assert!((NitrogenFixation::high(100.0, 200.0).midpoint() - 150.0).abs() < 0.001);
        assert!(!NitrogenFixation::none().is_fixer());
        assert!(NitrogenFixation::moderate(25.0, 60.0).is_fixer());
    }

    #[test]
    fn compat_target_matches_crop_and_family() {
        let model = crate::logic::CompatibilityModel::builtin();
        let canola = model.crop("canola").unwrap();
        let soybean = model.crop("soybean").unwrap();

        assert!(CompatTarget::Crop("Canola".into()).matches(canola));
        assert!(CompatTarget::Family(CropFamily::Fabaceae).matches(soybean));
        assert!(!CompatTarget::Family(CropFamily::Fabaceae).matches(canola));
    }
}
