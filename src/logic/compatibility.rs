//! Crop reference data: the immutable catalog every request reads from.
//!
//! A `CompatibilityModel` is built once at start-up (built-in table or a YAML
//! catalog file) and shared behind an `Arc`. Nothing mutates it afterwards.

use crate::error::{Result, RotaplanError};
use crate::models::{
    CompatTarget, CropFamily, CropProfile, Level, NitrogenFixation, PestTag, YieldRange,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const BUILTIN_CATALOG_VERSION: &str = "builtin-2025.1";

#[derive(Debug, Clone, PartialEq)]
pub struct CompatibilityModel {
    version: String,
    crops: BTreeMap<String, CropProfile>,
}

#[derive(Debug, Deserialize, Serialize)]
struct CatalogFile {
    version: String,
    crops: Vec<CropProfile>,
}

impl CompatibilityModel {
    pub fn from_profiles(version: impl Into<String>, profiles: Vec<CropProfile>) -> Result<Self> {
        let mut crops = BTreeMap::new();

        for mut profile in profiles {
            profile.name = profile.name.trim().to_lowercase();
            validate_profile(&profile)?;
            if crops.contains_key(&profile.name) {
                return Err(RotaplanError::Config(format!(
                    "crop '{}' is defined twice in the catalog",
                    profile.name
                )));
            }
            crops.insert(profile.name.clone(), profile);
        }

        if crops.is_empty() {
            return Err(RotaplanError::Config("crop catalog is empty".into()));
        }

        let model = Self {
            version: version.into(),
            crops,
        };

        for crop in model.crops.values() {
            for target in &crop.incompatible_predecessors {
                if let CompatTarget::Crop(name) = target {
                    if !model.crops.contains_key(&name.to_lowercase()) {
                        tracing::warn!(
                            crop = %crop.name,
                            predecessor = %name,
                            "Compatibility rule references a crop missing from the catalog"
                        );
                    }
                }
            }
        }

        Ok(model)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::from_profiles(file.version, file.crops)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RotaplanError::Config(format!("Failed to read crop catalog {:?}: {}", path, e))
        })?;
        let model = Self::from_yaml_str(&content)?;
        tracing::info!(
            version = %model.version,
            crops = model.len(),
            "Loaded crop catalog"
        );
        Ok(model)
    }

    pub fn to_yaml(&self) -> Result<String> {
        let file = CatalogFile {
            version: self.version.clone(),
            crops: self.crops.values().cloned().collect(),
        };
        Ok(serde_yaml::to_string(&file)?)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.crops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crops.is_empty()
    }

    pub fn crop(&self, name: &str) -> Option<&CropProfile> {
        self.crops.get(name).or_else(|| {
            let key = name.trim().to_lowercase();
            self.crops.get(&key)
        })
    }

    pub fn require(&self, name: &str) -> Result<&CropProfile> {
        self.crop(name)
            .ok_or_else(|| RotaplanError::UnknownCrop(name.to_string()))
    }

    /// Looks up every crop of a sequence, failing on the first unknown name.
    pub fn resolve(&self, sequence: &[String]) -> Result<Vec<&CropProfile>> {
        sequence.iter().map(|name| self.require(name)).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.crops.keys().map(String::as_str)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &CropProfile> {
        self.crops.values()
    }

    pub fn family_universe_size(&self) -> usize {
        CropFamily::all().len()
    }

    pub fn builtin() -> Self {
        let crops = builtin_profiles()
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        Self {
            version: BUILTIN_CATALOG_VERSION.to_string(),
            crops,
        }
    }
}

impl Default for CompatibilityModel {
    fn default() -> Self {
        Self::builtin()
    }
}

fn validate_profile(profile: &CropProfile) -> Result<()> {
    let invalid = |msg: &str| -> Result<()> {
        Err(RotaplanError::Config(format!(
            "crop '{}': {}",
            profile.name, msg
        )))
    };

    if profile.name.is_empty() {
        return invalid("name must not be empty");
    }
    if profile.base_yield.low <= 0.0 || profile.base_yield.low > profile.base_yield.high {
        return invalid("base_yield must satisfy 0 < low <= high");
    }
    let fix = &profile.nitrogen_fixation;
    if fix.min_lbs < 0.0 || fix.min_lbs > fix.max_lbs {
        return invalid("nitrogen_fixation must satisfy 0 <= min_lbs <= max_lbs");
    }
    if profile.price_per_unit < 0.0 || profile.cost_per_acre < 0.0 {
        return invalid("price and cost must not be negative");
    }
    if profile.yield_cv < 0.0 {
        return invalid("yield_cv must not be negative");
    }
    if profile.max_consecutive_years == Some(0) {
        return invalid("max_consecutive_years must be at least 1 when set");
    }
    Ok(())
}

struct Traits {
    water: Level,
    carbon: Level,
    organic_matter: Level,
    erosion: Level,
    leaching: Level,
    price_volatility: Level,
    inputs: Level,
}

#[allow(clippy::too_many_arguments)]
fn profile(
    name: &str,
    family: CropFamily,
    nitrogen_fixation: NitrogenFixation,
    base_yield: YieldRange,
    price_per_unit: f64,
    cost_per_acre: f64,
    nitrogen_demand_lbs: f64,
    pests: &[PestTag],
    traits: Traits,
    weather_sensitive: bool,
    yield_cv: f64,
    perennial: bool,
    max_consecutive_years: u32,
    incompatible_predecessors: Vec<CompatTarget>,
) -> CropProfile {
    CropProfile {
        name: name.to_string(),
        family,
        nitrogen_fixation,
        base_yield,
        price_per_unit,
        cost_per_acre,
        nitrogen_demand_lbs,
        pests: pests.to_vec(),
        water_use_efficiency: traits.water,
        carbon_sequestration: traits.carbon,
        organic_matter: traits.organic_matter,
        erosion_hazard: traits.erosion,
        leaching_hazard: traits.leaching,
        price_volatility: traits.price_volatility,
        input_intensity: traits.inputs,
        weather_sensitive,
        yield_cv,
        perennial,
        max_consecutive_years: Some(max_consecutive_years),
        incompatible_predecessors,
    }
}

// Yields, prices and costs are Midwest extension-budget ballparks.
fn builtin_profiles() -> Vec<CropProfile> {
    use CropFamily::*;
    use Level::*;
    use PestTag::*;

    vec![
        profile(
            "corn",
            Poaceae,
            NitrogenFixation::none(),
            YieldRange::new(160.0, 200.0, "bu/acre"),
            4.50,
            550.0,
            180.0,
            &[Rootworm, FungalDisease, WeedPressure],
            Traits {
                water: Medium,
                carbon: Medium,
                organic_matter: Medium,
                erosion: High,
                leaching: High,
                price_volatility: Medium,
                inputs: High,
            },
            true,
            0.15,
            false,
            3,
            vec![],
        ),
        profile(
            "soybean",
            Fabaceae,
            NitrogenFixation::moderate(25.0, 60.0),
            YieldRange::new(45.0, 60.0, "bu/acre"),
            11.50,
            350.0,
            0.0,
            &[Nematode, FungalDisease, Aphid],
            Traits {
                water: High,
                carbon: Low,
                organic_matter: Low,
                erosion: Medium,
                leaching: Low,
                price_volatility: Medium,
                inputs: Low,
            },
            false,
            0.12,
            false,
            2,
            vec![],
        ),
        profile(
            "wheat",
            Poaceae,
            NitrogenFixation::none(),
            YieldRange::new(60.0, 80.0, "bu/acre"),
            6.00,
            300.0,
            100.0,
            &[FungalDisease, Aphid],
            Traits {
                water: High,
                carbon: Medium,
                organic_matter: Medium,
                erosion: Low,
                leaching: Medium,
                price_volatility: High,
                inputs: Medium,
            },
            false,
            0.18,
            false,
            2,
            vec![],
        ),
        profile(
            "oats",
            Poaceae,
            NitrogenFixation::none(),
            YieldRange::new(60.0, 90.0, "bu/acre"),
            3.80,
            220.0,
            60.0,
            &[FungalDisease],
            Traits {
                water: High,
                carbon: Medium,
                organic_matter: Medium,
                erosion: Low,
                leaching: Low,
                price_volatility: Medium,
                inputs: Low,
            },
            false,
            0.20,
            false,
            2,
            vec![],
        ),
        profile(
            "barley",
            Poaceae,
            NitrogenFixation::none(),
            YieldRange::new(60.0, 85.0, "bu/acre"),
            5.00,
            260.0,
            80.0,
            &[FungalDisease, Aphid],
            Traits {
                water: High,
                carbon: Medium,
                organic_matter: Medium,
                erosion: Low,
                leaching: Medium,
                price_volatility: Medium,
                inputs: Medium,
            },
            false,
            0.18,
            false,
            2,
            vec![],
        ),
        profile(
            "sorghum",
            Poaceae,
            NitrogenFixation::none(),
            YieldRange::new(70.0, 100.0, "bu/acre"),
            4.20,
            320.0,
            100.0,
            &[Aphid, WeedPressure],
            Traits {
                water: High,
                carbon: Medium,
                organic_matter: Medium,
                erosion: Medium,
                leaching: Medium,
                price_volatility: Medium,
                inputs: Medium,
            },
            false,
            0.16,
            false,
            3,
            vec![],
        ),
        profile(
            "alfalfa",
            Fabaceae,
            NitrogenFixation::high(100.0, 200.0),
            YieldRange::new(4.0, 6.0, "ton/acre"),
            200.0,
            400.0,
            0.0,
            &[Aphid],
            Traits {
                water: Medium,
                carbon: High,
                organic_matter: High,
                erosion: Low,
                leaching: Low,
                price_volatility: Low,
                inputs: Low,
            },
            false,
            0.12,
            true,
            5,
            vec![],
        ),
        profile(
            "clover",
            Fabaceae,
            NitrogenFixation::high(100.0, 150.0),
            YieldRange::new(2.0, 3.5, "ton/acre"),
            150.0,
            200.0,
            0.0,
            &[],
            Traits {
                water: High,
                carbon: High,
                organic_matter: High,
                erosion: Low,
                leaching: Low,
                price_volatility: Low,
                inputs: Low,
            },
            false,
            0.18,
            true,
            3,
            vec![],
        ),
        profile(
            "peas",
            Fabaceae,
            NitrogenFixation::moderate(30.0, 60.0),
            YieldRange::new(35.0, 50.0, "bu/acre"),
            8.00,
            250.0,
            0.0,
            &[FungalDisease, Aphid],
            Traits {
                water: High,
                carbon: Low,
                organic_matter: Low,
                erosion: Medium,
                leaching: Low,
                price_volatility: Medium,
                inputs: Low,
            },
            true,
            0.22,
            false,
            1,
            vec![CompatTarget::Family(Fabaceae)],
        ),
        profile(
            "canola",
            Brassicaceae,
            NitrogenFixation::none(),
            YieldRange::new(40.0, 55.0, "bu/acre"),
            12.00,
            330.0,
            120.0,
            &[FungalDisease, Aphid],
            Traits {
                water: Medium,
                carbon: Medium,
                organic_matter: Medium,
                erosion: Medium,
                leaching: Medium,
                price_volatility: High,
                inputs: High,
            },
            true,
            0.25,
            false,
            1,
            vec![
                CompatTarget::Family(Brassicaceae),
                CompatTarget::Crop("sunflower".into()),
            ],
        ),
        profile(
            "sunflower",
            Asteraceae,
            NitrogenFixation::none(),
            YieldRange::new(1500.0, 2000.0, "lb/acre"),
            0.25,
            280.0,
            90.0,
            &[FungalDisease, Wireworm],
            Traits {
                water: High,
                carbon: Medium,
                organic_matter: Medium,
                erosion: High,
                leaching: Medium,
                price_volatility: High,
                inputs: Medium,
            },
            true,
            0.24,
            false,
            1,
            vec![CompatTarget::Crop("canola".into())],
        ),
        profile(
            "potato",
            Solanaceae,
            NitrogenFixation::none(),
            YieldRange::new(350.0, 450.0, "cwt/acre"),
            10.00,
            2200.0,
            200.0,
            &[SoilborneDisease, Wireworm, BacterialDisease, Nematode],
            Traits {
                water: Low,
                carbon: Low,
                organic_matter: Low,
                erosion: High,
                leaching: High,
                price_volatility: High,
                inputs: High,
            },
            true,
            0.20,
            false,
            1,
            vec![CompatTarget::Family(Solanaceae)],
        ),
        profile(
            "sugarbeet",
            Amaranthaceae,
            NitrogenFixation::none(),
            YieldRange::new(28.0, 36.0, "ton/acre"),
            45.00,
            1100.0,
            110.0,
            &[Nematode, SoilborneDisease],
            Traits {
                water: Medium,
                carbon: Low,
                organic_matter: Low,
                erosion: High,
                leaching: Medium,
                price_volatility: Medium,
                inputs: High,
            },
            true,
            0.15,
            false,
            1,
            vec![CompatTarget::Family(Amaranthaceae)],
        ),
        profile(
            "buckwheat",
            Polygonaceae,
            NitrogenFixation::none(),
            YieldRange::new(800.0, 1200.0, "lb/acre"),
            0.30,
            150.0,
            20.0,
            &[],
            Traits {
                water: High,
                carbon: Low,
                organic_matter: Medium,
                erosion: Medium,
                leaching: Low,
                price_volatility: High,
                inputs: Low,
            },
            true,
            0.30,
            false,
            1,
            vec![],
        ),
    ]
}
