use crate::error::{Result, RotaplanError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub yields: YieldConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// YAML crop catalog replacing the built-in one
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
}

/// Weights of the six sustainability sub-scores in the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub environmental_impact: f64,
    pub soil_health: f64,
    pub carbon_sequestration: f64,
    pub water_efficiency: f64,
    pub biodiversity: f64,
    pub long_term_viability: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            environmental_impact: 0.20,
            soil_health: 0.20,
            carbon_sequestration: 0.15,
            water_efficiency: 0.15,
            biodiversity: 0.15,
            long_term_viability: 0.15,
        }
    }
}

impl ScoringWeights {
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.environmental_impact,
            self.soil_health,
            self.carbon_sequestration,
            self.water_efficiency,
            self.biodiversity,
            self.long_term_viability,
        ]
    }

    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GradeThresholds {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            a: 90.0,
            b: 80.0,
            c: 70.0,
            d: 60.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub grade_thresholds: GradeThresholds,
    /// Sub-scores below this get an improvement recommendation
    pub recommendation_threshold: f64,
    /// lbs N/acre per year that counts as full nitrogen contribution
    pub reference_nitrogen_lbs_per_year: f64,
    /// Biodiversity credited to a single-crop perennial stand
    pub perennial_stand_biodiversity: f64,
    /// Share of economic balance in long-term viability (rest is soil trajectory)
    pub viability_economic_weight: f64,
    /// Soil-health index points gained per year at full contribution
    pub trajectory_gain_per_year: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            grade_thresholds: GradeThresholds::default(),
            recommendation_threshold: 70.0,
            reference_nitrogen_lbs_per_year: 150.0,
            perennial_stand_biodiversity: 40.0,
            viability_economic_weight: 0.5,
            trajectory_gain_per_year: 12.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 50.0,
            high: 70.0,
            critical: 85.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RiskConfig {
    pub thresholds: RiskThresholds,
    /// Yield coefficient of variation that maps to a risk of 100
    pub yield_cv_ceiling: f64,
    /// Purchased lbs N/acre per year that maps to full nitrogen exposure
    pub reference_purchased_nitrogen_lbs: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            thresholds: RiskThresholds::default(),
            yield_cv_ceiling: 0.40,
            reference_purchased_nitrogen_lbs: 200.0,
        }
    }
}

/// Percentage yield boost band for a class of nitrogen fixer.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct BoostBand {
    pub min: f64,
    pub max: f64,
}

impl BoostBand {
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct YieldConfig {
    pub moderate_fixer_boost: BoostBand,
    pub high_fixer_boost: BoostBand,
    /// Yield loss when a non-perennial crop follows itself
    pub continuous_cropping_penalty: f64,
    /// USD per lb of fertilizer nitrogen
    pub nitrogen_price_per_lb: f64,
    /// Treat the last crop in field history as the year-0 predecessor
    pub carry_over_history: bool,
}

impl Default for YieldConfig {
    fn default() -> Self {
        Self {
            moderate_fixer_boost: BoostBand {
                min: 0.05,
                max: 0.15,
            },
            high_fixer_boost: BoostBand {
                min: 0.10,
                max: 0.25,
            },
            continuous_cropping_penalty: 0.10,
            nitrogen_price_per_lb: 0.60,
            carry_over_history: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum partial sequences expanded per search
    pub max_nodes: usize,
    /// Wall-clock limit for a search in milliseconds
    pub deadline_ms: Option<u64>,
    pub top_n: usize,
    /// Explore first-year branches on the rayon pool
    pub parallel: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_nodes: 250_000,
            deadline_ms: None,
            top_n: 1,
            parallel: true,
        }
    }
}

impl Config {
    pub fn load(config_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_override {
            Some(p) => {
                if !p.exists() {
                    return Err(RotaplanError::Config(format!(
                        "Config file not found at {:?}",
                        p
                    )));
                }
                Some(p)
            }
            None => Self::find_config_path(),
        };

        let Some(config_path) = config_path else {
            tracing::info!("No config file found, using built-in defaults");
            return Ok(Self::default());
        };

        tracing::debug!(path = %config_path.display(), "Loading configuration");
        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| RotaplanError::Config(format!("Failed to read config: {}", e)))?;

        Self::from_yaml_str(&Self::substitute_env_vars(&config_str))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| RotaplanError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Search for config.yaml in standard locations.
    fn find_config_path() -> Option<PathBuf> {
        let local_config = PathBuf::from("config/config.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir()
            .map(|dir| dir.join("rotaplan").join("config.yaml"))
            .filter(|p| p.exists())
    }

    pub fn validate(&self) -> Result<()> {
        let weights = self.scoring.weights;
        if weights.as_array().iter().any(|w| *w < 0.0) {
            return Err(RotaplanError::Config(
                "scoring weights must not be negative".into(),
            ));
        }
        if (weights.total() - 1.0).abs() > 1e-6 {
            return Err(RotaplanError::Config(format!(
                "scoring weights must sum to 1.0 (got {:.4})",
                weights.total()
            )));
        }

        let g = self.scoring.grade_thresholds;
        if !(g.a > g.b && g.b > g.c && g.c > g.d) {
            return Err(RotaplanError::Config(
                "grade thresholds must be strictly descending (a > b > c > d)".into(),
            ));
        }

        let r = self.risk.thresholds;
        if !(r.medium < r.high && r.high < r.critical) {
            return Err(RotaplanError::Config(
                "risk thresholds must be strictly ascending (medium < high < critical)".into(),
            ));
        }

        for (name, band) in [
            ("moderate_fixer_boost", self.yields.moderate_fixer_boost),
            ("high_fixer_boost", self.yields.high_fixer_boost),
        ] {
            if band.min < 0.0 || band.min > band.max {
                return Err(RotaplanError::Config(format!(
                    "{} must satisfy 0 <= min <= max",
                    name
                )));
            }
        }

        if !(0.0..1.0).contains(&self.yields.continuous_cropping_penalty) {
            return Err(RotaplanError::Config(
                "continuous_cropping_penalty must be in [0, 1)".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.scoring.viability_economic_weight) {
            return Err(RotaplanError::Config(
                "viability_economic_weight must be in [0, 1]".into(),
            ));
        }

        if self.scoring.reference_nitrogen_lbs_per_year <= 0.0
            || self.risk.yield_cv_ceiling <= 0.0
            || self.risk.reference_purchased_nitrogen_lbs <= 0.0
        {
            return Err(RotaplanError::Config(
                "reference values must be positive".into(),
            ));
        }

        if self.search.top_n == 0 || self.search.max_nodes == 0 {
            return Err(RotaplanError::Config(
                "search.top_n and search.max_nodes must be at least 1".into(),
            ));
        }

        Ok(())
    }

    fn substitute_env_vars(content: &str) -> String {
        let mut result = content.to_string();

        // Find all ${VAR_NAME} patterns and substitute
        let re = match regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}") {
            Ok(re) => re,
            Err(_) => return result,
        };

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];
            if let Ok(value) = std::env::var(var_name) {
                result = result.replace(placeholder, &value);
            }
        }

        result
    }

    pub fn data_dir(&self, data_dir_override: Option<&Path>) -> Result<PathBuf> {
        // CLI override takes priority
        if let Some(dir) = data_dir_override {
            std::fs::create_dir_all(dir)?;
            return Ok(dir.to_path_buf());
        }

        // Then check env var
        if let Ok(dir) = std::env::var("ROTAPLAN_DATA_DIR") {
            let p = PathBuf::from(dir);
            std::fs::create_dir_all(&p)?;
            return Ok(p);
        }

        if let Some(dir) = &self.storage.data_dir {
            std::fs::create_dir_all(dir)?;
            return Ok(dir.clone());
        }

        // Use XDG data directory
        let data_dir = dirs::data_dir()
            .ok_or_else(|| RotaplanError::Config("Cannot determine data directory".into()))?
            .join("rotaplan");

        std::fs::create_dir_all(&data_dir)?;
        Ok(data_dir)
    }

    pub fn db_path(&self, data_dir_override: Option<&Path>) -> Result<PathBuf> {
        Ok(self.data_dir(data_dir_override)?.join("rotaplan.db"))
    }
}
