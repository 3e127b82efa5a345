use crate::config::RiskThresholds;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Weather,
    Market,
    PestDisease,
    SoilHealth,
    YieldVariability,
    Economic,
}

impl RiskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Weather => "Weather/Climate",
            RiskCategory::Market => "Market Volatility",
            RiskCategory::PestDisease => "Pest/Disease",
            RiskCategory::SoilHealth => "Soil Health",
            RiskCategory::YieldVariability => "Yield Variability",
            RiskCategory::Economic => "Economic",
        }
    }

    pub fn all() -> &'static [RiskCategory] {
        &[
            RiskCategory::Weather,
            RiskCategory::Market,
            RiskCategory::PestDisease,
            RiskCategory::SoilHealth,
            RiskCategory::YieldVariability,
            RiskCategory::Economic,
        ]
    }

    /// Fixed mitigation catalog, one entry per category.
    pub fn mitigation(&self) -> &'static str {
        match self {
            RiskCategory::Weather => {
                "Diversify planting dates, favor drought- and flood-tolerant varieties, \
                 and carry crop insurance for weather-sensitive years."
            }
            RiskCategory::Market => {
                "Spread sales with forward contracts or hedging and avoid concentrating \
                 the rotation on a single price-volatile commodity."
            }
            RiskCategory::PestDisease => {
                "Break pest and disease cycles by alternating crop families, scout \
                 regularly, and use resistant varieties or integrated pest management."
            }
            RiskCategory::SoilHealth => {
                "Add cover crops, reduce tillage, and include a legume or perennial \
                 year to rebuild organic matter."
            }
            RiskCategory::YieldVariability => {
                "Stabilize yields with soil moisture management, proven hybrids for the \
                 zone, and revenue protection insurance."
            }
            RiskCategory::Economic => {
                "Lower input exposure by using nitrogen credits from legumes, soil-test \
                 based fertility, and pre-purchasing fertilizer."
            }
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Classifies the worst category score; first matching threshold wins.
    pub fn from_max_score(max_score: f64, thresholds: &RiskThresholds) -> Self {
        if max_score >= thresholds.critical {
            RiskLevel::Critical
        } else if max_score >= thresholds.high {
            RiskLevel::High
        } else if max_score >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The six risk category scores, each 0-100 (higher is riskier).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskScores {
    pub weather: f64,
    pub market: f64,
    pub pest_disease: f64,
    pub soil_health: f64,
    pub yield_variability: f64,
    pub economic: f64,
}

impl RiskScores {
    pub fn get(&self, category: RiskCategory) -> f64 {
        match category {
            RiskCategory::Weather => self.weather,
            RiskCategory::Market => self.market,
            RiskCategory::PestDisease => self.pest_disease,
            RiskCategory::SoilHealth => self.soil_health,
            RiskCategory::YieldVariability => self.yield_variability,
            RiskCategory::Economic => self.economic,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (RiskCategory, f64)> + '_ {
        RiskCategory::all().iter().map(move |c| (*c, self.get(*c)))
    }

    pub fn max(&self) -> f64 {
        self.iter().map(|(_, v)| v).fold(0.0, f64::max)
    }

    /// Sum of all categories, used as a tie-breaker between plans.
    pub fn aggregate(&self) -> f64 {
        self.iter().map(|(_, v)| v).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskTimelineEntry {
    pub year: usize,
    pub crop: String,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub primary_risk: RiskCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub scores: RiskScores,
    pub risk_level: RiskLevel,
    pub mitigation_strategies: Vec<String>,
    pub risk_timeline: Vec<RiskTimelineEntry>,
}
