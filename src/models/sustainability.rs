use crate::config::GradeThresholds;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SustainabilityDimension {
    EnvironmentalImpact,
    SoilHealth,
    CarbonSequestration,
    WaterEfficiency,
    Biodiversity,
    LongTermViability,
}

impl SustainabilityDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            SustainabilityDimension::EnvironmentalImpact => "Environmental Impact",
            SustainabilityDimension::SoilHealth => "Soil Health",
            SustainabilityDimension::CarbonSequestration => "Carbon Sequestration",
            SustainabilityDimension::WaterEfficiency => "Water Efficiency",
            SustainabilityDimension::Biodiversity => "Biodiversity",
            SustainabilityDimension::LongTermViability => "Long-Term Viability",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            SustainabilityDimension::EnvironmentalImpact => "environmental_impact",
            SustainabilityDimension::SoilHealth => "soil_health",
            SustainabilityDimension::CarbonSequestration => "carbon_sequestration",
            SustainabilityDimension::WaterEfficiency => "water_efficiency",
            SustainabilityDimension::Biodiversity => "biodiversity",
            SustainabilityDimension::LongTermViability => "long_term_viability",
        }
    }

    pub fn all() -> &'static [SustainabilityDimension] {
        &[
            SustainabilityDimension::EnvironmentalImpact,
            SustainabilityDimension::SoilHealth,
            SustainabilityDimension::CarbonSequestration,
            SustainabilityDimension::WaterEfficiency,
            SustainabilityDimension::Biodiversity,
            SustainabilityDimension::LongTermViability,
        ]
    }
}

impl std::fmt::Display for SustainabilityDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: f64, thresholds: &GradeThresholds) -> Self {
        if score >= thresholds.a {
            Grade::A
        } else if score >= thresholds.b {
            Grade::B
        } else if score >= thresholds.c {
            Grade::C
        } else if score >= thresholds.d {
            Grade::D
        } else {
            Grade::F
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The six sustainability sub-scores, each 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SustainabilityScores {
    pub environmental_impact: f64,
    pub soil_health: f64,
    pub carbon_sequestration: f64,
    pub water_efficiency: f64,
    pub biodiversity: f64,
    pub long_term_viability: f64,
}

impl SustainabilityScores {
    pub fn get(&self, dimension: SustainabilityDimension) -> f64 {
        match dimension {
            SustainabilityDimension::EnvironmentalImpact => self.environmental_impact,
            SustainabilityDimension::SoilHealth => self.soil_health,
            SustainabilityDimension::CarbonSequestration => self.carbon_sequestration,
            SustainabilityDimension::WaterEfficiency => self.water_efficiency,
            SustainabilityDimension::Biodiversity => self.biodiversity,
            SustainabilityDimension::LongTermViability => self.long_term_viability,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SustainabilityDimension, f64)> + '_ {
        SustainabilityDimension::all()
            .iter()
            .map(move |d| (*d, self.get(*d)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDetails {
    /// Shannon index over crop families
    pub diversity_index: f64,
    /// lbs N/acre fixed over the whole rotation
    pub total_nitrogen_fixed: f64,
    pub unique_crops_count: usize,
    pub family_count: usize,
    pub has_nitrogen_fixer: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SustainabilityScoreSet {
    pub scores: SustainabilityScores,
    pub overall: f64,
    pub grade: Grade,
    pub analysis_details: AnalysisDetails,
    /// Soil-health proxy per year; never decreases
    pub soil_health_trajectory: Vec<f64>,
}
