use super::{Grade, Recommendation, RiskProfile, SustainabilityScoreSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationYear {
    /// 0-based offset from the first planned season
    pub year: usize,
    pub crop: String,
    pub preceding_crop: Option<String>,
    pub expected_yield: f64,
    pub yield_unit: String,
    /// lbs N/acre credited from a fixing predecessor
    pub nitrogen_credit_lbs: f64,
    /// Gross revenue for the whole field
    pub revenue: f64,
    /// Production cost for the whole field after nitrogen credits
    pub cost: f64,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EconomicSummary {
    pub total_cost: f64,
    pub expected_revenue: f64,
    pub net_return: f64,
    /// Return on investment in percent
    pub roi_percent: f64,
}

impl EconomicSummary {
    pub fn from_years(years: &[RotationYear]) -> Self {
        let total_cost: f64 = years.iter().map(|y| y.cost).sum();
        let expected_revenue: f64 = years.iter().map(|y| y.revenue).sum();
        let net_return = expected_revenue - total_cost;
        let roi_percent = if total_cost > 0.0 {
            net_return / total_cost * 100.0
        } else {
            0.0
        };

        Self {
            total_cost,
            expected_revenue,
            net_return,
            roi_percent,
        }
    }
}

/// A scored rotation. Plans are never edited; a revision is a new plan
/// with a higher version that points back at the plan it supersedes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRotationPlan {
    pub id: String,
    pub version: u32,
    pub supersedes: Option<String>,
    pub field_id: String,
    pub years: Vec<RotationYear>,
    pub sustainability: SustainabilityScoreSet,
    pub risk: RiskProfile,
    pub overall_sustainability_score: f64,
    pub sustainability_grade: Grade,
    pub economics: EconomicSummary,
    pub recommendations: Vec<Recommendation>,
    pub created_at: DateTime<Utc>,
}

impl CropRotationPlan {
    /// Deterministic id derived from the field, crop sequence and version.
    pub fn make_id(field_id: &str, sequence: &[String], version: u32) -> String {
        format!("{}:{}:v{}", field_id, sequence.join("-"), version)
    }

    pub fn sequence(&self) -> Vec<String> {
        self.years.iter().map(|y| y.crop.clone()).collect()
    }

    pub fn horizon(&self) -> usize {
        self.years.len()
    }

    /// Mean of expected yield relative to each crop's base yield, in percent.
    pub fn yield_index(&self, base_yields: &[f64]) -> f64 {
        let ratios: Vec<f64> = self
            .years
            .iter()
            .zip(base_yields)
            .filter(|(_, base)| **base > 0.0)
            .map(|(y, base)| y.expected_yield / base * 100.0)
            .collect();
        if ratios.is_empty() {
            0.0
        } else {
            ratios.iter().sum::<f64>() / ratios.len() as f64
        }
    }
}
