use super::CompatibilityModel;
use crate::error::{Result, RotaplanError};
use crate::models::{CropRotationPlan, RiskCategory, SustainabilityDimension};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub metric: String,
    pub higher_is_better: bool,
    /// One value per plan, in input order
    pub values: Vec<f64>,
    /// Difference from the first plan's value
    pub deltas: Vec<f64>,
}

impl MetricRow {
    fn new(metric: impl Into<String>, higher_is_better: bool, values: Vec<f64>) -> Self {
        let baseline = values.first().copied().unwrap_or(0.0);
        let deltas = values.iter().map(|v| v - baseline).collect();
        Self {
            metric: metric.into(),
            higher_is_better,
            values,
            deltas,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanComparison {
    pub plan_ids: Vec<String>,
    pub rows: Vec<MetricRow>,
    pub recommended_plan_id: String,
    pub rationale: String,
}

impl PlanComparison {
    pub fn row(&self, metric: &str) -> Option<&MetricRow> {
        self.rows.iter().find(|r| r.metric == metric)
    }
}

pub struct PlanComparator<'a> {
    model: &'a CompatibilityModel,
}

impl<'a> PlanComparator<'a> {
    pub fn new(model: &'a CompatibilityModel) -> Self {
        Self { model }
    }

    pub fn compare(&self, plans: &[CropRotationPlan]) -> Result<PlanComparison> {
        if plans.len() < 2 {
            return Err(RotaplanError::InvalidInput(format!(
                "comparison needs at least two plans, got {}",
                plans.len()
            )));
        }

        let mut rows = Vec::new();
        for dimension in SustainabilityDimension::all() {
            rows.push(MetricRow::new(
                dimension.key(),
                true,
                plans
                    .iter()
                    .map(|p| p.sustainability.scores.get(*dimension))
                    .collect(),
            ));
        }
        rows.push(MetricRow::new(
            "overall_sustainability",
            true,
            plans.iter().map(|p| p.overall_sustainability_score).collect(),
        ));
        for category in RiskCategory::all() {
            rows.push(MetricRow::new(
                format!("{}_risk", risk_key(*category)),
                false,
                plans.iter().map(|p| p.risk.scores.get(*category)).collect(),
            ));
        }

        let yield_index = plans
            .iter()
            .map(|p| self.yield_index(p))
            .collect::<Result<Vec<_>>>()?;
        rows.push(MetricRow::new("yield_index", true, yield_index));
        rows.push(MetricRow::new(
            "total_cost",
            false,
            plans.iter().map(|p| p.economics.total_cost).collect(),
        ));
        rows.push(MetricRow::new(
            "expected_revenue",
            true,
            plans.iter().map(|p| p.economics.expected_revenue).collect(),
        ));
        rows.push(MetricRow::new(
            "roi_percent",
            true,
            plans.iter().map(|p| p.economics.roi_percent).collect(),
        ));

        let best = plans
            .iter()
            .min_by(|a, b| recommendation_order(a, b))
            .ok_or_else(|| RotaplanError::InvalidInput("no plans to compare".into()))?;

        let rationale = format!(
            "{} has the highest overall sustainability score ({:.1}, grade {}) with {} risk",
            best.id, best.overall_sustainability_score, best.sustainability_grade, best.risk.risk_level
        );

        tracing::debug!(plans = plans.len(), recommended = %best.id, "Compared plans");

        Ok(PlanComparison {
            plan_ids: plans.iter().map(|p| p.id.clone()).collect(),
            rows,
            recommended_plan_id: best.id.clone(),
            rationale,
        })
    }

    /// Mean expected yield as a percentage of each crop's catalog base yield.
    fn yield_index(&self, plan: &CropRotationPlan) -> Result<f64> {
        let bases = plan
            .years
            .iter()
            .map(|y| self.model.require(&y.crop).map(|c| c.base_yield.midpoint()))
            .collect::<Result<Vec<_>>>()?;
        Ok(plan.yield_index(&bases))
    }
}

/// Highest overall first, then lower risk level, then lower id.
fn recommendation_order(a: &CropRotationPlan, b: &CropRotationPlan) -> Ordering {
    b.overall_sustainability_score
        .total_cmp(&a.overall_sustainability_score)
        .then_with(|| a.risk.risk_level.cmp(&b.risk.risk_level))
        .then_with(|| a.id.cmp(&b.id))
}

fn risk_key(category: RiskCategory) -> &'static str {
    match category {
        RiskCategory::Weather => "weather",
        RiskCategory::Market => "market",
        RiskCategory::PestDisease => "pest_disease",
        RiskCategory::SoilHealth => "soil_health",
        RiskCategory::YieldVariability => "yield_variability",
        RiskCategory::Economic => "economic",
    }
}
