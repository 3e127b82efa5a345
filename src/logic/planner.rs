use super::{CompatibilityModel, RiskAssessor, SustainabilityScorer, YieldEstimator, YieldOverrides};
use crate::config::Config;
use crate::error::{Result, RotaplanError};
use crate::models::{
    CropRotationPlan, EconomicSummary, FieldProfile, Recommendation, RiskProfile, RotationYear,
    SustainabilityScoreSet,
};
use chrono::Utc;

/// Yield, sustainability and risk results for one sequence on one field.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub years: Vec<RotationYear>,
    pub sustainability: SustainabilityScoreSet,
    pub risk: RiskProfile,
    pub recommendations: Vec<Recommendation>,
}

/// Runs the estimators for a fixed field and turns sequences into plans.
pub struct PlanBuilder<'a> {
    model: &'a CompatibilityModel,
    config: &'a Config,
    field: &'a FieldProfile,
    overrides: &'a YieldOverrides,
    historical_yield_cv: Option<f64>,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(
        model: &'a CompatibilityModel,
        config: &'a Config,
        field: &'a FieldProfile,
        overrides: &'a YieldOverrides,
    ) -> Self {
        Self {
            model,
            config,
            field,
            overrides,
            historical_yield_cv: None,
        }
    }

    pub fn with_historical_yield_cv(mut self, cv: Option<f64>) -> Self {
        self.historical_yield_cv = cv;
        self
    }

    pub fn evaluate(&self, sequence: &[String]) -> Result<Evaluation> {
        if sequence.is_empty() {
            return Err(RotaplanError::EmptySequence);
        }

        let years = YieldEstimator::new(self.model, &self.config.yields, self.overrides)
            .estimate_sequence(sequence, self.field)?;

        let scorer = SustainabilityScorer::new(self.model, &self.config.scoring);
        let sustainability = scorer.score(&years, self.field)?;
        let recommendations = scorer.recommendations(&sustainability, &years);

        let risk = RiskAssessor::new(self.model, &self.config.risk).assess(
            &years,
            self.field,
            sustainability.scores.soil_health,
            self.historical_yield_cv,
        )?;

        Ok(Evaluation {
            years,
            sustainability,
            risk,
            recommendations,
        })
    }

    pub fn build(
        &self,
        sequence: &[String],
        version: u32,
        supersedes: Option<String>,
    ) -> Result<CropRotationPlan> {
        let evaluation = self.evaluate(sequence)?;
        let canonical: Vec<String> = evaluation.years.iter().map(|y| y.crop.clone()).collect();

        Ok(CropRotationPlan {
            id: CropRotationPlan::make_id(&self.field.field_id, &canonical, version),
            version,
            supersedes,
            field_id: self.field.field_id.clone(),
            economics: EconomicSummary::from_years(&evaluation.years),
            overall_sustainability_score: evaluation.sustainability.overall,
            sustainability_grade: evaluation.sustainability.grade,
            years: evaluation.years,
            sustainability: evaluation.sustainability,
            risk: evaluation.risk,
            recommendations: evaluation.recommendations,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClimateZone, DrainageClass, SoilTexture};

    #[test]
    fn build_fills_every_section() {
        let model = CompatibilityModel::builtin();
        let config = Config::default();
        let field = FieldProfile::new("north-40", 40.0, ClimateZone::Temperate)
            .with_soil(SoilTexture::Loam, DrainageClass::WellDrained);
        let overrides = YieldOverrides::default();
        let builder = PlanBuilder::new(&model, &config, &field, &overrides);

        let sequence = vec!["Corn".to_string(), "soybean".to_string()];
        let plan = builder.build(&sequence, 1, None).unwrap();

        assert_eq!(plan.id, "north-40:corn-soybean:v1");
        assert_eq!(plan.horizon(), 2);
        assert_eq!(plan.sequence(), vec!["corn", "soybean"]);
        assert_eq!(plan.sustainability.soil_health_trajectory.len(), 2);
        assert_eq!(plan.risk.risk_timeline.len(), 2);
        assert!(plan.economics.expected_revenue > 0.0);
        assert_eq!(plan.overall_sustainability_score, plan.sustainability.overall);
    }

    #[test]
    fn empty_sequence_is_rejected() {
        let model = CompatibilityModel::builtin();
        let config = Config::default();
        let field = FieldProfile::new("f", 10.0, ClimateZone::Temperate);
        let overrides = YieldOverrides::default();
        let builder = PlanBuilder::new(&model, &config, &field, &overrides);
        assert!(matches!(
            builder.evaluate(&[]),
            Err(RotaplanError::EmptySequence)
        ));
    }
}
