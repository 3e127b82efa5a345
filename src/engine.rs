//! Entry points used by callers: generation, scoring, risk, validation,
//! comparison and plan revision, all resolved against one catalog snapshot.

use crate::config::Config;
use crate::error::{Result, RotaplanError};
use crate::logic::{
    CompatibilityModel, ConstraintValidator, GenerationOutcome, PlanBuilder, PlanComparator,
    PlanComparison, RotationPlanGenerator, SearchBudget, SearchSpace, YieldOverrides,
};
use crate::models::{
    AnalysisDetails, ConstraintSet, CropRotationPlan, FieldCharacteristics, FieldProfile, Grade,
    Recommendation, RiskLevel, RiskScores, RiskTimelineEntry, RotationConstraint,
    SustainabilityScores, ValidationReport,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Resolves field ids to profiles.
pub trait FieldLookup: Send + Sync {
    /// Returns `UnknownField` when no profile exists for the id.
    fn field_profile(&self, field_id: &str) -> Result<FieldProfile>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryFields {
    fields: BTreeMap<String, FieldProfile>,
}

impl InMemoryFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, field: FieldProfile) -> Self {
        self.insert(field);
        self
    }

    pub fn insert(&mut self, field: FieldProfile) {
        self.fields.insert(field.field_id.clone(), field);
    }
}

impl FieldLookup for InMemoryFields {
    fn field_profile(&self, field_id: &str) -> Result<FieldProfile> {
        self.fields
            .get(field_id)
            .cloned()
            .ok_or_else(|| RotaplanError::UnknownField(field_id.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub field_id: String,
    /// Crops pinned to the first years, in order
    #[serde(default)]
    pub hint: Vec<String>,
    /// Crops the search may place; empty means the whole catalog
    #[serde(default)]
    pub candidates: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<RotationConstraint>,
    pub horizon_years: usize,
    #[serde(default)]
    pub top_n: Option<usize>,
    #[serde(default)]
    pub budget: Option<SearchBudget>,
    #[serde(default)]
    pub yield_overrides: YieldOverrides,
}

impl GenerateRequest {
    pub fn new(field_id: impl Into<String>, horizon_years: usize) -> Self {
        Self {
            field_id: field_id.into(),
            horizon_years,
            ..Default::default()
        }
    }

    pub fn with_candidates(mut self, crops: &[&str]) -> Self {
        self.candidates = crops.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_hint(mut self, crops: &[&str]) -> Self {
        self.hint = crops.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_constraint(mut self, constraint: RotationConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = Some(top_n);
        self
    }

    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.budget = Some(budget);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceScore {
    pub sustainability_scores: SustainabilityScores,
    pub overall_sustainability_score: f64,
    pub grade: Grade,
    pub analysis_details: AnalysisDetails,
    pub soil_health_trajectory: Vec<f64>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_categories: RiskScores,
    pub risk_level: RiskLevel,
    pub mitigation_strategies: Vec<String>,
    pub risk_timeline: Vec<RiskTimelineEntry>,
}

/// Shared, read-only engine. Cloning is cheap; every clone sees the same
/// catalog snapshot and configuration.
#[derive(Clone)]
pub struct RotationEngine {
    model: Arc<CompatibilityModel>,
    config: Arc<Config>,
    fields: Arc<dyn FieldLookup>,
}

impl RotationEngine {
    pub fn new(
        model: Arc<CompatibilityModel>,
        config: Arc<Config>,
        fields: Arc<dyn FieldLookup>,
    ) -> Self {
        tracing::debug!(
            catalog_version = model.version(),
            crops = model.len(),
            "Rotation engine ready"
        );
        Self {
            model,
            config,
            fields,
        }
    }

    pub fn model(&self) -> &CompatibilityModel {
        &self.model
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn generate(&self, request: &GenerateRequest) -> Result<GenerationOutcome> {
        let field = self.fields.field_profile(&request.field_id)?;
        request.yield_overrides.validate()?;
        let constraints = ConstraintSet::from_constraints(&request.constraints)?;

        let candidates: Vec<String> = if request.candidates.is_empty() {
            self.model.names().map(str::to_string).collect()
        } else {
            request.candidates.clone()
        };
        let space = SearchSpace::resolve(
            &self.model,
            &candidates,
            &request.hint,
            request.horizon_years,
        )?;

        let budget = request
            .budget
            .unwrap_or_else(|| SearchBudget::from(&self.config.search));
        let top_n = request.top_n.unwrap_or(self.config.search.top_n);

        tracing::info!(
            field_id = %field.field_id,
            horizon = request.horizon_years,
            candidates = space.candidates.len(),
            hinted = space.hint.len(),
            max_nodes = budget.max_nodes,
            "Generating rotations"
        );

        let builder = PlanBuilder::new(&self.model, &self.config, &field, &request.yield_overrides);
        RotationPlanGenerator::new(&self.model, &constraints)
            .with_budget(budget)
            .with_parallel(self.config.search.parallel)
            .generate(&space, &builder, top_n)
    }

    pub fn score_sequence(&self, field_id: &str, sequence: &[String]) -> Result<SequenceScore> {
        if sequence.is_empty() {
            return Err(RotaplanError::EmptySequence);
        }
        let field = self.fields.field_profile(field_id)?;
        let overrides = YieldOverrides::default();
        let evaluation =
            PlanBuilder::new(&self.model, &self.config, &field, &overrides).evaluate(sequence)?;

        let set = evaluation.sustainability;
        Ok(SequenceScore {
            sustainability_scores: set.scores,
            overall_sustainability_score: set.overall,
            grade: set.grade,
            analysis_details: set.analysis_details,
            soil_health_trajectory: set.soil_health_trajectory,
            recommendations: evaluation.recommendations,
        })
    }

    pub fn risk_assessment(
        &self,
        field_id: &str,
        sequence: &[String],
        characteristics: &FieldCharacteristics,
    ) -> Result<RiskAssessment> {
        if sequence.is_empty() {
            return Err(RotaplanError::EmptySequence);
        }
        if let Some(cv) = characteristics.historical_yield_cv {
            if !cv.is_finite() || cv < 0.0 {
                return Err(RotaplanError::InvalidInput(format!(
                    "historical_yield_cv must be a non-negative number, got {}",
                    cv
                )));
            }
        }

        let field = characteristics.apply_to(&self.fields.field_profile(field_id)?);
        let overrides = YieldOverrides::default();
        let risk = PlanBuilder::new(&self.model, &self.config, &field, &overrides)
            .with_historical_yield_cv(characteristics.historical_yield_cv)
            .evaluate(sequence)?
            .risk;

        Ok(RiskAssessment {
            risk_categories: risk.scores,
            risk_level: risk.risk_level,
            mitigation_strategies: risk.mitigation_strategies,
            risk_timeline: risk.risk_timeline,
        })
    }

    pub fn validate_constraints(
        &self,
        sequence: &[String],
        constraints: &[RotationConstraint],
    ) -> Result<ValidationReport> {
        let set = ConstraintSet::from_constraints(constraints)?;
        let validator = ConstraintValidator::new(&self.model, &set);
        validator.check_known_crops()?;
        let report = validator.validate(sequence)?;
        tracing::debug!(
            years = sequence.len(),
            valid = report.valid,
            violations = report.violations.len(),
            "Validated sequence"
        );
        Ok(report)
    }

    pub fn compare_plans(&self, plans: &[CropRotationPlan]) -> Result<PlanComparison> {
        PlanComparator::new(&self.model).compare(plans)
    }

    /// Scores a caller-authored sequence as a first-version plan.
    pub fn build_plan(
        &self,
        field_id: &str,
        sequence: &[String],
        overrides: &YieldOverrides,
    ) -> Result<CropRotationPlan> {
        overrides.validate()?;
        let field = self.fields.field_profile(field_id)?;
        PlanBuilder::new(&self.model, &self.config, &field, overrides).build(sequence, 1, None)
    }

    /// Produces the next version of `previous` with a new sequence.
    pub fn revise_plan(
        &self,
        previous: &CropRotationPlan,
        sequence: &[String],
        overrides: &YieldOverrides,
    ) -> Result<CropRotationPlan> {
        overrides.validate()?;
        let field = self.fields.field_profile(&previous.field_id)?;
        let version = previous.version.checked_add(1).ok_or_else(|| {
            RotaplanError::InvalidInput(format!("plan {} cannot be revised further", previous.id))
        })?;

        let plan = PlanBuilder::new(&self.model, &self.config, &field, overrides).build(
            sequence,
            version,
            Some(previous.id.clone()),
        )?;
        tracing::info!(previous = %previous.id, revised = %plan.id, "Revised plan");
        Ok(plan)
    }
}
