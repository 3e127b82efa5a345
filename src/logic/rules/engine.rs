use super::{low_score::LowScoreRule, nitrogen::NitrogenManagementRule, Rule, RuleContext};
use crate::models::{Recommendation, SustainabilityDimension};

pub struct RulesEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl RulesEngine {
    pub fn new() -> Self {
        let mut rules: Vec<Box<dyn Rule>> = SustainabilityDimension::all()
            .iter()
            .map(|d| Box::new(LowScoreRule::new(*d)) as Box<dyn Rule>)
            .collect();
        rules.push(Box::new(NitrogenManagementRule));

        Self { rules }
    }

    /// Recommendations in rule order: weak sub-scores first, then nitrogen.
    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Recommendation> {
        let recommendations: Vec<Recommendation> = self
            .rules
            .iter()
            .filter_map(|rule| rule.evaluate(ctx))
            .collect();
        tracing::trace!(
            rules = self.rules.len(),
            fired = recommendations.len(),
            "Evaluated advisory rules"
        );
        recommendations
    }

    pub fn list_rules(&self) -> Vec<(&'static str, &'static str)> {
        self.rules.iter().map(|r| (r.id(), r.name())).collect()
    }
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisDetails, SustainabilityScores};

    fn details(has_nitrogen_fixer: bool) -> AnalysisDetails {
        AnalysisDetails {
            diversity_index: 0.0,
            total_nitrogen_fixed: 0.0,
            unique_crops_count: 1,
            family_count: 1,
            has_nitrogen_fixer,
        }
    }

    #[test]
    fn registers_one_rule_per_dimension_plus_nitrogen() {
        let engine = RulesEngine::new();
        let ids: Vec<&str> = engine.list_rules().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids.len(), SustainabilityDimension::all().len() + 1);
        assert_eq!(ids.last(), Some(&"nitrogen_management"));
        assert!(ids.contains(&"low_biodiversity"));
    }

    #[test]
    fn strong_rotation_with_fixer_gets_no_advice() {
        let scores = SustainabilityScores {
            environmental_impact: 90.0,
            soil_health: 90.0,
            carbon_sequestration: 90.0,
            water_efficiency: 90.0,
            biodiversity: 90.0,
            long_term_viability: 90.0,
        };
        let details = details(true);
        let ctx = RuleContext {
            scores: &scores,
            details: &details,
            years: &[],
            threshold: 70.0,
        };
        let engine = RulesEngine::new();
        assert!(engine.evaluate(&ctx).is_empty());
    }

    #[test]
    fn weak_scores_fire_in_rule_order() {
        let scores = SustainabilityScores::default();
        let details = details(false);
        let ctx = RuleContext {
            scores: &scores,
            details: &details,
            years: &[],
            threshold: 70.0,
        };
        let recs = RulesEngine::new().evaluate(&ctx);
        assert_eq!(recs.len(), SustainabilityDimension::all().len() + 1);
        assert_eq!(recs.last().map(|r| r.id.as_str()), Some("nitrogen_management"));
        assert!(recs.iter().any(|r| r.id == "low_soil_health"));
    }
}
