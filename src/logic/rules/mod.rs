pub mod engine;
pub mod low_score;
pub mod nitrogen;

pub use engine::RulesEngine;

use crate::models::{AnalysisDetails, Recommendation, RotationYear, SustainabilityScores};

/// Everything an advisory rule may look at for one scored rotation.
pub struct RuleContext<'a> {
    pub scores: &'a SustainabilityScores,
    pub details: &'a AnalysisDetails,
    pub years: &'a [RotationYear],
    /// Sub-scores below this are considered weak
    pub threshold: f64,
}

/// Trait for advisory rules
pub trait Rule: Send + Sync {
    /// Unique identifier for this rule
    fn id(&self) -> &'static str;

    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Evaluate the rule and return a recommendation if conditions are met
    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<Recommendation>;
}
