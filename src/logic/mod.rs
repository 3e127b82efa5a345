pub mod calculations;
pub mod comparator;
pub mod compatibility;
pub mod generator;
pub mod planner;
pub mod risk;
pub mod rules;
pub mod sustainability;
pub mod validator;
pub mod yield_estimator;

pub use comparator::{MetricRow, PlanComparator, PlanComparison};
pub use compatibility::{CompatibilityModel, BUILTIN_CATALOG_VERSION};
pub use generator::{
    GenerationOutcome, InfeasibilityReport, InfeasibleReason, RotationPlanGenerator,
    SearchBudget, SearchSpace, SearchState,
};
pub use planner::{Evaluation, PlanBuilder};
pub use risk::RiskAssessor;
pub use rules::RulesEngine;
pub use sustainability::SustainabilityScorer;
pub use validator::{ConstraintValidator, PrefixState};
pub use yield_estimator::{YieldEstimate, YieldEstimator, YieldOverrides};
