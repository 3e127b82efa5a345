use super::{Rule, RuleContext};
use crate::models::{Recommendation, RecommendationCategory, Severity};

/// Suggests a legume year when no crop in the rotation fixes nitrogen.
pub struct NitrogenManagementRule;

impl Rule for NitrogenManagementRule {
    fn id(&self) -> &'static str {
        "nitrogen_management"
    }

    fn name(&self) -> &'static str {
        "Nitrogen Management"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<Recommendation> {
        if ctx.details.has_nitrogen_fixer {
            return None;
        }

        Some(
            Recommendation::new(
                self.id(),
                RecommendationCategory::NitrogenManagement,
                Severity::Advisory,
                "Add a Nitrogen-Fixing Crop",
                format!(
                    "None of the {} years includes a legume, so every crop depends on \
                     purchased nitrogen.",
                    ctx.years.len()
                ),
            )
            .with_data_point("Nitrogen fixed", "0 lbs N/acre", "Calculated")
            .with_action(
                "Insert soybean, peas or a clover/alfalfa year before the most \
                 nitrogen-hungry crop to earn a fertilizer credit.",
            ),
        )
    }
}
