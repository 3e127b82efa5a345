use super::{Rule, RuleContext};
use crate::models::{Recommendation, RecommendationCategory, Severity, SustainabilityDimension};

/// Flags one sustainability sub-score that falls below the recommendation threshold.
pub struct LowScoreRule {
    dimension: SustainabilityDimension,
}

impl LowScoreRule {
    pub fn new(dimension: SustainabilityDimension) -> Self {
        Self { dimension }
    }

    fn advice(&self) -> (&'static str, &'static str, &'static str) {
        match self.dimension {
            SustainabilityDimension::EnvironmentalImpact => (
                "Reduce Erosion and Leaching",
                "Crops in this rotation leave the field exposed to erosion or nitrate loss.",
                "Follow row crops with small grains or cover crops, and favor residue-building \
                 crops on sloped or sandy ground.",
            ),
            SustainabilityDimension::SoilHealth => (
                "Build Soil Organic Matter",
                "The rotation adds little organic matter or biologically fixed nitrogen.",
                "Include a legume or perennial forage year and keep residue on the field.",
            ),
            SustainabilityDimension::CarbonSequestration => (
                "Increase Carbon Capture",
                "Most crops in the rotation return little carbon to the soil.",
                "Add high-biomass crops such as perennial forages, or plant cover crops \
                 between cash crops.",
            ),
            SustainabilityDimension::WaterEfficiency => (
                "Improve Water Use Efficiency",
                "The rotation relies on crops with high water demand per unit of yield.",
                "Swap a year of water-hungry crops for small grains or legumes and schedule \
                 irrigation from soil moisture readings.",
            ),
            SustainabilityDimension::Biodiversity => (
                "Diversify Crop Families",
                "Few crop families appear in the rotation, which favors family-specific \
                 pests and diseases.",
                "Rotate across at least three plant families, for example a grass, a legume \
                 and a broadleaf.",
            ),
            SustainabilityDimension::LongTermViability => (
                "Strengthen Long-Term Viability",
                "Returns or the soil-health trajectory are weak over the planning horizon.",
                "Balance high-value crops with soil-building years and use nitrogen credits \
                 to lower input costs.",
            ),
        }
    }
}

impl Rule for LowScoreRule {
    fn id(&self) -> &'static str {
        match self.dimension {
            SustainabilityDimension::EnvironmentalImpact => "low_environmental_impact",
            SustainabilityDimension::SoilHealth => "low_soil_health",
            SustainabilityDimension::CarbonSequestration => "low_carbon_sequestration",
            SustainabilityDimension::WaterEfficiency => "low_water_efficiency",
            SustainabilityDimension::Biodiversity => "low_biodiversity",
            SustainabilityDimension::LongTermViability => "low_long_term_viability",
        }
    }

    fn name(&self) -> &'static str {
        self.dimension.as_str()
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<Recommendation> {
        let score = ctx.scores.get(self.dimension);
        if score >= ctx.threshold {
            return None;
        }

        let (title, description, action) = self.advice();
        Some(
            Recommendation::new(
                self.id(),
                RecommendationCategory::from(self.dimension),
                Severity::for_shortfall(score, ctx.threshold),
                title,
                description,
            )
            .with_data_point(self.dimension.as_str(), format!("{:.1}", score), "Calculated")
            .with_data_point("Threshold", format!("{:.0}", ctx.threshold), "Configuration")
            .with_action(action),
        )
    }
}
