use super::SustainabilityDimension;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationCategory {
    EnvironmentalImpact,
    SoilHealth,
    CarbonSequestration,
    WaterEfficiency,
    Biodiversity,
    LongTermViability,
    NitrogenManagement,
}

impl RecommendationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationCategory::EnvironmentalImpact => "Environmental Impact",
            RecommendationCategory::SoilHealth => "Soil Health",
            RecommendationCategory::CarbonSequestration => "Carbon Sequestration",
            RecommendationCategory::WaterEfficiency => "Water Efficiency",
            RecommendationCategory::Biodiversity => "Biodiversity",
            RecommendationCategory::LongTermViability => "Long-Term Viability",
            RecommendationCategory::NitrogenManagement => "Nitrogen Management",
        }
    }
}

impl From<SustainabilityDimension> for RecommendationCategory {
    fn from(dimension: SustainabilityDimension) -> Self {
        match dimension {
            SustainabilityDimension::EnvironmentalImpact => {
                RecommendationCategory::EnvironmentalImpact
            }
            SustainabilityDimension::SoilHealth => RecommendationCategory::SoilHealth,
            SustainabilityDimension::CarbonSequestration => {
                RecommendationCategory::CarbonSequestration
            }
            SustainabilityDimension::WaterEfficiency => RecommendationCategory::WaterEfficiency,
            SustainabilityDimension::Biodiversity => RecommendationCategory::Biodiversity,
            SustainabilityDimension::LongTermViability => {
                RecommendationCategory::LongTermViability
            }
        }
    }
}

impl std::fmt::Display for RecommendationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Advisory,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Advisory => "Advisory",
            Severity::Warning => "Warning",
            Severity::Critical => "Critical",
        }
    }

    /// Severity of a low sub-score: the further below the threshold, the louder.
    pub fn for_shortfall(score: f64, threshold: f64) -> Self {
        let gap = threshold - score;
        if gap >= 40.0 {
            Severity::Critical
        } else if gap >= 20.0 {
            Severity::Warning
        } else {
            Severity::Advisory
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub label: String,
    pub value: String,
    pub source: String,
}

impl DataPoint {
    pub fn new(label: &str, value: impl std::fmt::Display, source: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
            source: source.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub category: RecommendationCategory,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub data_points: Vec<DataPoint>,
    pub suggested_action: Option<String>,
}

impl Recommendation {
    pub fn new(
        id: impl Into<String>,
        category: RecommendationCategory,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            severity,
            title: title.into(),
            description: description.into(),
            data_points: Vec::new(),
            suggested_action: None,
        }
    }

    pub fn with_data_point(
        mut self,
        label: &str,
        value: impl std::fmt::Display,
        source: &str,
    ) -> Self {
        self.data_points.push(DataPoint::new(label, value, source));
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.suggested_action = Some(action.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_scales_with_shortfall() {
        assert_eq!(Severity::for_shortfall(65.0, 70.0), Severity::Advisory);
        assert_eq!(Severity::for_shortfall(45.0, 70.0), Severity::Warning);
        assert_eq!(Severity::for_shortfall(10.0, 70.0), Severity::Critical);
    }

    #[test]
    fn recommendation_builder_pattern() {
        let rec = Recommendation::new(
            "biodiversity_low",
            RecommendationCategory::Biodiversity,
            Severity::Warning,
            "Diversify Crop Families",
            "Only one crop family in the rotation",
        )
        .with_data_point("Biodiversity", "0.0", "Calculated")
        .with_action("Add a legume year");

        assert_eq!(rec.data_points.len(), 1);
        assert_eq!(rec.data_points[0].source, "Calculated");
        assert_eq!(rec.suggested_action.as_deref(), Some("Add a legume year"));
    }

    #[test]
    fn dimension_maps_to_category() {
        assert_eq!(
            RecommendationCategory::from(SustainabilityDimension::Biodiversity),
            RecommendationCategory::Biodiversity
        );
        assert_eq!(
            RecommendationCategory::from(SustainabilityDimension::LongTermViability).as_str(),
            "Long-Term Viability"
        );
    }
}
