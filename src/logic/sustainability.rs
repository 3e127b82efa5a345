use super::calculations::{
    clamp_score, frequencies, mean, normalize, shannon_evenness, shannon_index,
};
use super::rules::{RuleContext, RulesEngine};
use super::CompatibilityModel;
use crate::config::ScoringConfig;
use crate::error::{Result, RotaplanError};
use crate::models::{
    AnalysisDetails, CropProfile, FieldProfile, Grade, Recommendation, RotationYear,
    SustainabilityScoreSet, SustainabilityScores,
};

/// Slope at which erosion hazard is doubled
const SLOPE_FOR_DOUBLE_EROSION: f64 = 20.0;

/// Extra leaching when a non-fixer gets no nitrogen credit and relies on fertilizer
const UNCREDITED_LEACHING_FACTOR: f64 = 1.15;

pub struct SustainabilityScorer<'a> {
    model: &'a CompatibilityModel,
    config: &'a ScoringConfig,
    rules: RulesEngine,
}

impl<'a> SustainabilityScorer<'a> {
    pub fn new(model: &'a CompatibilityModel, config: &'a ScoringConfig) -> Self {
        Self {
            model,
            config,
            rules: RulesEngine::new(),
        }
    }

    pub fn score(
        &self,
        years: &[RotationYear],
        field: &FieldProfile,
    ) -> Result<SustainabilityScoreSet> {
        if years.is_empty() {
            return Err(RotaplanError::EmptySequence);
        }
        let crops: Vec<&CropProfile> = years
            .iter()
            .map(|y| self.model.require(&y.crop))
            .collect::<Result<_>>()?;

        let total_nitrogen_fixed: f64 = crops
            .iter()
            .filter(|c| c.is_fixer())
            .map(|c| c.nitrogen_fixation.midpoint())
            .sum();

        let trajectory = self.soil_health_trajectory(&crops, field);
        let final_soil = trajectory.last().copied().unwrap_or(field.soil_health_index);

        let scores = SustainabilityScores {
            environmental_impact: self.environmental_impact(years, &crops, field),
            soil_health: self.soil_health(&crops, total_nitrogen_fixed),
            carbon_sequestration: clamp_score(
                100.0 * mean(crops.iter().map(|c| c.carbon_sequestration.benefit())),
            ),
            water_efficiency: clamp_score(
                100.0 * mean(crops.iter().map(|c| c.water_use_efficiency.benefit())),
            ),
            biodiversity: self.biodiversity(&crops),
            long_term_viability: self.long_term_viability(years, final_soil),
        };

        let overall = self.overall(&scores);
        let families = frequencies(crops.iter().map(|c| c.family));
        let names = frequencies(crops.iter().map(|c| c.name.as_str()));

        let analysis_details = AnalysisDetails {
            diversity_index: shannon_index(&families),
            total_nitrogen_fixed,
            unique_crops_count: names.len(),
            family_count: families.len(),
            has_nitrogen_fixer: crops.iter().any(|c| c.is_fixer()),
        };

        tracing::debug!(
            years = years.len(),
            overall,
            biodiversity = scores.biodiversity,
            "Scored rotation sustainability"
        );

        Ok(SustainabilityScoreSet {
            scores,
            overall,
            grade: Grade::from_score(overall, &self.config.grade_thresholds),
            analysis_details,
            soil_health_trajectory: trajectory,
        })
    }

    /// Weighted overall score from the six sub-scores.
    pub fn overall(&self, scores: &SustainabilityScores) -> f64 {
        let weights = self.config.weights.as_array();
        let total: f64 = scores
            .iter()
            .zip(weights)
            .map(|((_, value), weight)| value * weight)
            .sum();
        clamp_score(total)
    }

    pub fn recommendations(
        &self,
        set: &SustainabilityScoreSet,
        years: &[RotationYear],
    ) -> Vec<Recommendation> {
        let ctx = RuleContext {
            scores: &set.scores,
            details: &set.analysis_details,
            years,
            threshold: self.config.recommendation_threshold,
        };
        self.rules.evaluate(&ctx)
    }

    fn environmental_impact(
        &self,
        years: &[RotationYear],
        crops: &[&CropProfile],
        field: &FieldProfile,
    ) -> f64 {
        let slope_factor = 1.0 + field.slope_percent.clamp(0.0, SLOPE_FOR_DOUBLE_EROSION)
            / SLOPE_FOR_DOUBLE_EROSION;
        let texture_factor = field.soil_texture.leaching_factor();

        let hazards = years.iter().zip(crops).map(|(year, crop)| {
            let erosion = crop.erosion_hazard.hazard() * slope_factor;
            let mut leaching = crop.leaching_hazard.hazard() * texture_factor;
            if !crop.is_fixer() && year.nitrogen_credit_lbs <= 0.0 {
                leaching *= UNCREDITED_LEACHING_FACTOR;
            }
            (0.5 * erosion + 0.5 * leaching).min(1.0)
        });

        clamp_score(100.0 * (1.0 - mean(hazards)))
    }

    fn nitrogen_fraction(&self, fixed: f64, years: usize) -> f64 {
        let reference = years as f64 * self.config.reference_nitrogen_lbs_per_year;
        if reference <= 0.0 {
            return 0.0;
        }
        (fixed / reference).min(1.0)
    }

    fn soil_health(&self, crops: &[&CropProfile], total_nitrogen_fixed: f64) -> f64 {
        let organic_matter = mean(crops.iter().map(|c| c.organic_matter.benefit()));
        let nitrogen = self.nitrogen_fraction(total_nitrogen_fixed, crops.len());
        clamp_score(100.0 * (0.6 * organic_matter + 0.4 * nitrogen))
    }

    fn biodiversity(&self, crops: &[&CropProfile]) -> f64 {
        let families = frequencies(crops.iter().map(|c| c.family));
        if families.len() <= 1 {
            // Only a single perennial stand is exempt, not a mix within one family
            let single_stand = crops.windows(2).all(|w| w[0].name == w[1].name);
            if single_stand && crops.iter().all(|c| c.perennial) {
                return clamp_score(self.config.perennial_stand_biodiversity);
            }
            return 0.0;
        }
        clamp_score(100.0 * shannon_evenness(&families, self.model.family_universe_size()))
    }

    /// Baseline index plus each year's soil-health contribution; never decreases.
    fn soil_health_trajectory(&self, crops: &[&CropProfile], field: &FieldProfile) -> Vec<f64> {
        let mut value = clamp_score(field.soil_health_index);
        crops
            .iter()
            .map(|crop| {
                let fixed = if crop.is_fixer() {
                    crop.nitrogen_fixation.midpoint()
                } else {
                    0.0
                };
                let contribution =
                    0.6 * crop.organic_matter.benefit() + 0.4 * self.nitrogen_fraction(fixed, 1);
                value = (value + contribution * self.config.trajectory_gain_per_year).min(100.0);
                value
            })
            .collect()
    }

    fn long_term_viability(&self, years: &[RotationYear], final_soil: f64) -> f64 {
        let revenue: f64 = years.iter().map(|y| y.revenue).sum();
        let cost: f64 = years.iter().map(|y| y.cost).sum();
        let economic = if cost > 0.0 {
            100.0 * normalize(revenue / cost, 0.5, 2.0)
        } else if revenue > 0.0 {
            100.0
        } else {
            0.0
        };

        let w = self.config.viability_economic_weight;
        clamp_score(w * economic + (1.0 - w) * final_soil)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::YieldConfig;
    use crate::logic::{YieldEstimator, YieldOverrides};
    use crate::models::{ClimateZone, DrainageClass, SoilTexture};

    fn field() -> FieldProfile {
        FieldProfile::new("north-40", 40.0, ClimateZone::Temperate)
            .with_soil(SoilTexture::Loam, DrainageClass::WellDrained)
    }

    fn score(crops: &[&str]) -> SustainabilityScoreSet {
        let model = CompatibilityModel::builtin();
        let scoring = ScoringConfig::default();
        let yields = YieldConfig::default();
        let overrides = YieldOverrides::default();
        let sequence: Vec<String> = crops.iter().map(|c| c.to_string()).collect();
        let years = YieldEstimator::new(&model, &yields, &overrides)
            .estimate_sequence(&sequence, &field())
            .unwrap();
        SustainabilityScorer::new(&model, &scoring)
            .score(&years, &field())
            .unwrap()
    }

    #[test]
    fn all_scores_are_bounded() {
        for crops in [
            vec!["corn", "soybean", "wheat", "alfalfa"],
            vec!["potato", "potato", "potato"],
            vec!["alfalfa"],
            vec!["canola", "wheat", "peas", "barley", "sunflower"],
        ] {
            let set = score(&crops);
            for (dimension, value) in set.scores.iter() {
                assert!(
                    (0.0..=100.0).contains(&value),
                    "{} out of range for {:?}: {}",
                    dimension,
                    crops,
                    value
                );
            }
            assert!((0.0..=100.0).contains(&set.overall));
            assert!(set.analysis_details.unique_crops_count <= crops.len());
        }
    }

    #[test]
    fn monoculture_has_no_biodiversity() {
        let set = score(&["corn", "corn", "corn"]);
        assert_eq!(set.scores.biodiversity, 0.0);
        assert_eq!(set.analysis_details.family_count, 1);
        assert_eq!(set.analysis_details.diversity_index, 0.0);
    }

    #[test]
    fn single_family_rotation_has_no_biodiversity() {
        let set = score(&["corn", "wheat", "oats"]);
        assert_eq!(set.scores.biodiversity, 0.0);
        assert_eq!(set.analysis_details.unique_crops_count, 3);
    }

    #[test]
    fn perennial_stand_gets_configured_credit() {
        let set = score(&["alfalfa", "alfalfa", "alfalfa"]);
        let expected = ScoringConfig::default().perennial_stand_biodiversity;
        assert!((set.scores.biodiversity - expected).abs() < 1e-9);
    }

    #[test]
    fn mixed_perennials_of_one_family_get_no_stand_credit() {
        let set = score(&["alfalfa", "clover"]);
        assert_eq!(set.analysis_details.family_count, 1);
        assert_eq!(set.scores.biodiversity, 0.0);
    }

    #[test]
    fn even_family_mix_scores_full_biodiversity() {
        let set = score(&["corn", "soybean"]);
        assert!((set.scores.biodiversity - 100.0).abs() < 1e-9);
        assert!((set.analysis_details.diversity_index - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn fixers_raise_soil_health() {
        let with_fixer = score(&["corn", "soybean", "corn", "soybean"]);
        let without = score(&["corn", "wheat", "corn", "wheat"]);
        assert!(with_fixer.analysis_details.has_nitrogen_fixer);
        assert!((with_fixer.analysis_details.total_nitrogen_fixed - 85.0).abs() < 1e-9);
        assert!(!without.analysis_details.has_nitrogen_fixer);
        assert!(with_fixer.scores.soil_health > 0.0);
    }

    #[test]
    fn trajectory_never_decreases_and_is_capped() {
        let set = score(&["alfalfa", "alfalfa", "alfalfa", "alfalfa", "corn"]);
        assert_eq!(set.soil_health_trajectory.len(), 5);
        for pair in set.soil_health_trajectory.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert!(set.soil_health_trajectory.iter().all(|v| *v <= 100.0));
    }

    #[test]
    fn grade_follows_overall() {
        let set = score(&["corn", "soybean", "wheat"]);
        let thresholds = ScoringConfig::default().grade_thresholds;
        assert_eq!(set.grade, Grade::from_score(set.overall, &thresholds));
    }

    #[test]
    fn steep_slope_lowers_environmental_score() {
        let model = CompatibilityModel::builtin();
        let scoring = ScoringConfig::default();
        let yields = YieldConfig::default();
        let overrides = YieldOverrides::default();
        let sequence = vec!["corn".to_string(), "soybean".to_string()];
        let flat = field();
        let steep = field().with_slope(12.0);
        let estimator = YieldEstimator::new(&model, &yields, &overrides);
        let scorer = SustainabilityScorer::new(&model, &scoring);

        let flat_set = scorer
            .score(&estimator.estimate_sequence(&sequence, &flat).unwrap(), &flat)
            .unwrap();
        let steep_set = scorer
            .score(&estimator.estimate_sequence(&sequence, &steep).unwrap(), &steep)
            .unwrap();
        assert!(steep_set.scores.environmental_impact < flat_set.scores.environmental_impact);
    }

    #[test]
    fn empty_rotation_is_rejected() {
        let model = CompatibilityModel::builtin();
        let scoring = ScoringConfig::default();
        let err = SustainabilityScorer::new(&model, &scoring)
            .score(&[], &field())
            .unwrap_err();
        assert!(matches!(err, RotaplanError::EmptySequence));
    }

    #[test]
    fn weak_rotation_gets_recommendations() {
        let model = CompatibilityModel::builtin();
        let scoring = ScoringConfig::default();
        let yields = YieldConfig::default();
        let overrides = YieldOverrides::default();
        let sequence = vec!["corn".to_string(), "corn".to_string()];
        let years = YieldEstimator::new(&model, &yields, &overrides)
            .estimate_sequence(&sequence, &field())
            .unwrap();
        let scorer = SustainabilityScorer::new(&model, &scoring);
        let set = scorer.score(&years, &field()).unwrap();
        let recs = scorer.recommendations(&set, &years);

        assert!(recs.iter().any(|r| r.id == "low_biodiversity"));
        assert!(recs.iter().any(|r| r.id == "nitrogen_management"));
    }
}
