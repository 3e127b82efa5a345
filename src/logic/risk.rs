use super::calculations::{clamp_score, frequencies, mean, shannon_evenness};
use super::CompatibilityModel;
use crate::config::RiskConfig;
use crate::error::{Result, RotaplanError};
use crate::models::{
    CropProfile, FieldProfile, RiskCategory, RiskLevel, RiskProfile, RiskScores,
    RiskTimelineEntry, RotationYear,
};

/// Pest tags on one crop that count as full pressure
const FULL_PEST_PRESSURE_TAGS: f64 = 4.0;

pub struct RiskAssessor<'a> {
    model: &'a CompatibilityModel,
    config: &'a RiskConfig,
}

impl<'a> RiskAssessor<'a> {
    pub fn new(model: &'a CompatibilityModel, config: &'a RiskConfig) -> Self {
        Self { model, config }
    }

    /// Risk profile of an estimated rotation.
    ///
    /// `soil_health_score` is the sustainability soil-health sub-score of the
    /// same rotation. `historical_yield_cv` replaces the crops' default yield
    /// variability when the field has a measured one.
    pub fn assess(
        &self,
        years: &[RotationYear],
        field: &FieldProfile,
        soil_health_score: f64,
        historical_yield_cv: Option<f64>,
    ) -> Result<RiskProfile> {
        if years.is_empty() {
            return Err(RotaplanError::EmptySequence);
        }
        let crops: Vec<&CropProfile> = years
            .iter()
            .map(|y| self.model.require(&y.crop))
            .collect::<Result<_>>()?;
        let history = field.last_crop().and_then(|name| self.model.crop(name));

        let scores = RiskScores {
            weather: self.weather(&crops, field),
            market: self.market(&crops),
            pest_disease: self.pest_disease(&crops, history),
            soil_health: clamp_score(100.0 - soil_health_score),
            yield_variability: self.yield_variability(&crops, historical_yield_cv),
            economic: self.economic(years, &crops),
        };

        let thresholds = &self.config.thresholds;
        let risk_level = RiskLevel::from_max_score(scores.max(), thresholds);

        let mitigation_strategies = scores
            .iter()
            .filter(|(_, score)| *score >= thresholds.medium)
            .map(|(category, _)| category.mitigation().to_string())
            .collect();

        let risk_timeline = self.timeline(years, &crops, field, history);

        tracing::debug!(
            level = %risk_level,
            max = scores.max(),
            "Assessed rotation risk"
        );

        Ok(RiskProfile {
            scores,
            risk_level,
            mitigation_strategies,
            risk_timeline,
        })
    }

    fn weather(&self, crops: &[&CropProfile], field: &FieldProfile) -> f64 {
        let sensitive = mean(
            crops
                .iter()
                .map(|c| if c.weather_sensitive { 1.0 } else { 0.0 }),
        );
        let volatility = field.weather_volatility().hazard();
        clamp_score(100.0 * (0.6 * sensitive + 0.4 * volatility))
    }

    fn market(&self, crops: &[&CropProfile]) -> f64 {
        let volatility = mean(crops.iter().map(|c| c.price_volatility.hazard()));
        let counts = frequencies(crops.iter().map(|c| c.name.as_str()));
        let largest = counts.values().copied().max().unwrap_or(0);
        let concentration = largest as f64 / crops.len() as f64;
        clamp_score(100.0 * (0.7 * volatility + 0.3 * concentration))
    }

    /// Adjacent pairs, with the last history crop in front of year 0.
    fn pairs<'c>(
        crops: &[&'c CropProfile],
        history: Option<&'c CropProfile>,
    ) -> Vec<(&'c CropProfile, &'c CropProfile)> {
        let mut pairs = Vec::with_capacity(crops.len());
        if let (Some(prev), Some(first)) = (history, crops.first()) {
            pairs.push((prev, *first));
        }
        pairs.extend(crops.windows(2).map(|w| (w[0], w[1])));
        pairs
    }

    fn pest_disease(&self, crops: &[&CropProfile], history: Option<&CropProfile>) -> f64 {
        let pairs = Self::pairs(crops, history);

        let same_family = mean(
            pairs
                .iter()
                .map(|(prev, next)| if prev.family == next.family { 1.0 } else { 0.0 }),
        );
        let carryover = mean(pairs.iter().map(|(prev, next)| pest_carryover(prev, next)));
        let pressure = mean(crops.iter().map(|c| pest_pressure(c)));

        let families = frequencies(crops.iter().map(|c| c.family));
        let unevenness = 1.0 - shannon_evenness(&families, self.model.family_universe_size());

        clamp_score(
            100.0 * (0.35 * same_family + 0.25 * carryover + 0.15 * pressure + 0.25 * unevenness),
        )
    }

    fn yield_variability(&self, crops: &[&CropProfile], historical_cv: Option<f64>) -> f64 {
        let cv = historical_cv.unwrap_or_else(|| mean(crops.iter().map(|c| c.yield_cv)));
        clamp_score(100.0 * cv / self.config.yield_cv_ceiling)
    }

    fn purchased_nitrogen(year: &RotationYear, crop: &CropProfile) -> f64 {
        (crop.nitrogen_demand_lbs - year.nitrogen_credit_lbs).max(0.0)
    }

    fn economic(&self, years: &[RotationYear], crops: &[&CropProfile]) -> f64 {
        let inputs = mean(crops.iter().map(|c| c.input_intensity.hazard()));
        let purchased = mean(
            years
                .iter()
                .zip(crops)
                .map(|(y, c)| Self::purchased_nitrogen(y, c)),
        );
        let nitrogen = (purchased / self.config.reference_purchased_nitrogen_lbs).min(1.0);
        clamp_score(100.0 * (0.6 * inputs + 0.4 * nitrogen))
    }

    fn timeline(
        &self,
        years: &[RotationYear],
        crops: &[&CropProfile],
        field: &FieldProfile,
        history: Option<&CropProfile>,
    ) -> Vec<RiskTimelineEntry> {
        let volatility = field.weather_volatility().hazard();

        years
            .iter()
            .zip(crops)
            .enumerate()
            .map(|(i, (year, crop))| {
                let prev = if i == 0 { history } else { Some(crops[i - 1]) };
                let (same_family, carryover) = match prev {
                    Some(p) => (
                        if p.family == crop.family { 1.0 } else { 0.0 },
                        pest_carryover(p, crop),
                    ),
                    None => (0.0, 0.0),
                };
                let sensitive = if crop.weather_sensitive { 1.0 } else { 0.0 };
                let purchased = Self::purchased_nitrogen(year, crop);

                let factors = RiskScores {
                    weather: clamp_score(100.0 * (0.6 * sensitive + 0.4 * volatility)),
                    market: clamp_score(100.0 * crop.price_volatility.hazard()),
                    pest_disease: clamp_score(
                        100.0 * (0.5 * same_family + 0.3 * carryover + 0.2 * pest_pressure(crop)),
                    ),
                    soil_health: clamp_score(100.0 * (1.0 - crop.organic_matter.benefit())),
                    yield_variability: clamp_score(
                        100.0 * crop.yield_cv / self.config.yield_cv_ceiling,
                    ),
                    economic: clamp_score(
                        100.0
                            * (0.6 * crop.input_intensity.hazard()
                                + 0.4
                                    * (purchased / self.config.reference_purchased_nitrogen_lbs)
                                        .min(1.0)),
                    ),
                };

                let risk_score = mean(factors.iter().map(|(_, v)| v));
                RiskTimelineEntry {
                    year: year.year,
                    crop: crop.name.clone(),
                    risk_score,
                    risk_level: RiskLevel::from_max_score(risk_score, &self.config.thresholds),
                    primary_risk: dominant(&factors),
                }
            })
            .collect()
    }
}

/// Share of the next crop's pests already hosted by the previous crop.
fn pest_carryover(prev: &CropProfile, next: &CropProfile) -> f64 {
    if next.pests.is_empty() {
        return 0.0;
    }
    next.shared_pests(prev) as f64 / next.pests.len() as f64
}

fn pest_pressure(crop: &CropProfile) -> f64 {
    (crop.pests.len() as f64 / FULL_PEST_PRESSURE_TAGS).min(1.0)
}

/// Highest-scoring category; the earlier category wins ties.
fn dominant(scores: &RiskScores) -> RiskCategory {
    let mut best = (RiskCategory::Weather, scores.weather);
    for (category, value) in scores.iter() {
        if value > best.1 {
            best = (category, value);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ScoringConfig, YieldConfig};
    use crate::logic::{SustainabilityScorer, YieldEstimator, YieldOverrides};
    use crate::models::{ClimateZone, DrainageClass, Level, SoilTexture};

    fn field() -> FieldProfile {
        FieldProfile::new("north-40", 40.0, ClimateZone::Temperate)
            .with_soil(SoilTexture::Loam, DrainageClass::WellDrained)
    }

    fn assess_on(crops: &[&str], field: &FieldProfile, cv: Option<f64>) -> RiskProfile {
        let model = CompatibilityModel::builtin();
        let yields = YieldConfig::default();
        let scoring = ScoringConfig::default();
        let risk = RiskConfig::default();
        let overrides = YieldOverrides::default();
        let sequence: Vec<String> = crops.iter().map(|c| c.to_string()).collect();
        let years = YieldEstimator::new(&model, &yields, &overrides)
            .estimate_sequence(&sequence, field)
            .unwrap();
        let soil = SustainabilityScorer::new(&model, &scoring)
            .score(&years, field)
            .unwrap()
            .scores
            .soil_health;
        RiskAssessor::new(&model, &risk)
            .assess(&years, field, soil, cv)
            .unwrap()
    }

    fn assess(crops: &[&str]) -> RiskProfile {
        assess_on(crops, &field(), None)
    }

    #[test]
    fn scores_are_bounded() {
        for crops in [
            vec!["corn", "corn", "corn", "corn"],
            vec!["corn", "soybean", "wheat", "alfalfa"],
            vec!["potato"],
        ] {
            let profile = assess(&crops);
            for (category, value) in profile.scores.iter() {
                assert!(
                    (0.0..=100.0).contains(&value),
                    "{} out of range: {}",
                    category,
                    value
                );
            }
            assert_eq!(profile.risk_timeline.len(), crops.len());
        }
    }

    #[test]
    fn monoculture_has_high_pest_risk() {
        let mono = assess(&["corn", "corn", "corn"]);
        let rotated = assess(&["corn", "soybean", "corn"]);
        assert!(mono.scores.pest_disease > rotated.scores.pest_disease);
        assert!(mono.scores.pest_disease >= 85.0);
        assert_eq!(mono.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn history_counts_toward_pest_risk() {
        let fresh = assess_on(&["corn", "soybean"], &field(), None);
        let after_corn = assess_on(&["corn", "soybean"], &field().with_history(2024, "corn"), None);
        assert!(after_corn.scores.pest_disease > fresh.scores.pest_disease);
    }

    #[test]
    fn volatile_climate_raises_weather_risk() {
        let mut volatile = field();
        volatile.climate_volatility = Some(Level::High);
        let calm = assess(&["corn", "soybean"]);
        let stormy = assess_on(&["corn", "soybean"], &volatile, None);
        assert!(stormy.scores.weather > calm.scores.weather);
    }

    #[test]
    fn historical_cv_overrides_crop_defaults() {
        let profile = assess_on(&["corn", "soybean"], &field(), Some(0.40));
        assert!((profile.scores.yield_variability - 100.0).abs() < 1e-9);
        let profile = assess_on(&["corn", "soybean"], &field(), Some(0.10));
        assert!((profile.scores.yield_variability - 25.0).abs() < 1e-9);
    }

    #[test]
    fn soil_risk_mirrors_soil_health() {
        let model = CompatibilityModel::builtin();
        let risk = RiskConfig::default();
        let years = YieldEstimator::new(&model, &YieldConfig::default(), &YieldOverrides::default())
            .estimate_sequence(&["wheat".to_string()], &field())
            .unwrap();
        let profile = RiskAssessor::new(&model, &risk)
            .assess(&years, &field(), 64.0, None)
            .unwrap();
        assert!((profile.scores.soil_health - 36.0).abs() < 1e-9);
    }

    #[test]
    fn mitigations_follow_category_order() {
        let profile = assess(&["corn", "corn", "corn"]);
        let expected: Vec<String> = profile
            .scores
            .iter()
            .filter(|(_, v)| *v >= 50.0)
            .map(|(c, _)| c.mitigation().to_string())
            .collect();
        assert!(!expected.is_empty());
        assert_eq!(profile.mitigation_strategies, expected);
    }

    #[test]
    fn timeline_names_dominant_category() {
        let profile = assess(&["corn", "corn"]);
        let second = &profile.risk_timeline[1];
        assert_eq!(second.crop, "corn");
        assert_eq!(second.year, 1);
        // Corn after corn: same family, full pest carryover
        assert_eq!(second.primary_risk, RiskCategory::PestDisease);
    }

    #[test]
    fn dominant_prefers_earlier_category_on_ties() {
        let scores = RiskScores {
            weather: 40.0,
            market: 40.0,
            ..Default::default()
        };
        assert_eq!(dominant(&scores), RiskCategory::Weather);
    }

    #[test]
    fn empty_rotation_is_rejected() {
        let model = CompatibilityModel::builtin();
        let risk = RiskConfig::default();
        assert!(matches!(
            RiskAssessor::new(&model, &risk).assess(&[], &field(), 50.0, None),
            Err(RotaplanError::EmptySequence)
        ));
    }
}
