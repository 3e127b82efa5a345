use super::CompatibilityModel;
use crate::config::YieldConfig;
use crate::error::{Result, RotaplanError};
use crate::models::{CropProfile, FieldProfile, FixerClass, RotationYear};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Externally computed values that replace the estimator's own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YieldOverrides {
    /// Expected yield per crop, in the crop's yield unit
    #[serde(default)]
    pub yields: BTreeMap<String, f64>,
    /// Nitrogen credit left by a fixing crop, lbs N/acre
    #[serde(default)]
    pub nitrogen_credits: BTreeMap<String, f64>,
}

impl YieldOverrides {
    pub fn is_empty(&self) -> bool {
        self.yields.is_empty() && self.nitrogen_credits.is_empty()
    }

    pub fn with_yield(mut self, crop: &str, value: f64) -> Self {
        self.yields.insert(crop.to_lowercase(), value);
        self
    }

    pub fn with_nitrogen_credit(mut self, crop: &str, lbs: f64) -> Self {
        self.nitrogen_credits.insert(crop.to_lowercase(), lbs);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some((crop, v)) = self.yields.iter().find(|(_, v)| !(**v > 0.0)) {
            return Err(RotaplanError::InvalidInput(format!(
                "yield override for '{}' must be positive (got {})",
                crop, v
            )));
        }
        if let Some((crop, v)) = self.nitrogen_credits.iter().find(|(_, v)| !(**v >= 0.0)) {
            return Err(RotaplanError::InvalidInput(format!(
                "nitrogen credit override for '{}' must not be negative (got {})",
                crop, v
            )));
        }
        Ok(())
    }

    fn yield_for(&self, crop: &str) -> Option<f64> {
        self.yields.get(crop).copied()
    }

    fn credit_for(&self, crop: &str) -> Option<f64> {
        self.nitrogen_credits.get(crop).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct YieldEstimate {
    pub expected_yield: f64,
    pub unit: String,
    pub nitrogen_credit_lbs: f64,
    pub notes: Vec<String>,
}

pub struct YieldEstimator<'a> {
    model: &'a CompatibilityModel,
    config: &'a YieldConfig,
    overrides: &'a YieldOverrides,
}

impl<'a> YieldEstimator<'a> {
    pub fn new(
        model: &'a CompatibilityModel,
        config: &'a YieldConfig,
        overrides: &'a YieldOverrides,
    ) -> Self {
        Self {
            model,
            config,
            overrides,
        }
    }

    pub fn estimate(
        &self,
        crop: &str,
        year: usize,
        preceding: Option<&str>,
        field: &FieldProfile,
    ) -> Result<YieldEstimate> {
        let profile = self.model.require(crop)?;
        let previous = match preceding {
            Some(name) => Some(self.model.require(name)?),
            None => None,
        };
        Ok(self.estimate_profile(profile, year, previous, field))
    }

    fn estimate_profile(
        &self,
        crop: &CropProfile,
        year: usize,
        previous: Option<&CropProfile>,
        field: &FieldProfile,
    ) -> YieldEstimate {
        let mut notes = Vec::new();
        let mut expected = crop.base_yield.midpoint()
            * field.soil_texture.yield_factor()
            * field.drainage.yield_factor();
        let mut credit = 0.0;

        match previous {
            Some(prev) if prev.name == crop.name => {
                if !crop.perennial {
                    let penalty = self.config.continuous_cropping_penalty;
                    expected *= 1.0 - penalty;
                    notes.push(format!(
                        "Continuous {}: -{:.0}% yield",
                        crop.name,
                        penalty * 100.0
                    ));
                }
            }
            Some(prev) if prev.is_fixer() => {
                let boost = match prev.nitrogen_fixation.class {
                    FixerClass::High => self.config.high_fixer_boost.midpoint(),
                    _ => self.config.moderate_fixer_boost.midpoint(),
                };
                expected *= 1.0 + boost;
                credit = self
                    .overrides
                    .credit_for(&prev.name)
                    .unwrap_or_else(|| prev.nitrogen_fixation.midpoint());
                notes.push(format!(
                    "Nitrogen credit from {}: {:.1} lbs N/acre, +{:.1}% yield",
                    prev.name,
                    credit,
                    boost * 100.0
                ));
            }
            _ => {}
        }

        if let Some(value) = self.overrides.yield_for(&crop.name) {
            expected = value;
            notes.push("Yield override applied".to_string());
        }

        tracing::trace!(
            crop = %crop.name,
            year,
            expected_yield = expected,
            nitrogen_credit = credit,
            "Estimated yield"
        );

        YieldEstimate {
            expected_yield: expected,
            unit: crop.base_yield.unit.clone(),
            nitrogen_credit_lbs: credit,
            notes,
        }
    }

    /// Revenue and cost for the whole field in USD.
    pub fn economics(
        &self,
        crop: &CropProfile,
        estimate: &YieldEstimate,
        acreage: f64,
    ) -> (f64, f64) {
        let revenue = estimate.expected_yield * crop.price_per_unit * acreage;
        let saved = estimate.nitrogen_credit_lbs.min(crop.nitrogen_demand_lbs)
            * self.config.nitrogen_price_per_lb;
        let cost = (crop.cost_per_acre - saved).max(0.0) * acreage;
        (revenue, cost)
    }

    /// Predecessor of the first planned year, if history carry-over is enabled.
    pub fn initial_predecessor(&self, field: &FieldProfile) -> Option<&'a CropProfile> {
        if !self.config.carry_over_history {
            return None;
        }
        let last = field.last_crop()?;
        let profile = self.model.crop(last);
        if profile.is_none() {
            tracing::debug!(crop = last, "Ignoring history crop missing from the catalog");
        }
        profile
    }

    /// Estimates every year of a sequence.
    pub fn estimate_sequence(
        &self,
        sequence: &[String],
        field: &FieldProfile,
    ) -> Result<Vec<RotationYear>> {
        let crops = self.model.resolve(sequence)?;
        let mut previous = self.initial_predecessor(field);
        let mut years = Vec::with_capacity(crops.len());

        for (year, crop) in crops.into_iter().enumerate() {
            let estimate = self.estimate_profile(crop, year, previous, field);
            let (revenue, cost) = self.economics(crop, &estimate, field.acreage);
            years.push(RotationYear {
                year,
                crop: crop.name.clone(),
                preceding_crop: previous.map(|p| p.name.clone()),
                expected_yield: estimate.expected_yield,
                yield_unit: estimate.unit,
                nitrogen_credit_lbs: estimate.nitrogen_credit_lbs,
                revenue,
                cost,
                notes: estimate.notes,
            });
            previous = Some(crop);
        }

        Ok(years)
    }
}
