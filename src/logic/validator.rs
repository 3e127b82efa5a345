//! Constraint checking for rotation sequences.
//!
//! `validate` walks a complete sequence once and collects every violation.
//! The generator uses the incremental half (`PrefixState`, `check_extension`,
//! `check_reachable`) to prune partial sequences as it builds them.

use super::CompatibilityModel;
use crate::error::{Result, RotaplanError};
use crate::models::{ConstraintKind, ConstraintSet, CropProfile, ValidationReport, Violation};
use std::collections::BTreeSet;

/// Summary of a partial sequence, enough to check the next extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixState {
    pub len: usize,
    pub last: Option<String>,
    pub run_length: u32,
    pub distinct: BTreeSet<String>,
    pub has_fixer: bool,
}

impl PrefixState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Length of the current run if `crop` were appended.
    pub fn run_after(&self, crop: &CropProfile) -> u32 {
        if self.last.as_deref() == Some(crop.name.as_str()) {
            self.run_length + 1
        } else {
            1
        }
    }

    /// State after appending `crop`. Does not check anything.
    pub fn push(&mut self, crop: &CropProfile) {
        if self.last.as_deref() == Some(crop.name.as_str()) {
            self.run_length += 1;
        } else {
            self.run_length = 1;
            self.last = Some(crop.name.clone());
        }
        self.distinct.insert(crop.name.clone());
        self.has_fixer |= crop.is_fixer();
        self.len += 1;
    }

    pub fn extended(&self, crop: &CropProfile) -> Self {
        let mut next = self.clone();
        next.push(crop);
        next
    }
}

fn run_violation(crop: &CropProfile, run: u32, max: u32, rule: ConstraintKind) -> Violation {
    Violation::new(
        rule,
        format!("{} grown {} years in a row (limit {})", crop.name, run, max),
    )
    .with_crop(&crop.name)
}

pub struct ConstraintValidator<'a> {
    model: &'a CompatibilityModel,
    constraints: &'a ConstraintSet,
}

impl<'a> ConstraintValidator<'a> {
    pub fn new(model: &'a CompatibilityModel, constraints: &'a ConstraintSet) -> Self {
        Self { model, constraints }
    }

    /// Every crop named by a constraint must exist in the catalog.
    pub fn check_known_crops(&self) -> Result<()> {
        for crop in self.constraints.referenced_crops() {
            if self.model.crop(crop).is_none() {
                return Err(RotaplanError::UnknownCrop(crop.to_string()));
            }
        }
        Ok(())
    }

    /// Effective consecutive-year limit for a crop and the rule that sets it.
    /// The farmer's limit wins ties with the catalog limit.
    pub fn effective_max(&self, crop: &CropProfile) -> Option<(u32, ConstraintKind)> {
        let farmer = self.constraints.max_consecutive_for(&crop.name);
        match (farmer, crop.max_consecutive_years) {
            (Some(f), Some(c)) if c < f => Some((c, ConstraintKind::Compatibility)),
            (Some(f), _) => Some((f, ConstraintKind::MaxConsecutive)),
            (None, Some(c)) => Some((c, ConstraintKind::Compatibility)),
            (None, None) => None,
        }
    }

    pub fn validate(&self, sequence: &[String]) -> Result<ValidationReport> {
        self.check_known_crops()?;

        if sequence.is_empty() {
            return Ok(ValidationReport::from_violations(vec![Violation::new(
                ConstraintKind::EmptySequence,
                "rotation sequence is empty",
            )]));
        }

        let crops = self.model.resolve(sequence)?;
        let mut violations = Vec::new();
        let mut state = PrefixState::new();

        for (position, crop) in crops.iter().enumerate() {
            let run = state.run_after(crop);
            if let Some((max, rule)) = self.effective_max(crop) {
                // An over-long run is reported once, where it first passes the limit
                if max.checked_add(1) == Some(run) {
                    violations.push(run_violation(crop, run, max, rule).at(position));
                }
            }
            if position > 0 {
                let prev = crops[position - 1];
                violations.extend(
                    self.check_pair(prev, crop)
                        .into_iter()
                        .map(|v| v.at(position)),
                );
            }
            state.push(crop);
        }

        violations.extend(self.check_complete(&state));

        if !violations.is_empty() {
            tracing::debug!(
                sequence = %sequence.join(","),
                violations = violations.len(),
                "Sequence failed validation"
            );
        }

        Ok(ValidationReport::from_violations(violations))
    }

    /// Run-length check for appending `crop` to the prefix, then pair rules.
    /// Returns the first violation only; the search needs nothing more.
    pub fn check_extension(&self, state: &PrefixState, crop: &CropProfile) -> Option<Violation> {
        let run = state.run_after(crop);
        if let Some((max, rule)) = self.effective_max(crop) {
            if run > max {
                return Some(run_violation(crop, run, max, rule));
            }
        }

        let prev = state.last.as_deref().and_then(|name| self.model.crop(name))?;
        self.check_pair(prev, crop).into_iter().next()
    }

    /// Forbidden sequences and catalog incompatibilities for one adjacent pair.
    fn check_pair(&self, prev: &CropProfile, crop: &CropProfile) -> Vec<Violation> {
        let mut out = Vec::new();

        if self.constraints.is_forbidden(&prev.name, &crop.name) {
            out.push(
                Violation::new(
                    ConstraintKind::ForbiddenSequence,
                    format!("{} may not follow {}", crop.name, prev.name),
                )
                .with_crop(&crop.name),
            );
        }

        if let Some(target) = crop.rejects_predecessor(prev) {
            out.push(
                Violation::new(
                    ConstraintKind::Compatibility,
                    format!(
                        "{} is incompatible after {} ({})",
                        crop.name, prev.name, target
                    ),
                )
                .with_crop(&crop.name),
            );
        }

        out
    }

    /// Whole-sequence rules, checked once the sequence is complete.
    pub fn check_complete(&self, state: &PrefixState) -> Vec<Violation> {
        let mut out = Vec::new();

        if let Some(min) = self.constraints.min_diversity {
            if state.distinct.len() < min {
                out.push(Violation::new(
                    ConstraintKind::MinDiversity,
                    format!(
                        "{} distinct crops, at least {} required",
                        state.distinct.len(),
                        min
                    ),
                ));
            }
        }

        if self.constraints.requires_nitrogen_fixer && !state.has_fixer {
            out.push(Violation::new(
                ConstraintKind::RequiresNitrogenFixer,
                "no nitrogen-fixing crop in the rotation",
            ));
        }

        out
    }

    /// Lookahead bound: can the remaining years still satisfy the whole-sequence
    /// rules given the candidate crops?
    pub fn check_reachable(
        &self,
        state: &PrefixState,
        remaining: usize,
        candidates: &[&CropProfile],
    ) -> Option<Violation> {
        if let Some(min) = self.constraints.min_diversity {
            let unused = candidates
                .iter()
                .filter(|c| !state.distinct.contains(&c.name))
                .count();
            let best = state.distinct.len() + remaining.min(unused);
            if best < min {
                return Some(Violation::new(
                    ConstraintKind::MinDiversity,
                    format!(
                        "at most {} distinct crops reachable, at least {} required",
                        best, min
                    ),
                ));
            }
        }

        if self.constraints.requires_nitrogen_fixer
            && !state.has_fixer
            && (remaining == 0 || !candidates.iter().any(|c| c.is_fixer()))
        {
            return Some(Violation::new(
                ConstraintKind::RequiresNitrogenFixer,
                "no nitrogen-fixing crop can still be placed",
            ));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(crops: &[&str]) -> Vec<String> {
        crops.iter().map(|c| c.to_string()).collect()
    }

    fn validate(constraints: &ConstraintSet, crops: &[&str]) -> ValidationReport {
        let model = CompatibilityModel::builtin();
        ConstraintValidator::new(&model, constraints)
            .validate(&seq(crops))
            .unwrap()
    }

    #[test]
    fn corn_soybean_alternation_is_valid() {
        let set = ConstraintSet::new().with_max_consecutive("corn", 1);
        let report = validate(&set, &["corn", "soybean", "corn", "soybean"]);
        assert!(report.valid, "{:?}", report.messages());
    }

    #[test]
    fn run_above_max_is_rejected_once() {
        let set = ConstraintSet::new().with_max_consecutive("corn", 1);
        let report = validate(&set, &["corn", "corn", "corn"]);
        assert!(!report.valid);
        assert_eq!(report.violations.len(), 1);
        let v = &report.violations[0];
        assert_eq!(v.rule, ConstraintKind::MaxConsecutive);
        assert_eq!(v.crop.as_deref(), Some("corn"));
        assert_eq!(v.position, Some(1));
    }

    #[test]
    fn run_equal_to_max_is_accepted() {
        let set = ConstraintSet::new().with_max_consecutive("corn", 2);
        let report = validate(&set, &["corn", "corn", "soybean"]);
        assert!(report.valid, "{:?}", report.messages());
    }

    #[test]
    fn catalog_limit_applies_without_farmer_limit() {
        // Canola allows a single year before another crop
        let report = validate(&ConstraintSet::new(), &["canola", "canola"]);
        assert!(report.has_rule(ConstraintKind::Compatibility));
        assert!(!report.has_rule(ConstraintKind::MaxConsecutive));
    }

    #[test]
    fn stricter_catalog_limit_wins() {
        let set = ConstraintSet::new().with_max_consecutive("soybean", 5);
        let report = validate(&set, &["soybean", "soybean", "soybean"]);
        assert!(report.has_rule(ConstraintKind::Compatibility));
    }

    #[test]
    fn separate_runs_are_reported_separately() {
        let set = ConstraintSet::new().with_max_consecutive("corn", 1);
        let report = validate(&set, &["corn", "corn", "soybean", "corn", "corn"]);
        let positions: Vec<_> = report
            .violations
            .iter()
            .filter(|v| v.rule == ConstraintKind::MaxConsecutive)
            .map(|v| v.position)
            .collect();
        assert_eq!(positions, vec![Some(1), Some(4)]);
    }

    #[test]
    fn forbidden_sequence_is_directional() {
        let set = ConstraintSet::new().with_forbidden("corn", "wheat");
        assert!(validate(&set, &["corn", "wheat"]).has_rule(ConstraintKind::ForbiddenSequence));
        assert!(validate(&set, &["wheat", "corn"]).valid);
    }

    #[test]
    fn incompatible_predecessor_is_reported() {
        let report = validate(&ConstraintSet::new(), &["sunflower", "canola"]);
        assert!(report.has_rule(ConstraintKind::Compatibility));
        assert_eq!(report.violations[0].position, Some(1));
    }

    #[test]
    fn min_diversity_and_fixer_are_whole_sequence_rules() {
        let set = ConstraintSet::new()
            .with_min_diversity(3)
            .with_nitrogen_fixer();
        let report = validate(&set, &["corn", "wheat", "corn"]);
        assert!(report.has_rule(ConstraintKind::MinDiversity));
        assert!(report.has_rule(ConstraintKind::RequiresNitrogenFixer));

        let ok = validate(&set, &["corn", "soybean", "wheat"]);
        assert!(ok.valid, "{:?}", ok.messages());
    }

    #[test]
    fn single_year_can_only_fail_diversity() {
        let set = ConstraintSet::new()
            .with_max_consecutive("corn", 1)
            .with_min_diversity(2);
        let report = validate(&set, &["corn"]);
        assert_eq!(report.violations.len(), 1);
        assert!(report.has_rule(ConstraintKind::MinDiversity));
    }

    #[test]
    fn empty_sequence_is_invalid() {
        let report = validate(&ConstraintSet::new(), &[]);
        assert!(!report.valid);
        assert!(report.has_rule(ConstraintKind::EmptySequence));
    }

    #[test]
    fn unknown_crop_aborts() {
        let model = CompatibilityModel::builtin();
        let set = ConstraintSet::new();
        let err = ConstraintValidator::new(&model, &set)
            .validate(&seq(&["corn", "kudzu"]))
            .unwrap_err();
        assert!(matches!(err, RotaplanError::UnknownCrop(ref c) if c == "kudzu"));
    }

    #[test]
    fn constraint_on_unknown_crop_aborts() {
        let model = CompatibilityModel::builtin();
        let set = ConstraintSet::new().with_max_consecutive("kudzu", 1);
        let err = ConstraintValidator::new(&model, &set)
            .validate(&seq(&["corn"]))
            .unwrap_err();
        assert!(matches!(err, RotaplanError::UnknownCrop(_)));
    }

    #[test]
    fn reachability_bounds_diversity() {
        let model = CompatibilityModel::builtin();
        let set = ConstraintSet::new().with_min_diversity(3);
        let validator = ConstraintValidator::new(&model, &set);
        let corn = model.crop("corn").unwrap();
        let soybean = model.crop("soybean").unwrap();
        let wheat = model.crop("wheat").unwrap();

        let mut state = PrefixState::new();
        state.push(corn);
        state.push(corn);

        // One year left, only one unused crop: at most 2 distinct
        assert!(validator
            .check_reachable(&state, 1, &[corn, soybean, wheat])
            .is_some());

        let mut state = PrefixState::new();
        state.push(corn);
        assert!(validator
            .check_reachable(&state, 2, &[corn, soybean, wheat])
            .is_none());
    }

    #[test]
    fn reachability_bounds_fixer() {
        let model = CompatibilityModel::builtin();
        let set = ConstraintSet::new().with_nitrogen_fixer();
        let validator = ConstraintValidator::new(&model, &set);
        let corn = model.crop("corn").unwrap();
        let wheat = model.crop("wheat").unwrap();
        let soybean = model.crop("soybean").unwrap();

        let state = PrefixState::new().extended(corn);
        assert!(validator.check_reachable(&state, 2, &[corn, wheat]).is_some());
        assert!(validator.check_reachable(&state, 2, &[corn, soybean]).is_none());
        assert!(validator.check_reachable(&state, 0, &[corn, soybean]).is_some());
    }

    #[test]
    fn prefix_state_tracks_runs() {
        let model = CompatibilityModel::builtin();
        let corn = model.crop("corn").unwrap();
        let soybean = model.crop("soybean").unwrap();

        let state = PrefixState::new()
            .extended(corn)
            .extended(corn)
            .extended(soybean);
        assert_eq!(state.len, 3);
        assert_eq!(state.run_length, 1);
        assert_eq!(state.last.as_deref(), Some("soybean"));
        assert_eq!(state.distinct.len(), 2);
        assert!(state.has_fixer);
    }
}
