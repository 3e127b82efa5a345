use crate::error::{Result, RotaplanError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A farmer-supplied rule on the shape of a rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RotationConstraint {
    MaxConsecutive { crop: String, max: u32 },
    MinDiversity { min: usize },
    RequiresNitrogenFixer,
    ForbiddenSequence { from: String, to: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintKind {
    MaxConsecutive,
    MinDiversity,
    RequiresNitrogenFixer,
    ForbiddenSequence,
    Compatibility,
    EmptySequence,
}

impl ConstraintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintKind::MaxConsecutive => "MAX_CONSECUTIVE",
            ConstraintKind::MinDiversity => "MIN_DIVERSITY",
            ConstraintKind::RequiresNitrogenFixer => "REQUIRES_NITROGEN_FIXER",
            ConstraintKind::ForbiddenSequence => "FORBIDDEN_SEQUENCE",
            ConstraintKind::Compatibility => "COMPATIBILITY",
            ConstraintKind::EmptySequence => "EMPTY_SEQUENCE",
        }
    }
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized, consistency-checked form of a constraint list.
///
/// Crop names are lower-cased so lookups match the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConstraintSet {
    pub max_consecutive: BTreeMap<String, u32>,
    pub min_diversity: Option<usize>,
    pub requires_nitrogen_fixer: bool,
    pub forbidden: BTreeSet<(String, String)>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from raw constraints, rejecting contradictory duplicates.
    pub fn from_constraints(constraints: &[RotationConstraint]) -> Result<Self> {
        let mut set = Self::default();

        for constraint in constraints {
            match constraint {
                RotationConstraint::MaxConsecutive { crop, max } => {
                    let key = crop.trim().to_lowercase();
                    if let Some(existing) = set.max_consecutive.insert(key.clone(), *max) {
                        if existing != *max {
                            return Err(RotaplanError::InvalidConstraintSet(format!(
                                "MAX_CONSECUTIVE for '{}' given twice with different limits ({} and {})",
                                key, existing, max
                            )));
                        }
                    }
                }
                RotationConstraint::MinDiversity { min } => {
                    if let Some(existing) = set.min_diversity.replace(*min) {
                        if existing != *min {
                            return Err(RotaplanError::InvalidConstraintSet(format!(
                                "MIN_DIVERSITY given twice with different values ({} and {})",
                                existing, min
                            )));
                        }
                    }
                }
                RotationConstraint::RequiresNitrogenFixer => {
                    set.requires_nitrogen_fixer = true;
                }
                RotationConstraint::ForbiddenSequence { from, to } => {
                    set.forbidden
                        .insert((from.trim().to_lowercase(), to.trim().to_lowercase()));
                }
            }
        }

        Ok(set)
    }

    pub fn with_max_consecutive(mut self, crop: &str, max: u32) -> Self {
        self.max_consecutive.insert(crop.to_lowercase(), max);
        self
    }

    pub fn with_min_diversity(mut self, min: usize) -> Self {
        self.min_diversity = Some(min);
        self
    }

    pub fn with_nitrogen_fixer(mut self) -> Self {
        self.requires_nitrogen_fixer = true;
        self
    }

    pub fn with_forbidden(mut self, from: &str, to: &str) -> Self {
        self.forbidden.insert((from.to_lowercase(), to.to_lowercase()));
        self
    }

    pub fn max_consecutive_for(&self, crop: &str) -> Option<u32> {
        self.max_consecutive.get(crop).copied()
    }

    pub fn is_forbidden(&self, from: &str, to: &str) -> bool {
        self.forbidden
            .contains(&(from.to_string(), to.to_string()))
    }

    /// Crop names referenced by any constraint.
    pub fn referenced_crops(&self) -> BTreeSet<&str> {
        let mut crops: BTreeSet<&str> = self.max_consecutive.keys().map(String::as_str).collect();
        for (from, to) in &self.forbidden {
            crops.insert(from.as_str());
            crops.insert(to.as_str());
        }
        crops
    }

    /// Rejects constraints that contradict crops the caller forces into the rotation.
    pub fn check_forced(&self, forced: &[String]) -> Result<()> {
        for crop in forced {
            if self.max_consecutive_for(crop) == Some(0) {
                return Err(RotaplanError::InvalidConstraintSet(format!(
                    "MAX_CONSECUTIVE for '{}' is 0 but the crop is required by the sequence hint",
                    crop
                )));
            }
        }
        for pair in forced.windows(2) {
            if self.is_forbidden(&pair[0], &pair[1]) {
                return Err(RotaplanError::InvalidConstraintSet(format!(
                    "FORBIDDEN_SEQUENCE {} -> {} contradicts the sequence hint",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: ConstraintKind,
    pub crop: Option<String>,
    pub position: Option<usize>,
    pub message: String,
}

impl Violation {
    pub fn new(rule: ConstraintKind, message: impl Into<String>) -> Self {
        Self {
            rule,
            crop: None,
            position: None,
            message: message.into(),
        }
    }

    pub fn with_crop(mut self, crop: &str) -> Self {
        self.crop = Some(crop.to_string());
        self
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.rule, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.to_string()).collect()
    }

    pub fn has_rule(&self, rule: ConstraintKind) -> bool {
        self.violations.iter().any(|v| v.rule == rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraints_deserialize_from_tagged_yaml() {
        let yaml = r#"
- type: max_consecutive
  crop: Corn
  max: 1
- type: min_diversity
  min: 3
- type: requires_nitrogen_fixer
- type: forbidden_sequence
  from: canola
  to: sunflower
"#;
        let raw: Vec<RotationConstraint> = serde_yaml::from_str(yaml).unwrap();
        let set = ConstraintSet::from_constraints(&raw).unwrap();

        assert_eq!(set.max_consecutive_for("corn"), Some(1));
        assert_eq!(set.min_diversity, Some(3));
        assert!(set.requires_nitrogen_fixer);
        assert!(set.is_forbidden("canola", "sunflower"));
        assert!(!set.is_forbidden("sunflower", "canola"));
    }

    #[test]
    fn conflicting_max_consecutive_is_rejected() {
        let raw = vec![
            RotationConstraint::MaxConsecutive {
                crop: "corn".into(),
                max: 1,
            },
            RotationConstraint::MaxConsecutive {
                crop: "CORN".into(),
                max: 2,
            },
        ];
        let err = ConstraintSet::from_constraints(&raw).unwrap_err();
        assert!(matches!(err, RotaplanError::InvalidConstraintSet(_)));
    }

    #[test]
    fn repeated_identical_constraint_is_accepted() {
        let raw = vec![
            RotationConstraint::MinDiversity { min: 2 },
            RotationConstraint::MinDiversity { min: 2 },
        ];
        assert!(ConstraintSet::from_constraints(&raw).is_ok());
    }

    #[test]
    fn zero_max_on_forced_crop_is_contradictory() {
        let set = ConstraintSet::new().with_max_consecutive("wheat", 0);
        let err = set
            .check_forced(&["corn".to_string(), "wheat".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("wheat"));
        assert!(set.check_forced(&["corn".to_string()]).is_ok());
    }

    #[test]
    fn violation_display_names_rule() {
        let v = Violation::new(ConstraintKind::MaxConsecutive, "corn grown 3 years in a row")
            .with_crop("corn")
            .at(2);
        assert_eq!(v.to_string(), "[MAX_CONSECUTIVE] corn grown 3 years in a row");
        assert_eq!(v.position, Some(2));
    }
}
