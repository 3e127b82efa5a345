use rotaplan::config::{Config, RiskThresholds};
use rotaplan::logic::{
    CompatibilityModel, GenerationOutcome, InfeasibleReason, SearchBudget, YieldOverrides,
};
use rotaplan::models::{
    ClimateZone, ConstraintKind, DrainageClass, FieldProfile, RiskLevel, RotationConstraint,
    SoilTexture,
};
use rotaplan::{Database, GenerateRequest, InMemoryFields, RotaplanError, RotationEngine};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn temperate_loam() -> FieldProfile {
    FieldProfile::new("north-40", 40.0, ClimateZone::Temperate)
        .with_soil(SoilTexture::Loam, DrainageClass::WellDrained)
}

fn engine() -> RotationEngine {
    RotationEngine::new(
        Arc::new(CompatibilityModel::builtin()),
        Arc::new(Config::default()),
        Arc::new(InMemoryFields::new().with_field(temperate_loam())),
    )
}

fn seq(crops: &[&str]) -> Vec<String> {
    crops.iter().map(|c| c.to_string()).collect()
}

fn corn_max(max: u32) -> RotationConstraint {
    RotationConstraint::MaxConsecutive {
        crop: "corn".into(),
        max,
    }
}

#[test]
fn corn_soybean_alternation_is_valid_and_second_corn_yields_more() {
    let engine = engine();
    let sequence = seq(&["corn", "soybean", "corn", "soybean"]);

    let report = engine
        .validate_constraints(&sequence, &[corn_max(1)])
        .unwrap();
    assert!(report.valid, "unexpected violations: {:?}", report.messages());

    let plan = engine
        .build_plan("north-40", &sequence, &YieldOverrides::default())
        .unwrap();
    assert_eq!(plan.horizon(), 4);
    assert!(plan.years[2].expected_yield > plan.years[0].expected_yield);
    assert!(plan.years[2].nitrogen_credit_lbs > 0.0);
    assert_eq!(plan.years[0].nitrogen_credit_lbs, 0.0);
}

#[test]
fn continuous_corn_breaks_max_consecutive() {
    let report = engine()
        .validate_constraints(&seq(&["corn", "corn", "corn"]), &[corn_max(1)])
        .unwrap();

    assert!(!report.valid);
    let violation = report
        .violations
        .iter()
        .find(|v| v.rule == ConstraintKind::MaxConsecutive)
        .expect("MAX_CONSECUTIVE violation");
    assert_eq!(violation.crop.as_deref(), Some("corn"));
    assert_eq!(violation.position, Some(1));
    // reported once, where the run first exceeds the limit
    assert_eq!(
        report
            .violations
            .iter()
            .filter(|v| v.rule == ConstraintKind::MaxConsecutive)
            .count(),
        1
    );
}

#[test]
fn run_equal_to_max_is_accepted() {
    let report = engine()
        .validate_constraints(&seq(&["corn", "corn", "soybean"]), &[corn_max(2)])
        .unwrap();
    assert!(report.valid);
}

#[test]
fn min_diversity_three_uses_every_candidate() {
    let request = GenerateRequest::new("north-40", 3)
        .with_candidates(&["corn", "soybean", "wheat"])
        .with_constraint(RotationConstraint::MinDiversity { min: 3 })
        .with_top_n(3);

    match engine().generate(&request).unwrap() {
        GenerationOutcome::Complete {
            plans,
            budget_exhausted,
            ..
        } => {
            assert!(!budget_exhausted);
            assert!(!plans.is_empty());
            for plan in &plans {
                let mut crops = plan.sequence();
                crops.sort();
                assert_eq!(crops, seq(&["corn", "soybean", "wheat"]));
                assert_eq!(plan.sustainability.analysis_details.unique_crops_count, 3);
            }
            let scores: Vec<f64> = plans.iter().map(|p| p.overall_sustainability_score).collect();
            assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        }
        GenerationOutcome::Infeasible(report) => {
            assert!(report.cites(ConstraintKind::MinDiversity), "{}", report.message);
        }
    }
}

#[test]
fn unreachable_diversity_is_infeasible() {
    let request = GenerateRequest::new("north-40", 2)
        .with_candidates(&["corn", "soybean", "wheat"])
        .with_constraint(RotationConstraint::MinDiversity { min: 3 });

    match engine().generate(&request).unwrap() {
        GenerationOutcome::Infeasible(report) => {
            assert_eq!(report.reason, InfeasibleReason::Constraint);
            assert!(report.cites(ConstraintKind::MinDiversity));
        }
        other => panic!("expected infeasible, got {:?}", other.state()),
    }
}

#[test]
fn tiny_budget_without_results_reports_exhaustion() {
    let request = GenerateRequest::new("north-40", 4).with_budget(SearchBudget::new(1));

    match engine().generate(&request).unwrap() {
        GenerationOutcome::Infeasible(report) => {
            assert_eq!(report.reason, InfeasibleReason::BudgetExhausted);
        }
        other => panic!("expected budget exhaustion, got {:?}", other.state()),
    }
}

#[test]
fn deadline_caps_generation_over_the_whole_catalog() {
    let budget = SearchBudget::new(usize::MAX).with_deadline(Duration::from_millis(100));
    let request = GenerateRequest::new("north-40", 6)
        .with_budget(budget)
        .with_top_n(2);

    let started = Instant::now();
    let outcome = engine().generate(&request).unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(3), "took {:?}", elapsed);
    match outcome {
        GenerationOutcome::Complete {
            plans,
            budget_exhausted,
            ..
        } => {
            assert!(budget_exhausted);
            assert!(!plans.is_empty() && plans.len() <= 2);
        }
        GenerationOutcome::Infeasible(report) => {
            assert_eq!(report.reason, InfeasibleReason::BudgetExhausted);
        }
    }
}

#[test]
fn generation_is_deterministic() {
    let request = GenerateRequest::new("north-40", 3)
        .with_candidates(&["corn", "soybean", "wheat", "oats"])
        .with_constraint(RotationConstraint::RequiresNitrogenFixer)
        .with_top_n(5);
    let engine = engine();

    let first: Vec<Vec<String>> = engine
        .generate(&request)
        .unwrap()
        .plans()
        .iter()
        .map(|p| p.sequence())
        .collect();
    let second: Vec<Vec<String>> = engine
        .generate(&request)
        .unwrap()
        .plans()
        .iter()
        .map(|p| p.sequence())
        .collect();

    assert_eq!(first.len(), 5);
    assert_eq!(first, second);
    assert!(first.iter().all(|s| s.iter().any(|c| c == "soybean")));
}

#[test]
fn empty_sequence_score_is_a_validation_error() {
    let err = engine().score_sequence("north-40", &[]).unwrap_err();
    assert!(matches!(err, RotaplanError::EmptySequence));
}

#[test]
fn scores_stay_in_range() {
    let engine = engine();
    for crops in [
        vec!["corn"],
        vec!["corn", "corn", "corn"],
        vec!["corn", "soybean", "wheat", "oats"],
    ] {
        let score = engine.score_sequence("north-40", &seq(&crops)).unwrap();
        for (_, value) in score.sustainability_scores.iter() {
            assert!((0.0..=100.0).contains(&value), "{:?}: {}", crops, value);
        }
        assert!((0.0..=100.0).contains(&score.overall_sustainability_score));
    }
}

#[test]
fn critical_boundary_is_85() {
    let thresholds = RiskThresholds::default();
    assert_eq!(RiskLevel::from_max_score(84.0, &thresholds), RiskLevel::High);
    assert_eq!(RiskLevel::from_max_score(84.999, &thresholds), RiskLevel::High);
    assert_eq!(RiskLevel::from_max_score(85.0, &thresholds), RiskLevel::Critical);
    assert_eq!(RiskLevel::from_max_score(49.9, &thresholds), RiskLevel::Low);
}

#[test]
fn identical_plans_compare_evenly() {
    let engine = engine();
    let overrides = YieldOverrides::default();
    let sequence = seq(&["corn", "soybean", "wheat"]);
    let v1 = engine.build_plan("north-40", &sequence, &overrides).unwrap();
    let v2 = engine.revise_plan(&v1, &sequence, &overrides).unwrap();

    let comparison = engine.compare_plans(&[v2.clone(), v1.clone()]).unwrap();
    assert!(comparison
        .rows
        .iter()
        .all(|row| row.deltas.iter().all(|d| d.abs() < 1e-9)));
    assert_eq!(comparison.recommended_plan_id, v1.id);
}

#[test]
fn sqlite_fields_back_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("rotaplan.db")).unwrap();
    db.upsert_field(&temperate_loam().with_history(2024, "soybean"))
        .unwrap();

    let engine = RotationEngine::new(
        Arc::new(CompatibilityModel::builtin()),
        Arc::new(Config::default()),
        Arc::new(db),
    );

    let score = engine
        .score_sequence("north-40", &seq(&["corn", "soybean"]))
        .unwrap();
    assert!(score.analysis_details.has_nitrogen_fixer);

    let err = engine
        .score_sequence("south-80", &seq(&["corn"]))
        .unwrap_err();
    assert!(matches!(err, RotaplanError::UnknownField(_)));
}
