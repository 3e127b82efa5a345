//! Branch-and-bound search for feasible rotations.
//!
//! The search walks sequences depth-first. Every extension is checked
//! against the run and pair rules, and every prefix against a lookahead
//! bound for the whole-sequence rules, so infeasible subtrees are never
//! expanded. Each first-year crop is an independent root branch with its own
//! context and node budget; branches run on the rayon pool and are merged in
//! candidate order, which keeps results deterministic.

use super::validator::{ConstraintValidator, PrefixState};
use super::{CompatibilityModel, PlanBuilder};
use crate::config::SearchConfig;
use crate::error::{Result, RotaplanError};
use crate::models::{ConstraintKind, ConstraintSet, CropProfile, CropRotationPlan, Violation};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchState {
    Initialized,
    Expanding,
    Scoring,
    Complete,
    Infeasible,
}

impl std::fmt::Display for SearchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SearchState::Initialized => "initialized",
            SearchState::Expanding => "expanding",
            SearchState::Scoring => "scoring",
            SearchState::Complete => "complete",
            SearchState::Infeasible => "infeasible",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchBudget {
    /// Partial and complete sequences visited across all branches
    pub max_nodes: usize,
    pub deadline_ms: Option<u64>,
}

impl SearchBudget {
    pub fn new(max_nodes: usize) -> Self {
        Self {
            max_nodes,
            deadline_ms: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = Some(deadline.as_millis() as u64);
        self
    }
}

impl From<&SearchConfig> for SearchBudget {
    fn from(config: &SearchConfig) -> Self {
        Self {
            max_nodes: config.max_nodes,
            deadline_ms: config.deadline_ms,
        }
    }
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfeasibleReason {
    /// A constraint blocked every branch
    Constraint,
    /// The budget ran out before any feasible sequence was found
    BudgetExhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfeasibilityReport {
    pub reason: InfeasibleReason,
    /// Rule that blocked the deepest point the search reached
    pub blocking_rule: Option<ConstraintKind>,
    pub message: String,
    /// Prefix (including the rejected crop) at the deepest block
    pub deepest_prefix: Vec<String>,
    pub nodes_explored: usize,
}

impl InfeasibilityReport {
    pub fn cites(&self, rule: ConstraintKind) -> bool {
        self.blocking_rule == Some(rule)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationOutcome {
    Complete {
        plans: Vec<CropRotationPlan>,
        budget_exhausted: bool,
        nodes_explored: usize,
    },
    Infeasible(InfeasibilityReport),
}

impl GenerationOutcome {
    pub fn state(&self) -> SearchState {
        match self {
            GenerationOutcome::Complete { .. } => SearchState::Complete,
            GenerationOutcome::Infeasible(_) => SearchState::Infeasible,
        }
    }

    pub fn plans(&self) -> &[CropRotationPlan] {
        match self {
            GenerationOutcome::Complete { plans, .. } => plans,
            GenerationOutcome::Infeasible(_) => &[],
        }
    }
}

/// What to search: free candidates, a pinned prefix and the horizon.
#[derive(Debug, Clone)]
pub struct SearchSpace<'a> {
    pub candidates: Vec<&'a CropProfile>,
    pub hint: Vec<&'a CropProfile>,
    pub horizon: usize,
}

impl<'a> SearchSpace<'a> {
    /// Resolves names against the catalog; candidates are de-duplicated and
    /// sorted by name.
    pub fn resolve(
        model: &'a CompatibilityModel,
        candidates: &[String],
        hint: &[String],
        horizon: usize,
    ) -> Result<Self> {
        if horizon == 0 {
            return Err(RotaplanError::InvalidInput(
                "horizon_years must be at least 1".into(),
            ));
        }
        if hint.len() > horizon {
            return Err(RotaplanError::InvalidInput(format!(
                "sequence hint has {} years but the horizon is {}",
                hint.len(),
                horizon
            )));
        }

        let mut resolved = model.resolve(candidates)?;
        resolved.sort_by(|a, b| a.name.cmp(&b.name));
        resolved.dedup_by(|a, b| a.name == b.name);

        if resolved.is_empty() && hint.len() < horizon {
            return Err(RotaplanError::InvalidInput(
                "no candidate crops to fill the horizon".into(),
            ));
        }

        Ok(Self {
            candidates: resolved,
            hint: model.resolve(hint)?,
            horizon,
        })
    }

    /// Crops that may appear at `depth`.
    fn choices(&self, depth: usize) -> &[&'a CropProfile] {
        match self.hint.get(depth) {
            Some(pinned) => std::slice::from_ref(pinned),
            None => &self.candidates,
        }
    }

    /// Every crop that can appear anywhere, for lookahead bounds.
    fn universe(&self) -> Vec<&'a CropProfile> {
        let mut all: Vec<&CropProfile> = self
            .candidates
            .iter()
            .chain(self.hint.iter())
            .copied()
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all.dedup_by(|a, b| a.name == b.name);
        all
    }
}

#[derive(Debug, Clone)]
struct Blocked {
    depth: usize,
    prefix: Vec<String>,
    violation: Violation,
}

/// A scored feasible sequence.
#[derive(Debug, Clone)]
pub struct Ranked {
    pub overall: f64,
    pub aggregate_risk: f64,
    pub sequence: Vec<String>,
}

impl Ranked {
    /// Higher overall first, then lower aggregate risk, then lexical sequence.
    fn cmp_best_first(a: &Ranked, b: &Ranked) -> Ordering {
        b.overall
            .total_cmp(&a.overall)
            .then_with(|| a.aggregate_risk.total_cmp(&b.aggregate_risk))
            .then_with(|| a.sequence.cmp(&b.sequence))
    }
}

// Best sorts lowest, so a max-heap keeps the worst retained sequence on top.
impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        Ranked::cmp_best_first(self, other)
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

#[derive(Debug, Default)]
pub struct SearchResult {
    /// Best sequences found, best first, at most `top_n`
    pub best: Vec<Ranked>,
    /// Feasible sequences scored, including those that did not make the cut
    pub feasible: usize,
    /// Partial and complete sequences visited across all branches
    pub nodes_explored: usize,
    pub budget_exhausted: bool,
    deepest: Option<Blocked>,
}

impl SearchResult {
    pub fn sequences(&self) -> Vec<Vec<String>> {
        self.best.iter().map(|r| r.sequence.clone()).collect()
    }

    fn merge(mut self, other: SearchResult) -> Self {
        self.best.extend(other.best);
        self.feasible += other.feasible;
        self.nodes_explored += other.nodes_explored;
        self.budget_exhausted |= other.budget_exhausted;
        self.deepest = match (self.deepest, other.deepest) {
            (Some(a), Some(b)) if b.depth > a.depth => Some(b),
            (Some(a), _) => Some(a),
            (None, b) => b,
        };
        self
    }
}

/// Depth-first state of one root branch.
struct BranchContext<'s, 'a> {
    validator: &'s ConstraintValidator<'s>,
    builder: &'s PlanBuilder<'s>,
    space: &'s SearchSpace<'a>,
    universe: &'s [&'a CropProfile],
    node_limit: usize,
    deadline: Option<Instant>,
    top_n: usize,
    best: BinaryHeap<Ranked>,
    result: SearchResult,
}

impl<'s, 'a> BranchContext<'s, 'a> {
    fn out_of_budget(&mut self) -> bool {
        if self.result.budget_exhausted {
            return true;
        }
        let over_nodes = self.result.nodes_explored >= self.node_limit;
        let over_time = self.deadline.is_some_and(|d| Instant::now() >= d);
        if over_nodes || over_time {
            self.result.budget_exhausted = true;
        }
        self.result.budget_exhausted
    }

    fn block(
        &mut self,
        prefix: &[&CropProfile],
        crop: Option<&CropProfile>,
        violation: Violation,
    ) {
        let depth = prefix.len() + usize::from(crop.is_some());
        if self.result.deepest.as_ref().is_some_and(|b| b.depth >= depth) {
            return;
        }
        let mut names: Vec<String> = prefix.iter().map(|c| c.name.clone()).collect();
        if let Some(crop) = crop {
            names.push(crop.name.clone());
        }
        self.result.deepest = Some(Blocked {
            depth,
            prefix: names,
            violation,
        });
    }

    /// Tries `crop` as the next year of `prefix` and explores below it.
    fn try_extend(
        &mut self,
        prefix: &mut Vec<&'a CropProfile>,
        state: &PrefixState,
        crop: &'a CropProfile,
    ) -> Result<()> {
        if let Some(violation) = self.validator.check_extension(state, crop) {
            self.block(prefix, Some(crop), violation);
            return Ok(());
        }

        let next = state.extended(crop);
        let remaining = self.space.horizon - prefix.len() - 1;
        if let Some(violation) = self.validator.check_reachable(&next, remaining, self.universe) {
            self.block(prefix, Some(crop), violation);
            return Ok(());
        }

        prefix.push(crop);
        let explored = self.expand(prefix, &next);
        prefix.pop();
        explored
    }

    fn expand(&mut self, prefix: &mut Vec<&'a CropProfile>, state: &PrefixState) -> Result<()> {
        if self.out_of_budget() {
            return Ok(());
        }
        self.result.nodes_explored += 1;

        if prefix.len() == self.space.horizon {
            match self.validator.check_complete(state).into_iter().next() {
                None => self.score_leaf(prefix)?,
                Some(violation) => self.block(prefix, None, violation),
            }
            return Ok(());
        }

        let space = self.space;
        for &crop in space.choices(prefix.len()) {
            self.try_extend(prefix, state, crop)?;
            if self.result.budget_exhausted {
                break;
            }
        }
        Ok(())
    }

    fn score_leaf(&mut self, prefix: &[&CropProfile]) -> Result<()> {
        let sequence: Vec<String> = prefix.iter().map(|c| c.name.clone()).collect();
        let evaluation = self.builder.evaluate(&sequence)?;
        self.result.feasible += 1;
        self.best.push(Ranked {
            overall: evaluation.sustainability.overall,
            aggregate_risk: evaluation.risk.scores.aggregate(),
            sequence,
        });
        if self.best.len() > self.top_n {
            self.best.pop();
        }
        Ok(())
    }

    fn finish(mut self) -> SearchResult {
        self.result.best = self.best.into_sorted_vec();
        self.result
    }
}

pub struct RotationPlanGenerator<'a> {
    model: &'a CompatibilityModel,
    constraints: &'a ConstraintSet,
    budget: SearchBudget,
    parallel: bool,
}

impl<'a> RotationPlanGenerator<'a> {
    pub fn new(model: &'a CompatibilityModel, constraints: &'a ConstraintSet) -> Self {
        Self {
            model,
            constraints,
            budget: SearchBudget::default(),
            parallel: true,
        }
    }

    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Explores the space within the budget, scoring each feasible sequence
    /// as it is reached and keeping the best `top_n`.
    pub fn search(
        &self,
        space: &SearchSpace<'_>,
        builder: &PlanBuilder<'_>,
        top_n: usize,
    ) -> Result<SearchResult> {
        let validator = ConstraintValidator::new(self.model, self.constraints);
        validator.check_known_crops()?;
        let hint_names: Vec<String> = space.hint.iter().map(|c| c.name.clone()).collect();
        self.constraints.check_forced(&hint_names)?;

        let top_n = top_n.max(1);
        let universe = space.universe();
        let roots = space.choices(0);
        let node_limit = (self.budget.max_nodes / roots.len().max(1)).max(1);
        let deadline = self
            .budget
            .deadline_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        tracing::debug!(
            state = %SearchState::Expanding,
            roots = roots.len(),
            horizon = space.horizon,
            node_limit,
            "Starting rotation search"
        );

        let explore = |index: usize| -> Result<SearchResult> {
            let mut ctx = BranchContext {
                validator: &validator,
                builder,
                space,
                universe: &universe,
                node_limit,
                deadline,
                top_n,
                best: BinaryHeap::with_capacity(top_n + 1),
                result: SearchResult::default(),
            };
            let mut prefix = Vec::with_capacity(space.horizon);
            ctx.try_extend(&mut prefix, &PrefixState::new(), roots[index])?;
            Ok(ctx.finish())
        };

        // Merge in root order so the outcome does not depend on scheduling
        let branches: Vec<SearchResult> = if self.parallel {
            (0..roots.len())
                .into_par_iter()
                .map(explore)
                .collect::<Result<_>>()?
        } else {
            (0..roots.len()).map(explore).collect::<Result<_>>()?
        };
        let mut result = branches
            .into_iter()
            .fold(SearchResult::default(), SearchResult::merge);
        result.best.sort_by(Ranked::cmp_best_first);
        result.best.truncate(top_n);

        tracing::debug!(
            feasible = result.feasible,
            nodes = result.nodes_explored,
            budget_exhausted = result.budget_exhausted,
            "Rotation search finished"
        );
        if result.budget_exhausted {
            tracing::warn!(
                nodes = result.nodes_explored,
                max_nodes = self.budget.max_nodes,
                deadline_ms = ?self.budget.deadline_ms,
                "Search budget exhausted before the space was fully explored"
            );
        }

        Ok(result)
    }

    /// Searches and turns the best `top_n` sequences into plans.
    pub fn generate(
        &self,
        space: &SearchSpace<'_>,
        builder: &PlanBuilder<'_>,
        top_n: usize,
    ) -> Result<GenerationOutcome> {
        tracing::debug!(state = %SearchState::Initialized, "Rotation generation requested");
        let result = self.search(space, builder, top_n)?;

        if result.best.is_empty() {
            let report = infeasibility_report(result);
            tracing::info!(
                state = %SearchState::Infeasible,
                rule = ?report.blocking_rule,
                "{}",
                report.message
            );
            return Ok(GenerationOutcome::Infeasible(report));
        }

        tracing::debug!(
            state = %SearchState::Scoring,
            retained = result.best.len(),
            "Building plans for the best sequences"
        );

        let plans = result
            .best
            .iter()
            .map(|r| builder.build(&r.sequence, 1, None))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            state = %SearchState::Complete,
            feasible = result.feasible,
            returned = plans.len(),
            best = plans.first().map(|p| p.overall_sustainability_score),
            "Rotation generation complete"
        );

        Ok(GenerationOutcome::Complete {
            plans,
            budget_exhausted: result.budget_exhausted,
            nodes_explored: result.nodes_explored,
        })
    }
}

fn infeasibility_report(result: SearchResult) -> InfeasibilityReport {
    match result.deepest {
        Some(blocked) if !result.budget_exhausted => InfeasibilityReport {
            reason: InfeasibleReason::Constraint,
            blocking_rule: Some(blocked.violation.rule),
            message: format!(
                "no feasible rotation: {} (deepest prefix: {})",
                blocked.violation,
                blocked.prefix.join(" -> ")
            ),
            deepest_prefix: blocked.prefix,
            nodes_explored: result.nodes_explored,
        },
        blocked => InfeasibilityReport {
            reason: InfeasibleReason::BudgetExhausted,
            blocking_rule: blocked.as_ref().map(|b| b.violation.rule),
            message: format!(
                "search budget exhausted after {} nodes without a feasible rotation",
                result.nodes_explored
            ),
            deepest_prefix: blocked.map(|b| b.prefix).unwrap_or_default(),
            nodes_explored: result.nodes_explored,
        },
    }
}
