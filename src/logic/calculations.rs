use std::collections::BTreeMap;

/// Clamp a score into the 0-100 range. NaN collapses to 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Count occurrences of each key, keeping deterministic key order
pub fn frequencies<K: Ord, I: IntoIterator<Item = K>>(items: I) -> BTreeMap<K, usize> {
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    counts
}

/// Shannon diversity index H = -sum(p ln p) over category counts
pub fn shannon_index<K>(counts: &BTreeMap<K, usize>) -> f64 {
    let total: usize = counts.values().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .values()
        .filter(|c| **c > 0)
        .map(|c| {
            let p = *c as f64 / total;
            -p * p.ln()
        })
        .sum()
}

/// Shannon evenness on 0-1: H divided by the largest H reachable with
/// `observations` draws from `universe` categories.
///
/// The ceiling grows with the number of observations until it reaches the
/// universe size, so the result is relative to the sequence length. Two
/// families split 1:1 score 1.0 over two years but 0.5 over four, where four
/// families were possible. Compare evenness only between sequences of the
/// same length, or where both lengths are at least `universe`.
pub fn shannon_evenness<K>(counts: &BTreeMap<K, usize>, universe: usize) -> f64 {
    let observations: usize = counts.values().sum();
    let reachable = observations.min(universe);
    if reachable <= 1 {
        return 0.0;
    }
    (shannon_index(counts) / (reachable as f64).ln()).clamp(0.0, 1.0)
}

/// Linear map of `value` from [lo, hi] onto [0, 1], clamped
pub fn normalize(value: f64, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return if value >= hi { 1.0 } else { 0.0 };
    }
    ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
}
