//! Selection strategies (§4.5.1): deterministic rules for picking an idle
//! session out of a pool's `available` list, plus the adaptive meta-strategy
//! that ranks the others against each other.

use crate::metrics::StrategyMetrics;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// One of the six strategies named in the data model. `Adaptive` is a
/// meta-strategy: it periodically re-ranks the other five and delegates to
/// whichever currently scores best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionStrategy {
    RoundRobin,
    LeastConnections,
    LeastLatency,
    Random,
    Weighted,
    Adaptive,
}

/// The five concrete strategies `Adaptive` ranks among. Excludes `Adaptive`
/// itself, since ranking a meta-strategy against itself is meaningless.
const CONCRETE_STRATEGIES: [SelectionStrategy; 5] = [
    SelectionStrategy::RoundRobin,
    SelectionStrategy::LeastConnections,
    SelectionStrategy::LeastLatency,
    SelectionStrategy::Random,
    SelectionStrategy::Weighted,
];

impl SelectionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionStrategy::RoundRobin => "round_robin",
            SelectionStrategy::LeastConnections => "least_connections",
            SelectionStrategy::LeastLatency => "least_latency",
            SelectionStrategy::Random => "random",
            SelectionStrategy::Weighted => "weighted",
            SelectionStrategy::Adaptive => "adaptive",
        }
    }
}

/// Lightweight view of one idle session, as the strategy needs it. `index`
/// is the position within the pool's `available` list the caller should use
/// to pull the chosen session out.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub index: usize,
    pub session_id: u64,
    pub reuse_count: u64,
    pub last_used_at_ms: u64,
}

/// Per-pool mutable state a strategy needs across calls: the round-robin
/// cursor and the adaptive ranking bookkeeping.
pub struct StrategyState {
    round_robin_cursor: AtomicUsize,
    adaptive_current: std::sync::Mutex<SelectionStrategy>,
    adaptive_acquisitions: AtomicUsize,
    adaptive_last_ranked_ms: AtomicU64,
}

const ADAPTIVE_RERANK_ACQUISITIONS: usize = 200;
const ADAPTIVE_RERANK_INTERVAL_MS: u64 = 30_000;
const ADAPTIVE_SWITCH_THRESHOLD: f64 = 0.10;
const ADAPTIVE_FAILURE_PENALTY_MS: f64 = 1_000.0;

impl StrategyState {
    pub fn new() -> Self {
        Self {
            round_robin_cursor: AtomicUsize::new(0),
            adaptive_current: std::sync::Mutex::new(SelectionStrategy::RoundRobin),
            adaptive_acquisitions: AtomicUsize::new(0),
            adaptive_last_ranked_ms: AtomicU64::new(0),
        }
    }

    /// Selects a candidate using `configured`, resolving `Adaptive` to its
    /// current best-ranked concrete strategy first.
    pub fn select(
        &self,
        configured: SelectionStrategy,
        candidates: &[Candidate],
        metrics: &StrategyMetrics,
        now_ms: u64,
    ) -> Option<Candidate> {
        if candidates.is_empty() {
            return None;
        }

        let effective = if configured == SelectionStrategy::Adaptive {
            self.resolve_adaptive(metrics, now_ms)
        } else {
            configured
        };

        self.select_concrete(effective, candidates, metrics)
    }

    fn resolve_adaptive(&self, metrics: &StrategyMetrics, now_ms: u64) -> SelectionStrategy {
        let acquisitions = self.adaptive_acquisitions.fetch_add(1, Ordering::Relaxed) + 1;
        let last_ranked = self.adaptive_last_ranked_ms.load(Ordering::Relaxed);
        let due = acquisitions >= ADAPTIVE_RERANK_ACQUISITIONS
            || now_ms.saturating_sub(last_ranked) >= ADAPTIVE_RERANK_INTERVAL_MS;

        if !due {
            return *self.adaptive_current.lock().unwrap();
        }

        self.adaptive_acquisitions.store(0, Ordering::Relaxed);
        self.adaptive_last_ranked_ms.store(now_ms, Ordering::Relaxed);

        let mut current = self.adaptive_current.lock().unwrap();
        let current_score = Self::score(*current, metrics, now_ms);

        let mut best = *current;
        let mut best_score = current_score;
        for candidate_strategy in CONCRETE_STRATEGIES {
            let score = Self::score(candidate_strategy, metrics, now_ms);
            if score < best_score {
                best = candidate_strategy;
                best_score = score;
            }
        }

        // Hysteretic switch: only move if the challenger beats the
        // incumbent by at least 10%, so a strategy flapping near the
        // decision boundary doesn't thrash every ranking interval.
        if best != *current && current_score > 0.0 {
            let improvement = (current_score - best_score) / current_score;
            if improvement >= ADAPTIVE_SWITCH_THRESHOLD {
                *current = best;
            }
        } else if current_score == 0.0 && best != *current {
            *current = best;
        }

        *current
    }

    fn score(strategy: SelectionStrategy, metrics: &StrategyMetrics, now_ms: u64) -> f64 {
        let summary = metrics.summary(strategy, now_ms, 15 * 60 * 1000);
        if summary.count == 0 {
            return 0.0;
        }
        summary.p95_ms as f64 + ADAPTIVE_FAILURE_PENALTY_MS * (1.0 - summary.success_rate)
    }

    fn select_concrete(
        &self,
        strategy: SelectionStrategy,
        candidates: &[Candidate],
        metrics: &StrategyMetrics,
    ) -> Option<Candidate> {
        match strategy {
            SelectionStrategy::RoundRobin => {
                let mut sorted: Vec<&Candidate> = candidates.iter().collect();
                sorted.sort_by_key(|c| c.session_id);
                let cursor = self.round_robin_cursor.fetch_add(1, Ordering::Relaxed);
                sorted.get(cursor % sorted.len()).copied().copied()
            }
            SelectionStrategy::LeastConnections => candidates
                .iter()
                .min_by(|a, b| {
                    a.reuse_count
                        .cmp(&b.reuse_count)
                        .then(a.last_used_at_ms.cmp(&b.last_used_at_ms))
                        .then(a.session_id.cmp(&b.session_id))
                })
                .copied(),
            SelectionStrategy::LeastLatency => candidates
                .iter()
                .min_by(|a, b| {
                    let a_ema = metrics.session_ema_latency(a.session_id).unwrap_or(f64::INFINITY);
                    let b_ema = metrics.session_ema_latency(b.session_id).unwrap_or(f64::INFINITY);
                    a_ema
                        .partial_cmp(&b_ema)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(a.reuse_count.cmp(&b.reuse_count))
                        .then(a.last_used_at_ms.cmp(&b.last_used_at_ms))
                        .then(a.session_id.cmp(&b.session_id))
                })
                .copied(),
            SelectionStrategy::Random => {
                use rand::Rng;
                let idx = rand::rng().random_range(0..candidates.len());
                candidates.get(idx).copied()
            }
            SelectionStrategy::Weighted => {
                const EPSILON: f64 = 0.01;
                let weights: Vec<f64> = candidates
                    .iter()
                    .map(|c| {
                        let ema = metrics.session_ema_latency(c.session_id).unwrap_or(0.0);
                        let failure_rate = metrics.session_failure_rate(c.session_id, 50);
                        (1.0 / (1.0 + ema)).max(EPSILON) * (1.0 - failure_rate).max(EPSILON)
                    })
                    .collect();
                let total: f64 = weights.iter().sum();
                if total <= 0.0 {
                    return candidates.first().copied();
                }
                use rand::Rng;
                let mut pick = rand::rng().random_range(0.0..total);
                for (candidate, weight) in candidates.iter().zip(weights.iter()) {
                    if pick < *weight {
                        return Some(*candidate);
                    }
                    pick -= weight;
                }
                candidates.last().copied()
            }
            SelectionStrategy::Adaptive => {
                unreachable!("Adaptive is resolved to a concrete strategy before selection")
            }
        }
    }
}

impl Default for StrategyState {
    fn default() -> Self {
        Self::new()
    }
}
