//! Strategy metrics (C6): bounded per-strategy ring buffers feeding
//! selection decisions and observability.

use crate::strategy::SelectionStrategy;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// One recorded outcome of an acquisition/invocation cycle, keyed by the
/// strategy that was active when it happened. `session_id` is `None` for
/// samples recorded before a session was chosen (e.g. a breaker rejection).
#[derive(Debug, Clone)]
pub struct StrategySample {
    pub strategy: SelectionStrategy,
    pub session_id: Option<u64>,
    pub ts_ms: u64,
    pub response_ms: u64,
    pub success: bool,
    pub reused: bool,
    pub wait_ms: u64,
    pub error: Option<String>,
}

/// Aggregate view over a window of samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategySummary {
    pub count: usize,
    pub success_rate: f64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub mean_ms: f64,
}

impl StrategySummary {
    fn empty() -> Self {
        Self {
            count: 0,
            success_rate: 1.0,
            p50_ms: 0,
            p95_ms: 0,
            mean_ms: 0.0,
        }
    }
}

const MAX_SAMPLES_PER_STRATEGY: usize = 1000;
const MAX_SAMPLES_PER_SESSION: usize = 200;

struct StrategyBucket {
    samples: VecDeque<StrategySample>,
    ema_latency_ms: f64,
    ema_initialized: bool,
}

impl StrategyBucket {
    fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(MAX_SAMPLES_PER_STRATEGY),
            ema_latency_ms: 0.0,
            ema_initialized: false,
        }
    }
}

/// Per-session latency/outcome tracking, keyed by `session_id`, feeding the
/// `least_latency` and `weighted` strategies' per-candidate signal.
struct SessionBucket {
    ema_latency_ms: f64,
    ema_initialized: bool,
    recent_outcomes: VecDeque<bool>,
}

impl SessionBucket {
    fn new() -> Self {
        Self {
            ema_latency_ms: 0.0,
            ema_initialized: false,
            recent_outcomes: VecDeque::with_capacity(MAX_SAMPLES_PER_SESSION),
        }
    }
}

/// Bounded ring buffer of [`StrategySample`]s per strategy, for one pool.
///
/// Eviction is FIFO once a strategy's buffer hits
/// [`MAX_SAMPLES_PER_STRATEGY`]; `summary` never reads samples older than
/// its window; insertion order is preserved so `ema_latency` can be
/// recomputed deterministically from any starting point.
pub struct StrategyMetrics {
    buckets: Mutex<HashMap<&'static str, StrategyBucket>>,
    sessions: Mutex<HashMap<u64, SessionBucket>>,
}

impl StrategyMetrics {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Records one sample, evicting the oldest if the strategy's buffer is
    /// full, and updates that strategy's latency EMA with a default
    /// half-life of 30s worth of samples (approximated via a fixed alpha,
    /// since samples arrive at irregular wall-clock spacing).
    pub fn record(&self, sample: StrategySample) {
        let key = sample.strategy.as_str();
        let mut buckets = self.buckets.lock().unwrap();
        let bucket = buckets.entry(key).or_insert_with(StrategyBucket::new);

        const ALPHA: f64 = 0.1;
        if bucket.ema_initialized {
            bucket.ema_latency_ms =
                ALPHA * sample.response_ms as f64 + (1.0 - ALPHA) * bucket.ema_latency_ms;
        } else {
            bucket.ema_latency_ms = sample.response_ms as f64;
            bucket.ema_initialized = true;
        }

        if bucket.samples.len() >= MAX_SAMPLES_PER_STRATEGY {
            bucket.samples.pop_front();
        }

        if let Some(session_id) = sample.session_id {
            let mut sessions = self.sessions.lock().unwrap();
            let session = sessions.entry(session_id).or_insert_with(SessionBucket::new);

            if session.ema_initialized {
                session.ema_latency_ms = ALPHA * sample.response_ms as f64 + (1.0 - ALPHA) * session.ema_latency_ms;
            } else {
                session.ema_latency_ms = sample.response_ms as f64;
                session.ema_initialized = true;
            }

            if session.recent_outcomes.len() >= MAX_SAMPLES_PER_SESSION {
                session.recent_outcomes.pop_front();
            }
            session.recent_outcomes.push_back(sample.success);
        }

        bucket.samples.push_back(sample);
    }

    /// Summary over the last `window_ms`, relative to `now_ms`.
    pub fn summary(&self, strategy: SelectionStrategy, now_ms: u64, window_ms: u64) -> StrategySummary {
        let buckets = self.buckets.lock().unwrap();
        let Some(bucket) = buckets.get(strategy.as_str()) else {
            return StrategySummary::empty();
        };

        let floor = now_ms.saturating_sub(window_ms);
        let mut latencies: Vec<u64> = bucket
            .samples
            .iter()
            .filter(|s| s.ts_ms >= floor)
            .map(|s| s.response_ms)
            .collect();
        if latencies.is_empty() {
            return StrategySummary::empty();
        }
        latencies.sort_unstable();

        let count = latencies.len();
        let success_count = bucket
            .samples
            .iter()
            .filter(|s| s.ts_ms >= floor && s.success)
            .count();
        let sum: u64 = latencies.iter().sum();
        let p50 = latencies[(count - 1) * 50 / 100];
        let p95 = latencies[(count - 1) * 95 / 100];

        StrategySummary {
            count,
            success_rate: success_count as f64 / count as f64,
            p50_ms: p50,
            p95_ms: p95,
            mean_ms: sum as f64 / count as f64,
        }
    }

    /// Exponential moving average of latency for `strategy`, independent of
    /// any time window (the EMA decays naturally with each new sample).
    pub fn ema_latency(&self, strategy: SelectionStrategy) -> Option<f64> {
        let buckets = self.buckets.lock().unwrap();
        buckets
            .get(strategy.as_str())
            .filter(|b| b.ema_initialized)
            .map(|b| b.ema_latency_ms)
    }

    /// Recent failure rate for `strategy` over its most recent `n` samples,
    /// used by the `weighted` selection strategy.
    pub fn recent_failure_rate(&self, strategy: SelectionStrategy, n: usize) -> f64 {
        let buckets = self.buckets.lock().unwrap();
        let Some(bucket) = buckets.get(strategy.as_str()) else {
            return 0.0;
        };
        if bucket.samples.is_empty() {
            return 0.0;
        }
        let recent: Vec<&StrategySample> = bucket.samples.iter().rev().take(n).collect();
        let failures = recent.iter().filter(|s| !s.success).count();
        failures as f64 / recent.len() as f64
    }

    /// Exponential moving average of latency for one session, independent of
    /// which strategy was active when its samples were recorded. Feeds
    /// `least_latency`/`weighted` candidate selection.
    pub fn session_ema_latency(&self, session_id: u64) -> Option<f64> {
        let sessions = self.sessions.lock().unwrap();
        sessions
            .get(&session_id)
            .filter(|s| s.ema_initialized)
            .map(|s| s.ema_latency_ms)
    }

    /// Recent failure rate for one session over its most recent `n` samples.
    /// Returns `0.0` for an unseen session, matching `recent_failure_rate`.
    pub fn session_failure_rate(&self, session_id: u64, n: usize) -> f64 {
        let sessions = self.sessions.lock().unwrap();
        let Some(session) = sessions.get(&session_id) else {
            return 0.0;
        };
        if session.recent_outcomes.is_empty() {
            return 0.0;
        }
        let recent: Vec<&bool> = session.recent_outcomes.iter().rev().take(n).collect();
        let failures = recent.iter().filter(|s| !**s).count();
        failures as f64 / recent.len() as f64
    }
}

impl Default for StrategyMetrics {
    fn default() -> Self {
        Self::new()
    }
}
