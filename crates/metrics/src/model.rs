//! Metrics value objects: call samples and usage snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed agent call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSample {
    /// Whether the result came from the response cache.
    pub cache_hit: bool,

    /// Whether the call produced a usable result.
    pub success: bool,

    /// Token estimate reported by the agent (or stored with the cached
    /// value — a hit counts these as saved, not spent).
    pub estimated_tokens: u32,

    /// Wall-clock latency of the call.
    pub latency_ms: u64,
}

impl CallSample {
    /// A successful live call.
    pub fn live(estimated_tokens: u32, latency_ms: u64) -> Self {
        Self {
            cache_hit: false,
            success: true,
            estimated_tokens,
            latency_ms,
        }
    }

    /// A cache hit.
    pub fn hit(estimated_tokens: u32) -> Self {
        Self {
            cache_hit: true,
            success: true,
            estimated_tokens,
            latency_ms: 0,
        }
    }

    /// A failed live call.
    pub fn failure(latency_ms: u64) -> Self {
        Self {
            cache_hit: false,
            success: false,
            estimated_tokens: 0,
            latency_ms,
        }
    }
}

/// Aggregate statistics for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentUsage {
    /// Registered agent name.
    pub agent: String,

    /// Total recorded calls (hits included).
    pub total_calls: u64,

    /// Calls served from the cache.
    pub cache_hits: u64,

    /// Failed live calls.
    pub failures: u64,

    /// Tokens spent on live calls.
    pub tokens_used: u64,

    /// Tokens avoided by cache hits.
    pub tokens_saved: u64,

    /// Cumulative live-call latency.
    pub total_latency_ms: u64,
}

impl AgentUsage {
    pub(crate) fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            total_calls: 0,
            cache_hits: 0,
            failures: 0,
            tokens_used: 0,
            tokens_saved: 0,
            total_latency_ms: 0,
        }
    }

    pub(crate) fn absorb(&mut self, sample: &CallSample) {
        self.total_calls += 1;
        if sample.cache_hit {
            self.cache_hits += 1;
            self.tokens_saved += sample.estimated_tokens as u64;
        } else {
            self.tokens_used += sample.estimated_tokens as u64;
            self.total_latency_ms += sample.latency_ms;
            if !sample.success {
                self.failures += 1;
            }
        }
    }
}

/// A point-in-time view of resource consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Total recorded calls.
    pub total_calls: u64,

    /// Calls served from the cache.
    pub cache_hits: u64,

    /// Cache hit rate, 0.0–1.0 (0.0 when no calls were recorded).
    pub hit_rate: f64,

    /// Tokens spent on live calls.
    pub tokens_used: u64,

    /// Tokens avoided by cache hits.
    pub tokens_saved: u64,

    /// Per-agent usage, ranked by call volume (descending).
    pub agents: Vec<AgentUsage>,

    /// Start of the window this snapshot covers, if windowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_start: Option<DateTime<Utc>>,

    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
}
