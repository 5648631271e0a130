//! Thread-safe metrics recorder.
//!
//! Shared process-wide and incremented from concurrently executing
//! batches, so all interior state sits behind `RwLock`s held briefly and
//! never across an await point.

use crate::model::{AgentUsage, CallSample, UsageSnapshot};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// Upper bound on the retained sample journal. Oldest samples are
/// dropped once exceeded; lifetime totals are unaffected.
const MAX_SAMPLES: usize = 10_000;

/// One timestamped sample in the journal, for windowed snapshots.
#[derive(Debug, Clone)]
struct JournalEntry {
    agent: String,
    sample: CallSample,
    at: DateTime<Utc>,
}

/// The resource metrics recorder.
pub struct ResourceMetrics {
    /// Lifetime totals per agent.
    totals: RwLock<HashMap<String, AgentUsage>>,
    /// Bounded journal of recent samples (oldest first).
    journal: RwLock<Vec<JournalEntry>>,
}

impl ResourceMetrics {
    /// Create a new, empty recorder.
    pub fn new() -> Self {
        Self {
            totals: RwLock::new(HashMap::new()),
            journal: RwLock::new(Vec::new()),
        }
    }

    /// Record one agent call.
    pub fn record_call(&self, agent: &str, sample: CallSample) {
        {
            let mut totals = self.totals.write().unwrap_or_else(|e| e.into_inner());
            totals
                .entry(agent.to_string())
                .or_insert_with(|| AgentUsage::new(agent))
                .absorb(&sample);
        }

        let mut journal = self.journal.write().unwrap_or_else(|e| e.into_inner());
        if journal.len() >= MAX_SAMPLES {
            let drain = MAX_SAMPLES / 10;
            journal.drain(..drain);
        }
        journal.push(JournalEntry {
            agent: agent.to_string(),
            sample,
            at: Utc::now(),
        });
    }

    /// Take a snapshot of lifetime totals, or of the trailing window if
    /// one is given.
    pub fn snapshot(&self, window: Option<Duration>) -> UsageSnapshot {
        let now = Utc::now();
        match window {
            None => self.lifetime_snapshot(now),
            Some(window) => self.windowed_snapshot(now - window, now),
        }
    }

    /// Forget everything: totals and journal.
    pub fn reset(&self) {
        tracing::debug!("Resource metrics reset");
        self.totals
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.journal
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Total recorded calls across all agents.
    pub fn total_calls(&self) -> u64 {
        self.totals
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|u| u.total_calls)
            .sum()
    }

    fn lifetime_snapshot(&self, now: DateTime<Utc>) -> UsageSnapshot {
        let totals = self.totals.read().unwrap_or_else(|e| e.into_inner());
        let agents: Vec<AgentUsage> = totals.values().cloned().collect();
        drop(totals);
        Self::assemble(agents, None, now)
    }

    fn windowed_snapshot(&self, from: DateTime<Utc>, now: DateTime<Utc>) -> UsageSnapshot {
        let journal = self.journal.read().unwrap_or_else(|e| e.into_inner());
        let mut by_agent: HashMap<&str, AgentUsage> = HashMap::new();
        for entry in journal.iter().filter(|e| e.at >= from) {
            by_agent
                .entry(entry.agent.as_str())
                .or_insert_with(|| AgentUsage::new(&entry.agent))
                .absorb(&entry.sample);
        }
        let agents: Vec<AgentUsage> = by_agent.into_values().collect();
        drop(journal);
        Self::assemble(agents, Some(from), now)
    }

    fn assemble(
        mut agents: Vec<AgentUsage>,
        window_start: Option<DateTime<Utc>>,
        taken_at: DateTime<Utc>,
    ) -> UsageSnapshot {
        agents.sort_by(|a, b| b.total_calls.cmp(&a.total_calls).then(a.agent.cmp(&b.agent)));

        let total_calls: u64 = agents.iter().map(|u| u.total_calls).sum();
        let cache_hits: u64 = agents.iter().map(|u| u.cache_hits).sum();
        let tokens_used: u64 = agents.iter().map(|u| u.tokens_used).sum();
        let tokens_saved: u64 = agents.iter().map(|u| u.tokens_saved).sum();
        let hit_rate = if total_calls == 0 {
            0.0
        } else {
            cache_hits as f64 / total_calls as f64
        };

        UsageSnapshot {
            total_calls,
            cache_hits,
            hit_rate,
            tokens_used,
            tokens_saved,
            agents,
            window_start,
            taken_at,
        }
    }
}

impl Default for ResourceMetrics {
    fn default() -> Self {
        Self::new()
    }
}
