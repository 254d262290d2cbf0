//! TTL-bounded correlation of in-flight commands to their eventual responses.
//!
//! Each processor owns its cache; there is no cross-instance sharing, so no
//! synchronization is needed. Entries not claimed by a matched response are
//! evicted `ttl` after insertion, firing the eviction listener exactly once
//! per entry. Sweeps run on access, with [`CorrelationCache::sweep_at`]
//! exposed for timer-driven owners.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Reference TTL for unmatched correlation entries.
pub const DEFAULT_TRACE_TTL: Duration = Duration::from_secs(300);

/// Observability context for one command round trip, closed when the matching
/// response arrives or the entry expires.
#[derive(Debug)]
pub struct Trace {
    name: String,
    correlation_id: String,
    started_at: Instant,
}

impl Trace {
    pub fn begin(name: impl Into<String>, correlation_id: impl Into<String>, now: Instant) -> Self {
        Self {
            name: name.into(),
            correlation_id: correlation_id.into(),
            started_at: now,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn finish(self, now: Instant) {
        tracing::debug!(
            "trace '{}' for {} closed after {:?}",
            self.name,
            self.correlation_id,
            now.saturating_duration_since(self.started_at)
        );
    }
}

struct CorrelationEntry {
    trace: Trace,
    inserted_at: Instant,
}

type EvictionListener = Box<dyn FnMut(&str) + Send>;

/// Expiring map from correlation id to in-flight trace.
pub struct CorrelationCache {
    entries: HashMap<String, CorrelationEntry>,
    ttl: Duration,
    listener: Option<EvictionListener>,
}

impl CorrelationCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            listener: None,
        }
    }

    /// Install the eviction listener, called once per entry evicted by time.
    /// Entries removed by a matched response do not notify.
    pub fn set_eviction_listener(&mut self, listener: impl FnMut(&str) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn insert_at(&mut self, correlation_id: String, trace: Trace, now: Instant) {
        self.sweep_at(now);
        if self.entries.contains_key(&correlation_id) {
            tracing::debug!("replacing in-flight trace for {}", correlation_id);
        }
        self.entries.insert(
            correlation_id,
            CorrelationEntry {
                trace,
                inserted_at: now,
            },
        );
    }

    /// Claim the entry for a matched response. Expired entries are evicted
    /// first and are therefore never claimable, even before a sweep ran.
    pub fn remove_at(&mut self, correlation_id: &str, now: Instant) -> Option<Trace> {
        self.sweep_at(now);
        self.entries.remove(correlation_id).map(|entry| entry.trace)
    }

    /// Evict every entry older than the TTL, returning the eviction count.
    pub fn sweep_at(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.inserted_at) >= self.ttl)
            .map(|(correlation_id, _)| correlation_id.clone())
            .collect();
        for correlation_id in &expired {
            self.entries.remove(correlation_id);
            tracing::info!("trace for {} expired", correlation_id);
            if let Some(listener) = self.listener.as_mut() {
                listener(correlation_id);
            }
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
