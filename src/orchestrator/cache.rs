//! Routing decision cache
//!
//! Entries expire after a TTL and are discarded as soon as the catalog
//! version they were computed against is superseded.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::routing::{ConstraintSet, RoutingDecision};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    requirement: String,
    constraints: [Option<u64>; 4],
}

impl CacheKey {
    fn new(requirement: &str, constraints: &ConstraintSet) -> Self {
        Self {
            requirement: requirement.trim().to_lowercase(),
            constraints: [
                constraints.max_cost_per_call.map(f64::to_bits),
                constraints.min_success_rate.map(f64::to_bits),
                constraints.max_response_time_ms.map(f64::to_bits),
                constraints.monthly_budget.map(f64::to_bits),
            ],
        }
    }
}

#[derive(Debug)]
struct Entry {
    decision: RoutingDecision,
    catalog_version: u64,
    stored_at: Instant,
}

#[derive(Debug)]
pub struct DecisionCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, Entry>>,
}

impl DecisionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached decision still valid for `catalog_version`
    pub fn get(&self, requirement: &str, constraints: &ConstraintSet, catalog_version: u64) -> Option<RoutingDecision> {
        let key = CacheKey::new(requirement, constraints);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(&key)?;
        if entry.catalog_version != catalog_version || entry.stored_at.elapsed() > self.ttl {
            entries.remove(&key);
            return None;
        }
        Some(entry.decision.clone())
    }

    pub fn insert(&self, requirement: &str, constraints: &ConstraintSet, catalog_version: u64, decision: RoutingDecision) {
        let key = CacheKey::new(requirement, constraints);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        // stale versions can never be served again
        entries.retain(|_, e| e.catalog_version == catalog_version);
        entries.insert(
            key,
            Entry {
                decision,
                catalog_version,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
