// vigil-providers/src/breaker.rs
// ============================================================================
// Module: Circuit Breaker Registry
// Description: Per-integration circuit breaker state (§4.4, §5).
// Purpose: Fast-fail integrations that are already known to be unhealthy
//          instead of piling retries onto them.
// ============================================================================

//! ## Overview
//! One [`BreakerEntry`] exists per integration name. The registry is the
//! "circuit-breaker map keyed by integration name, mutated by all workers"
//! §5 calls out as shared mutable state: the outer map is behind a
//! [`RwLock`] so lookups don't contend, and each entry has its own
//! [`Mutex`] so unrelated integrations never block each other.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;

use vigil_core::time::Clock;
use vigil_core::time::Timestamp;

/// Circuit breaker state for one integration (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls pass through normally.
    Closed,
    /// Calls fast-fail without attempting the integration.
    Open,
    /// One probe call is allowed through to test recovery.
    HalfOpen,
}

/// Tunables for a [`CircuitBreakerRegistry`] (§4.4 defaults).
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Consecutive retryable failures before the breaker opens.
    pub failure_threshold: u32,
    /// Seconds the breaker stays open before allowing a probe.
    pub reset_timeout_seconds: i64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 5, reset_timeout_seconds: 30 }
    }
}

#[derive(Debug)]
struct BreakerEntry {
    state: BreakerState,
    failures: u32,
    last_failure_at: Option<Timestamp>,
}

impl BreakerEntry {
    const fn new() -> Self {
        Self { state: BreakerState::Closed, failures: 0, last_failure_at: None }
    }
}

/// Per-integration circuit breaker state, shared across every coordinator
/// worker thread.
pub struct CircuitBreakerRegistry {
    config: BreakerConfig,
    entries: RwLock<BTreeMap<String, Arc<Mutex<BreakerEntry>>>>,
}

impl CircuitBreakerRegistry {
    /// Creates an empty registry with the given tunables.
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self { config, entries: RwLock::new(BTreeMap::new()) }
    }

    fn entry_for(&self, integration: &str) -> Arc<Mutex<BreakerEntry>> {
        if let Some(existing) = self.read_entries().get(integration) {
            return Arc::clone(existing);
        }
        let mut entries = self.write_entries();
        Arc::clone(entries.entry(integration.to_string()).or_insert_with(|| Arc::new(Mutex::new(BreakerEntry::new()))))
    }

    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Arc<Mutex<BreakerEntry>>>> {
        self.entries.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Arc<Mutex<BreakerEntry>>>> {
        self.entries.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Returns whether a call to `integration` may proceed right now,
    /// transitioning `OPEN` to `HALF_OPEN` once `reset_timeout_seconds` has
    /// elapsed (§4.4).
    pub fn allow_call(&self, integration: &str, clock: &dyn Clock) -> bool {
        let entry = self.entry_for(integration);
        let mut guard = entry.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match guard.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let elapsed_enough = guard
                    .last_failure_at
                    .is_none_or(|last| (clock.now() - last).num_seconds() >= self.config.reset_timeout_seconds);
                if elapsed_enough {
                    guard.state = BreakerState::HalfOpen;
                }
                elapsed_enough
            }
        }
    }

    /// Records a successful call: closes the breaker and resets the
    /// failure count.
    pub fn record_success(&self, integration: &str) {
        let entry = self.entry_for(integration);
        let mut guard = entry.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.state = BreakerState::Closed;
        guard.failures = 0;
        guard.last_failure_at = None;
    }

    /// Records a failed call. A failure during `HALF_OPEN` reopens the
    /// breaker immediately regardless of retryability; a failure during
    /// `CLOSED` only counts toward `failure_threshold` when `retryable` is
    /// true, since a non-retryable failure (e.g. a 400-class response) is a
    /// caller bug, not evidence the integration itself is unhealthy (§4.4).
    pub fn record_failure(&self, integration: &str, clock: &dyn Clock, retryable: bool) {
        let entry = self.entry_for(integration);
        let mut guard = entry.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.last_failure_at = Some(clock.now());
        match guard.state {
            BreakerState::HalfOpen => guard.state = BreakerState::Open,
            BreakerState::Closed if retryable => {
                guard.failures += 1;
                if guard.failures >= self.config.failure_threshold {
                    guard.state = BreakerState::Open;
                }
            }
            BreakerState::Closed | BreakerState::Open => {}
        }
    }

    /// Returns the current state for `integration` (`Closed` if never seen).
    #[must_use]
    pub fn state_of(&self, integration: &str) -> BreakerState {
        let entry = self.entry_for(integration);
        entry.lock().unwrap_or_else(std::sync::PoisonError::into_inner).state
    }
}
