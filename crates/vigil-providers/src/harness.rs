// vigil-providers/src/harness.rs
// ============================================================================
// Module: Integration Harness
// Description: Retry-with-jitter and circuit-breaker wrapper around a single
//              integration call (§4.4).
// Purpose: Give every adapter the same resilience policy instead of letting
//          each one reimplement backoff and breaker accounting.
// Dependencies: vigil-core, rand
// ============================================================================

//! ## Overview
//! The harness composes two of the three layers §4.4 describes: retry with
//! jittered exponential backoff, and circuit-breaker accounting. The third
//! layer, the per-attempt timeout, is the adapter's own responsibility (most
//! concretely, the blocking HTTP client's configured deadline) since this
//! harness runs synchronously and has no way to preempt a call in flight.

use std::thread;
use std::time::Duration;

use rand::Rng as _;
use vigil_core::time::Clock;

use crate::breaker::CircuitBreakerRegistry;
use crate::error::IntegrationError;

/// Retry tunables (§4.4 defaults: base 500ms, max 3 attempts).
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Base backoff delay before jitter, in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum attempts per call, including the first.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { base_delay_ms: 500, max_attempts: 3 }
    }
}

/// Wraps a single outbound integration call with retry and circuit-breaker
/// policy (§4.4).
pub struct IntegrationHarness<'a> {
    retry: RetryConfig,
    breaker: &'a CircuitBreakerRegistry,
    clock: &'a dyn Clock,
}

impl<'a> IntegrationHarness<'a> {
    /// Creates a harness over the given breaker registry and clock.
    #[must_use]
    pub const fn new(retry: RetryConfig, breaker: &'a CircuitBreakerRegistry, clock: &'a dyn Clock) -> Self {
        Self { retry, breaker, clock }
    }

    /// Executes `attempt` under `integration`'s breaker and this harness's
    /// retry policy. `attempt` receives the 1-based attempt number so an
    /// adapter can label a `Retry-After`-honoring sleep it performed itself.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::BreakerOpen`] without attempting the call
    /// when the breaker is open, or the last attempt's error once retries
    /// are exhausted or the error is not retryable.
    pub fn call<T>(
        &self,
        integration: &str,
        mut attempt: impl FnMut(u32) -> Result<T, IntegrationError>,
    ) -> Result<T, IntegrationError> {
        if !self.breaker.allow_call(integration, self.clock) {
            return Err(IntegrationError::BreakerOpen(integration.to_string()));
        }
        let mut last_error = None;
        for attempt_number in 1..=self.retry.max_attempts {
            match attempt(attempt_number) {
                Ok(value) => {
                    self.breaker.record_success(integration);
                    return Ok(value);
                }
                Err(err) => {
                    let retryable = err.retryable();
                    self.breaker.record_failure(integration, self.clock, retryable);
                    let exhausted = attempt_number == self.retry.max_attempts;
                    if !retryable || exhausted {
                        return Err(err);
                    }
                    thread::sleep(Duration::from_millis(jittered_backoff_ms(self.retry.base_delay_ms, attempt_number)));
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| IntegrationError::Call {
            message: "retry loop exited without a recorded error".to_string(),
            retryable: false,
        }))
    }
}

/// Exponential backoff with full jitter: `base * 2^(attempt - 1)`, then a
/// uniform draw from the half-width band around it (roughly `[0.5x, 1.5x]`
/// of the unjittered delay).
fn jittered_backoff_ms(base_delay_ms: u64, attempt_number: u32) -> u64 {
    let exponent = attempt_number.saturating_sub(1).min(16);
    let unjittered = base_delay_ms.saturating_mul(1u64 << exponent);
    let half = unjittered / 2;
    half.saturating_add(rand::thread_rng().gen_range(0..=unjittered.max(1)))
}
