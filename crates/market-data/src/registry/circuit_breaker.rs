//! Circuit breaker keyed by provider and symbol.
//!
//! - **Closed**: calls go through, consecutive failures are counted.
//! - **Open**: calls are refused until the recovery timeout has elapsed.
//! - **HalfOpen**: trial calls go through. Enough successes close the
//!   circuit, any failure opens it again.
//!
//! Each symbol has its own circuit per provider, so failures of one symbol
//! never block calls made for another. State is in memory only.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::Serialize;

/// Circuit breaker state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Circuit breaker configuration.
#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// Time an open circuit waits before allowing trial calls.
    pub recovery_timeout: Duration,
    /// Trial successes needed to close a half-open circuit.
    pub half_open_success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            half_open_success_threshold: 2,
        }
    }
}

#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    failures: u32,
    trial_successes: u32,
    opened_at: Option<Instant>,
}

impl Default for Circuit {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: 0,
            trial_successes: 0,
            opened_at: None,
        }
    }
}

/// Health of one (provider, symbol) circuit, for status endpoints.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHealth {
    pub provider: String,
    pub symbol: String,
    pub state: CircuitState,
    pub failures: u32,
}

type CircuitKey = (&'static str, String);

/// Thread-safe circuit breaker keyed by provider id and canonical symbol.
pub struct CircuitBreaker {
    circuits: Mutex<HashMap<CircuitKey, Circuit>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }

    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            circuits: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// A poisoned lock only means another thread panicked mid-update; the
    /// counters are still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<CircuitKey, Circuit>> {
        self.circuits.lock().unwrap_or_else(|poisoned| {
            warn!("Circuit breaker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Returns true when a call to `provider` for `symbol` may proceed.
    ///
    /// Moves an open circuit to HalfOpen once the recovery timeout elapsed.
    pub fn allow(&self, provider: &'static str, symbol: &str) -> bool {
        let mut circuits = self.lock();
        let circuit = circuits.entry((provider, symbol.to_string())).or_default();

        match circuit.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let recovered = circuit
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.config.recovery_timeout);
                if recovered {
                    info!(
                        "Circuit for '{}' on {} is half-open, allowing trial calls",
                        provider, symbol
                    );
                    circuit.state = CircuitState::HalfOpen;
                    circuit.trial_successes = 0;
                }
                recovered
            }
        }
    }

    pub fn record_success(&self, provider: &'static str, symbol: &str) {
        let mut circuits = self.lock();
        let circuit = circuits.entry((provider, symbol.to_string())).or_default();

        match circuit.state {
            CircuitState::Closed => circuit.failures = 0,
            CircuitState::HalfOpen => {
                circuit.trial_successes += 1;
                if circuit.trial_successes >= self.config.half_open_success_threshold {
                    info!(
                        "Closing circuit for '{}' on {} after {} trial successes",
                        provider, symbol, circuit.trial_successes
                    );
                    *circuit = Circuit::default();
                }
            }
            CircuitState::Open => {
                debug!(
                    "Ignoring success for '{}' on {} while its circuit is open",
                    provider, symbol
                );
            }
        }
    }

    pub fn record_failure(&self, provider: &'static str, symbol: &str) {
        let mut circuits = self.lock();
        let circuit = circuits.entry((provider, symbol.to_string())).or_default();
        circuit.failures += 1;

        match circuit.state {
            CircuitState::Closed if circuit.failures >= self.config.failure_threshold => {
                warn!(
                    "Opening circuit for '{}' on {} after {} consecutive failures",
                    provider, symbol, circuit.failures
                );
                circuit.state = CircuitState::Open;
                circuit.opened_at = Some(Instant::now());
            }
            CircuitState::Closed => {
                debug!(
                    "Failure for '{}' on {} ({}/{})",
                    provider, symbol, circuit.failures, self.config.failure_threshold
                );
            }
            CircuitState::HalfOpen => {
                warn!("Trial call to '{}' for {} failed, reopening circuit", provider, symbol);
                circuit.state = CircuitState::Open;
                circuit.opened_at = Some(Instant::now());
                circuit.trial_successes = 0;
            }
            CircuitState::Open => {}
        }
    }

    pub fn state(&self, provider: &'static str, symbol: &str) -> CircuitState {
        self.lock()
            .get(&(provider, symbol.to_string()))
            .map(|c| c.state)
            .unwrap_or(CircuitState::Closed)
    }

    /// Forces every circuit of `provider` back to Closed.
    pub fn reset(&self, provider: &'static str) {
        let mut circuits = self.lock();
        info!("Resetting circuits for '{}'", provider);
        for ((id, _), circuit) in circuits.iter_mut() {
            if *id == provider {
                *circuit = Circuit::default();
            }
        }
    }

    /// Snapshot of every circuit seen so far, sorted by provider then symbol.
    pub fn health(&self) -> Vec<ProviderHealth> {
        let mut health: Vec<ProviderHealth> = self
            .lock()
            .iter()
            .map(|((provider, symbol), circuit)| ProviderHealth {
                provider: provider.to_string(),
                symbol: symbol.clone(),
                state: circuit.state,
                failures: circuit.failures,
            })
            .collect();
        health.sort_by(|a, b| (&a.provider, &a.symbol).cmp(&(&b.provider, &b.symbol)));
        health
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOUTAI: &str = "sh600519";

    fn fast_config(threshold: u32, trials: u32) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: threshold,
            recovery_timeout: Duration::from_millis(10),
            half_open_success_threshold: trials,
        }
    }

    #[test]
    fn test_opens_after_threshold() {
        let cb = CircuitBreaker::with_config(fast_config(3, 2));

        cb.record_failure("SINA", MOUTAI);
        cb.record_failure("SINA", MOUTAI);
        assert!(cb.allow("SINA", MOUTAI));

        cb.record_failure("SINA", MOUTAI);
        assert_eq!(cb.state("SINA", MOUTAI), CircuitState::Open);
        assert!(!cb.allow("SINA", MOUTAI));
    }

    #[test]
    fn test_success_resets_consecutive_failures() {
        let cb = CircuitBreaker::with_config(fast_config(2, 1));
        cb.record_failure("SINA", MOUTAI);
        cb.record_success("SINA", MOUTAI);
        cb.record_failure("SINA", MOUTAI);
        assert_eq!(cb.state("SINA", MOUTAI), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_recovery() {
        let cb = CircuitBreaker::with_config(fast_config(1, 2));
        cb.record_failure("EASTMONEY", MOUTAI);
        std::thread::sleep(Duration::from_millis(20));

        assert!(cb.allow("EASTMONEY", MOUTAI));
        assert_eq!(cb.state("EASTMONEY", MOUTAI), CircuitState::HalfOpen);

        cb.record_success("EASTMONEY", MOUTAI);
        assert_eq!(cb.state("EASTMONEY", MOUTAI), CircuitState::HalfOpen);
        cb.record_success("EASTMONEY", MOUTAI);
        assert_eq!(cb.state("EASTMONEY", MOUTAI), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let cb = CircuitBreaker::with_config(fast_config(1, 2));
        cb.record_failure("EASTMONEY", MOUTAI);
        std::thread::sleep(Duration::from_millis(20));
        cb.allow("EASTMONEY", MOUTAI);

        cb.record_failure("EASTMONEY", MOUTAI);
        assert_eq!(cb.state("EASTMONEY", MOUTAI), CircuitState::Open);
        assert!(!cb.allow("EASTMONEY", MOUTAI));
    }

    #[test]
    fn test_providers_are_independent() {
        let cb = CircuitBreaker::with_config(fast_config(1, 1));
        cb.record_failure("SINA", MOUTAI);

        assert!(!cb.allow("SINA", MOUTAI));
        assert!(cb.allow("EASTMONEY", MOUTAI));

        let health = cb.health();
        assert_eq!(health.len(), 2);
        assert_eq!(health[0].provider, "EASTMONEY");
        assert_eq!(health[1].state, CircuitState::Open);

        cb.reset("SINA");
        assert!(cb.allow("SINA", MOUTAI));
    }

    #[test]
    fn test_symbols_are_independent() {
        let cb = CircuitBreaker::with_config(fast_config(2, 1));
        for symbol in ["sz000001", "sz000002", "sz000003"] {
            cb.record_failure("SINA", symbol);
            cb.record_failure("SINA", symbol);
            assert_eq!(cb.state("SINA", symbol), CircuitState::Open);
        }

        assert!(cb.allow("SINA", MOUTAI));
        assert_eq!(cb.state("SINA", MOUTAI), CircuitState::Closed);

        cb.reset("SINA");
        assert!(cb.health().iter().all(|h| h.state == CircuitState::Closed));
    }
}
