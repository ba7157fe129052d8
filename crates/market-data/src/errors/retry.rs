/// Classification for retry policy.
///
/// Used by the registry to decide whether a failed provider call should fall
/// through to the next provider and whether it counts against the provider's
/// circuit breaker.
///
/// | Class | Try Next Provider? | Record Circuit Breaker Failure? |
/// |-------|-------------------|--------------------------------|
/// | `Never` | No | No |
/// | `FailoverWithPenalty` | Yes | Yes |
/// | `NextProvider` | Yes | No |
/// | `CircuitOpen` | Yes (skip this one) | No (already recorded) |
///
/// Retries never happen within one refresh cycle; a symbol that fails on
/// every provider is retried on the next scheduled cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Bad symbol or terminal failure, trying elsewhere won't help.
    Never,

    /// Transport or upstream contract failure. The next provider is tried and
    /// the failure counts towards opening this provider's circuit.
    FailoverWithPenalty,

    /// This provider can't serve the request but another one might.
    NextProvider,

    /// Circuit breaker is open for this provider.
    CircuitOpen,
}
