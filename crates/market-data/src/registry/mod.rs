//! Provider registry module.
//!
//! This module provides orchestration for market data providers, including:
//! - Provider registration and priority ordering
//! - Circuit breaking for fault tolerance
//! - Quote data validation

mod circuit_breaker;
mod registry;
mod validator;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState, ProviderHealth};
pub use registry::ProviderRegistry;
pub use validator::{QuoteValidator, ValidationIssue, ValidationSeverity, ValidatorConfig};
