//! Error types and retry classification for the market data crate.
//!
//! - [`MarketDataError`]: the error enum for every fetch, parse and
//!   normalization operation
//! - [`ErrorKind`]: the coarse taxonomy consumers switch on
//! - [`RetryClass`]: how the provider registry reacts to an error

mod retry;

pub use retry::RetryClass;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse error taxonomy exposed to consumers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Unrecognized or malformed symbol. Surfaced to the caller, never retried.
    Normalization,
    /// Network failure, non-success status or timeout.
    Transport,
    /// A response arrived but its shape did not match the expected layout.
    UpstreamFormat,
    /// No registered provider implements the operation.
    Unsupported,
}

/// Errors that can occur during market data operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketDataError {
    /// The user-supplied ticker could not be mapped to a market code.
    #[error("Invalid symbol '{symbol}': {reason}")]
    InvalidSymbol { symbol: String, reason: String },

    /// The request could not be sent or its body could not be read.
    #[error("Transport error: {provider} - {message}")]
    Transport { provider: String, message: String },

    /// The request did not complete within the adapter's deadline.
    #[error("Timeout: {provider}")]
    Timeout { provider: String },

    /// The upstream answered with a non-success HTTP status.
    #[error("HTTP {status} from {provider}")]
    HttpStatus { provider: String, status: u16 },

    /// The upstream answered but the payload does not match its contract.
    #[error("Upstream format error: {provider} - {message}")]
    UpstreamFormat { provider: String, message: String },

    /// The upstream answered successfully but does not know the symbol.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The provider does not implement the requested operation.
    #[error("{operation} is not supported by {provider}")]
    NotSupported { operation: String, provider: String },

    /// The circuit breaker is open for this provider.
    #[error("Circuit open: {provider}")]
    CircuitOpen { provider: String },

    /// Data returned by a provider failed validation.
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    /// No provider is registered for the operation.
    #[error("No providers available")]
    NoProvidersAvailable,

    /// Every provider was tried and every one failed.
    #[error("All providers failed")]
    AllProvidersFailed,
}

impl MarketDataError {
    pub(crate) fn transport(provider: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn format(provider: &str, message: impl Into<String>) -> Self {
        Self::UpstreamFormat {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn not_supported(provider: &str, operation: &str) -> Self {
        Self::NotSupported {
            operation: operation.to_string(),
            provider: provider.to_string(),
        }
    }

    /// Maps a reqwest error onto the transport variants.
    pub(crate) fn from_reqwest(provider: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                provider: provider.to_string(),
            }
        } else {
            Self::transport(provider, error.to_string())
        }
    }

    /// Returns the taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSymbol { .. } => ErrorKind::Normalization,
            Self::Transport { .. }
            | Self::Timeout { .. }
            | Self::HttpStatus { .. }
            | Self::CircuitOpen { .. }
            | Self::AllProvidersFailed => ErrorKind::Transport,
            Self::UpstreamFormat { .. }
            | Self::SymbolNotFound(_)
            | Self::ValidationFailed { .. } => ErrorKind::UpstreamFormat,
            Self::NotSupported { .. } | Self::NoProvidersAvailable => ErrorKind::Unsupported,
        }
    }

    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use stockpulse_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::Timeout { provider: "SINA".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::FailoverWithPenalty);
    ///
    /// let error = MarketDataError::InvalidSymbol {
    ///     symbol: "ABC".to_string(),
    ///     reason: "not a six digit code".to_string(),
    /// };
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::InvalidSymbol { .. } | Self::NoProvidersAvailable | Self::AllProvidersFailed => {
                RetryClass::Never
            }

            Self::Transport { .. }
            | Self::Timeout { .. }
            | Self::HttpStatus { .. }
            | Self::UpstreamFormat { .. } => RetryClass::FailoverWithPenalty,

            Self::SymbolNotFound(_) | Self::NotSupported { .. } | Self::ValidationFailed { .. } => {
                RetryClass::NextProvider
            }

            Self::CircuitOpen { .. } => RetryClass::CircuitOpen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_symbol_is_normalization_and_never_retried() {
        let error = MarketDataError::InvalidSymbol {
            symbol: "XX1".to_string(),
            reason: "bad prefix".to_string(),
        };
        assert_eq!(error.kind(), ErrorKind::Normalization);
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_transport_family_shares_kind() {
        let errors = [
            MarketDataError::transport("EASTMONEY", "connection reset"),
            MarketDataError::Timeout {
                provider: "EASTMONEY".to_string(),
            },
            MarketDataError::HttpStatus {
                provider: "SINA".to_string(),
                status: 502,
            },
        ];
        for error in errors {
            assert_eq!(error.kind(), ErrorKind::Transport);
            assert_eq!(error.retry_class(), RetryClass::FailoverWithPenalty);
        }
    }

    #[test]
    fn test_format_error_is_distinct_from_transport() {
        let error = MarketDataError::format("SINA", "expected 32 fields, got 3");
        assert_eq!(error.kind(), ErrorKind::UpstreamFormat);
        assert_ne!(error.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_not_supported_tries_next_provider() {
        let error = MarketDataError::not_supported("SINA", "ticks");
        assert_eq!(error.kind(), ErrorKind::Unsupported);
        assert_eq!(error.retry_class(), RetryClass::NextProvider);
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::SymbolNotFound("sh600000".to_string());
        assert_eq!(format!("{}", error), "Symbol not found: sh600000");

        let error = MarketDataError::HttpStatus {
            provider: "SINA".to_string(),
            status: 403,
        };
        assert_eq!(format!("{}", error), "HTTP 403 from SINA");
    }
}
