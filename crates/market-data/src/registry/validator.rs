//! Quote data validation.
//!
//! Hard issues reject the quote and make the registry try the next provider.
//! Soft issues are logged and the quote is accepted.

use log::warn;

use crate::errors::MarketDataError;
use crate::models::Quote;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationSeverity {
    Hard,
    Soft,
}

#[derive(Clone, Debug)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    pub message: String,
}

impl ValidationIssue {
    fn hard(message: String) -> Self {
        Self {
            severity: ValidationSeverity::Hard,
            message,
        }
    }

    fn soft(message: String) -> Self {
        Self {
            severity: ValidationSeverity::Soft,
            message,
        }
    }
}

/// Quote validator configuration.
#[derive(Clone, Debug)]
pub struct ValidatorConfig {
    /// Allowed drift between the reported change and `price - previous_close`.
    pub change_tolerance: f64,
    /// Prices above this are logged as suspicious.
    pub max_price: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            change_tolerance: 0.01,
            max_price: 1_000_000.0,
        }
    }
}

/// Checks quotes returned by providers.
#[derive(Default)]
pub struct QuoteValidator {
    config: ValidatorConfig,
}

impl QuoteValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Collects every issue found in `quote`.
    pub fn inspect(&self, quote: &Quote) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        let prices = [
            ("price", quote.price),
            ("open", quote.open),
            ("high", quote.high),
            ("low", quote.low),
            ("previous close", quote.previous_close),
        ];
        for (label, value) in prices {
            if !value.is_finite() || value < 0.0 {
                issues.push(ValidationIssue::hard(format!("Invalid {} {}", label, value)));
            }
        }
        if quote.price <= 0.0 {
            issues.push(ValidationIssue::hard(format!("Non-positive price {}", quote.price)));
        }
        if quote.volume < 0.0 || quote.amount < 0.0 {
            issues.push(ValidationIssue::hard(format!(
                "Negative volume {} or amount {}",
                quote.volume, quote.amount
            )));
        }

        if quote.high < quote.low {
            issues.push(ValidationIssue::hard(format!(
                "High ({}) is less than Low ({})",
                quote.high, quote.low
            )));
        } else {
            for (label, value) in [("Open", quote.open), ("Price", quote.price)] {
                if value < quote.low || value > quote.high {
                    issues.push(ValidationIssue::soft(format!(
                        "{} ({}) is outside High/Low range ({}-{})",
                        label, value, quote.low, quote.high
                    )));
                }
            }
        }

        if !quote.change_is_consistent(self.config.change_tolerance) {
            issues.push(ValidationIssue::soft(format!(
                "Change {} ({}%) disagrees with price {} and previous close {}",
                quote.change, quote.change_percent, quote.price, quote.previous_close
            )));
        }

        if quote.price > self.config.max_price {
            issues.push(ValidationIssue::soft(format!(
                "Price ({}) exceeds max threshold ({})",
                quote.price, self.config.max_price
            )));
        }

        issues
    }

    /// Returns an error when any hard issue is present. Soft issues are logged.
    pub fn validate(&self, quote: &Quote) -> Result<(), MarketDataError> {
        let issues = self.inspect(quote);

        let hard: Vec<&str> = issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Hard)
            .map(|i| i.message.as_str())
            .collect();
        if !hard.is_empty() {
            return Err(MarketDataError::ValidationFailed {
                message: format!("{}: {}", quote.symbol, hard.join("; ")),
            });
        }

        for issue in &issues {
            warn!("Quote validation warning for {}: {}", quote.symbol, issue.message);
        }
        Ok(())
    }
}
