//! Ticker normalization.
//!
//! Accepts `600519`, `sh600519`, `SZ000001` and similar inputs and produces a
//! [`NormalizedSymbol`] carrying the exchange, index flag and the price
//! scaling rule for index quotes.

use serde::Serialize;

use super::market::{bare_code_index, lookup_index, Market};
use crate::errors::MarketDataError;

/// Index values above this magnitude are assumed to arrive pre-multiplied by
/// the index's scaling factor.
pub const INDEX_SCALE_THRESHOLD: f64 = 1000.0;

/// A ticker resolved to its exchange.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSymbol {
    /// Six digit security code.
    pub code: String,
    pub market: Market,
    pub is_index: bool,
    pub scaling_factor: f64,
}

impl NormalizedSymbol {
    /// Canonical form used as the key everywhere, e.g. `sh600519`.
    pub fn canonical(&self) -> String {
        format!("{}{}", self.market.prefix(), self.code)
    }

    /// Sina market code (same shape as the canonical form).
    pub fn sina_code(&self) -> String {
        self.canonical()
    }

    /// Eastmoney security id, `1.600519` for Shanghai and `0.000001` for Shenzhen.
    pub fn eastmoney_secid(&self) -> String {
        let market_id = match self.market {
            Market::Shanghai => 1,
            Market::Shenzhen => 0,
        };
        format!("{}.{}", market_id, self.code)
    }

    /// Applies the index magnitude heuristic to a provider value.
    ///
    /// Only index symbols with a non-unit scaling factor are touched, and only
    /// when the value exceeds [`INDEX_SCALE_THRESHOLD`].
    pub fn rescale(&self, value: f64) -> f64 {
        if self.is_index && self.scaling_factor != 1.0 && value > INDEX_SCALE_THRESHOLD {
            value / self.scaling_factor
        } else {
            value
        }
    }
}

/// Resolves a raw ticker to its exchange and index metadata.
///
/// Rules:
/// - An explicit `sh`/`sz` prefix (any case) wins.
/// - Otherwise codes starting with `6` are Shanghai, as are the Shanghai
///   index codes the catalog marks as claiming their bare code (`000300`,
///   `000905`, ...). `399` codes are Shenzhen indices and everything else is
///   Shenzhen. `000001` stays Ping An Bank; the composite needs `sh000001`.
/// - Anything other than an optional prefix followed by six digits is an
///   error. No market is guessed for malformed input.
pub fn normalize(raw: &str) -> Result<NormalizedSymbol, MarketDataError> {
    let trimmed = raw.trim();
    let invalid = |reason: &str| MarketDataError::InvalidSymbol {
        symbol: raw.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("empty symbol"));
    }

    let (explicit_market, code) = match trimmed.get(..2) {
        Some(head) if head.chars().all(|c| c.is_ascii_alphabetic()) => {
            let market = Market::from_prefix(head)
                .ok_or_else(|| invalid("unknown market prefix, expected sh or sz"))?;
            (Some(market), &trimmed[2..])
        }
        _ => (None, trimmed),
    };

    if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("expected a six digit security code"));
    }

    let market = explicit_market.unwrap_or_else(|| infer_market(code));
    let index = lookup_index(market, code);

    Ok(NormalizedSymbol {
        code: code.to_string(),
        market,
        is_index: index.is_some() || (market == Market::Shenzhen && code.starts_with("399")),
        scaling_factor: index.map(|e| e.scale).unwrap_or(1.0),
    })
}

fn infer_market(code: &str) -> Market {
    if code.starts_with('6') || bare_code_index(code).is_some() {
        Market::Shanghai
    } else {
        Market::Shenzhen
    }
}
