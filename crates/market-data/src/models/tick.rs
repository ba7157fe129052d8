use chrono::NaiveDateTime;
use log::debug;
use serde::{Deserialize, Serialize};

use super::quote::derive_change;
use super::session::in_session;

/// One intraday price observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickPoint {
    pub symbol: String,
    /// Exchange local time (Asia/Shanghai).
    pub time: NaiveDateTime,
    pub price: f64,
    /// Running volume-weighted average price for the session.
    pub avg_price: f64,
    /// Volume traded in this tick, in shares.
    pub volume: f64,
    /// Turnover accumulated since the session opened.
    pub cumulative_amount: f64,
    /// Change against the previous session close.
    pub change: f64,
    pub change_percent: f64,
}

impl TickPoint {
    /// Builds a tick, deriving the change fields from `previous_close`.
    pub fn new(
        symbol: &str,
        time: NaiveDateTime,
        price: f64,
        avg_price: f64,
        volume: f64,
        cumulative_amount: f64,
        previous_close: f64,
    ) -> Self {
        let (change, change_percent) = derive_change(price, previous_close);
        Self {
            symbol: symbol.to_string(),
            time,
            price,
            avg_price,
            volume,
            cumulative_amount,
            change,
            change_percent,
        }
    }
}

/// Keeps ticks inside the trading windows whose time strictly increases.
pub fn retain_session_ticks(ticks: Vec<TickPoint>) -> Vec<TickPoint> {
    let total = ticks.len();
    let mut kept: Vec<TickPoint> = Vec::with_capacity(total);
    for tick in ticks {
        if !in_session(tick.time.time()) {
            continue;
        }
        if kept.last().is_some_and(|last| tick.time <= last.time) {
            continue;
        }
        kept.push(tick);
    }
    if kept.len() != total {
        debug!("Dropped {} out-of-session or out-of-order ticks", total - kept.len());
    }
    kept
}
