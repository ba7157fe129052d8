//! Parser for the `hq.sinajs.cn` snapshot lines.
//!
//! Each line looks like `var hq_str_sh600519="<comma separated values>";`.
//! Values are read through the named positions below.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Asia::Shanghai;

use super::PROVIDER_ID;
use crate::errors::MarketDataError;
use crate::models::{derive_change, OrderBook, Quote};
use crate::provider::http::parse_number;
use crate::resolver::NormalizedSymbol;

mod pos {
    pub const NAME: usize = 0;
    pub const OPEN: usize = 1;
    pub const PREV_CLOSE: usize = 2;
    pub const PRICE: usize = 3;
    pub const HIGH: usize = 4;
    pub const LOW: usize = 5;
    /// Shares.
    pub const VOLUME: usize = 8;
    pub const AMOUNT: usize = 9;
    /// Five `(volume, price)` pairs, best first.
    pub const BIDS: usize = 10;
    pub const ASKS: usize = 20;
    pub const DATE: usize = 30;
    pub const TIME: usize = 31;
    pub const MIN_FIELDS: usize = 32;
}

/// Quote and book decoded from one snapshot line.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub quote: Quote,
    pub order_book: OrderBook,
}

/// Finds the payload for `code` in a multi-line response.
///
/// Returns `Ok(None)` when the line exists with an empty payload, which is
/// how the upstream reports unknown symbols.
fn find_payload<'a>(text: &'a str, code: &str) -> Result<Option<&'a str>, MarketDataError> {
    let marker = format!("hq_str_{}=\"", code);
    let line = text
        .lines()
        .find(|line| line.contains(&marker))
        .ok_or_else(|| MarketDataError::format(PROVIDER_ID, format!("no line for {}", code)))?;

    let start = line.find(&marker).map(|i| i + marker.len()).unwrap_or(0);
    let rest = &line[start..];
    let end = rest
        .find('"')
        .ok_or_else(|| MarketDataError::format(PROVIDER_ID, "unterminated payload"))?;
    let payload = rest[..end].trim();

    Ok((!payload.is_empty()).then_some(payload))
}

fn exchange_time(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M:%S").ok()?;
    Shanghai
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses the snapshot for `symbol` out of a decoded response body.
pub(crate) fn parse_snapshot(
    symbol: &NormalizedSymbol,
    text: &str,
) -> Result<Snapshot, MarketDataError> {
    let code = symbol.sina_code();
    let payload =
        find_payload(text, &code)?.ok_or_else(|| MarketDataError::SymbolNotFound(code.clone()))?;

    let values: Vec<&str> = payload.split(',').collect();
    if values.len() < pos::MIN_FIELDS {
        return Err(MarketDataError::format(
            PROVIDER_ID,
            format!(
                "expected at least {} fields for {}, got {}",
                pos::MIN_FIELDS,
                code,
                values.len()
            ),
        ));
    }

    let num = |i: usize| parse_number(values[i]).unwrap_or(0.0);
    let price_at = |i: usize| symbol.rescale(num(i));

    let previous_close = price_at(pos::PREV_CLOSE);
    let mut price = price_at(pos::PRICE);
    // Before the open and for suspended securities the price field is zero.
    if price <= 0.0 {
        price = previous_close;
    }
    if price <= 0.0 {
        return Err(MarketDataError::format(PROVIDER_ID, format!("no price for {}", code)));
    }
    let (change, change_percent) = derive_change(price, previous_close);
    let or_price = |v: f64| if v > 0.0 { v } else { price };

    let quote = Quote {
        symbol: symbol.canonical(),
        name: values[pos::NAME].trim().to_string(),
        price,
        change,
        change_percent,
        open: or_price(price_at(pos::OPEN)),
        high: or_price(price_at(pos::HIGH)),
        low: or_price(price_at(pos::LOW)),
        previous_close,
        volume: num(pos::VOLUME),
        amount: num(pos::AMOUNT),
        turnover_rate: None,
        pe: None,
        pb: None,
        market_cap: None,
        timestamp: exchange_time(values[pos::DATE], values[pos::TIME]).unwrap_or_else(Utc::now),
        source: PROVIDER_ID.to_string(),
    };

    let ladder = |base: usize| -> Vec<(f64, f64)> {
        (0..5)
            .map(|level| {
                let volume = num(base + level * 2);
                let price = num(base + level * 2 + 1);
                (price, volume)
            })
            .collect()
    };
    let order_book = OrderBook::from_ladders(&ladder(pos::BIDS), &ladder(pos::ASKS));

    Ok(Snapshot { quote, order_book })
}
