//! Eastmoney response envelopes and their conversion into canonical records.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::fields::{self, kline, trend, Field};
use super::PROVIDER_ID;
use crate::errors::MarketDataError;
use crate::provider::http::parse_number;
use crate::models::{
    derive_change, normalize_series, retain_session_ticks, KlineBar, KlinePeriod, OrderBook, Quote,
    TickPoint,
};
use crate::resolver::NormalizedSymbol;

/// Common push2 envelope. `data` is `null` for unknown securities.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub rc: i64,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KlineData {
    #[serde(default)]
    pub klines: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TrendsData {
    #[serde(default)]
    pub pre_close: Option<f64>,
    #[serde(default)]
    pub trends: Vec<String>,
}

fn decode<T: DeserializeOwned>(
    symbol: &NormalizedSymbol,
    body: &str,
) -> Result<T, MarketDataError> {
    let envelope: Envelope<T> = serde_json::from_str(body)
        .map_err(|e| MarketDataError::format(PROVIDER_ID, format!("invalid JSON: {}", e)))?;

    if envelope.rc != 0 {
        return Err(MarketDataError::format(
            PROVIDER_ID,
            format!("unexpected rc {}", envelope.rc),
        ));
    }

    envelope
        .data
        .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.canonical()))
}

/// Reads a keyed numeric field and applies its factor. `"-"` reads as absent.
fn read(data: &Map<String, Value>, field: Field) -> Option<f64> {
    let raw = match data.get(field.code)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_number(s)?,
        _ => return None,
    };
    Some(raw * field.factor)
}

fn read_price(symbol: &NormalizedSymbol, data: &Map<String, Value>, field: Field) -> Option<f64> {
    read(data, field).map(|v| symbol.rescale(v))
}

/// Converts a `stock/get` response into a quote.
pub(crate) fn parse_quote(symbol: &NormalizedSymbol, body: &str) -> Result<Quote, MarketDataError> {
    let data: Map<String, Value> = decode(symbol, body)?;

    let previous_close = read_price(symbol, &data, fields::PREV_CLOSE).unwrap_or(0.0);
    // Suspended securities publish "-" for the price.
    let price = read_price(symbol, &data, fields::PRICE)
        .or((previous_close > 0.0).then_some(previous_close))
        .ok_or_else(|| MarketDataError::format(PROVIDER_ID, "quote has no price"))?;
    let (change, change_percent) = derive_change(price, previous_close);

    let timestamp = read(&data, fields::TIMESTAMP)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0))
        .unwrap_or_else(Utc::now);

    let name = data
        .get(fields::NAME)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(Quote {
        symbol: symbol.canonical(),
        name,
        price,
        change,
        change_percent,
        open: read_price(symbol, &data, fields::OPEN).unwrap_or(price),
        high: read_price(symbol, &data, fields::HIGH).unwrap_or(price),
        low: read_price(symbol, &data, fields::LOW).unwrap_or(price),
        previous_close,
        volume: read(&data, fields::VOLUME).unwrap_or(0.0),
        amount: read(&data, fields::AMOUNT).unwrap_or(0.0),
        turnover_rate: read(&data, fields::TURNOVER_RATE),
        pe: read(&data, fields::PE),
        pb: read(&data, fields::PB),
        market_cap: read(&data, fields::MARKET_CAP),
        timestamp,
        source: PROVIDER_ID.to_string(),
    })
}

/// Converts a `stock/get` response into the five-level book.
pub(crate) fn parse_order_book(
    symbol: &NormalizedSymbol,
    body: &str,
) -> Result<OrderBook, MarketDataError> {
    let data: Map<String, Value> = decode(symbol, body)?;
    let ladder = |levels: &[(Field, Field)]| -> Vec<(f64, f64)> {
        levels
            .iter()
            .map(|(price, volume)| {
                (
                    read(&data, *price).unwrap_or(0.0),
                    read(&data, *volume).unwrap_or(0.0),
                )
            })
            .collect()
    };
    Ok(OrderBook::from_ladders(&ladder(&fields::BIDS), &ladder(&fields::ASKS)))
}

fn parse_bar_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_kline_record(
    symbol: &NormalizedSymbol,
    period: KlinePeriod,
    line: &str,
) -> Option<KlineBar> {
    let cols: Vec<&str> = line.split(',').collect();
    if cols.len() < kline::ARITY {
        return None;
    }
    let num = |i: usize| parse_number(cols[i]);
    let price = |i: usize| num(i).map(|v| symbol.rescale(v));

    Some(KlineBar {
        symbol: symbol.canonical(),
        period,
        time: parse_bar_time(cols[kline::DATE])?,
        open: price(kline::OPEN)?,
        close: price(kline::CLOSE)?,
        high: price(kline::HIGH)?,
        low: price(kline::LOW)?,
        volume: num(kline::VOLUME)? * 100.0,
        amount: num(kline::AMOUNT)?,
        amplitude: num(kline::AMPLITUDE),
        change: price(kline::CHANGE),
        change_percent: num(kline::CHANGE_PERCENT),
        turnover_rate: num(kline::TURNOVER_RATE),
    })
}

/// Converts a `kline/get` response into bars. Short or malformed records are
/// skipped.
pub(crate) fn parse_klines(
    symbol: &NormalizedSymbol,
    period: KlinePeriod,
    body: &str,
) -> Result<Vec<KlineBar>, MarketDataError> {
    let data: KlineData = decode(symbol, body)?;
    let total = data.klines.len();

    let bars: Vec<KlineBar> = data
        .klines
        .iter()
        .filter_map(|line| {
            let bar = parse_kline_record(symbol, period, line);
            if bar.is_none() {
                debug!("Skipping malformed kline record for {}: {}", symbol.canonical(), line);
            }
            bar
        })
        .collect();

    if bars.len() < total {
        debug!("Kept {}/{} kline records for {}", bars.len(), total, symbol.canonical());
    }
    Ok(normalize_series(bars))
}

/// Converts a `trends2/get` response into session ticks.
pub(crate) fn parse_ticks(
    symbol: &NormalizedSymbol,
    body: &str,
) -> Result<Vec<TickPoint>, MarketDataError> {
    let data: TrendsData = decode(symbol, body)?;
    let previous_close = data.pre_close.map(|v| symbol.rescale(v)).unwrap_or(0.0);
    let canonical = symbol.canonical();

    let mut cumulative = 0.0;
    let mut ticks = Vec::with_capacity(data.trends.len());
    for line in &data.trends {
        let cols: Vec<&str> = line.split(',').collect();
        if cols.len() < trend::ARITY {
            debug!("Skipping short trend record for {}: {}", canonical, line);
            continue;
        }
        let parsed = (
            parse_bar_time(cols[trend::TIME]),
            parse_number(cols[trend::PRICE]),
            parse_number(cols[trend::AVG_PRICE]),
            parse_number(cols[trend::VOLUME]),
            parse_number(cols[trend::AMOUNT]),
        );
        let (Some(time), Some(price), Some(avg), Some(volume), Some(amount)) = parsed else {
            debug!("Skipping malformed trend record for {}: {}", canonical, line);
            continue;
        };
        cumulative += amount;
        ticks.push(TickPoint::new(
            &canonical,
            time,
            symbol.rescale(price),
            symbol.rescale(avg),
            volume * 100.0,
            cumulative,
            previous_close,
        ));
    }

    Ok(retain_session_ticks(ticks))
}
