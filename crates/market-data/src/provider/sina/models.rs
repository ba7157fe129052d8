//! JSON payloads from the Sina `json_v2` and `openapi` services.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use tracing::debug;

use super::PROVIDER_ID;
use crate::errors::MarketDataError;
use crate::models::{normalize_series, retain_session_ticks, KlineBar, KlinePeriod, TickPoint};
use crate::provider::http::parse_number;
use crate::resolver::NormalizedSymbol;

/// One `CN_MarketDataService.getKLineData` record. Every value is a string.
#[derive(Debug, Deserialize)]
pub(crate) struct SinaKline {
    pub day: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MinlineResponse {
    pub result: MinlineResult,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MinlineResult {
    #[serde(default)]
    pub status: Option<MinlineStatus>,
    #[serde(default)]
    pub data: Option<Vec<MinlinePoint>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MinlineStatus {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MinlinePoint {
    /// `HH:MM:SS`
    pub m: String,
    /// Price.
    pub p: String,
    pub avg_p: String,
    /// Shares traded in the minute.
    pub v: String,
}

/// `scale` parameter for the intraday kline service.
pub(crate) fn kline_scale(period: KlinePeriod) -> Option<u32> {
    match period {
        KlinePeriod::Min5 | KlinePeriod::Min15 | KlinePeriod::Min30 | KlinePeriod::Min60 => {
            period.minutes()
        }
        _ => None,
    }
}

fn parse_day(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parses the kline JSON array. A literal `null` body means unknown symbol.
pub(crate) fn parse_kline_json(
    symbol: &NormalizedSymbol,
    period: KlinePeriod,
    body: &str,
) -> Result<Vec<KlineBar>, MarketDataError> {
    let records: Option<Vec<SinaKline>> = serde_json::from_str(body.trim())
        .map_err(|e| MarketDataError::format(PROVIDER_ID, format!("invalid kline JSON: {}", e)))?;
    let records = records.ok_or_else(|| MarketDataError::SymbolNotFound(symbol.canonical()))?;

    let price = |raw: &str| parse_number(raw).map(|v| symbol.rescale(v));
    let to_bar = |r: &SinaKline| -> Option<KlineBar> {
        Some(KlineBar {
            symbol: symbol.canonical(),
            period,
            time: parse_day(&r.day)?,
            open: price(&r.open)?,
            close: price(&r.close)?,
            high: price(&r.high)?,
            low: price(&r.low)?,
            volume: parse_number(&r.volume)?,
            amount: 0.0,
            amplitude: None,
            change: None,
            change_percent: None,
            turnover_rate: None,
        })
    };

    let bars = records
        .iter()
        .filter_map(|r| {
            let bar = to_bar(r);
            if bar.is_none() {
                debug!("Skipping malformed Sina kline for {}: {:?}", symbol.canonical(), r);
            }
            bar
        })
        .collect();

    Ok(normalize_series(bars))
}

/// Parses the minute line for `date`, deriving change fields from
/// `previous_close` and accumulating turnover as price times volume.
pub(crate) fn parse_minline(
    symbol: &NormalizedSymbol,
    date: NaiveDate,
    previous_close: f64,
    body: &str,
) -> Result<Vec<TickPoint>, MarketDataError> {
    let response: MinlineResponse = serde_json::from_str(body)
        .map_err(|e| MarketDataError::format(PROVIDER_ID, format!("invalid minline JSON: {}", e)))?;

    if let Some(status) = &response.result.status {
        if status.code != 0 {
            return Err(MarketDataError::format(
                PROVIDER_ID,
                format!(
                    "minline status {}: {}",
                    status.code,
                    status.msg.as_deref().unwrap_or_default()
                ),
            ));
        }
    }

    let canonical = symbol.canonical();
    let mut cumulative = 0.0;
    let mut ticks = Vec::new();
    for point in response.result.data.unwrap_or_default() {
        let parsed = (
            NaiveTime::parse_from_str(point.m.trim(), "%H:%M:%S").ok(),
            parse_number(&point.p),
            parse_number(&point.avg_p),
            parse_number(&point.v),
        );
        let (Some(time), Some(price), Some(avg), Some(volume)) = parsed else {
            debug!("Skipping malformed minline point for {}: {:?}", canonical, point.m);
            continue;
        };
        let price = symbol.rescale(price);
        cumulative += price * volume;
        ticks.push(TickPoint::new(
            &canonical,
            date.and_time(time),
            price,
            symbol.rescale(avg),
            volume,
            cumulative,
            previous_close,
        ));
    }

    Ok(retain_session_ticks(ticks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::normalize;

    #[test]
    fn test_parse_kline_json() {
        let symbol = normalize("sh600519").unwrap();
        let body = r#"[
            {"day":"2024-03-06 10:30:00","open":"1700.000","high":"1706.000","low":"1699.000","close":"1705.500","volume":"123400"},
            {"day":"2024-03-06 10:00:00","open":"1698.000","high":"1701.000","low":"1697.000","close":"1700.000","volume":"99800"},
            {"day":"bad","open":"1","high":"1","low":"1","close":"1","volume":"1"}
        ]"#;

        let bars = parse_kline_json(&symbol, KlinePeriod::Min30, body).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 1700.0);
        assert_eq!(bars[1].volume, 123_400.0);
        assert_eq!(bars[1].period, KlinePeriod::Min30);
    }

    #[test]
    fn test_null_kline_is_not_found() {
        let symbol = normalize("sh600519").unwrap();
        let err = parse_kline_json(&symbol, KlinePeriod::Min5, "null").unwrap_err();
        assert!(matches!(err, MarketDataError::SymbolNotFound(_)));
    }

    #[test]
    fn test_parse_minline() {
        let symbol = normalize("sz000001").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        let body = r#"{"result":{"status":{"code":0},"data":[
            {"m":"09:30:00","v":"100","p":"10.00","avg_p":"10.00"},
            {"m":"09:31:00","v":"200","p":"10.10","avg_p":"10.07"},
            {"m":"11:31:00","v":"1","p":"10.10","avg_p":"10.07"}
        ]}}"#;

        let ticks = parse_minline(&symbol, date, 10.0, body).unwrap();

        assert_eq!(ticks.len(), 2);
        assert!((ticks[1].cumulative_amount - 3020.0).abs() < 1e-9);
        assert!((ticks[1].change_percent - 1.0).abs() < 1e-9);
        assert_eq!(ticks[0].time, date.and_hms_opt(9, 30, 0).unwrap());
    }

    #[test]
    fn test_minline_error_status() {
        let symbol = normalize("sz000001").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        let body = r#"{"result":{"status":{"code":-1,"msg":"symbol error"},"data":null}}"#;
        let err = parse_minline(&symbol, date, 10.0, body).unwrap_err();
        assert!(matches!(err, MarketDataError::UpstreamFormat { .. }));
    }

    #[test]
    fn test_kline_scale() {
        assert_eq!(kline_scale(KlinePeriod::Min60), Some(60));
        assert_eq!(kline_scale(KlinePeriod::Min1), None);
        assert_eq!(kline_scale(KlinePeriod::Weekly), None);
    }
}
