//! Historical transaction pages (`vMS_MarketHistory`).
//!
//! The page is GBK encoded HTML holding one quarter of daily bars in a table.
//! Cells are read by the named column positions below.

use std::future::Future;

use chrono::{Datelike, NaiveDate};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::PROVIDER_ID;
use crate::errors::MarketDataError;
use crate::models::{KlineBar, KlinePeriod};
use crate::provider::http::parse_number;
use crate::resolver::NormalizedSymbol;

mod col {
    pub const DATE: usize = 0;
    pub const OPEN: usize = 1;
    pub const HIGH: usize = 2;
    pub const CLOSE: usize = 3;
    pub const LOW: usize = 4;
    /// Shares.
    pub const VOLUME: usize = 5;
    pub const AMOUNT: usize = 6;
}

/// Rows with fewer cells are layout rows, not data.
const MIN_CELLS: usize = 4;

/// Upper bound on quarter pages walked for one request.
pub(crate) const MAX_QUARTERS: usize = 8;

fn selector(css: &str) -> Result<Selector, MarketDataError> {
    Selector::parse(css)
        .map_err(|e| MarketDataError::format(PROVIDER_ID, format!("bad selector {}: {:?}", css, e)))
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Extracts the data rows of the history table as text cells.
///
/// Uses `#FundHoldSharesTable` when present, otherwise the first table. The
/// header row is discarded and rows with fewer than four cells are skipped.
pub(crate) fn extract_rows(html: &str) -> Result<Vec<Vec<String>>, MarketDataError> {
    let document = Html::parse_document(html);
    let by_id = selector("table#FundHoldSharesTable")?;
    let any_table = selector("table")?;
    let rows = selector("tr")?;
    let cells = selector("td, th")?;

    let Some(table) = document
        .select(&by_id)
        .next()
        .or_else(|| document.select(&any_table).next())
    else {
        return Ok(Vec::new());
    };

    Ok(table
        .select(&rows)
        .skip(1)
        .map(|row| row.select(&cells).map(|c| cell_text(&c)).collect::<Vec<_>>())
        .filter(|cells| cells.len() >= MIN_CELLS)
        .collect())
}

fn row_to_bar(symbol: &NormalizedSymbol, cells: &[String]) -> Option<KlineBar> {
    let price = |i: usize| {
        cells
            .get(i)
            .and_then(|c| parse_number(c))
            .map(|v| symbol.rescale(v))
    };
    let num = |i: usize| cells.get(i).and_then(|c| parse_number(c));

    let date = NaiveDate::parse_from_str(cells.get(col::DATE)?, "%Y-%m-%d").ok()?;
    Some(KlineBar {
        symbol: symbol.canonical(),
        period: KlinePeriod::Daily,
        time: date.and_hms_opt(0, 0, 0)?,
        open: price(col::OPEN)?,
        close: price(col::CLOSE)?,
        high: price(col::HIGH)?,
        low: price(col::LOW)?,
        volume: num(col::VOLUME).unwrap_or(0.0),
        amount: num(col::AMOUNT).unwrap_or(0.0),
        amplitude: None,
        change: None,
        change_percent: None,
        turnover_rate: None,
    })
}

/// Parses one quarter page into daily bars, in page order.
pub(crate) fn parse_history_page(
    symbol: &NormalizedSymbol,
    html: &str,
) -> Result<Vec<KlineBar>, MarketDataError> {
    let rows = extract_rows(html)?;
    let bars: Vec<KlineBar> = rows
        .iter()
        .filter_map(|cells| {
            let bar = row_to_bar(symbol, cells);
            if bar.is_none() {
                debug!("Skipping history row for {}: {:?}", symbol.canonical(), cells);
            }
            bar
        })
        .collect();
    Ok(bars)
}

/// `(year, quarter)` pairs starting at the quarter containing `today` and
/// walking backwards.
pub(crate) fn quarters_back(today: NaiveDate) -> impl Iterator<Item = (i32, u32)> {
    let start = (today.year(), (today.month() - 1) / 3 + 1);
    std::iter::successors(Some(start), |&(year, quarter)| {
        Some(if quarter == 1 {
            (year - 1, 4)
        } else {
            (year, quarter - 1)
        })
    })
}

/// Walks quarter pages backwards from `today` until `count` bars are
/// collected or [`MAX_QUARTERS`] pages were read.
///
/// A failing page ends the walk. The error is returned only when nothing was
/// collected before it; otherwise the bars gathered so far are returned and
/// the caller sees a short series.
pub(crate) async fn collect_quarters<F, Fut>(
    symbol: &NormalizedSymbol,
    today: NaiveDate,
    count: usize,
    mut fetch_page: F,
) -> Result<Vec<KlineBar>, MarketDataError>
where
    F: FnMut(i32, u32) -> Fut,
    Fut: Future<Output = Result<String, MarketDataError>>,
{
    let mut collected = Vec::new();
    for (year, quarter) in quarters_back(today).take(MAX_QUARTERS) {
        let page = match fetch_page(year, quarter).await {
            Ok(html) => parse_history_page(symbol, &html),
            Err(e) => Err(e),
        };
        let page = match page {
            Ok(page) => page,
            Err(e) if collected.is_empty() => return Err(e),
            Err(e) => {
                warn!(
                    "Sina history {} {}Q{} failed, keeping {} bars: {}",
                    symbol.canonical(),
                    year,
                    quarter,
                    collected.len(),
                    e
                );
                break;
            }
        };
        debug!(
            "Sina history {} {}Q{}: {} rows",
            symbol.canonical(),
            year,
            quarter,
            page.len()
        );
        collected.extend(page);
        if collected.len() >= count {
            break;
        }
    }
    Ok(collected)
}

/// Page path for the symbol. Index pages carry a `type/S` segment.
pub(crate) fn history_path(symbol: &NormalizedSymbol) -> String {
    if symbol.is_index {
        format!("vMS_MarketHistory/stockid/{}/type/S.phtml", symbol.code)
    } else {
        format!("vMS_MarketHistory/stockid/{}.phtml", symbol.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::normalize;

    const PAGE: &str = r##"
        <html><body>
        <table id="toolbar"><tr><td>nav</td></tr></table>
        <table id="FundHoldSharesTable">
          <thead><tr><th colspan="7">贵州茅台(600519) 历史交易</th></tr></thead>
          <tr><td>日期</td><td>开盘价</td><td>最高价</td><td>收盘价</td><td>最低价</td><td>交易量(股)</td><td>交易金额(元)</td></tr>
          <tr><td><div><a href="#"> 2024-03-06 </a></div></td><td>1700.00</td><td>1710.00</td><td>1705.50</td><td>1695.00</td><td>2500000</td><td>4263750000</td></tr>
          <tr><td>2024-03-05</td><td>1690.00</td><td>1700.00</td><td>1690.00</td><td>1680.00</td><td>2100000</td><td>3549000000</td></tr>
          <tr><td colspan="2">note</td></tr>
        </table>
        </body></html>"##;

    #[test]
    fn test_extract_rows_skips_header_and_short_rows() {
        let rows = extract_rows(PAGE).unwrap();
        // Column titles survive as a row; they fail date parsing later.
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][col::DATE], "2024-03-06");
    }

    #[test]
    fn test_parse_history_page() {
        let symbol = normalize("600519").unwrap();
        let bars = parse_history_page(&symbol, PAGE).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 1705.5);
        assert_eq!(bars[0].high, 1710.0);
        assert_eq!(bars[0].low, 1695.0);
        assert_eq!(bars[1].volume, 2_100_000.0);
    }

    #[test]
    fn test_falls_back_to_first_table() {
        let html = "<table><tr><td>h</td></tr><tr><td>2024-01-02</td><td>10</td><td>11</td><td>10.5</td><td>9.9</td></tr></table>";
        let symbol = normalize("000001").unwrap();
        let bars = parse_history_page(&symbol, html).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].volume, 0.0);
    }

    #[test]
    fn test_page_without_table_is_empty() {
        let symbol = normalize("000001").unwrap();
        assert!(parse_history_page(&symbol, "<p>nothing</p>").unwrap().is_empty());
    }

    #[test]
    fn test_quarters_back() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let quarters: Vec<_> = quarters_back(today).take(3).collect();
        assert_eq!(quarters, vec![(2024, 1), (2023, 4), (2023, 3)]);
    }

    fn quarter_page(year: i32, quarter: u32) -> String {
        let month = (quarter - 1) * 3 + 1;
        let rows: String = (1..=3)
            .map(|day| {
                format!(
                    "<tr><td>{year}-{month:02}-{day:02}</td><td>10</td><td>11</td><td>10.5</td><td>9.5</td><td>1000</td><td>10500</td></tr>"
                )
            })
            .collect();
        format!("<table id=\"FundHoldSharesTable\"><tr><td>header</td></tr>{rows}</table>")
    }

    #[tokio::test]
    async fn test_failed_later_quarter_keeps_collected_bars() {
        let symbol = normalize("600519").unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();

        let bars = collect_quarters(&symbol, today, 10, |year, quarter| async move {
            if (year, quarter) == (2024, 2) {
                Ok(quarter_page(year, quarter))
            } else {
                Err(MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(bars.len(), 3);
        assert!(bars.iter().all(|b| b.time.date().month() == 4));
    }

    #[tokio::test]
    async fn test_failed_first_quarter_is_an_error() {
        let symbol = normalize("600519").unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();

        let err = collect_quarters(&symbol, today, 10, |_, _| async {
            Err::<String, _>(MarketDataError::Timeout {
                provider: PROVIDER_ID.to_string(),
            })
        })
        .await
        .unwrap_err();
        assert!(matches!(err, MarketDataError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_walk_stops_once_count_is_reached() {
        let symbol = normalize("600519").unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        let mut pages = 0;

        let bars = collect_quarters(&symbol, today, 5, |year, quarter| {
            pages += 1;
            async move { Ok(quarter_page(year, quarter)) }
        })
        .await
        .unwrap();

        assert_eq!(pages, 2);
        assert_eq!(bars.len(), 6);
    }

    #[test]
    fn test_index_history_path() {
        let index = normalize("sh000001").unwrap();
        assert_eq!(history_path(&index), "vMS_MarketHistory/stockid/000001/type/S.phtml");
        let equity = normalize("600519").unwrap();
        assert_eq!(history_path(&equity), "vMS_MarketHistory/stockid/600519.phtml");
    }
}
