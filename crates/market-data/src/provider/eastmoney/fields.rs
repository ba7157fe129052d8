//! Field mapping tables for the Eastmoney push2 endpoints.
//!
//! Every field the adapter reads is declared here once, together with the
//! fixed factor that converts the wire value into canonical units.

/// One keyed quote field and its unit conversion.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Field {
    pub code: &'static str,
    /// Multiplier applied to the wire value.
    pub factor: f64,
}

const fn field(code: &'static str, factor: f64) -> Field {
    Field { code, factor }
}

/// Prices and ratios arrive multiplied by 100.
const CENTS: f64 = 0.01;
/// Volumes arrive in lots of 100 shares.
const LOTS: f64 = 100.0;

pub(crate) const PRICE: Field = field("f43", CENTS);
pub(crate) const HIGH: Field = field("f44", CENTS);
pub(crate) const LOW: Field = field("f45", CENTS);
pub(crate) const OPEN: Field = field("f46", CENTS);
pub(crate) const VOLUME: Field = field("f47", LOTS);
pub(crate) const AMOUNT: Field = field("f48", 1.0);
pub(crate) const CODE: &str = "f57";
pub(crate) const NAME: &str = "f58";
pub(crate) const PREV_CLOSE: Field = field("f60", CENTS);
pub(crate) const TIMESTAMP: Field = field("f86", 1.0);
pub(crate) const MARKET_CAP: Field = field("f116", 1.0);
pub(crate) const PE: Field = field("f162", CENTS);
pub(crate) const PB: Field = field("f167", CENTS);
pub(crate) const TURNOVER_RATE: Field = field("f168", CENTS);

/// Bid ladder as `(price, volume)`, rank 1 first.
pub(crate) const BIDS: [(Field, Field); 5] = [
    (field("f19", CENTS), field("f20", LOTS)),
    (field("f17", CENTS), field("f18", LOTS)),
    (field("f15", CENTS), field("f16", LOTS)),
    (field("f13", CENTS), field("f14", LOTS)),
    (field("f11", CENTS), field("f12", LOTS)),
];

/// Ask ladder as `(price, volume)`, rank 1 first.
pub(crate) const ASKS: [(Field, Field); 5] = [
    (field("f39", CENTS), field("f40", LOTS)),
    (field("f37", CENTS), field("f38", LOTS)),
    (field("f35", CENTS), field("f36", LOTS)),
    (field("f33", CENTS), field("f34", LOTS)),
    (field("f31", CENTS), field("f32", LOTS)),
];

/// Comma-separated `fields` parameter for the quote request.
pub(crate) fn quote_field_list() -> String {
    let mut codes = vec![
        PRICE.code,
        HIGH.code,
        LOW.code,
        OPEN.code,
        VOLUME.code,
        AMOUNT.code,
        CODE,
        NAME,
        PREV_CLOSE.code,
        TIMESTAMP.code,
        MARKET_CAP.code,
        PE.code,
        PB.code,
        TURNOVER_RATE.code,
    ];
    for (price, volume) in BIDS.iter().chain(ASKS.iter()) {
        codes.push(price.code);
        codes.push(volume.code);
    }
    codes.join(",")
}

/// Column positions of one kline record.
pub(crate) mod kline {
    pub const DATE: usize = 0;
    pub const OPEN: usize = 1;
    pub const CLOSE: usize = 2;
    pub const HIGH: usize = 3;
    pub const LOW: usize = 4;
    /// Lots.
    pub const VOLUME: usize = 5;
    pub const AMOUNT: usize = 6;
    pub const AMPLITUDE: usize = 7;
    pub const CHANGE_PERCENT: usize = 8;
    pub const CHANGE: usize = 9;
    pub const TURNOVER_RATE: usize = 10;
    pub const ARITY: usize = 11;
}

/// Column positions of one trends2 record.
pub(crate) mod trend {
    pub const TIME: usize = 0;
    pub const PRICE: usize = 2;
    /// Lots.
    pub const VOLUME: usize = 5;
    pub const AMOUNT: usize = 6;
    pub const AVG_PRICE: usize = 7;
    pub const ARITY: usize = 8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_list_is_unique() {
        let list = quote_field_list();
        let codes: Vec<&str> = list.split(',').collect();
        let mut deduped = codes.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(codes.len(), deduped.len());
        assert_eq!(codes.len(), 34);
    }
}
