use serde::{Deserialize, Serialize};

/// Side of the book.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Bid,
    Ask,
}

/// One rung of the five-level depth snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookLevel {
    pub side: Side,
    /// 1 is the best price.
    pub rank: u8,
    pub price: f64,
    /// Resting volume in shares.
    pub volume: f64,
}

/// Bid and ask ladders, each ordered rank 1 first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBook {
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
}

/// Maximum depth published by the exchanges.
pub const BOOK_DEPTH: usize = 5;

impl OrderBook {
    /// Builds a book from `(price, volume)` pairs given best price first.
    ///
    /// Ranks follow the input position, so a filtered-out level leaves a gap
    /// in the ranks rather than promoting deeper levels. Levels with a
    /// non-positive or non-finite price are excluded.
    pub fn from_ladders(bids: &[(f64, f64)], asks: &[(f64, f64)]) -> Self {
        Self {
            bids: ladder(Side::Bid, bids),
            asks: ladder(Side::Ask, asks),
        }
    }

    /// True when neither side has a valid level.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

fn ladder(side: Side, levels: &[(f64, f64)]) -> Vec<OrderBookLevel> {
    levels
        .iter()
        .take(BOOK_DEPTH)
        .enumerate()
        .filter(|(_, (price, _))| price.is_finite() && *price > 0.0)
        .map(|(i, (price, volume))| OrderBookLevel {
            side,
            rank: (i + 1) as u8,
            price: *price,
            volume: *volume,
        })
        .collect()
}
