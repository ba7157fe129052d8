//! Canonical market data records.
//!
//! Every adapter converts its wire format into these types. They are plain
//! immutable values and serialize as camelCase JSON.

mod kline;
mod order_book;
mod quote;
pub mod session;
mod tick;

pub use kline::{closes, fill_derived_fields, normalize_series, KlineBar, KlinePeriod};
pub use order_book::{OrderBook, OrderBookLevel, Side, BOOK_DEPTH};
pub use quote::{derive_change, Quote};
pub use tick::{retain_session_ticks, TickPoint};

/// Provider identifier, e.g. "SINA" or "EASTMONEY".
pub type ProviderId = std::borrow::Cow<'static, str>;
