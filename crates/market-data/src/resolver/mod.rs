//! Symbol resolution.
//!
//! Maps user-supplied tickers to exchange-qualified codes and provides the
//! per-provider code formats.

mod market;
mod normalizer;

pub use market::{index_name, Market};
pub use normalizer::{normalize, NormalizedSymbol, INDEX_SCALE_THRESHOLD};
