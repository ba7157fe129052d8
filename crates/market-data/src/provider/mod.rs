//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - Provider capabilities and HTTP settings
//! - The Eastmoney (structured JSON) and Sina (text snapshot and HTML)
//!   implementations
//!
//! Providers receive an already normalized symbol and derive their own
//! upstream code from it.

mod capabilities;
pub(crate) mod http;
mod traits;

pub mod eastmoney;
pub mod sina;

pub use capabilities::{ProviderCapabilities, ProviderSettings};
pub use traits::{MarketDataProvider, QuoteWithBook};
