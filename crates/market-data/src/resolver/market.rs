//! Exchange identities and the catalog of known index codes.
//!
//! The catalog lives in `indices.json`, is embedded at compile time and is
//! indexed once via `lazy_static`.

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use log::error;
use serde::{Deserialize, Serialize};

/// Mainland exchange a security trades on.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Market {
    #[serde(rename = "sh")]
    Shanghai,
    #[serde(rename = "sz")]
    Shenzhen,
}

impl Market {
    /// Two-letter prefix used in canonical symbols.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Shanghai => "sh",
            Self::Shenzhen => "sz",
        }
    }

    pub(crate) fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_lowercase().as_str() {
            "sh" => Some(Self::Shanghai),
            "sz" => Some(Self::Shenzhen),
            _ => None,
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

#[derive(Debug, Default, Deserialize)]
struct IndexCatalog {
    indices: Vec<IndexEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IndexEntry {
    pub market: Market,
    pub code: String,
    pub name: String,
    #[serde(default = "unit_scale")]
    pub scale: f64,
    /// A bare code (no prefix) means this index rather than the Shenzhen
    /// security with the same digits.
    #[serde(default, rename = "bareCode")]
    pub bare_code: bool,
}

fn unit_scale() -> f64 {
    1.0
}

lazy_static! {
    static ref INDICES: HashMap<(Market, String), IndexEntry> = load_indices();
}

fn load_indices() -> HashMap<(Market, String), IndexEntry> {
    let catalog: IndexCatalog =
        serde_json::from_str(include_str!("indices.json")).unwrap_or_else(|e| {
            error!("indices.json is malformed, index detection disabled: {}", e);
            IndexCatalog::default()
        });

    catalog
        .indices
        .into_iter()
        .map(|entry| ((entry.market, entry.code.clone()), entry))
        .collect()
}

/// Looks up a known index by exchange and six digit code.
pub(crate) fn lookup_index(market: Market, code: &str) -> Option<&'static IndexEntry> {
    INDICES.get(&(market, code.to_string()))
}

/// Shanghai index claimed by a bare six digit code, if any.
pub(crate) fn bare_code_index(code: &str) -> Option<&'static IndexEntry> {
    lookup_index(Market::Shanghai, code).filter(|e| e.bare_code)
}

/// Display name of a known index.
pub fn index_name(market: Market, code: &str) -> Option<&'static str> {
    lookup_index(market, code).map(|e| e.name.as_str())
}
