//! Harvested record: one phone-number listing row.

use serde::{Deserialize, Serialize};

/// A single extracted listing, as produced by the page extractor.
///
/// Downstream persistence upserts by `phone`, so re-extracting a page
/// after a retry is harmless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestedRecord {
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub region: String,
    pub area_code: String,
    pub source_url: String,
}
