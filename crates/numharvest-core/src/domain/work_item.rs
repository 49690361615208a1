//! Work items: the ordered, deterministic list a cursor indexes into.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::WorkListMeta;

/// One unit of harvesting work: a (region, area-code) listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub region: String,
    pub area_code: String,
    pub url: String,
}

impl WorkItem {
    /// Stable dedup key within a run. Two entries pointing at the same
    /// page are the same work.
    pub fn key(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.region, self.area_code)
    }
}

/// Shape of the region/area-code index document produced by the sidebar
/// scraper (external collaborator). Only the fields the work list needs.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionIndex {
    pub regions: BTreeMap<String, RegionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionEntry {
    #[serde(default)]
    pub area_codes: Vec<AreaCodeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AreaCodeEntry {
    pub code: String,
    pub url: String,
}

/// Ordered work list plus the identity of its source.
///
/// Ordering must be stable across runs so that a persisted cursor offset
/// stays a meaningful resume point. Items are sorted by (region,
/// area_code) no matter what order the source delivered them in.
#[derive(Debug, Clone)]
pub struct WorkList {
    source: String,
    items: Vec<WorkItem>,
}

impl WorkList {
    pub fn new(source: impl Into<String>, mut items: Vec<WorkItem>) -> Self {
        items.sort_by(|a, b| {
            a.region
                .cmp(&b.region)
                .then_with(|| a.area_code.cmp(&b.area_code))
        });
        Self {
            source: source.into(),
            items,
        }
    }

    /// Build from a parsed region index document.
    pub fn from_region_index(source: impl Into<String>, index: &RegionIndex) -> Self {
        let mut items = Vec::new();
        for (region, entry) in &index.regions {
            for ac in &entry.area_codes {
                items.push(WorkItem {
                    region: region.clone(),
                    area_code: ac.code.clone(),
                    url: ac.url.clone(),
                });
            }
        }
        Self::new(source, items)
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Fingerprint used to decide whether a saved cursor is still valid.
    pub fn meta(&self) -> WorkListMeta {
        WorkListMeta {
            source: self.source.clone(),
            len: self.items.len(),
        }
    }
}
