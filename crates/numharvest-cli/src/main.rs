//! Demo wiring: a full harvest run against a scripted extractor.
//!
//! Real deployments plug in a browser-backed extractor and point the
//! store at a shared directory; everything else is identical.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use numharvest_core::config::HarvestConfig;
use numharvest_core::domain::{HarvestedRecord, RegionIndex, WorkItem, WorkList};
use numharvest_core::errors::ExtractError;
use numharvest_core::harvest::HarvestRunner;
use numharvest_core::lock::TaskLock;
use numharvest_core::ports::{Extractor, LeaseProbe, SystemClock};
use numharvest_core::progress::ProgressTracker;
use numharvest_core::stores::FsStore;

/// Stand-in extractor: yields a couple of records per page and fails the
/// first `n` calls to show the retry path.
struct DemoExtractor {
    remaining_failures: AtomicU32,
}

impl DemoExtractor {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl Extractor for DemoExtractor {
    async fn extract(&self, item: &WorkItem) -> Result<Vec<HarvestedRecord>, ExtractError> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(ExtractError::new(format!(
                "intentional failure (left={left})"
            )));
        }
        Ok(vec![
            HarvestedRecord {
                phone: format!("({}) 555-0100", item.area_code),
                price: Some("$149".into()),
                region: item.region.clone(),
                area_code: item.area_code.clone(),
                source_url: item.url.clone(),
            },
            HarvestedRecord {
                phone: format!("({}) 555-0199", item.area_code),
                price: None,
                region: item.region.clone(),
                area_code: item.area_code.clone(),
                source_url: item.url.clone(),
            },
        ])
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // (A) Shared state lives under a directory both the lock and the
    // progress record use; concurrent runs against the same dir exclude
    // each other.
    let state_dir = std::env::temp_dir().join("numharvest-demo");
    let store = Arc::new(FsStore::new(&state_dir));
    let clock = Arc::new(SystemClock);

    // (B) Config: demo pacing, tiny record cap so the early stop shows.
    let config = HarvestConfig {
        min_delay: 0.1,
        max_delay: 0.3,
        long_pause_every: 0,
        max_total_records: Some(10),
        ..Default::default()
    };

    // (C) Work list from an index document, the shape the sidebar
    // scraper emits.
    let index: RegionIndex = serde_json::from_value(serde_json::json!({
        "regions": {
            "Ohio": { "area_codes": [
                { "code": "216", "url": "https://example.com/categories/Ohio/216" },
                { "code": "330", "url": "https://example.com/categories/Ohio/330" },
            ]},
            "Texas": { "area_codes": [
                { "code": "214", "url": "https://example.com/categories/Texas/214" },
                { "code": "512", "url": "https://example.com/categories/Texas/512" },
            ]},
        }
    }))
    .expect("index document is well-formed");
    let work_list = WorkList::from_region_index("demo-index", &index);

    // (D) Wire the runner and go.
    let lock = Arc::new(TaskLock::new(
        "numharvest",
        store.clone(),
        clock.clone(),
        Arc::new(LeaseProbe),
        config.lock_settings(),
    ));
    let tracker = ProgressTracker::new(store, clock);
    let runner = HarvestRunner::new(
        "numharvest",
        lock,
        tracker,
        Arc::new(DemoExtractor::new(1)),
        config.retry_policy(),
        config.throttle_policy(),
        config.max_total_records,
    );

    match runner.run(&work_list).await {
        Ok(report) => {
            println!(
                "outcome={:?} succeeded={} failed={} records={} cursor={} elapsed={:.1}s",
                report.outcome,
                report.summary.succeeded,
                report.summary.failed,
                report.summary.records_captured,
                report.cursor,
                report.elapsed.as_secs_f64(),
            );
        }
        Err(err) => {
            eprintln!("harvest aborted: {err}");
            std::process::exit(1);
        }
    }
}
