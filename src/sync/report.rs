//! Run phases and the per-run report.

use crate::materializer::MaterializeSummary;
use serde::Serialize;
use std::fmt;

/// Where the driver is within one page of the walk
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Requesting the next listing page
    FetchingPage,
    /// Fetching bodies for every stub on the page
    HydratingBodies,
    /// Materializing assets of every hydrated post
    DownloadingAssets,
    /// Selecting and stamping the page's kept-set
    NormalizingBatch,
    /// Walk finished; batch handed to persistence
    Done,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::FetchingPage => "fetching_page",
            SyncPhase::HydratingBodies => "hydrating_bodies",
            SyncPhase::DownloadingAssets => "downloading_assets",
            SyncPhase::NormalizingBatch => "normalizing_batch",
            SyncPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Counters describing one completed run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Listing pages requested
    pub pages_fetched: usize,
    /// Post stubs seen across all pages
    pub posts_listed: usize,
    /// Stubs dropped because no body came back
    pub posts_dropped: usize,
    /// Posts handed to persistence
    pub posts_kept: usize,
    /// Assets downloaded and written
    pub assets_stored: usize,
    /// Assets skipped because they were already stored
    pub assets_already_present: usize,
    /// Assets that could not be materialized
    pub assets_failed: usize,
    /// Distinct authors in the persisted batch
    pub authors: usize,
    /// Whether the walk ended on a page containing known posts
    pub stopped_on_known: bool,
}

impl SyncReport {
    pub(crate) fn add_assets(&mut self, summary: MaterializeSummary) {
        self.assets_stored += summary.stored;
        self.assets_already_present += summary.already_present;
        self.assets_failed += summary.failed;
    }
}
