//! Sequential run over a search-results page and its listings.

use crate::assemble::RecordAssembler;
use crate::enumerate::enumerate_listings;
use crate::error::ExtractionError;
use crate::fetch::{WaitStatus, fetch, wait_leniently};
use crate::record::{ListingRecord, ListingReference};
use crate::session::{BrowserSession, WaitCondition};
use crate::snapshot::snapshot;
use crate::{Error, Result};
use chrono::{DateTime, Local};
use std::time::Duration;
use url::Url;

/// Last row of a fully rendered detail table
pub const DETAIL_READY_SELECTOR: &str = "table.item-detail-table tr:nth-of-type(11)";

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Wait for every element to render after each navigation
    pub wait_for_visible: bool,
    /// Bound on the visibility wait; on timeout the page is snapshotted as is
    /// and counted in [`RunReport::degraded`]
    pub page_timeout: Duration,
    /// Selector marking a listing page as complete, waited for leniently
    pub detail_ready_selector: Option<String>,
    pub detail_timeout: Duration,
    /// Stop after this many listings
    pub limit: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            wait_for_visible: true,
            page_timeout: Duration::from_secs(30),
            detail_ready_selector: Some(DETAIL_READY_SELECTOR.to_string()),
            detail_timeout: Duration::from_secs(10),
            limit: None,
        }
    }
}

/// A listing excluded from the output, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingFailure {
    pub url: String,
    pub error: ExtractionError,
}

/// The session failure that ended a run early.
#[derive(Debug, Clone, PartialEq)]
pub struct RunAbort {
    /// Listing being harvested when the session failed
    pub url: String,
    pub reason: String,
}

/// What happened to one listing.
#[derive(Debug, Clone)]
pub struct ListingOutcome {
    pub wait: WaitStatus,
    pub result: std::result::Result<ListingRecord, ExtractionError>,
}

/// Run-scoped tally of listings and their results.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub records: Vec<ListingRecord>,
    pub failures: Vec<ListingFailure>,
    /// Listings visited so far, successful or not
    pub processed: usize,
    /// Listings snapshotted after a visibility timeout
    pub degraded: usize,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    /// Set when a session error stopped the run; records gathered before it
    /// are kept
    pub aborted: Option<RunAbort>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            failures: Vec::new(),
            processed: 0,
            degraded: 0,
            started_at: Local::now(),
            finished_at: None,
            aborted: None,
        }
    }

    /// Fold one listing outcome into the tally
    pub fn record(&mut self, reference: &ListingReference, outcome: ListingOutcome) {
        self.processed += 1;
        if outcome.wait == WaitStatus::TimedOut {
            self.degraded += 1;
        }

        match outcome.result {
            Ok(record) => self.records.push(record),
            Err(error) => {
                tracing::warn!(
                    "Skipping {} (field '{}'): {}",
                    reference,
                    error.field(),
                    error
                );
                self.failures.push(ListingFailure {
                    url: reference.to_string(),
                    error,
                });
            }
        }
    }

    pub fn succeeded(&self) -> usize {
        self.records.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    fn abort(&mut self, reference: &ListingReference, error: &Error) {
        tracing::error!("Run aborted at {}: {}", reference, error);
        self.aborted = Some(RunAbort {
            url: reference.to_string(),
            reason: error.to_string(),
        });
    }

    fn finish(&mut self) {
        let finished_at = Local::now();
        tracing::info!(
            "Start: {}, End: {}",
            self.started_at.format("%Y%m%d_%H%M%S"),
            finished_at.format("%Y%m%d_%H%M%S")
        );
        self.finished_at = Some(finished_at);
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives a session through a search page and each listing it links to.
#[derive(Debug, Clone, Default)]
pub struct Harvester {
    options: RunOptions,
    assembler: RecordAssembler,
}

impl Harvester {
    pub fn new(options: RunOptions, assembler: RecordAssembler) -> Self {
        Self { options, assembler }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Load the search page and enumerate its listings, honoring the limit
    pub async fn discover<S>(
        &self,
        session: &mut S,
        search_url: &Url,
        base_url: &Url,
    ) -> Result<Vec<ListingReference>>
    where
        S: BrowserSession + ?Sized,
    {
        tracing::info!("Searching: {}", search_url);
        fetch(
            session,
            search_url.as_str(),
            self.options.wait_for_visible,
            self.options.page_timeout,
        )
        .await?;

        let doc = snapshot(session).await?;
        let mut references = enumerate_listings(&doc, base_url);
        if let Some(limit) = self.options.limit {
            references.truncate(limit);
        }
        Ok(references)
    }

    /// Fetch, snapshot and assemble a single listing.
    ///
    /// Only session failures are returned as `Err`; extraction failures are
    /// part of the outcome.
    pub async fn harvest_listing<S>(
        &self,
        session: &mut S,
        reference: &ListingReference,
    ) -> Result<ListingOutcome>
    where
        S: BrowserSession + ?Sized,
    {
        let fetched = fetch(
            session,
            reference.as_str(),
            self.options.wait_for_visible,
            self.options.page_timeout,
        )
        .await?;

        if let Some(selector) = &self.options.detail_ready_selector {
            let condition = WaitCondition::SelectorPresent(selector.clone());
            wait_leniently(session, &condition, self.options.detail_timeout).await?;
        }

        let doc = snapshot(session).await?;
        Ok(ListingOutcome {
            wait: fetched.wait,
            result: self.assembler.assemble(reference, &doc),
        })
    }

    /// Harvest `references` one after another, in order.
    ///
    /// `on_progress` sees the report after every listing. A session error
    /// stops the run: the report keeps every listing harvested before it and
    /// records the failure in [`RunReport::aborted`].
    pub async fn run_listings<S, F>(
        &self,
        session: &mut S,
        references: &[ListingReference],
        mut on_progress: F,
    ) -> RunReport
    where
        S: BrowserSession + ?Sized,
        F: FnMut(&RunReport),
    {
        let mut report = RunReport::new();

        for reference in references {
            tracing::info!("No.{}: {}", report.processed + 1, reference);
            match self.harvest_listing(session, reference).await {
                Ok(outcome) => report.record(reference, outcome),
                Err(e) => {
                    report.abort(reference, &e);
                    break;
                }
            }
            on_progress(&report);
        }

        report.finish();
        tracing::info!(
            "Harvested {} of {} listings ({} skipped)",
            report.succeeded(),
            report.processed,
            report.failed()
        );
        report
    }

    /// Discover listings on `search_url` and harvest all of them.
    ///
    /// Fails only if the search page itself cannot be loaded.
    pub async fn run<S>(&self, session: &mut S, search_url: &Url, base_url: &Url) -> Result<RunReport>
    where
        S: BrowserSession + ?Sized,
    {
        let references = self.discover(session, search_url, base_url).await?;
        Ok(self.run_listings(session, &references, |_| {}).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Field};
    use crate::session::fake::FakeSession;
    use chrono::FixedOffset;

    const SEARCH: &str = "https://www.mercari.com/jp/search/?keyword=shoes";
    const BASE: &str = "https://www.mercari.com";

    fn search_page(hrefs: &[&str]) -> String {
        let items: String = hrefs
            .iter()
            .map(|href| format!(r#"<section class="items-box"><a href="{}">item</a></section>"#, href))
            .collect();
        format!("<html><body>{}</body></html>", items)
    }

    fn listing_page(title: &str, listed: &str, updated: &str) -> String {
        format!(
            r#"<html><body>
                 <h1 class="item-name">{title}</h1>
                 <span class="item-price bold">¥3,500</span>
                 <table class="item-detail-table">
                   <tr><th>出品者</th><td>
                     <a href="/jp/u/42/">Taro</a>
                     <div class="item-user-ratings"><span>120</span><span>3</span></div>
                   </td></tr>
                   <tr><th>出品日時</th><td>{listed}</td></tr>
                   <tr><th>更新日時</th><td>{updated}</td></tr>
                 </table>
               </body></html>"#
        )
    }

    fn harvester(limit: Option<usize>) -> Harvester {
        Harvester::new(
            RunOptions {
                page_timeout: Duration::from_millis(20),
                detail_timeout: Duration::from_millis(20),
                limit,
                ..RunOptions::default()
            },
            RecordAssembler::with_offset(FixedOffset::east_opt(9 * 3600).unwrap()),
        )
    }

    fn urls() -> (Url, Url) {
        (Url::parse(SEARCH).unwrap(), Url::parse(BASE).unwrap())
    }

    #[tokio::test]
    async fn test_run_harvests_listings_in_order() {
        let mut session = FakeSession::new()
            .with_page(SEARCH, &search_page(&["/jp/items/m1/", "/jp/items/m2/"]))
            .with_page(
                "https://www.mercari.com/jp/items/m1/",
                &listing_page("Sample Shoes", "2024/05/01 10:00:00", "2024/05/02 16:00:00"),
            )
            .with_page(
                "https://www.mercari.com/jp/items/m2/",
                &listing_page("Running Shoes", "2024/05/01 10:00:00", "2024/05/01 11:30:00"),
            );
        let (search, base) = urls();

        let report = harvester(None).run(&mut session, &search, &base).await.unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.records[0].title(), "Sample Shoes");
        assert_eq!(report.records[0].elapsed_hours(), 30.0);
        assert_eq!(report.records[1].title(), "Running Shoes");
        assert_eq!(report.records[1].elapsed_hours(), 1.5);
        assert!(report.finished_at.is_some());
        assert_eq!(
            session.navigations,
            vec![
                SEARCH.to_string(),
                "https://www.mercari.com/jp/items/m1/".to_string(),
                "https://www.mercari.com/jp/items/m2/".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_listing_is_skipped_and_run_continues() {
        let mut session = FakeSession::new()
            .with_page(
                SEARCH,
                &search_page(&["/jp/items/m1/", "/jp/items/m2/", "/jp/items/m3/"]),
            )
            .with_page(
                "https://www.mercari.com/jp/items/m1/",
                &listing_page("First", "2024/05/01 10:00:00", "2024/05/02 16:00:00"),
            )
            .with_page(
                "https://www.mercari.com/jp/items/m2/",
                "<html><body><p>This listing was removed</p></body></html>",
            )
            .with_page(
                "https://www.mercari.com/jp/items/m3/",
                &listing_page("Third", "2024-13-40", "2024/05/02 16:00:00"),
            );
        let (search, base) = urls();

        let report = harvester(None).run(&mut session, &search, &base).await.unwrap();

        assert_eq!(report.processed, 3);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.records[0].title(), "First");

        assert_eq!(report.failures[0].url, "https://www.mercari.com/jp/items/m2/");
        assert_eq!(report.failures[0].error.field(), Field::Title);
        assert_eq!(report.failures[1].url, "https://www.mercari.com/jp/items/m3/");
        assert!(report.failures[1].error.is_format());
    }

    /// Visibility timeouts degrade to a best-effort snapshot: the listing is
    /// still assembled from whatever rendered.
    #[tokio::test]
    async fn test_visibility_timeout_still_assembles_listing() {
        let mut session = FakeSession::new()
            .with_page(SEARCH, &search_page(&["/jp/items/m1/"]))
            .with_page(
                "https://www.mercari.com/jp/items/m1/",
                &listing_page("Sample Shoes", "2024/05/01 10:00:00", "2024/05/02 16:00:00"),
            )
            .never_visible();
        let (search, base) = urls();

        let report = harvester(None).run(&mut session, &search, &base).await.unwrap();

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.degraded, 1);
    }

    #[tokio::test]
    async fn test_session_failure_aborts_run() {
        let mut session = FakeSession::new()
            .with_page(SEARCH, &search_page(&["/jp/items/m1/", "/jp/items/m2/"]))
            .with_unreachable("https://www.mercari.com/jp/items/m1/");
        let (search, base) = urls();

        let report = harvester(None).run(&mut session, &search, &base).await.unwrap();

        assert!(report.is_aborted());
        assert_eq!(report.processed, 0);
        assert_eq!(session.navigations.len(), 2);
    }

    #[tokio::test]
    async fn test_session_failure_keeps_earlier_records() {
        let mut session = FakeSession::new()
            .with_page(
                SEARCH,
                &search_page(&["/jp/items/m1/", "/jp/items/m2/", "/jp/items/m3/"]),
            )
            .with_page(
                "https://www.mercari.com/jp/items/m1/",
                &listing_page("Sample Shoes", "2024/05/01 10:00:00", "2024/05/02 16:00:00"),
            )
            .with_unreachable("https://www.mercari.com/jp/items/m2/");
        let (search, base) = urls();

        let report = harvester(None).run(&mut session, &search, &base).await.unwrap();

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.records[0].title(), "Sample Shoes");
        assert_eq!(report.processed, 1);
        assert!(report.finished_at.is_some());

        let abort = report.aborted.as_ref().unwrap();
        assert_eq!(abort.url, "https://www.mercari.com/jp/items/m2/");
        assert!(abort.reason.contains("Session error"));

        // m3 is never visited
        assert_eq!(session.navigations.len(), 3);
    }

    #[tokio::test]
    async fn test_unreachable_search_page_fails_run() {
        let mut session = FakeSession::new().with_unreachable(SEARCH);
        let (search, base) = urls();

        let result = harvester(None).run(&mut session, &search, &base).await;

        assert!(matches!(result, Err(Error::Session(_))));
    }

    #[tokio::test]
    async fn test_empty_search_page_is_an_empty_run() {
        let mut session = FakeSession::new().with_page(SEARCH, &search_page(&[]));
        let (search, base) = urls();

        let report = harvester(None).run(&mut session, &search, &base).await.unwrap();

        assert_eq!(report.processed, 0);
        assert!(report.records.is_empty());
    }

    #[tokio::test]
    async fn test_limit_truncates_discovered_listings() {
        let mut session = FakeSession::new().with_page(
            SEARCH,
            &search_page(&["/jp/items/m1/", "/jp/items/m2/", "/jp/items/m3/"]),
        );
        let (search, base) = urls();

        let references = harvester(Some(2))
            .discover(&mut session, &search, &base)
            .await
            .unwrap();

        assert_eq!(references.len(), 2);
        assert_eq!(references[1].as_str(), "https://www.mercari.com/jp/items/m2/");
    }

    #[tokio::test]
    async fn test_progress_sees_running_count() {
        let mut session = FakeSession::new();
        let references = vec![
            ListingReference::parse("https://www.mercari.com/jp/items/m1/").unwrap(),
            ListingReference::parse("https://www.mercari.com/jp/items/m2/").unwrap(),
        ];
        let mut seen = Vec::new();

        let report = harvester(None)
            .run_listings(&mut session, &references, |r| seen.push(r.processed))
            .await;

        assert_eq!(seen, vec![1, 2]);
        assert_eq!(report.failed(), 2);
    }
}
