use crate::{Error, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Interval between readiness checks while waiting on a page
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Page state a session can be asked to wait for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// Document fully loaded and every element taking part in layout has a
    /// non-zero width and height
    AllElementsVisible,
    /// At least one node matches the CSS selector
    SelectorPresent(String),
}

/// A controlled browser tab, used strictly one operation at a time.
///
/// Every method takes `&mut self`: navigating while another wait is in flight
/// would corrupt that wait.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate the current page to `url`
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Serialized markup of the live page
    async fn current_markup(&mut self) -> Result<String>;

    /// Block until `condition` holds, or fail with [`Error::Timeout`]
    async fn wait_until(&mut self, condition: &WaitCondition, timeout: Duration) -> Result<()>;
}

/// Repeatedly run `check` until it reports `true` or `timeout` elapses.
///
/// A check that hangs past the deadline counts as a timeout. Check errors are
/// returned immediately.
pub async fn poll_until<F, Fut>(mut check: F, timeout: Duration, interval: Duration) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let deadline = Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining, check()).await {
            Ok(Ok(true)) => return Ok(()),
            Ok(Ok(false)) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(Error::Timeout(timeout)),
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::Timeout(timeout));
        }
        tokio::time::sleep(interval.min(remaining)).await;
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use scraper::{Html, Selector};
    use std::collections::{HashMap, HashSet};

    /// In-memory session serving fixed markup per URL.
    #[derive(Debug, Default)]
    pub struct FakeSession {
        pages: HashMap<String, String>,
        current: Option<String>,
        unreachable: HashSet<String>,
        never_visible: bool,
        pub navigations: Vec<String>,
    }

    impl FakeSession {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, url: &str, markup: &str) -> Self {
            self.pages.insert(url.to_string(), markup.to_string());
            self
        }

        pub fn with_unreachable(mut self, url: &str) -> Self {
            self.unreachable.insert(url.to_string());
            self
        }

        /// Make every visibility wait time out
        pub fn never_visible(mut self) -> Self {
            self.never_visible = true;
            self
        }
    }

    fn selector_present(markup: &str, selector: &str) -> Result<bool> {
        let selector = Selector::parse(selector)
            .map_err(|e| Error::Session(format!("invalid selector {:?}: {:?}", selector, e)))?;
        Ok(Html::parse_document(markup).select(&selector).next().is_some())
    }

    #[async_trait]
    impl BrowserSession for FakeSession {
        async fn navigate(&mut self, url: &str) -> Result<()> {
            self.navigations.push(url.to_string());
            if self.unreachable.contains(url) {
                return Err(Error::Session(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)));
            }
            self.current = Some(url.to_string());
            Ok(())
        }

        async fn current_markup(&mut self) -> Result<String> {
            let url = self
                .current
                .as_ref()
                .ok_or_else(|| Error::Session("no page loaded".to_string()))?;
            Ok(self
                .pages
                .get(url)
                .cloned()
                .unwrap_or_else(|| "<html><body></body></html>".to_string()))
        }

        async fn wait_until(&mut self, condition: &WaitCondition, timeout: Duration) -> Result<()> {
            let satisfied = match condition {
                WaitCondition::AllElementsVisible => !self.never_visible,
                WaitCondition::SelectorPresent(selector) => {
                    let markup = self.current_markup().await?;
                    selector_present(&markup, selector)?
                }
            };

            if satisfied {
                Ok(())
            } else {
                Err(Error::Timeout(timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_poll_until_returns_once_check_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result = poll_until(
            || {
                let counter = Arc::clone(&counter);
                async move { Ok::<_, Error>(counter.fetch_add(1, Ordering::SeqCst) >= 2) }
            },
            Duration::from_secs(5),
            Duration::from_millis(1),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_until_times_out() {
        let result = poll_until(
            || async { Ok::<_, Error>(false) },
            Duration::from_millis(30),
            Duration::from_millis(5),
        )
        .await;

        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn test_poll_until_propagates_check_error() {
        let result = poll_until(
            || async { Err::<bool, _>(Error::Session("target closed".to_string())) },
            Duration::from_secs(5),
            Duration::from_millis(1),
        )
        .await;

        assert!(matches!(result, Err(Error::Session(_))));
    }

    #[tokio::test]
    async fn test_poll_until_bounds_hanging_check() {
        let result = poll_until(
            || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, Error>(true)
            },
            Duration::from_millis(20),
            Duration::from_millis(5),
        )
        .await;

        assert!(matches!(result, Err(Error::Timeout(_))));
    }
}
