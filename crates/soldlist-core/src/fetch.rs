use crate::session::{BrowserSession, WaitCondition};
use crate::{Error, Result};
use std::time::Duration;

/// How a bounded page wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// No wait was requested
    Skipped,
    /// The condition held before the timeout
    Ready,
    /// The timeout elapsed; the page is used as-is
    TimedOut,
}

/// Result of navigating the session to a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub url: String,
    pub wait: WaitStatus,
}

/// Navigate `session` to `url`, optionally waiting until the page renders.
///
/// A visibility timeout is not an error: it is logged and the caller goes on
/// to snapshot whatever has rendered so far. Navigation failures are returned
/// as session errors.
pub async fn fetch<S>(
    session: &mut S,
    url: &str,
    wait_for_visible: bool,
    timeout: Duration,
) -> Result<FetchOutcome>
where
    S: BrowserSession + ?Sized,
{
    tracing::debug!("Navigating to {}", url);
    session.navigate(url).await?;

    let wait = if wait_for_visible {
        wait_leniently(session, &WaitCondition::AllElementsVisible, timeout).await?
    } else {
        WaitStatus::Skipped
    };

    if wait == WaitStatus::TimedOut {
        tracing::warn!(
            "Page not fully visible after {:?}, continuing with partial render: {}",
            timeout,
            url
        );
    }

    Ok(FetchOutcome {
        url: url.to_string(),
        wait,
    })
}

/// Wait for `condition`, turning a timeout into [`WaitStatus::TimedOut`]
pub async fn wait_leniently<S>(
    session: &mut S,
    condition: &WaitCondition,
    timeout: Duration,
) -> Result<WaitStatus>
where
    S: BrowserSession + ?Sized,
{
    match session.wait_until(condition, timeout).await {
        Ok(()) => Ok(WaitStatus::Ready),
        Err(Error::Timeout(elapsed)) => {
            tracing::debug!("Wait for {:?} timed out after {:?}", condition, elapsed);
            Ok(WaitStatus::TimedOut)
        }
        Err(e) => Err(e),
    }
}
