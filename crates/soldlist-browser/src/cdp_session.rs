use crate::{Error, Result};
use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use soldlist_core::session::{BrowserSession, POLL_INTERVAL, WaitCondition, poll_until};
use std::process::Child;
use std::time::Duration;
use tokio::task::JoinHandle;

const CONNECT_ATTEMPTS: u32 = 10;
const CONNECT_BACKOFF: Duration = Duration::from_millis(500);

/// True once the document has loaded and every element that takes part in
/// layout has a non-zero box. Elements with no text and no replaced content
/// (an empty icon `<span>`, a spacer `<div>`) are ignored, since they never
/// get a box.
const ALL_VISIBLE_SCRIPT: &str = r#"(() => {
    if (document.readyState !== 'complete' || !document.body) return false;
    const unrendered = new Set(['SCRIPT', 'STYLE', 'NOSCRIPT', 'TEMPLATE', 'LINK', 'META', 'BR', 'WBR']);
    const replaced = 'img, svg, video, canvas, iframe, embed, object, input, textarea, select, button';
    const hasContent = (el) =>
        el.textContent.trim() !== '' || el.matches(replaced) || el.querySelector(replaced) !== null;
    return Array.from(document.body.querySelectorAll('*'))
        .filter((el) => !unrendered.has(el.tagName.toUpperCase()) && hasContent(el))
        .filter((el) => el.getClientRects().length > 0)
        .every((el) => {
            const rect = el.getBoundingClientRect();
            return rect.width > 0 && rect.height > 0;
        });
})()"#;

/// A Chrome tab driven over the DevTools protocol.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    process: Option<Child>,
}

impl ChromeSession {
    /// Connect to Chrome listening on `debugging_port` and take over its
    /// first tab (or open one).
    pub async fn connect(debugging_port: u16) -> Result<Self> {
        let endpoint = format!("http://localhost:{}", debugging_port);
        tracing::info!("Connecting to Chrome on port {}", debugging_port);

        // Chrome may still be starting up
        let (browser, mut handler) = {
            let mut attempts_left = CONNECT_ATTEMPTS;
            loop {
                match Browser::connect(&endpoint).await {
                    Ok(result) => break result,
                    Err(e) => {
                        attempts_left -= 1;
                        if attempts_left == 0 {
                            return Err(Error::Cdp(format!(
                                "Failed to connect to Chrome after {} attempts: {}",
                                CONNECT_ATTEMPTS, e
                            )));
                        }
                        tracing::debug!("CDP connection failed, retrying ({} left): {}", attempts_left, e);
                        tokio::time::sleep(CONNECT_BACKOFF).await;
                    }
                }
            }
        };

        // The handler must be polled for any command to complete
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler event error (continuing): {}", e);
                }
            }
        });

        let page = match browser.pages().await?.into_iter().next() {
            Some(page) => page,
            None => browser.new_page("about:blank").await?,
        };

        tracing::info!("CDP connection established");
        Ok(Self {
            browser,
            page,
            handler_task,
            process: None,
        })
    }

    /// Take ownership of the Chrome process behind this session
    pub fn attach_process(mut self, process: Child) -> Self {
        self.process = Some(process);
        self
    }

    /// End the session, closing Chrome unless `keep_open` is set
    pub async fn shutdown(mut self, keep_open: bool) -> Result<()> {
        if keep_open {
            tracing::info!("Leaving Chrome open");
            return Ok(());
        }

        if let Err(e) = self.browser.close().await {
            tracing::debug!("Browser.close failed: {}", e);
        }

        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.kill() {
                tracing::debug!("Chrome already exited: {}", e);
            }
            process.wait()?;
        }

        Ok(())
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

fn session_error(err: CdpError) -> soldlist_core::Error {
    Error::from(err).into()
}

async fn is_ready(page: &Page, condition: &WaitCondition) -> soldlist_core::Result<bool> {
    let script = match condition {
        WaitCondition::AllElementsVisible => ALL_VISIBLE_SCRIPT.to_string(),
        WaitCondition::SelectorPresent(selector) => {
            let literal = serde_json::to_string(selector)
                .map_err(|e| soldlist_core::Error::Session(e.to_string()))?;
            format!("document.querySelector({}) !== null", literal)
        }
    };

    // The page may be mid-navigation; a failed evaluation means "not yet".
    match page.evaluate(script).await {
        Ok(result) => Ok(result.into_value::<bool>().unwrap_or(false)),
        Err(e) => {
            tracing::debug!("Readiness check failed: {}", e);
            Ok(false)
        }
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&mut self, url: &str) -> soldlist_core::Result<()> {
        self.page.goto(url).await.map_err(session_error)?;
        Ok(())
    }

    async fn current_markup(&mut self) -> soldlist_core::Result<String> {
        self.page.content().await.map_err(session_error)
    }

    async fn wait_until(
        &mut self,
        condition: &WaitCondition,
        timeout: Duration,
    ) -> soldlist_core::Result<()> {
        let page = &self.page;
        poll_until(|| is_ready(page, condition), timeout, POLL_INTERVAL).await
    }
}
