use crate::Result;
use crate::session::BrowserSession;
use scraper::Html;

/// Parse the live page of `session` into a read-only document tree.
///
/// Every call reads the page again; nothing is cached between calls.
pub async fn snapshot<S>(session: &mut S) -> Result<Html>
where
    S: BrowserSession + ?Sized,
{
    let markup = session.current_markup().await?;
    tracing::debug!("Captured {} bytes of page markup", markup.len());
    Ok(Html::parse_document(&markup))
}
