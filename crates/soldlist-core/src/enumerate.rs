use crate::record::ListingReference;
use lazy_static::lazy_static;
use scraper::{Html, Selector};
use url::Url;

lazy_static! {
    static ref LISTING_LINK: Selector = Selector::parse("section.items-box a").unwrap();
}

/// Collect listing links from a search-results page, in document order.
///
/// Relative `href`s are resolved against `base_url`. An empty results
/// section yields an empty list.
pub fn enumerate_listings(doc: &Html, base_url: &Url) -> Vec<ListingReference> {
    let mut references = Vec::new();

    for anchor in doc.select(&LISTING_LINK) {
        let Some(href) = anchor.value().attr("href") else {
            tracing::debug!("Skipping listing anchor without href");
            continue;
        };

        match base_url.join(href.trim()) {
            Ok(url) => references.push(ListingReference::new(url)),
            Err(e) => tracing::warn!("Skipping unresolvable listing link {:?}: {}", href, e),
        }
    }

    tracing::info!("Found {} listing links", references.len());
    references
}
