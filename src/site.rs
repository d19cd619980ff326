use crate::browser::Browser;
use crate::context::{Context, QueryParams, Record};
use crate::document::RenderedDocument;
use crate::error::ScrapeError;
use async_trait::async_trait;

/// Per-site behaviour plugged into the engine.
///
/// Only [`url_base`](SiteScraper::url_base) is required. Every other hook
/// has a default that makes the engine usable as is: no query parameters,
/// no records, a single page, no consent wall, every page acceptable.
///
/// Hooks that look at a [`RenderedDocument`] are synchronous; hooks that
/// drive the browser are async and receive the live handle.
#[async_trait]
pub trait SiteScraper<B: Browser>: Send {
    /// Scheme and host, e.g. `https://example.com`
    fn url_base(&self) -> &str;

    /// Path appended to the base URL
    fn path(&self) -> &str {
        ""
    }

    /// Query parameters for the first page.
    ///
    /// Values are substituted literally; pre-encode anything that needs it.
    fn url_params(&self, _ctx: &Context) -> QueryParams {
        QueryParams::new()
    }

    /// Turns one page into records, in the order they should be emitted
    fn parse_response<'a>(
        &'a self,
        _ctx: &'a Context,
        _doc: &'a RenderedDocument,
    ) -> Box<dyn Iterator<Item = Record> + 'a> {
        Box::new(std::iter::empty())
    }

    /// Rejects a page with [`ScrapeError::Fatal`] or [`ScrapeError::Retriable`]
    fn validate_response(
        &self,
        _ctx: &Context,
        _doc: &RenderedDocument,
    ) -> Result<(), ScrapeError> {
        Ok(())
    }

    /// Whether another page follows the one just parsed
    fn has_next_page(&mut self, _ctx: &Context, _doc: &RenderedDocument) -> bool {
        false
    }

    /// Moves the browser (or the scraper's own cursor) to the next page
    async fn go_to_next_page(
        &mut self,
        _ctx: &Context,
        _browser: &mut B,
    ) -> Result<(), ScrapeError> {
        Ok(())
    }

    /// Dismisses a cookie or consent interstitial after navigation
    async fn agree_cookies(&mut self, _ctx: &Context, _browser: &mut B) -> Result<(), ScrapeError> {
        Ok(())
    }
}
