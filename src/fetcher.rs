use crate::browser::{Browser, BrowserSession, Launcher};
use crate::config::StreamConfig;
use crate::context::{Context, QueryParams, Record};
use crate::document::RenderedDocument;
use crate::error::ScrapeError;
use crate::retry::RetryPolicy;
use crate::site::SiteScraper;
use std::time::Duration;

/// Joins base URL, path and query parameters into one URL.
///
/// Parameters keep their insertion order; the `?` is left out when there
/// are none. Nothing is percent-encoded.
pub fn build_url(url_base: &str, path: &str, params: &QueryParams) -> String {
    if params.is_empty() {
        format!("{}{}", url_base, path)
    } else {
        format!("{}{}?{}", url_base, path, params.to_query_string())
    }
}

/// Produces validated documents for the current page of one site.
pub struct PaginatedFetcher<L, S>
where
    L: Launcher,
    S: SiteScraper<L::Browser>,
{
    session: BrowserSession<L>,
    scraper: S,
    retry: RetryPolicy,
    timeout: Duration,
}

impl<L, S> PaginatedFetcher<L, S>
where
    L: Launcher,
    S: SiteScraper<L::Browser>,
{
    pub fn new(launcher: L, scraper: S, config: &StreamConfig) -> Self {
        Self {
            session: BrowserSession::new(launcher),
            scraper,
            retry: RetryPolicy::from_config(&config.retry),
            timeout: config.timeout(),
        }
    }

    /// Replaces the retry policy built from configuration
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn build_url(&self, ctx: &Context) -> String {
        let params = self.scraper.url_params(ctx);
        build_url(self.scraper.url_base(), self.scraper.path(), &params)
    }

    /// Navigates to the first page and returns it once validation accepts
    /// it, retrying transient failures under the retry policy.
    pub async fn fetch(&mut self, ctx: &Context) -> Result<RenderedDocument, ScrapeError> {
        let url = self.build_url(ctx);
        let mut backoff = self.retry.backoff();
        loop {
            let attempt = backoff.attempts() + 1;
            ::log::debug!("Fetching {} (attempt {})", url, attempt);
            match fetch_once(&mut self.session, &mut self.scraper, self.timeout, ctx, &url).await {
                Ok(doc) => {
                    ::log::debug!("Response received successfully from {}", url);
                    return Ok(doc);
                }
                Err(err) => backoff.wait(err).await?,
            }
        }
    }

    /// Re-reads the page the browser is showing, without navigating, and
    /// validates it. Used after the scraper has advanced pagination in place.
    pub async fn refetch_current_content(
        &mut self,
        ctx: &Context,
    ) -> Result<RenderedDocument, ScrapeError> {
        let browser = self.session.ensure().await?;
        let url = browser.current_url().await?;
        let markup = browser.current_content().await?;
        let doc = RenderedDocument::parse(&url, &markup);
        self.scraper.validate_response(ctx, &doc)?;
        Ok(doc)
    }

    /// Records the scraper extracts from `doc`, lazily
    pub fn parse<'a>(
        &'a self,
        ctx: &'a Context,
        doc: &'a RenderedDocument,
    ) -> Box<dyn Iterator<Item = Record> + 'a> {
        self.scraper.parse_response(ctx, doc)
    }

    pub fn has_next_page(&mut self, ctx: &Context, doc: &RenderedDocument) -> bool {
        self.scraper.has_next_page(ctx, doc)
    }

    /// Lets the scraper advance pagination, then reads the resulting page
    pub async fn advance(&mut self, ctx: &Context) -> Result<RenderedDocument, ScrapeError> {
        let browser = self.session.ensure().await?;
        self.scraper.go_to_next_page(ctx, browser).await?;
        self.refetch_current_content(ctx).await
    }

    pub async fn close(&mut self) -> Result<(), ScrapeError> {
        self.session.close().await
    }
}

/// One navigate-and-render attempt: load, dismiss consent, parse, validate
async fn fetch_once<L, S>(
    session: &mut BrowserSession<L>,
    scraper: &mut S,
    timeout: Duration,
    ctx: &Context,
    url: &str,
) -> Result<RenderedDocument, ScrapeError>
where
    L: Launcher,
    S: SiteScraper<L::Browser>,
{
    session.navigate(url, timeout).await?;
    let browser = session.ensure().await?;
    scraper.agree_cookies(ctx, browser).await?;
    let markup = browser.current_content().await?;

    let doc = RenderedDocument::parse(url, &markup);
    if let Err(err) = scraper.validate_response(ctx, &doc) {
        ::log::debug!("Validation rejected {}: {}", url, err);
        return Err(err);
    }
    Ok(doc)
}
