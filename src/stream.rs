use crate::browser::Launcher;
use crate::config::StreamConfig;
use crate::context::{Context, Record};
use crate::error::ScrapeError;
use crate::fetcher::PaginatedFetcher;
use crate::retry::RetryPolicy;
use crate::site::SiteScraper;
use futures::Stream;

/// Drives one site scraper across its pages and yields its records.
///
/// Records come out in page order, and within a page in the order the
/// scraper produced them. A failure is yielded once as the last item. The
/// browser session is closed when the stream finishes or fails; dropping
/// the stream early leaves shutdown to the browser backend.
pub struct ScrapeStream<L, S>
where
    L: Launcher,
    S: SiteScraper<L::Browser>,
{
    fetcher: PaginatedFetcher<L, S>,
}

impl<L, S> ScrapeStream<L, S>
where
    L: Launcher,
    S: SiteScraper<L::Browser>,
{
    pub fn new(launcher: L, scraper: S, config: &StreamConfig) -> Self {
        Self {
            fetcher: PaginatedFetcher::new(launcher, scraper, config),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.fetcher = self.fetcher.with_retry_policy(retry);
        self
    }

    /// Starts scraping the partition described by `ctx`
    pub fn records(self, ctx: Context) -> impl Stream<Item = Result<Record, ScrapeError>> {
        let mut fetcher = self.fetcher;
        async_stream::stream! {
            let mut page = 1u32;
            let mut failure = None;
            let mut next = fetcher.fetch(&ctx).await;
            loop {
                let doc = match next {
                    Ok(doc) => doc,
                    Err(err) => {
                        failure = Some(err);
                        break;
                    }
                };

                let mut emitted = 0usize;
                for record in fetcher.parse(&ctx, &doc) {
                    emitted += 1;
                    yield Ok(record);
                }
                ::log::info!("Page {} produced {} records", page, emitted);

                if !fetcher.has_next_page(&ctx, &doc) {
                    break;
                }
                page += 1;
                ::log::debug!("Advancing to page {}", page);
                next = fetcher.advance(&ctx).await;
            }

            close_quietly(&mut fetcher).await;
            match failure {
                Some(err) => {
                    ::log::error!("Stream stopped on page {}: {}", page, err);
                    yield Err(err);
                }
                None => ::log::info!("Stream finished after {} pages", page),
            }
        }
    }
}

async fn close_quietly<L, S>(fetcher: &mut PaginatedFetcher<L, S>)
where
    L: Launcher,
    S: SiteScraper<L::Browser>,
{
    if let Err(e) = fetcher.close().await {
        ::log::warn!("Failed to close browser session: {}", e);
    }
}
