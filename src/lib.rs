//! Engine for scraping records out of JavaScript-rendered websites.
//!
//! A [`SiteScraper`] says how to address a site, how to turn a rendered
//! page into records and how to move to the next page. [`ScrapeStream`]
//! drives it through a lazily started browser session, retrying transient
//! failures with exponential backoff, and yields the records as a stream.

pub mod browser;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod fetcher;
pub mod results;
pub mod retry;
pub mod selector;
pub mod site;
pub mod stream;

#[cfg(test)]
mod tests;

// Re-export commonly used types for convenience
pub use browser::{Browser, BrowserSession, Launcher};
pub use context::{Context, QueryParams, Record};
pub use document::RenderedDocument;
pub use error::{FailureKind, ScrapeError};
pub use fetcher::{PaginatedFetcher, build_url};
pub use retry::RetryPolicy;
pub use site::SiteScraper;
pub use stream::ScrapeStream;
