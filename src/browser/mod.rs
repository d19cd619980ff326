//! Browser capability and the lazily created session that owns it.

pub mod webdriver;

use crate::error::ScrapeError;
use async_trait::async_trait;
use std::time::Duration;

/// A live browser handle that can load pages and report what they rendered.
#[async_trait]
pub trait Browser: Send {
    /// Loads `url`, giving up once `timeout` elapses with
    /// [`ScrapeError::NavigationTimeout`].
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), ScrapeError>;

    /// Location the browser is showing, which in-page navigation may have
    /// moved away from the last URL passed to `navigate`
    async fn current_url(&mut self) -> Result<String, ScrapeError>;

    /// Current rendered markup of the loaded page
    async fn current_content(&mut self) -> Result<String, ScrapeError>;

    /// Shuts the browser down
    async fn close(&mut self) -> Result<(), ScrapeError>;
}

/// Starts browsers on demand.
#[async_trait]
pub trait Launcher: Send + Sync {
    type Browser: Browser;

    async fn launch(&self) -> Result<Self::Browser, ScrapeError>;
}

/// One browser for the lifetime of one stream, started on first use.
pub struct BrowserSession<L: Launcher> {
    launcher: L,
    browser: Option<L::Browser>,
}

impl<L: Launcher> BrowserSession<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            browser: None,
        }
    }

    /// Returns the live browser, launching it if none exists yet
    pub async fn ensure(&mut self) -> Result<&mut L::Browser, ScrapeError> {
        if self.browser.is_none() {
            ::log::debug!("Launching browser session");
            self.browser = Some(self.launcher.launch().await?);
        }
        self.browser
            .as_mut()
            .ok_or_else(|| ScrapeError::Session("browser missing after launch".to_string()))
    }

    pub async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), ScrapeError> {
        ::log::debug!("Navigating to {} (timeout {}s)", url, timeout.as_secs());
        self.ensure().await?.navigate(url, timeout).await
    }

    pub async fn current_content(&mut self) -> Result<String, ScrapeError> {
        self.ensure().await?.current_content().await
    }

    pub fn is_open(&self) -> bool {
        self.browser.is_some()
    }

    /// Closes the browser if one is running; a later `ensure` starts afresh
    pub async fn close(&mut self) -> Result<(), ScrapeError> {
        match self.browser.take() {
            Some(mut browser) => {
                ::log::debug!("Closing browser session");
                browser.close().await
            }
            None => Ok(()),
        }
    }
}
