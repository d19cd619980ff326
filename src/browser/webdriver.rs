use super::{Browser, Launcher};
use crate::config::WebDriverConfig;
use crate::error::ScrapeError;
use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder};
use serde_json::{Map, Value, json};
use std::time::Duration;

/// Slack on top of the page-load timeout before we stop waiting on the
/// WebDriver server itself
const NAVIGATION_GRACE: Duration = Duration::from_secs(5);

/// Launches Chrome through a WebDriver server.
#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
    config: WebDriverConfig,
}

impl WebDriverLauncher {
    pub fn new(config: WebDriverConfig) -> Self {
        Self { config }
    }

    /// Session capabilities: headless Chrome that ignores certificate errors
    pub fn capabilities(&self) -> Map<String, Value> {
        let mut args = Vec::new();
        if self.config.headless {
            args.push("--headless".to_string());
        }
        if self.config.accept_insecure_certs {
            args.push("--ignore-ssl-errors=yes".to_string());
            args.push("--ignore-certificate-errors".to_string());
        }
        args.extend(self.config.browser_args.iter().cloned());

        let mut caps = Map::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert(
            "acceptInsecureCerts".to_string(),
            json!(self.config.accept_insecure_certs),
        );
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        caps
    }

    async fn connect(&self, webdriver_url: &str) -> Result<Client, String> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities());
        builder
            .connect(webdriver_url)
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Launcher for WebDriverLauncher {
    type Browser = WebDriverBrowser;

    async fn launch(&self) -> Result<WebDriverBrowser, ScrapeError> {
        let webdriver_url = self.config.webdriver_url.as_str();
        match self.connect(webdriver_url).await {
            Ok(client) => {
                ::log::info!("Connected to WebDriver at {}", webdriver_url);
                return Ok(WebDriverBrowser { client });
            }
            Err(e) => {
                ::log::error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
            }
        }

        // If we couldn't connect, try with common alternative URLs
        let fallback_urls = [
            "http://localhost:9515", // ChromeDriver default
            "http://127.0.0.1:4444", // Try with IP instead of localhost
        ];

        for url in fallback_urls.iter() {
            if *url == webdriver_url {
                continue;
            }

            ::log::info!("Trying fallback WebDriver URL: {}", url);
            if let Ok(client) = self.connect(url).await {
                ::log::info!("Connected to fallback WebDriver at {}", url);
                return Ok(WebDriverBrowser { client });
            }
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(ScrapeError::Session(format!(
            "could not connect to any WebDriver server (tried {})",
            webdriver_url
        )))
    }
}

/// A WebDriver session.
///
/// Site scrapers that paginate through in-page controls reach the
/// underlying client through [`WebDriverBrowser::client`].
pub struct WebDriverBrowser {
    client: Client,
}

impl WebDriverBrowser {
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), ScrapeError> {
        self.client
            .update_timeouts(TimeoutConfiguration::new(None, Some(timeout), None))
            .await?;

        let timed_out = || ScrapeError::NavigationTimeout {
            url: url.to_string(),
            timeout,
        };
        match tokio::time::timeout(navigation_deadline(timeout), self.client.goto(url)).await {
            Ok(Ok(())) => Ok(()),
            // Only the W3C `timeout` status, not any message mentioning one
            Ok(Err(e)) if e.is_timeout() => Err(timed_out()),
            Ok(Err(e)) => Err(handle_navigation_error(e, url)),
            Err(_) => Err(timed_out()),
        }
    }

    async fn current_url(&mut self) -> Result<String, ScrapeError> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn current_content(&mut self) -> Result<String, ScrapeError> {
        Ok(self.client.source().await?)
    }

    async fn close(&mut self) -> Result<(), ScrapeError> {
        self.client.clone().close().await?;
        Ok(())
    }
}

/// How long to wait on the WebDriver server for a navigation bounded by
/// `timeout`; saturates instead of overflowing
fn navigation_deadline(timeout: Duration) -> Duration {
    timeout.saturating_add(NAVIGATION_GRACE)
}

/// Logs a failed navigation and converts it into our error type
fn handle_navigation_error(error: CmdError, url: &str) -> ScrapeError {
    if error.to_string().contains("Unable to find session") {
        ::log::warn!("Lost WebDriver session while loading {}", url);
    } else {
        ::log::error!("Failed to load {}: {}", url, error);
    }
    ScrapeError::Command(error)
}
