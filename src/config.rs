use crate::context::Context;
use crate::error::ScrapeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Longest page-load timeout accepted from configuration: one day
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Connection settings for the WebDriver-backed browser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebDriverConfig {
    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Render without a visible window
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Tolerate invalid or self-signed TLS certificates
    #[serde(default = "default_true")]
    pub accept_insecure_certs: bool,

    /// Extra command-line arguments for the browser
    #[serde(default)]
    pub browser_args: Vec<String>,
}

/// Backoff parameters for the navigate-and-render step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Multiplier applied to the delay after each retry
    #[serde(default = "default_factor")]
    pub factor: u32,
}

/// Engine settings shared by every stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Page-load timeout for each navigation, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

/// Selector for one record field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    /// CSS selector evaluated inside each record element
    pub selector: String,

    /// Attribute to read instead of the element text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,
}

/// Site description for the selector-driven scraper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorSiteConfig {
    /// Scheme and host, e.g. `https://quotes.toscrape.com`
    pub url_base: String,

    /// Path appended to `url_base`
    #[serde(default)]
    pub path: String,

    /// Fixed query parameters, in order
    #[serde(default)]
    pub params: Vec<(String, String)>,

    /// Context keys copied into the query string, in order
    #[serde(default)]
    pub context_params: Vec<String>,

    /// Selector matching one element per record
    pub record_selector: String,

    /// Output field name to selector
    pub fields: BTreeMap<String, FieldConfig>,

    /// Copy every context entry into each record
    #[serde(default)]
    pub include_context: bool,

    /// Clickable control that advances to the next page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_selector: Option<String>,

    /// Clickable control that dismisses a cookie or consent wall
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent_selector: Option<String>,

    /// Regex patterns whose presence in the page text is a permanent error
    #[serde(default)]
    pub fatal_patterns: Vec<String>,

    /// Regex patterns whose presence in the page text is a transient error
    #[serde(default)]
    pub retriable_patterns: Vec<String>,
}

/// Everything the command-line tap needs for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// Stream name stamped on every emitted message
    #[serde(default = "default_stream_name")]
    pub stream_name: String,

    pub site: SelectorSiteConfig,

    #[serde(default)]
    pub webdriver: WebDriverConfig,

    #[serde(default)]
    pub stream: StreamConfig,

    /// Partitions to scrape; one empty context when absent
    #[serde(default)]
    pub contexts: Vec<Context>,
}

impl TapConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScrapeError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ScrapeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScrapeError> {
        Url::parse(&self.site.url_base).map_err(|e| {
            ScrapeError::Config(format!("url_base {:?}: {}", self.site.url_base, e))
        })?;
        if self.site.fields.is_empty() {
            return Err(ScrapeError::Config("site.fields is empty".to_string()));
        }
        if !(1..=MAX_TIMEOUT_SECS).contains(&self.stream.timeout_secs) {
            return Err(ScrapeError::Config(format!(
                "stream.timeout_secs must be between 1 and {}, got {}",
                MAX_TIMEOUT_SECS, self.stream.timeout_secs
            )));
        }
        if self.stream.retry.max_tries == 0 {
            return Err(ScrapeError::Config(
                "stream.retry.max_tries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Contexts to run, never empty
    pub fn contexts(&self) -> Vec<Context> {
        if self.contexts.is_empty() {
            vec![Context::new()]
        } else {
            self.contexts.clone()
        }
    }
}

impl WebDriverConfig {
    /// Applies the `WEBDRIVER_URL` environment override, if set
    pub fn with_env_override(self) -> Self {
        self.with_url_override(std::env::var("WEBDRIVER_URL").ok())
    }

    /// Replaces the server URL with `webdriver_url` unless it is absent or empty
    pub fn with_url_override(mut self, webdriver_url: Option<String>) -> Self {
        if let Some(webdriver_url) = webdriver_url.filter(|u| !u.is_empty()) {
            self.webdriver_url = webdriver_url;
        }
        self
    }
}

impl StreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: true,
            accept_insecure_certs: true,
            browser_args: Vec::new(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_tries: default_max_tries(),
            base_delay_ms: default_base_delay_ms(),
            factor: default_factor(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_tries() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_factor() -> u32 {
    2
}

/// Default page-load timeout, in seconds
fn default_timeout_secs() -> u64 {
    300
}

fn default_stream_name() -> String {
    "records".to_string()
}
