use clap::Parser;
use render_tap::config::TapConfig;
use render_tap::context::Context;

#[derive(Parser, Debug)]
#[command(name = "render-tap")]
#[command(about = "Extracts records from JavaScript-rendered sites through a WebDriver browser")]
#[command(version)]
pub struct Args {
    /// Path to the tap configuration file (JSON)
    #[arg(short, long)]
    pub config: String,

    /// Partition to scrape, as a JSON object; repeat for several
    #[arg(long = "context", value_parser = parse_context)]
    pub contexts: Vec<Context>,

    /// Override the page-load timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Override the WebDriver server URL
    #[arg(short, long)]
    pub webdriver_url: Option<String>,

    /// Override the total number of attempts per page load
    #[arg(long)]
    pub max_tries: Option<u32>,
}

impl Args {
    /// Applies command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut TapConfig) {
        if !self.contexts.is_empty() {
            config.contexts = self.contexts.clone();
        }
        if let Some(timeout) = self.timeout {
            config.stream.timeout_secs = timeout;
        }
        if let Some(url) = &self.webdriver_url {
            config.webdriver.webdriver_url = url.clone();
        }
        if let Some(max_tries) = self.max_tries {
            config.stream.retry.max_tries = max_tries;
        }
    }
}

fn parse_context(raw: &str) -> Result<Context, String> {
    serde_json::from_str(raw).map_err(|e| format!("context must be a JSON object: {}", e))
}
