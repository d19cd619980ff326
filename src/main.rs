use clap::Parser;
use futures::StreamExt;
use render_tap::browser::webdriver::WebDriverLauncher;
use render_tap::config::TapConfig;
use render_tap::results::RecordMessage;
use render_tap::selector::SelectorScraper;
use render_tap::{Context, ScrapeStream};
use std::error::Error;
use std::io::Write;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let mut config = TapConfig::from_file(&args.config)?;
    config.webdriver = config.webdriver.with_env_override();
    args.apply(&mut config);
    config.validate()?;

    ::log::info!(
        "Starting stream {} for {}{}",
        config.stream_name,
        config.site.url_base,
        config.site.path
    );

    let start_time = std::time::Instant::now();
    let mut total = 0usize;
    for ctx in config.contexts() {
        total += run_context(&config, ctx).await?;
    }

    ::log::info!(
        "Emitted {} records in {:.2} seconds",
        total,
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Scrapes one partition, writing each record to stdout as it arrives
async fn run_context(config: &TapConfig, ctx: Context) -> Result<usize, Box<dyn Error>> {
    ::log::info!("Scraping context {}", serde_json::to_string(&ctx)?);

    let scraper = SelectorScraper::new(config.site.clone())?;
    let launcher = WebDriverLauncher::new(config.webdriver.clone());
    let records = ScrapeStream::new(launcher, scraper, &config.stream).records(ctx);
    futures::pin_mut!(records);

    let stdout = std::io::stdout();
    let mut count = 0usize;
    while let Some(record) = records.next().await {
        let line = RecordMessage::new(&config.stream_name, record?).to_json_line()?;
        let mut out = stdout.lock();
        writeln!(out, "{}", line)?;
        out.flush()?;
        count += 1;
    }
    Ok(count)
}
