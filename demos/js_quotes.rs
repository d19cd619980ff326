//! Hand-written site scraper for the JavaScript-rendered quotes sandbox.
//!
//! Run a ChromeDriver first, then:
//! `cargo run --example js_quotes -- --tag love`

use async_trait::async_trait;
use clap::Parser;
use fantoccini::Locator;
use futures::StreamExt;
use render_tap::browser::webdriver::{WebDriverBrowser, WebDriverLauncher};
use render_tap::config::{StreamConfig, WebDriverConfig};
use render_tap::{
    Context, QueryParams, Record, RenderedDocument, ScrapeError, ScrapeStream, SiteScraper,
};
use serde_json::json;
use std::error::Error;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Only scrape quotes carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Stop after this many pages
    #[arg(short, long, default_value_t = 3)]
    max_pages: u32,
}

struct QuotesScraper {
    page: u32,
    max_pages: u32,
}

#[async_trait]
impl SiteScraper<WebDriverBrowser> for QuotesScraper {
    fn url_base(&self) -> &str {
        "https://quotes.toscrape.com"
    }

    fn path(&self) -> &str {
        "/js/"
    }

    fn url_params(&self, ctx: &Context) -> QueryParams {
        let mut params = QueryParams::new();
        if let Some(tag) = ctx.get_str("tag") {
            params.insert("tag", tag);
        }
        params
    }

    fn parse_response<'a>(
        &'a self,
        _ctx: &'a Context,
        doc: &'a RenderedDocument,
    ) -> Box<dyn Iterator<Item = Record> + 'a> {
        let texts = doc.select_text("div.quote span.text").unwrap_or_default();
        let authors = doc.select_text("div.quote small.author").unwrap_or_default();
        let page = self.page;
        Box::new(texts.into_iter().zip(authors).map(move |(text, author)| {
            let mut record = Record::new();
            record.insert("text".to_string(), json!(text));
            record.insert("author".to_string(), json!(author));
            record.insert("page".to_string(), json!(page));
            record
        }))
    }

    fn validate_response(&self, _ctx: &Context, doc: &RenderedDocument) -> Result<(), ScrapeError> {
        if doc.body_text().contains("Too Many Requests") {
            return Err(ScrapeError::retriable("rate limited"));
        }
        if !doc.exists("div.quote")? && !doc.exists("div.col-md-8")? {
            return Err(ScrapeError::fatal(format!("{} is not a quotes page", doc.url())));
        }
        Ok(())
    }

    fn has_next_page(&mut self, _ctx: &Context, doc: &RenderedDocument) -> bool {
        self.page < self.max_pages && doc.exists("li.next > a").unwrap_or(false)
    }

    async fn go_to_next_page(
        &mut self,
        _ctx: &Context,
        browser: &mut WebDriverBrowser,
    ) -> Result<(), ScrapeError> {
        browser
            .client()
            .find(Locator::Css("li.next > a"))
            .await?
            .click()
            .await?;
        self.page += 1;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut ctx = Context::new();
    if let Some(tag) = &args.tag {
        ctx = ctx.with("tag", tag.as_str());
    }

    let launcher = WebDriverLauncher::new(WebDriverConfig::default().with_env_override());
    let scraper = QuotesScraper {
        page: 1,
        max_pages: args.max_pages,
    };
    let records = ScrapeStream::new(launcher, scraper, &StreamConfig::default()).records(ctx);
    futures::pin_mut!(records);

    while let Some(record) = records.next().await {
        println!("{}", serde_json::to_string(&record?)?);
    }
    Ok(())
}
