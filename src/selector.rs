//! A site scraper described entirely by configuration: CSS selectors for
//! records and their fields, optional next-page and consent controls, and
//! text patterns that mark error pages.

use crate::browser::webdriver::WebDriverBrowser;
use crate::config::SelectorSiteConfig;
use crate::context::{Context, QueryParams, Record};
use crate::document::{self, RenderedDocument};
use crate::error::ScrapeError;
use crate::site::SiteScraper;
use async_trait::async_trait;
use fantoccini::Locator;
use regex::Regex;
use scraper::Selector;
use serde_json::Value;

struct Field {
    name: String,
    selector: Selector,
    attr: Option<String>,
}

pub struct SelectorScraper {
    config: SelectorSiteConfig,
    record_selector: Selector,
    fields: Vec<Field>,
    next_selector: Option<Selector>,
    fatal_patterns: Vec<Regex>,
    retriable_patterns: Vec<Regex>,
    pages_advanced: u32,
}

impl SelectorScraper {
    /// Compiles every selector and pattern up front
    pub fn new(config: SelectorSiteConfig) -> Result<Self, ScrapeError> {
        let record_selector = document::selector(&config.record_selector)?;

        let mut fields = Vec::with_capacity(config.fields.len());
        for (name, field) in &config.fields {
            fields.push(Field {
                name: name.clone(),
                selector: document::selector(&field.selector)?,
                attr: field.attr.clone(),
            });
        }

        let next_selector = match &config.next_selector {
            Some(css) => Some(document::selector(css)?),
            None => None,
        };
        if let Some(css) = &config.consent_selector {
            document::selector(css)?;
        }

        Ok(Self {
            record_selector,
            fields,
            next_selector,
            fatal_patterns: compile_patterns(&config.fatal_patterns)?,
            retriable_patterns: compile_patterns(&config.retriable_patterns)?,
            config,
            pages_advanced: 0,
        })
    }

    fn extract(&self, ctx: &Context, element: scraper::ElementRef<'_>) -> Record {
        let mut record = Record::new();
        if self.config.include_context {
            for (key, value) in ctx.as_map() {
                record.insert(key.clone(), value.clone());
            }
        }
        for field in &self.fields {
            let value = element
                .select(&field.selector)
                .next()
                .and_then(|found| match &field.attr {
                    Some(attr) => found.value().attr(attr).map(|v| v.to_string()),
                    None => Some(document::element_text(found)),
                })
                .map(Value::String)
                .unwrap_or(Value::Null);
            record.insert(field.name.clone(), value);
        }
        record
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, ScrapeError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| ScrapeError::Config(format!("pattern {:?}: {}", p, e)))
        })
        .collect()
}

#[async_trait]
impl SiteScraper<WebDriverBrowser> for SelectorScraper {
    fn url_base(&self) -> &str {
        &self.config.url_base
    }

    fn path(&self) -> &str {
        &self.config.path
    }

    fn url_params(&self, ctx: &Context) -> QueryParams {
        let mut params: QueryParams = self.config.params.iter().cloned().collect();
        for key in &self.config.context_params {
            match ctx.get_str(key) {
                Some(value) => params.insert(key.clone(), value),
                None => ::log::warn!("Context has no value for query parameter {}", key),
            }
        }
        params
    }

    fn parse_response<'a>(
        &'a self,
        ctx: &'a Context,
        doc: &'a RenderedDocument,
    ) -> Box<dyn Iterator<Item = Record> + 'a> {
        Box::new(
            doc.html()
                .select(&self.record_selector)
                .map(move |element| self.extract(ctx, element)),
        )
    }

    fn validate_response(&self, _ctx: &Context, doc: &RenderedDocument) -> Result<(), ScrapeError> {
        if self.fatal_patterns.is_empty() && self.retriable_patterns.is_empty() {
            return Ok(());
        }
        let text = doc.body_text();
        if let Some(pattern) = self.fatal_patterns.iter().find(|p| p.is_match(&text)) {
            return Err(ScrapeError::fatal(format!(
                "{} matched error pattern {}",
                doc.url(),
                pattern
            )));
        }
        if let Some(pattern) = self.retriable_patterns.iter().find(|p| p.is_match(&text)) {
            return Err(ScrapeError::retriable(format!(
                "{} matched transient pattern {}",
                doc.url(),
                pattern
            )));
        }
        Ok(())
    }

    fn has_next_page(&mut self, _ctx: &Context, doc: &RenderedDocument) -> bool {
        match &self.next_selector {
            Some(selector) => doc.html().select(selector).next().is_some(),
            None => false,
        }
    }

    async fn go_to_next_page(
        &mut self,
        _ctx: &Context,
        browser: &mut WebDriverBrowser,
    ) -> Result<(), ScrapeError> {
        let Some(css) = self.config.next_selector.as_deref() else {
            return Ok(());
        };
        let next = browser.client().find(Locator::Css(css)).await?;
        next.click().await?;
        self.pages_advanced += 1;
        ::log::debug!("Clicked next-page control ({} so far)", self.pages_advanced);
        Ok(())
    }

    async fn agree_cookies(
        &mut self,
        _ctx: &Context,
        browser: &mut WebDriverBrowser,
    ) -> Result<(), ScrapeError> {
        let Some(css) = self.config.consent_selector.as_deref() else {
            return Ok(());
        };
        let buttons = browser.client().find_all(Locator::Css(css)).await?;
        match buttons.into_iter().next() {
            Some(button) => {
                button.click().await?;
                ::log::info!("Dismissed consent wall via {}", css);
            }
            None => ::log::debug!("No consent control matching {}", css),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldConfig;
    use std::collections::BTreeMap;

    const PAGE: &str = r#"<html><body>
        <div class="quote">
            <span class="text">The world as we have created it.</span>
            <small class="author">Albert Einstein</small>
            <a href="/author/Albert-Einstein">about</a>
        </div>
        <div class="quote">
            <span class="text">It is our choices.</span>
            <small class="author">J.K. Rowling</small>
        </div>
        <li class="next"><a href="/page/2/">Next</a></li>
    </body></html>"#;

    fn config() -> SelectorSiteConfig {
        let mut fields = BTreeMap::new();
        fields.insert(
            "text".to_string(),
            FieldConfig {
                selector: ".text".to_string(),
                attr: None,
            },
        );
        fields.insert(
            "author".to_string(),
            FieldConfig {
                selector: ".author".to_string(),
                attr: None,
            },
        );
        fields.insert(
            "link".to_string(),
            FieldConfig {
                selector: "a".to_string(),
                attr: Some("href".to_string()),
            },
        );
        SelectorSiteConfig {
            url_base: "https://quotes.toscrape.com".to_string(),
            path: "/js/".to_string(),
            params: vec![("sort".to_string(), "asc".to_string())],
            context_params: vec!["tag".to_string()],
            record_selector: ".quote".to_string(),
            fields,
            include_context: false,
            next_selector: Some("li.next > a".to_string()),
            consent_selector: None,
            fatal_patterns: vec!["(?i)page not found".to_string()],
            retriable_patterns: vec!["(?i)too many requests".to_string()],
        }
    }

    fn parse(scraper: &SelectorScraper, ctx: &Context, doc: &RenderedDocument) -> Vec<Record> {
        SiteScraper::<WebDriverBrowser>::parse_response(scraper, ctx, doc).collect()
    }

    #[test]
    fn test_extracts_records_in_document_order() {
        let scraper = SelectorScraper::new(config()).unwrap();
        let doc = RenderedDocument::parse("https://quotes.toscrape.com/js/", PAGE);
        let records = parse(&scraper, &Context::new(), &doc);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["author"], "Albert Einstein");
        assert_eq!(records[0]["link"], "/author/Albert-Einstein");
        assert_eq!(records[1]["text"], "It is our choices.");
        assert_eq!(records[1]["link"], Value::Null);
    }

    #[test]
    fn test_include_context_stamps_records() {
        let mut config = config();
        config.include_context = true;
        let scraper = SelectorScraper::new(config).unwrap();
        let doc = RenderedDocument::parse("https://quotes.toscrape.com/js/", PAGE);
        let ctx = Context::new().with("tag", "life");

        let records = parse(&scraper, &ctx, &doc);
        assert!(records.iter().all(|r| r["tag"] == "life"));
    }

    #[test]
    fn test_url_params_follow_config_then_context() {
        let scraper = SelectorScraper::new(config()).unwrap();
        let ctx = Context::new().with("tag", "love");
        let params = SiteScraper::<WebDriverBrowser>::url_params(&scraper, &ctx);
        assert_eq!(params.to_query_string(), "sort=asc&tag=love");
    }

    #[test]
    fn test_next_page_follows_selector() {
        let mut scraper = SelectorScraper::new(config()).unwrap();
        let ctx = Context::new();
        let first = RenderedDocument::parse("u", PAGE);
        let last = RenderedDocument::parse(
            "u",
            "<html><body><div class='quote'></div></body></html>",
        );

        assert!(SiteScraper::<WebDriverBrowser>::has_next_page(&mut scraper, &ctx, &first));
        assert!(!SiteScraper::<WebDriverBrowser>::has_next_page(&mut scraper, &ctx, &last));
    }

    #[test]
    fn test_validation_patterns() {
        let scraper = SelectorScraper::new(config()).unwrap();
        let ctx = Context::new();
        let validate = |markup: &str| {
            let doc = RenderedDocument::parse("u", markup);
            SiteScraper::<WebDriverBrowser>::validate_response(&scraper, &ctx, &doc)
        };

        assert!(validate(PAGE).is_ok());
        assert!(validate("<body>Page not found</body>").unwrap_err().is_fatal());
        assert!(validate("<body>Too Many Requests</body>").unwrap_err().is_retriable());
    }

    #[test]
    fn test_bad_selector_rejected_at_construction() {
        let mut config = config();
        config.record_selector = "div[".to_string();
        assert!(matches!(
            SelectorScraper::new(config),
            Err(ScrapeError::Selector { .. })
        ));
    }
}
