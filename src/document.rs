use crate::error::ScrapeError;
use scraper::{ElementRef, Html, Selector};

/// Queryable snapshot of one page's rendered markup.
///
/// Built once per fetched page and never mutated; the next page produces a
/// new document.
#[derive(Debug)]
pub struct RenderedDocument {
    url: String,
    html: Html,
}

impl RenderedDocument {
    /// Parses raw rendered markup read from `url`
    pub fn parse(url: &str, markup: &str) -> Self {
        Self {
            url: url.to_string(),
            html: Html::parse_document(markup),
        }
    }

    /// Where this snapshot was read from: the requested URL after a
    /// navigation, or the browser's reported location after in-page
    /// pagination
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The underlying parsed tree, for queries beyond the helpers below
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Elements matching a CSS selector, in document order
    pub fn select(&self, css: &str) -> Result<Vec<ElementRef<'_>>, ScrapeError> {
        let selector = selector(css)?;
        Ok(self.html.select(&selector).collect())
    }

    /// Whether any element matches a CSS selector
    pub fn exists(&self, css: &str) -> Result<bool, ScrapeError> {
        let selector = selector(css)?;
        Ok(self.html.select(&selector).next().is_some())
    }

    /// Whitespace-normalized text of every matching element
    pub fn select_text(&self, css: &str) -> Result<Vec<String>, ScrapeError> {
        Ok(self.select(css)?.into_iter().map(element_text).collect())
    }

    /// Contents of `<title>`, if present
    pub fn title(&self) -> Option<String> {
        self.select_text("title").ok()?.into_iter().next()
    }

    /// Whitespace-normalized text of the whole body
    pub fn body_text(&self) -> String {
        self.select_text("body")
            .map(|texts| texts.join(" "))
            .unwrap_or_default()
    }
}

/// Compiles a CSS selector, mapping the parser's error into ours
pub fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Text content of an element with runs of whitespace collapsed
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
