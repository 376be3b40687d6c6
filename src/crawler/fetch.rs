//! Page fetching and parsing.
//!
//! Turns one url into a `SiteRecord`: title, paragraph text, the full
//! document text as the token field, and absolute links, each capped at the
//! configured field size. Anything that is not a successful HTML response is
//! an error for the caller to log and skip.

use crate::site::SiteRecord;
use anyhow::Result;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Per-field size caps, in bytes.
#[derive(Debug, Clone)]
pub struct PageLimits {
    pub max_text: usize,
    pub max_tokens: usize,
    pub max_links: usize,
}

pub async fn fetch_page(
    client: &reqwest::Client,
    page_url: &str,
    limits: &PageLimits,
) -> Result<SiteRecord> {
    let response = client.get(page_url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("{} answered {}", page_url, response.status());
    }

    let is_html = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("text/html"))
        .unwrap_or(false);
    if !is_html {
        anyhow::bail!("{} is not an HTML page", page_url);
    }

    let body = response.text().await?;
    Ok(parse_page(page_url, &body, limits))
}

pub fn parse_page(page_url: &str, html: &str, limits: &PageLimits) -> SiteRecord {
    let document = Html::parse_document(html);
    let mut record = SiteRecord::new(page_url);

    let title_selector = Selector::parse("title").unwrap();
    if let Some(element) = document.select(&title_selector).next() {
        record.title = collapse_whitespace(&element.text().collect::<String>().to_lowercase());
    }

    let paragraph_selector = Selector::parse("p").unwrap();
    let paragraphs = document
        .select(&paragraph_selector)
        .map(|p| p.text().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ");
    record.text = truncate_at_char_boundary(
        collapse_whitespace(&paragraphs.to_lowercase()),
        limits.max_text,
    );

    let full_text = document.root_element().text().collect::<Vec<_>>().join(" ");
    record.tokens = truncate_at_char_boundary(
        collapse_whitespace(&full_text.to_lowercase()),
        limits.max_tokens,
    );

    let link_selector = Selector::parse("a[href]").unwrap();
    let base = Url::parse(page_url).ok();
    let mut links = String::new();
    for element in document.select(&link_selector) {
        if let Some(href) = element.value().attr("href")
            && let Some(absolute) = resolve_link(base.as_ref(), href)
        {
            // Whole links only: a truncated url would become a bogus target
            if links.len() + absolute.len() + 1 > limits.max_links {
                break;
            }
            if !links.is_empty() {
                links.push(' ');
            }
            links.push_str(&absolute);
        }
    }
    record.links = links;

    record
}

fn resolve_link(base: Option<&Url>, href: &str) -> Option<String> {
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let base = base?;
    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

fn collapse_whitespace(text: &str) -> String {
    let re = Regex::new(r"\s+").unwrap();
    re.replace_all(text, " ").trim().to_string()
}

fn truncate_at_char_boundary(mut text: String, max: usize) -> String {
    if text.len() > max {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> PageLimits {
        PageLimits {
            max_text: 64_000,
            max_tokens: 64_000,
            max_links: 32_000,
        }
    }

    const PAGE: &str = r##"
        <html>
          <head><title>My   Test Page</title></head>
          <body>
            <h1>Heading Words</h1>
            <p>First paragraph.</p>
            <p>Second paragraph.</p>
            <a href="/relative">rel</a>
            <a href="http://other.com/page">abs</a>
            <a href="mailto:x@y.z">mail</a>
            <a href="#frag">frag</a>
            <a href="/with#fragment">defrag</a>
          </body>
        </html>"##;

    #[test]
    fn test_parse_extracts_fields() {
        let record = parse_page("http://site.com/dir/", PAGE, &limits());

        assert_eq!(record.url, "http://site.com/dir/");
        assert_eq!(record.title, "my test page");
        assert_eq!(record.text, "first paragraph. second paragraph.");
        // The token field carries the whole document text
        assert!(record.tokens.contains("heading words"));
        assert!(record.tokens.contains("first paragraph."));
    }

    #[test]
    fn test_parse_resolves_links() {
        let record = parse_page("http://site.com/dir/", PAGE, &limits());
        let links: Vec<&str> = record.links.split_whitespace().collect();

        assert_eq!(
            links,
            vec![
                "http://site.com/relative",
                "http://other.com/page",
                "http://site.com/with",
            ]
        );
    }

    #[test]
    fn test_link_cap_keeps_whole_urls() {
        let tight = PageLimits {
            max_links: "http://site.com/relative".len() + 3,
            ..limits()
        };
        let record = parse_page("http://site.com/dir/", PAGE, &tight);

        assert_eq!(record.links, "http://site.com/relative");
    }

    #[test]
    fn test_text_cap_applies() {
        let tight = PageLimits {
            max_text: 5,
            ..limits()
        };
        let record = parse_page("http://site.com/", PAGE, &tight);
        assert!(record.text.len() <= 5);
    }

    #[test]
    fn test_unparseable_base_yields_no_links() {
        let record = parse_page("not a url", PAGE, &limits());
        assert!(record.links.is_empty());
    }
}
