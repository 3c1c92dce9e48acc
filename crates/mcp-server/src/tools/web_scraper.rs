//! Web page scraping: visible text, HTML fragments or links

use async_trait::async_trait;
use capability_core::{
    Arguments, HandlerError, HandlerResult, ParameterSpec, ToolContent, ToolDescriptor, ToolUnit,
};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;
use url::Url;

pub const WEB_SCRAPER: &str = "web_scraper";

const EXTRACT_TYPES: [&str; 3] = ["text", "html", "links"];

/// Extracted content is cut after this many characters
const MAX_CHARS: usize = 7000;

/// Elements whose text is never part of the visible text
const HIDDEN_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

/// What to pull out of the selected elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractType {
    Text,
    Html,
    Links,
}

impl FromStr for ExtractType {
    type Err = HandlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "html" => Ok(Self::Html),
            "links" => Ok(Self::Links),
            other => Err(HandlerError::invalid(format!(
                "Unsupported extract type '{}', expected one of: {}",
                other,
                EXTRACT_TYPES.join(", ")
            ))),
        }
    }
}

impl fmt::Display for ExtractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Html => f.write_str("html"),
            Self::Links => f.write_str("links"),
        }
    }
}

/// Fetches a page and extracts content from it
pub struct WebScraperTool {
    client: Client,
}

impl WebScraperTool {
    /// Create the tool; fails if no HTTP client can be built
    pub fn new(timeout_secs: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(format!("ChatData-MCP-Scraper/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { client })
    }

    async fn fetch(&self, url: &Url) -> HandlerResult<String> {
        info!("Scraping {}", url);

        let response = self
            .client
            .get(url.clone())
            .header("Accept", "text/html,application/xhtml+xml,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| HandlerError::Failed(format!("Request error: {}", e)))?
            .error_for_status()
            .map_err(|e| HandlerError::Failed(format!("HTTP error: {}", e)))?;

        response
            .text()
            .await
            .map_err(|e| HandlerError::Failed(format!("Failed to read page: {}", e)))
    }

    async fn scrape(&self, arguments: &Arguments) -> HandlerResult<String> {
        let url = page_url(arguments)?;
        let selector = arguments
            .get("selector")
            .and_then(Value::as_str)
            .filter(|selector| !selector.trim().is_empty());
        let extract: ExtractType = arguments
            .get("extract_type")
            .and_then(Value::as_str)
            .unwrap_or("text")
            .parse()?;

        let html = self.fetch(&url).await?;
        extract_page(&html, &url, selector, extract)
    }
}

#[async_trait]
impl ToolUnit for WebScraperTool {
    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![ToolDescriptor::new(
            WEB_SCRAPER,
            "Scrape a web page, either whole or the elements matching a CSS selector",
        )
        .required("url", ParameterSpec::string("Page URL"))
        .optional(
            "selector",
            ParameterSpec::string("CSS selector, e.g. 'div.content' or '#main'"),
        )
        .optional(
            "extract_type",
            ParameterSpec::string("Content to extract")
                .with_enum(EXTRACT_TYPES)
                .with_default("text"),
        )]
    }

    async fn call(&self, name: &str, arguments: Arguments) -> Option<HandlerResult<Vec<ToolContent>>> {
        if name != WEB_SCRAPER {
            return None;
        }

        Some(
            self.scrape(&arguments)
                .await
                .map(|report| vec![ToolContent::text(report)]),
        )
    }
}

fn page_url(arguments: &Arguments) -> HandlerResult<Url> {
    let raw = arguments
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| HandlerError::invalid("Missing required argument 'url'"))?;

    let url = Url::parse(raw).map_err(|e| HandlerError::invalid(format!("Invalid URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(HandlerError::invalid(
            "URL must start with 'http://' or 'https://'",
        )),
    }
}

/// Build the scrape report for an already fetched page
pub fn extract_page(
    html: &str,
    url: &Url,
    selector: Option<&str>,
    extract: ExtractType,
) -> HandlerResult<String> {
    let document = Html::parse_document(html);

    let elements: Vec<ElementRef> = match selector {
        Some(css) => {
            let parsed = Selector::parse(css).map_err(|e| {
                HandlerError::invalid(format!("Invalid selector '{}': {:?}", css, e))
            })?;
            let found: Vec<ElementRef> = document.select(&parsed).collect();
            if found.is_empty() {
                return Err(HandlerError::Failed(format!(
                    "No elements match selector '{}'",
                    css
                )));
            }
            found
        }
        None => vec![first_match(&document, "body").unwrap_or_else(|| document.root_element())],
    };

    let content = match extract {
        ExtractType::Text => elements
            .iter()
            .map(|element| visible_text(*element))
            .collect::<Vec<_>>()
            .join("\n\n"),
        ExtractType::Html => elements
            .iter()
            .map(|element| element.html())
            .collect::<Vec<_>>()
            .join("\n"),
        ExtractType::Links => links(&elements, url).join("\n"),
    };

    let title = first_match(&document, "title")
        .map(|title| title.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    let mut report = format!("## Web Scrape Result\n\nURL: {}\n\nTitle: {}\n\n", url, title);
    if let Some(css) = selector {
        report.push_str(&format!("Selector: `{}`\n\n", css));
    }
    report.push_str(&format!("Extract type: {}\n\n---\n\n", extract));
    report.push_str(&truncate(&content));

    Ok(report)
}

fn first_match<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next()
}

/// Text of `element` outside scripts and styles, one non-empty run per line
fn visible_text(element: ElementRef) -> String {
    element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
            });
            let text = text.trim();
            (!hidden && !text.is_empty()).then_some(text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Markdown links for every anchor with text, resolved against `base`
fn links(elements: &[ElementRef], base: &Url) -> Vec<String> {
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen: Vec<String> = Vec::new();
    let mut links = Vec::new();

    for element in elements {
        for anchor in element.select(&anchors) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Ok(target) = base.join(href) else {
                continue;
            };
            let text = anchor.text().collect::<String>();
            let text = text.trim();
            let target = target.to_string();

            if text.is_empty() || seen.contains(&target) {
                continue;
            }
            links.push(format!("[{}]({})", text, target));
            seen.push(target);
        }
    }

    links
}

fn truncate(content: &str) -> String {
    if content.chars().count() <= MAX_CHARS {
        return content.to_string();
    }

    let kept: String = content.chars().take(MAX_CHARS).collect();
    format!("{}...\n\n[content truncated at {} characters]", kept, MAX_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAGE: &str = r#"<html>
        <head><title> Sample Page </title><style>body { color: red; }</style></head>
        <body>
            <div id="main">
                <p>First paragraph.</p>
                <script>var hidden = true;</script>
                <p>Second <b>bold</b> paragraph.</p>
                <a href="/docs">Docs</a>
                <a href="https://example.org/x">External</a>
                <a href="/docs">Docs again</a>
                <a href="/empty"> </a>
            </div>
            <div class="note">A note</div>
        </body>
    </html>"#;

    fn base() -> Url {
        Url::parse("https://example.com/start/").unwrap()
    }

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_visible_text() {
        let report = extract_page(PAGE, &base(), None, ExtractType::Text).unwrap();

        assert!(report.starts_with("## Web Scrape Result\n\nURL: https://example.com/start/"));
        assert!(report.contains("Title: Sample Page"));
        assert!(report.contains("First paragraph."));
        assert!(report.contains("Second\nbold\nparagraph."));
        assert!(report.contains("A note"));
        assert!(!report.contains("hidden"));
        assert!(!report.contains("color: red"));
    }

    #[test]
    fn test_selector_and_html() {
        let report = extract_page(PAGE, &base(), Some("div.note"), ExtractType::Html).unwrap();

        assert!(report.contains("Selector: `div.note`"));
        assert!(report.contains(r#"<div class="note">A note</div>"#));
        assert!(!report.contains("First paragraph"));
    }

    #[test]
    fn test_links_are_resolved_and_deduplicated() {
        let report = extract_page(PAGE, &base(), Some("#main"), ExtractType::Links).unwrap();

        assert!(report.ends_with(
            "[Docs](https://example.com/docs)\n[External](https://example.org/x)"
        ));
    }

    #[test]
    fn test_selector_errors() {
        assert!(matches!(
            extract_page(PAGE, &base(), Some("table"), ExtractType::Text),
            Err(HandlerError::Failed(_))
        ));
        assert!(matches!(
            extract_page(PAGE, &base(), Some("div["), ExtractType::Text),
            Err(HandlerError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_truncate() {
        let long = "x".repeat(MAX_CHARS + 10);
        let cut = truncate(&long);
        assert!(cut.starts_with(&"x".repeat(MAX_CHARS)));
        assert!(cut.ends_with("[content truncated at 7000 characters]"));
        assert_eq!(truncate("short"), "short");
    }

    #[tokio::test]
    async fn test_argument_validation() {
        let tool = WebScraperTool::new(5).unwrap();

        let result = tool
            .call(WEB_SCRAPER, args(json!({ "url": "ftp://example.com" })))
            .await
            .unwrap();
        assert!(matches!(result, Err(HandlerError::InvalidArguments(_))));

        let result = tool
            .call(
                WEB_SCRAPER,
                args(json!({ "url": "https://example.com", "extract_type": "pdf" })),
            )
            .await
            .unwrap();
        assert!(matches!(result, Err(HandlerError::InvalidArguments(_))));

        assert!(tool.call("http_client", Arguments::new()).await.is_none());
    }
}
