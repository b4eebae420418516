//! Fetches result pages and reduces them to readable text snippets

use std::sync::LazyLock;
use std::time::Duration;

use regex::{Captures, Regex};
use tracing::{debug, instrument, warn};

use crate::Result;
use crate::http;

/// Pages with less readable text than this are skipped
pub const MIN_SNIPPET_CHARS: usize = 200;
/// Readable text kept per page
pub const MAX_SNIPPET_CHARS: usize = 2000;

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").expect("valid regex"));
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b.*?</style\s*>").expect("valid regex"));
static NOSCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<noscript\b.*?</noscript\s*>").expect("valid regex"));
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[a-zA-Z]+);").expect("valid regex")
});

/// Plain text of an HTML document with markup, scripts and styles removed
#[must_use]
pub fn readable_text(html: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(html, " ");
    let text = STYLE_BLOCK.replace_all(&text, " ");
    let text = NOSCRIPT_BLOCK.replace_all(&text, " ");
    let text = COMMENT.replace_all(&text, " ");
    let text = TAG.replace_all(&text, " ");
    let text = decode_entities(&text);
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures<'_>| {
            let entity = &caps[1];
            let decoded = match entity {
                "nbsp" => Some(' '),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                _ => numeric_entity(entity),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// `#8217` or `#x2019` to the character it names
fn numeric_entity(entity: &str) -> Option<char> {
    let number = entity.strip_prefix('#')?;
    let code = match number.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => number.parse().ok()?,
    };
    char::from_u32(code)
}

/// Readable text of a page if it is long enough to be useful, cut to
/// [`MAX_SNIPPET_CHARS`] characters
#[must_use]
pub fn snippet_from_html(html: &str) -> Option<String> {
    let text = readable_text(html);
    if text.chars().count() <= MIN_SNIPPET_CHARS {
        return None;
    }
    Some(text.chars().take(MAX_SNIPPET_CHARS).collect())
}

pub struct PageScraper {
    client: reqwest::Client,
}

impl PageScraper {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http::build_client(timeout)?,
        })
    }

    /// Snippet for one URL. Fetch failures and thin pages yield `None`.
    #[instrument(skip(self))]
    pub async fn fetch_snippet(&self, url: &str) -> Option<String> {
        match self.fetch_html(url).await {
            Ok(html) => {
                let snippet = snippet_from_html(&html);
                if snippet.is_none() {
                    debug!("Skipping {}: not enough readable text", url);
                }
                snippet
            }
            Err(e) => {
                warn!("Error scraping {}: {}", url, e);
                None
            }
        }
    }

    /// Snippets for each URL in order, skipping the ones that fail
    pub async fn fetch_snippets(&self, urls: &[String]) -> Vec<String> {
        let mut snippets = Vec::new();
        for url in urls {
            if let Some(snippet) = self.fetch_snippet(url).await {
                snippets.push(snippet);
            }
        }
        snippets
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}
