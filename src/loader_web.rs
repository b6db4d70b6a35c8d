//! Web page loader.
//!
//! Fetches a URL and returns its readable text: scripts, styles, and
//! noscript blocks are dropped, every remaining text node is collected,
//! and the result is normalized to one trimmed line per block with blank
//! lines removed. The page `<title>` becomes the source title.

use anyhow::{bail, Context, Result};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use crate::models::{LoadedSource, SourceKind};

const FETCH_TIMEOUT_SECS: u64 = 15;

/// Elements whose subtrees carry no readable text.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript"];

pub async fn load_webpage(url: &str) -> Result<LoadedSource> {
    let url = url.trim();
    if url.is_empty() {
        bail!("Website URL must not be empty");
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()?;

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;

    let status = response.status();
    if !status.is_success() {
        bail!("Fetching {} returned HTTP {}", url, status);
    }

    let html = response.text().await?;
    let (title, text) = readable_text(&html);

    Ok(LoadedSource {
        kind: SourceKind::Web,
        origin: url.to_string(),
        title,
        text,
    })
}

/// Extract the page title and visible text from an HTML document.
pub fn readable_text(html: &str) -> (Option<String>, String) {
    let document = Html::parse_document(html);

    let title_selector = Selector::parse("title").expect("static selector");
    let title = document
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let mut raw = String::new();
    collect_visible_text(document.root_element(), &mut raw);

    let cleaned: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    (title, cleaned.join("\n"))
}

fn collect_visible_text(element: ElementRef<'_>, out: &mut String) {
    if SKIPPED_ELEMENTS.contains(&element.value().name()) {
        return;
    }
    for node in element.children() {
        if let Some(child) = ElementRef::wrap(node) {
            collect_visible_text(child, out);
            // Element boundaries separate text blocks.
            out.push('\n');
        } else if let Some(text) = node.value().as_text() {
            out.push_str(text);
        }
    }
}
