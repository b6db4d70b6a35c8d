//! YouTube transcript loader.
//!
//! Resolves a video id from the common URL shapes, fetches the watch
//! page to discover the video's caption tracks, downloads the first
//! track's timedtext XML, and joins the caption snippets into one text
//! block. Videos without captions are an ingestion error.

use anyhow::{bail, Context, Result};
use std::time::Duration;
use url::Url;

use crate::models::{LoadedSource, SourceKind};

const FETCH_TIMEOUT_SECS: u64 = 15;
const VIDEO_ID_LEN: usize = 11;

pub async fn load_transcript(url: &str) -> Result<LoadedSource> {
    let url = url.trim();
    if url.is_empty() {
        bail!("YouTube URL must not be empty");
    }

    let video_id = extract_video_id(url)?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()?;

    let watch_url = format!("https://www.youtube.com/watch?v={}", video_id);
    let watch_page = client
        .get(&watch_url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", watch_url))?
        .error_for_status()
        .with_context(|| format!("Watch page request failed for video {}", video_id))?
        .text()
        .await?;

    let track_url = caption_track_url(&watch_page).ok_or_else(|| {
        anyhow::anyhow!("No transcript is available for video {}", video_id)
    })?;

    let transcript_xml = client
        .get(&track_url)
        .send()
        .await
        .context("Failed to fetch caption track")?
        .error_for_status()
        .context("Caption track request failed")?
        .text()
        .await?;

    let text = parse_timedtext(&transcript_xml)?;
    if text.trim().is_empty() {
        bail!("Transcript for video {} is empty", video_id);
    }

    Ok(LoadedSource {
        kind: SourceKind::Youtube,
        origin: url.to_string(),
        title: None,
        text,
    })
}

/// Extract a YouTube video id from the common URL formats:
/// `youtu.be/<id>`, `youtube.com/watch?v=<id>`, `/shorts/<id>`, or —
/// as a last resort — the first 11-character id-shaped run in the URL.
pub fn extract_video_id(url: &str) -> Result<String> {
    if let Ok(parsed) = Url::parse(url) {
        match parsed.host_str() {
            Some("youtu.be") => {
                let id = parsed.path().trim_start_matches('/');
                if !id.is_empty() {
                    return Ok(id.split('/').next().unwrap_or(id).to_string());
                }
            }
            Some("www.youtube.com") | Some("youtube.com") | Some("m.youtube.com") => {
                if parsed.path() == "/watch" {
                    if let Some((_, v)) = parsed.query_pairs().find(|(k, _)| k == "v") {
                        if !v.is_empty() {
                            return Ok(v.into_owned());
                        }
                    }
                }
                if let Some(rest) = parsed.path().strip_prefix("/shorts/") {
                    let id = rest.split('/').next().unwrap_or(rest);
                    if !id.is_empty() {
                        return Ok(id.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    // Last fallback: the first run of 11 id characters anywhere in the URL.
    if let Some(id) = first_id_run(url) {
        return Ok(id);
    }

    bail!("Could not find a YouTube video id in '{}'", url)
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn first_id_run(s: &str) -> Option<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut run_start = 0;
    for (i, &c) in chars.iter().enumerate() {
        if !is_id_char(c) {
            run_start = i + 1;
        } else if i + 1 - run_start == VIDEO_ID_LEN {
            return Some(chars[run_start..=i].iter().collect());
        }
    }
    None
}

/// Locate the first caption track's `baseUrl` inside the watch page's
/// embedded player response JSON.
pub fn caption_track_url(watch_page: &str) -> Option<String> {
    let tracks_at = watch_page.find("\"captionTracks\":")?;
    let tail = &watch_page[tracks_at..];
    let base_at = tail.find("\"baseUrl\":")?;
    let after = &tail[base_at + "\"baseUrl\":".len()..];
    let quote = after.find('"')?;
    let rest = &after[quote + 1..];
    let end = rest.find('"')?;
    let escaped = &rest[..end];
    // The URL is JSON-escaped inside the page source.
    Some(escaped.replace("\\u0026", "&").replace("\\/", "/"))
}

/// Join the `<text>` snippets of a timedtext XML document with newlines.
fn parse_timedtext(xml: &str) -> Result<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut lines: Vec<String> = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event() {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"text" {
                    in_text = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_text => {
                let once = te.unescape().unwrap_or_default().into_owned();
                // Caption payloads are double-escaped (&amp;#39; etc.).
                let twice = quick_xml::escape::unescape(&once)
                    .map(|c| c.into_owned())
                    .unwrap_or(once);
                let line = twice.trim().to_string();
                if !line.is_empty() {
                    lines.push(line);
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"text" {
                    in_text = false;
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => bail!("Failed to parse transcript XML: {}", e),
            _ => {}
        }
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_from_short_link() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn id_from_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn id_from_shorts_url() {
        assert_eq!(
            extract_video_id("https://youtube.com/shorts/abcABC123_-/extra").unwrap(),
            "abcABC123_-"
        );
    }

    #[test]
    fn id_from_mobile_host() {
        assert_eq!(
            extract_video_id("https://m.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn fallback_finds_id_shaped_run() {
        assert_eq!(
            extract_video_id("watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn no_id_is_an_error() {
        assert!(extract_video_id("https://example.com/video").is_err());
    }

    #[test]
    fn caption_track_url_unescapes_base_url() {
        let page = r#"...,"captionTracks":[{"baseUrl":"https:\/\/www.youtube.com\/api\/timedtext?v=abc&lang=en","name":{...}}],..."#;
        let url = caption_track_url(page).unwrap();
        assert_eq!(
            url,
            "https://www.youtube.com/api/timedtext?v=abc&lang=en"
        );
    }

    #[test]
    fn no_caption_tracks_yields_none() {
        assert!(caption_track_url("<html>no captions here</html>").is_none());
    }

    #[test]
    fn timedtext_snippets_joined_with_newlines() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
            <transcript>
              <text start="0.0" dur="1.5">first line</text>
              <text start="1.5" dur="2.0">it&amp;#39;s the second</text>
              <text start="3.5" dur="1.0">  </text>
            </transcript>"#;
        let text = parse_timedtext(xml).unwrap();
        assert_eq!(text, "first line\nit's the second");
    }
}
