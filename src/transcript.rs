//! Transcript resolution: video id extraction and caption scraping.

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Resolves a video reference into a block of plain transcript text.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the transcript for a video URL.
    ///
    /// Fails with [`Error::TranscriptUnavailable`] when no caption text
    /// exists for the video.
    async fn fetch(&self, video_url: &str) -> Result<String>;
}

static CAPTION_TRACK_URL: LazyLock<Regex> = LazyLock::new(|| {
    // First baseUrl inside the player's captionTracks array.
    Regex::new(r#""captionTracks":\s*\[\s*\{[^}]*?"baseUrl":\s*"([^"]+)""#).expect("valid regex")
});

static XML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Caption scraper for YouTube watch pages.
#[derive(Debug, Clone)]
pub struct YouTubeTranscript {
    http: reqwest::Client,
}

impl YouTubeTranscript {
    const USER_AGENT: &'static str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent(Self::USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { http }
    }
}

impl Default for YouTubeTranscript {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptSource for YouTubeTranscript {
    async fn fetch(&self, video_url: &str) -> Result<String> {
        let video_id = extract_video_id(video_url)?;
        debug!(video_id, "Fetching captions");

        let watch_url = format!("https://www.youtube.com/watch?v={video_id}");
        let page = self.http.get(&watch_url).send().await?.text().await?;

        let caption_url = caption_track_url(&page).ok_or_else(|| {
            warn!(video_id, "No caption tracks in watch page");
            Error::TranscriptUnavailable(format!("no captions found for video {video_id}"))
        })?;

        let xml = self.http.get(&caption_url).send().await?.text().await?;
        let text = clean_caption_xml(&xml);

        if text.is_empty() {
            return Err(Error::TranscriptUnavailable(format!(
                "empty caption track for video {video_id}"
            )));
        }

        debug!(video_id, chars = text.len(), "Captions extracted");
        Ok(text)
    }
}

/// Pull the video id out of a `youtu.be` or `youtube.com/watch` URL.
pub fn extract_video_id(url: &str) -> Result<&str> {
    if let Some(rest) = url.split("youtu.be/").nth(1) {
        let id = rest.split('?').next().unwrap_or(rest);
        if !id.is_empty() {
            return Ok(id);
        }
    }
    if url.contains("youtube.com/watch") {
        if let Some(rest) = url.split("v=").nth(1) {
            let id = rest.split('&').next().unwrap_or(rest);
            if !id.is_empty() {
                return Ok(id);
            }
        }
    }
    Err(Error::TranscriptUnavailable(format!(
        "not a recognized video URL: {url}"
    )))
}

/// Locate the first caption track URL embedded in a watch page.
fn caption_track_url(page: &str) -> Option<String> {
    let raw = CAPTION_TRACK_URL.captures(page)?.get(1)?.as_str();
    // The page embeds the URL JSON-escaped.
    Some(raw.replace("\\u0026", "&").replace("\\/", "/"))
}

/// Strip tags and entities from timed-text XML, leaving plain words.
fn clean_caption_xml(xml: &str) -> String {
    let text = XML_TAG.replace_all(xml, " ");
    let text = text
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}
