//! GKE no-channel release notes feed.

use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use regex::{Captures, Regex};
use reqwest::Client;
use tracing::debug;

use crate::error::GkupError;

pub const GKE_RELEASE_NOTES_URL: &str =
    "https://cloud.google.com/feeds/gke-no-channel-release-notes.xml";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<entry\b[^>]*>(.*?)</entry>").expect("valid entry regex"));
static CONTENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<content\b[^>]*>(.*?)</content>").expect("valid content regex")
});
static CDATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid cdata regex"));
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid entity regex")
});

/// One release batch from the feed, newest first by publisher convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseEntry {
    /// Entry content with XML escaping removed (HTML markup).
    pub content: String,
}

impl ReleaseEntry {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Source of release note entries.
pub trait ReleaseSource {
    fn fetch_entries(&self) -> impl Future<Output = Result<Vec<ReleaseEntry>, GkupError>> + Send;
}

/// Release notes fetched over HTTPS.
pub struct GkeReleaseFeed {
    client: Client,
    url: String,
}

impl GkeReleaseFeed {
    pub fn new(url: impl Into<String>) -> Result<Self, GkupError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("gkup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(GkupError::transport)?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn fetch_body(&self) -> Result<String, GkupError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(GkupError::transport)?;

        if !response.status().is_success() {
            return Err(GkupError::Transport(format!(
                "{} returned status {}",
                self.url,
                response.status()
            )));
        }

        response.text().await.map_err(GkupError::transport)
    }
}

impl ReleaseSource for GkeReleaseFeed {
    async fn fetch_entries(&self) -> Result<Vec<ReleaseEntry>, GkupError> {
        debug!("Fetching GKE release notes from {}", self.url);

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Fetching GKE release notes...");
        spinner.enable_steady_tick(Duration::from_millis(100));

        let body = self.fetch_body().await;
        spinner.finish_and_clear();

        let entries = parse_feed(&body?)?;
        debug!("Release notes feed has {} entries", entries.len());
        Ok(entries)
    }
}

/// Parse an Atom feed into its entries, in document order.
pub fn parse_feed(body: &str) -> Result<Vec<ReleaseEntry>, GkupError> {
    if !body.contains("<feed") {
        return Err(GkupError::FeedParse(
            "response is not an Atom feed".to_string(),
        ));
    }

    let entries = ENTRY_RE
        .captures_iter(body)
        .map(|entry| {
            let content = CONTENT_RE
                .captures(&entry[1])
                .map(|c| decode_text(&c[1]))
                .unwrap_or_default();
            ReleaseEntry { content }
        })
        .collect();

    Ok(entries)
}

/// Text of an XML element: CDATA sections verbatim, otherwise entity-decoded.
fn decode_text(raw: &str) -> String {
    if raw.trim_start().starts_with("<![CDATA[") {
        return CDATA_RE
            .captures_iter(raw)
            .map(|c| c[1].to_string())
            .collect();
    }

    ENTITY_RE
        .replace_all(raw, |caps: &Captures| {
            let name = &caps[1];
            let decoded = match name {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ if name.starts_with("#x") => u32::from_str_radix(&name[2..], 16)
                    .ok()
                    .and_then(char::from_u32),
                _ if name.starts_with('#') => name[1..].parse().ok().and_then(char::from_u32),
                _ => None,
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}
