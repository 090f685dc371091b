//! Metadata resolver for Kizuna.
//!
//! Looks up a page title and icon for a freshly pasted link. Resolution is
//! best-effort: every failure degrades to `{title: url, icon: None}` and is
//! never reported to the caller.

use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use crate::types::bookmark::PageMetadata;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title pattern"));
static META_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid meta pattern"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>").expect("valid link pattern"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid attribute pattern")
});

/// Resolves `{title, icon}` for a URL. Implementations must not fail.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> PageMetadata;
}

/// Resolver that never touches the network.
pub struct OfflineMetadataResolver;

#[async_trait]
impl MetadataResolver for OfflineMetadataResolver {
    async fn resolve(&self, url: &str) -> PageMetadata {
        PageMetadata::fallback(url)
    }
}

/// Extracts title and icon from an HTML document fetched from `page_url`.
///
/// Title: `<title>`, then `og:title`, then the URL itself. Icon: `rel="icon"`,
/// then `rel="shortcut icon"`, resolved against the page origin, then the
/// public favicon service for the host.
pub fn extract_metadata(html: &str, page_url: &str) -> PageMetadata {
    let title = TITLE_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|t| !t.is_empty())
        .or_else(|| og_title(html))
        .unwrap_or_else(|| page_url.to_string());

    PageMetadata {
        title,
        icon: icon_href(html, page_url),
    }
}

fn attributes(tag: &str) -> HashMap<String, String> {
    ATTR_RE
        .captures_iter(tag)
        .filter_map(|c| {
            let name = c.get(1)?.as_str().to_ascii_lowercase();
            let value = c.get(2).or_else(|| c.get(3)).or_else(|| c.get(4))?;
            Some((name, value.as_str().to_string()))
        })
        .collect()
}

fn og_title(html: &str) -> Option<String> {
    META_RE.find_iter(html).find_map(|tag| {
        let attrs = attributes(tag.as_str());
        if attrs.get("property").map(|p| p.eq_ignore_ascii_case("og:title")) != Some(true) {
            return None;
        }
        attrs
            .get("content")
            .map(|c| decode_entities(c.trim()))
            .filter(|c| !c.is_empty())
    })
}

fn link_href(html: &str, rel: &str) -> Option<String> {
    LINK_RE.find_iter(html).find_map(|tag| {
        let attrs = attributes(tag.as_str());
        let matches = attrs
            .get("rel")
            .map(|r| r.trim().eq_ignore_ascii_case(rel))
            .unwrap_or(false);
        if !matches {
            return None;
        }
        attrs
            .get("href")
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
    })
}

fn icon_href(html: &str, page_url: &str) -> Option<String> {
    let parsed = Url::parse(page_url).ok()?;
    let href = link_href(html, "icon").or_else(|| link_href(html, "shortcut icon"));

    match href {
        Some(href) if href.starts_with("http") => Some(href),
        Some(href) => parsed
            .join("/")
            .and_then(|origin| origin.join(&href))
            .ok()
            .map(String::from),
        None => parsed
            .host_str()
            .map(|host| format!("https://www.google.com/s2/favicons?domain={}&sz=32", host)),
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

#[cfg(feature = "network")]
pub use http::HttpMetadataResolver;

#[cfg(feature = "network")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;
    use tracing::{debug, warn};

    use super::{extract_metadata, MetadataResolver};
    use crate::types::bookmark::PageMetadata;
    use crate::types::settings::MetadataSettings;

    /// Fetches the page over HTTP and scrapes it.
    pub struct HttpMetadataResolver {
        client: reqwest::Client,
    }

    impl HttpMetadataResolver {
        pub fn new(settings: &MetadataSettings) -> Result<Self, reqwest::Error> {
            let client = reqwest::Client::builder()
                .user_agent(settings.user_agent.clone())
                .timeout(Duration::from_millis(settings.timeout_ms))
                .build()?;
            Ok(Self { client })
        }

        async fn fetch_html(&self, url: &str) -> Result<String, String> {
            let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;
            if !response.status().is_success() {
                return Err(format!("status {}", response.status()));
            }
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("text/html")
                .to_ascii_lowercase();
            if !content_type.contains("html") {
                return Err(format!("not an HTML page: {}", content_type));
            }
            response.text().await.map_err(|e| e.to_string())
        }
    }

    #[async_trait]
    impl MetadataResolver for HttpMetadataResolver {
        async fn resolve(&self, url: &str) -> PageMetadata {
            match self.fetch_html(url).await {
                Ok(html) => {
                    let metadata = extract_metadata(&html, url);
                    debug!(%url, title = %metadata.title, "resolved page metadata");
                    metadata
                }
                Err(err) => {
                    warn!(%url, error = %err, "metadata lookup failed, using fallback");
                    PageMetadata::fallback(url)
                }
            }
        }
    }
}
