// src/fetcher.rs
//! Readable-text fetching for job descriptions and auxiliary reference links.

use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::app_log;
use crate::error::{CvResult, CvToolError};
use crate::utils::{clean_text, is_http_url};

pub const MAX_ADDITIONAL_URLS: usize = 5;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const FETCH_TIMEOUT_SECS: u64 = 15;
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg", "head"];

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Readable text of the page at `url`.
    async fn fetch_text(&self, url: &str) -> CvResult<String>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> CvResult<String> {
        if !is_http_url(url) {
            return Err(CvToolError::fetch(url, "only http(s) links can be fetched"));
        }

        app_log!(info, "Fetching {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                CvToolError::fetch(url, "request timed out")
            } else {
                CvToolError::fetch(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CvToolError::fetch(url, format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        if !is_textual(&content_type) {
            return Err(CvToolError::fetch(
                url,
                format!("unsupported content type {}", content_type),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CvToolError::fetch(url, e))?;

        let text = if content_type.contains("html") || looks_like_html(&body) {
            extract_readable_text(&body)
        } else {
            clean_text(&body)
        };

        app_log!(debug, "Fetched {} characters from {}", text.len(), url);
        Ok(text)
    }
}

fn is_textual(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.starts_with("text/")
        || content_type.contains("html")
        || content_type.contains("xml")
        || content_type.contains("json")
}

fn looks_like_html(body: &str) -> bool {
    let head = body.trim_start();
    head.starts_with('<') && head.get(..512).unwrap_or(head).to_lowercase().contains("<html")
}

/// Visible text of an HTML document, one text run per line.
pub fn extract_readable_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut lines = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|el| SKIPPED_ELEMENTS.contains(&el.name()))
                .unwrap_or(false)
        });
        if !hidden {
            lines.push(String::from(&**text));
        }
    }

    clean_text(&lines.join("\n"))
}

/// Job description text: a link is fetched, anything else is used as pasted.
/// A link that cannot be read leaves no job description, which is a
/// `MissingInput` for the caller.
pub async fn resolve_job_description(
    fetcher: &dyn ContentFetcher,
    input: &str,
) -> CvResult<String> {
    let input = input.trim();
    if !is_http_url(input) {
        return Ok(input.to_string());
    }

    match fetcher.fetch_text(input).await {
        Ok(text) if !text.trim().is_empty() => Ok(text),
        Ok(_) => Err(CvToolError::MissingInput(format!(
            "The job posting at {} has no readable text. Paste the job description instead.",
            input
        ))),
        Err(e) => {
            app_log!(warn, "Job description fetch failed: {}", e);
            Err(CvToolError::MissingInput(format!(
                "Could not read the job posting at {}. Paste the job description instead.",
                input
            )))
        }
    }
}

/// Fetch up to [`MAX_ADDITIONAL_URLS`] links. Failures contribute nothing.
pub async fn fetch_additional_urls(
    fetcher: &dyn ContentFetcher,
    urls: &[String],
) -> BTreeMap<String, String> {
    let mut contents = BTreeMap::new();

    let targets = urls
        .iter()
        .map(|u| u.trim())
        .filter(|u| is_http_url(u))
        .take(MAX_ADDITIONAL_URLS);

    for url in targets {
        if contents.contains_key(url) {
            continue;
        }
        match fetcher.fetch_text(url).await {
            Ok(text) if !text.trim().is_empty() => {
                contents.insert(url.to_string(), text);
            }
            Ok(_) => app_log!(info, "No readable text at {}", url),
            Err(e) => app_log!(warn, "Skipping additional URL: {}", e),
        }
    }

    contents
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::HashMap;

    /// Serves canned pages; unknown URLs fail like a 404.
    #[derive(Default)]
    pub struct StaticFetcher {
        pub pages: HashMap<String, String>,
    }

    impl StaticFetcher {
        pub fn with_page(mut self, url: &str, text: &str) -> Self {
            self.pages.insert(url.to_string(), text.to_string());
            self
        }
    }

    #[async_trait]
    impl ContentFetcher for StaticFetcher {
        async fn fetch_text(&self, url: &str) -> CvResult<String> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| CvToolError::fetch(url, "HTTP 404 Not Found"))
        }
    }
}
