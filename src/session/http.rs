//! Plain-HTTP fetcher reading a profile's Open Graph metadata.
//!
//! No script execution and no interactive login: counts, bio and avatar come
//! from the `<meta>` tags the server renders for link previews.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{debug, info};
use reqwest::StatusCode;

use crate::models::{
    ProfileDetails, BIO_NOT_FOUND, FOLLOWERS_NOT_FOUND, FOLLOWINGS_NOT_FOUND, PHOTO_NOT_FOUND,
};
use crate::settings::Credentials;

use super::ProfileFetcher;

const REQUEST_TIMEOUT_SECS: u64 = 20;

pub struct HttpProfileFetcher {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    // Page body from the last `fetch`, reused by the following `fetch_raw_page`.
    last_page: Option<(String, String)>,
}

impl HttpProfileFetcher {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("profile-watcher/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            last_page: None,
        })
    }

    pub fn profile_url(&self, target: &str) -> String {
        format!("{}/{}/", self.base_url, target)
    }

    async fn get_page(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en")
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        if !response.status().is_success() {
            bail!("HTTP {} from {url}", response.status());
        }

        response
            .text()
            .await
            .with_context(|| format!("failed to read body from {url}"))
    }
}

impl ProfileFetcher for HttpProfileFetcher {
    async fn login(&mut self) -> Result<()> {
        let response = self
            .http
            .get(&self.base_url)
            .send()
            .await
            .with_context(|| format!("{} is unreachable", self.base_url))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            bail!("{} refused the session (HTTP {status})", self.base_url);
        }

        if self.credentials.username.is_empty() {
            info!("HTTP session established anonymously");
        } else {
            info!("HTTP session established for {}", self.credentials.username);
        }
        Ok(())
    }

    async fn fetch(&mut self, target: &str) -> Result<ProfileDetails> {
        let url = self.profile_url(target);
        let html = self.get_page(&url).await?;
        let details = parse_profile_html(&html);
        debug!("Parsed {url}: {details:?}");
        self.last_page = Some((target.to_string(), html));
        Ok(details)
    }

    async fn fetch_raw_page(&mut self, target: &str) -> Result<Vec<u8>> {
        if let Some((cached_target, html)) = self.last_page.take() {
            if cached_target == target {
                return Ok(html.into_bytes());
            }
        }
        let url = self.profile_url(target);
        Ok(self.get_page(&url).await?.into_bytes())
    }

    async fn fetch_screenshot(&mut self) -> Result<Vec<u8>> {
        bail!("screenshots need a rendering browser session; the HTTP fetcher cannot capture one")
    }
}

/// Extracts a best-effort record. Missing pieces take their sentinel.
pub fn parse_profile_html(html: &str) -> ProfileDetails {
    use scraper::Html;

    let document = Html::parse_document(html);
    let og_description = meta_content(&document, r#"meta[property="og:description"]"#);
    let description = meta_content(&document, r#"meta[name="description"]"#);
    let og_image = meta_content(&document, r#"meta[property="og:image"]"#);

    let counts = og_description.as_deref().or(description.as_deref());
    let followers = counts
        .and_then(|text| count_before(text, &["Followers", "Follower"]))
        .unwrap_or_else(|| FOLLOWERS_NOT_FOUND.to_string());
    let followings = counts
        .and_then(|text| count_before(text, &["Following"]))
        .unwrap_or_else(|| FOLLOWINGS_NOT_FOUND.to_string());
    let bio = description
        .as_deref()
        .and_then(quoted_bio)
        .unwrap_or_else(|| BIO_NOT_FOUND.to_string());
    let profile_photo_url = og_image
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| PHOTO_NOT_FOUND.to_string());

    ProfileDetails {
        followers,
        followings,
        bio,
        profile_photo_url,
    }
}

fn meta_content(document: &scraper::Html, selector: &str) -> Option<String> {
    let selector = scraper::Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
}

/// "1,234 Followers, 56 Following, 7 Posts - ..." -> the number before a label.
fn count_before(text: &str, labels: &[&str]) -> Option<String> {
    let head = text.split(" - ").next().unwrap_or(text);
    head.split(", ").find_map(|part| {
        let part = part.trim();
        labels.iter().find_map(|label| {
            part.strip_suffix(label)
                .map(str::trim)
                .filter(|count| !count.is_empty())
                .map(str::to_string)
        })
    })
}

/// Bio as rendered in the description: `...from Name (@user): "bio text"`.
fn quoted_bio(text: &str) -> Option<String> {
    let start = text.find(": \"")? + 3;
    let end = text.rfind('"')?;
    if end <= start {
        return None;
    }
    Some(text[start..end].to_string())
}
