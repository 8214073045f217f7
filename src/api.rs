//! Async client for the **World Bank Indicators API (v2)**.
//!
//! Only the `country/all/indicator/{id}` endpoint is used. Every response is an
//! array `[PageMeta, [RawObservation, ...]]`; [`fetch_indicator`] walks all
//! pages and concatenates them in page order.
//!
//! ### Notes
//! - The API sometimes serializes `per_page` as a **string**; we accept both string/number.
//! - Requests are not retried. A transport, HTTP or decoding failure on any page
//!   aborts the whole fetch for that indicator.
//! - Network timeouts use a sane default (30s) and can be adjusted by editing the client builder.
//!
//! Typical usage:
//! ```no_run
//! # async fn run() -> wbi_tidy::Result<()> {
//! use wbi_tidy::api::{Client, fetch_indicator};
//! let client = Client::default();
//! let rows = fetch_indicator(&client, "SP.POP.TOTL").await?;
//! # Ok(()) }
//! ```
use crate::error::{Error, Result};
use crate::models::{PageMeta, RawObservation};
use async_trait::async_trait;
use log::debug;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client as HttpClient;
use reqwest::redirect::Policy;
use serde_json::Value;
use std::time::Duration;

/// Page size requested from the API.
pub const PER_PAGE: u32 = 2000;

/// Safety cap to avoid pathological jobs.
pub const MAX_PAGES: u32 = 1000;

/// One decoded response.
#[derive(Debug, Clone)]
pub struct Page {
    pub meta: PageMeta,
    pub rows: Vec<RawObservation>,
}

/// Anything that can hand out one page of an indicator's observations.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, indicator: &str, page: u32) -> Result<Page>;
}

#[derive(Debug, Clone)]
pub struct Client {
    pub base_url: String,
    http: HttpClient,
}

/// Root of the v2 API.
pub const DEFAULT_BASE_URL: &str = "https://api.worldbank.org/v2";

impl Default for Client {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL).expect("reqwest client build")
    }
}

// Allow -, _, . unescaped in codes (common for indicator ids)
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

impl Client {
    /// Client against a custom API root (no trailing slash).
    ///
    /// Fails with [`Error::Transport`] when the TLS backend cannot initialize.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30)) // total request timeout
            .connect_timeout(Duration::from_secs(10)) // connect timeout
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(concat!("wbi_tidy/", env!("CARGO_PKG_VERSION"))) // set user agent
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    /// URL of one page of an indicator across all countries.
    pub fn page_url(&self, indicator: &str, page: u32) -> String {
        let id = percent_encoding::utf8_percent_encode(indicator.trim(), SAFE);
        format!(
            "{}/country/all/indicator/{}?format=json&per_page={}&page={}",
            self.base_url, id, PER_PAGE, page
        )
    }
}

#[async_trait]
impl PageSource for Client {
    async fn fetch_page(&self, indicator: &str, page: u32) -> Result<Page> {
        let url = self.page_url(indicator, page);
        debug!("GET {url}");
        let res = self.http.get(&url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::Http { status, url });
        }
        let body = res.text().await?;
        parse_page(&body)
    }
}

/// Decode one response body.
///
/// The API returns an array: [Meta, [Entry, ...]] or a "message" object in
/// position 0 on error. The data element is `null` when there is nothing to
/// report; that decodes as an empty page.
pub fn parse_page(body: &str) -> Result<Page> {
    let v: Value = serde_json::from_str(body)?;
    let arr = v
        .as_array()
        .ok_or_else(|| Error::Shape("not a top-level array".into()))?;
    let Some(head) = arr.first() else {
        return Err(Error::Shape("empty array".into()));
    };

    // If first element has "message", surface API error.
    if let Some(message) = head.get("message") {
        return Err(Error::Api(message.to_string()));
    }

    let meta: PageMeta = serde_json::from_value(head.clone())?;
    let rows: Vec<RawObservation> = match arr.get(1) {
        None | Some(Value::Null) => Vec::new(),
        Some(data) => serde_json::from_value(data.clone())?,
    };
    Ok(Page { meta, rows })
}

/// Fetch every page of `indicator` and concatenate the observations in page order.
///
/// Page 1 is requested first; its `pages` field decides how many further
/// requests are issued. Pages `2..=pages` are requested one after another.
pub async fn fetch_indicator<S>(source: &S, indicator: &str) -> Result<Vec<RawObservation>>
where
    S: PageSource + ?Sized,
{
    let first = source.fetch_page(indicator, 1).await?;
    let pages = first.meta.pages;
    if pages > MAX_PAGES {
        return Err(Error::Shape(format!(
            "{indicator} declares {pages} pages, limit is {MAX_PAGES}"
        )));
    }
    debug!(
        "{indicator}: {} rows over {pages} page(s)",
        first.meta.total
    );

    let capacity = (first.meta.total as usize).min(PER_PAGE as usize * pages.max(1) as usize);
    let mut out = Vec::with_capacity(capacity);
    out.extend(first.rows);
    for page in 2..=pages {
        let next = source.fetch_page(indicator, page).await?;
        out.extend(next.rows);
    }
    Ok(out)
}
