#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wbi_tidy::api::{Page, PageSource, parse_page};
use wbi_tidy::{Error, Result};

/// In-memory page source that records every request it serves.
#[derive(Default)]
pub struct MockSource {
    pages: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    requests: Mutex<Vec<(String, u32)>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the response bodies for pages 1..=n of `indicator`.
    pub fn with_pages(mut self, indicator: &str, bodies: Vec<String>) -> Self {
        self.pages.insert(indicator.to_string(), bodies);
        self
    }

    /// Every request for `indicator` fails with HTTP 503.
    pub fn failing(mut self, indicator: &str) -> Self {
        self.failing.insert(indicator.to_string());
        self
    }

    pub fn requests(&self) -> Vec<(String, u32)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, indicator: &str) -> usize {
        self.requests()
            .iter()
            .filter(|(i, _)| i == indicator)
            .count()
    }
}

#[async_trait]
impl PageSource for MockSource {
    async fn fetch_page(&self, indicator: &str, page: u32) -> Result<Page> {
        self.requests
            .lock()
            .unwrap()
            .push((indicator.to_string(), page));
        if self.failing.contains(indicator) {
            return Err(Error::Http {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                url: format!("mock://{indicator}/{page}"),
            });
        }
        let body = self
            .pages
            .get(indicator)
            .and_then(|p| p.get(page as usize - 1))
            .ok_or_else(|| Error::Shape(format!("no page {page} for {indicator}")))?;
        parse_page(body)
    }
}

/// One raw observation as the API serializes it.
pub fn observation(indicator: &str, iso3: &str, date: &str, value: Value) -> Value {
    json!({
        "indicator": {"id": indicator, "value": "Some indicator"},
        "country": {"id": &iso3[..2], "value": "Some country"},
        "countryiso3code": iso3,
        "date": date,
        "value": value,
        "unit": "",
        "obs_status": "",
        "decimal": 0
    })
}

/// A full response body for page `page` of `pages`.
pub fn page_body(page: u32, pages: u32, total: u32, rows: Vec<Value>) -> String {
    json!([
        {
            "page": page,
            "pages": pages,
            "per_page": 2000,
            "total": total,
            "sourceid": "2",
            "sourcename": "World Development Indicators",
            "lastupdated": "2024-06-28"
        },
        rows
    ])
    .to_string()
}

/// `pages` bodies for `indicator`, page `n` holding `per_page[n-1]` rows.
///
/// Dates encode position as `1900 + 10 * page + row`, so order can be checked.
pub fn paged(indicator: &str, per_page: &[usize]) -> Vec<String> {
    let pages = per_page.len() as u32;
    let total = per_page.iter().sum::<usize>() as u32;
    per_page
        .iter()
        .enumerate()
        .map(|(i, &n)| {
            let page = i as u32 + 1;
            let rows = (0..n)
                .map(|r| {
                    observation(
                        indicator,
                        "DEU",
                        &format!("{}", 1900 + page * 10 + r as u32),
                        json!(r as f64 + 0.5),
                    )
                })
                .collect();
            page_body(page, pages, total, rows)
        })
        .collect()
}

/// Minimal HTTP/1.1 server on 127.0.0.1 answering GETs from a fixed route table.
///
/// Routes are keyed by request target (path + query). Unknown targets get 404.
pub struct LocalApi {
    pub base_url: String,
    targets: Arc<Mutex<Vec<String>>>,
}

impl LocalApi {
    pub async fn start(routes: Vec<(String, u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Arc<HashMap<String, (u16, String)>> = Arc::new(
            routes
                .into_iter()
                .map(|(target, status, body)| (target, (status, body)))
                .collect(),
        );
        let targets = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&targets);
        tokio::spawn(async move {
            while let Ok((sock, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                let seen = Arc::clone(&seen);
                tokio::spawn(async move { answer(sock, &routes, &seen).await });
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            targets,
        }
    }

    /// Request targets in arrival order.
    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }
}

async fn answer(
    mut sock: TcpStream,
    routes: &HashMap<String, (u16, String)>,
    seen: &Mutex<Vec<String>>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match sock.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let head = String::from_utf8_lossy(&buf);
    let target = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("")
        .to_string();
    seen.lock().unwrap().push(target.clone());

    let (status, body) = routes
        .get(&target)
        .cloned()
        .unwrap_or((404, "not found".to_string()));
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        503 => "Service Unavailable",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = sock.write_all(response.as_bytes()).await;
    let _ = sock.shutdown().await;
}

/// Request target for one page of `indicator` under the default query.
pub fn page_target(indicator: &str, page: u32) -> String {
    format!("/country/all/indicator/{indicator}?format=json&per_page=2000&page={page}")
}
