//! PDF source: downloads a deck and splits its text into pages.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header, Client};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

static RE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+(?:[.,]\d+)?%?").unwrap());

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF download timed out")]
    Timeout,

    #[error("Failed to download PDF: HTTP {0}")]
    Status(u16),

    #[error("Failed to download PDF: {0}")]
    Download(String),

    #[error("The URL did not return a PDF file")]
    NotAPdf,

    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("PDF contains no extractable text")]
    Empty,
}

/// Text extracted from one page of the deck.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageData {
    /// 1-based page number.
    pub index: usize,
    pub title: Option<String>,
    pub text: String,
    pub numbers: Vec<String>,
}

/// Where pipeline workers get deck pages from.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<PageData>, PdfError>;
}

/// Downloads decks over HTTP with a fixed timeout and parses them with `pdf-extract`.
#[derive(Clone)]
pub struct HttpPdfSource {
    client: Client,
}

impl HttpPdfSource {
    pub fn new(timeout_secs: u64) -> Result<Self, PdfError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PdfError::Download(e.to_string()))?;
        Ok(Self { client })
    }

    async fn download(&self, url: &str) -> Result<Bytes, PdfError> {
        info!("Downloading PDF from {url}");

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/pdf")
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PdfError::Status(status.as_u16()));
        }

        let is_pdf = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/pdf"));
        if !is_pdf {
            return Err(PdfError::NotAPdf);
        }

        response.bytes().await.map_err(map_request_error)
    }
}

fn map_request_error(e: reqwest::Error) -> PdfError {
    if e.is_timeout() {
        PdfError::Timeout
    } else {
        PdfError::Download(e.to_string())
    }
}

#[async_trait]
impl DocumentSource for HttpPdfSource {
    async fn fetch(&self, url: &str) -> Result<Vec<PageData>, PdfError> {
        let bytes = self.download(url).await?;
        debug!("Downloaded {} bytes from {url}", bytes.len());

        // pdf-extract is synchronous and CPU-bound.
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| PdfError::Parse(e.to_string()))?
            .map_err(|e| PdfError::Parse(format!("{e:?}")))?;

        let pages = split_pages(&text);
        if pages.is_empty() {
            return Err(PdfError::Empty);
        }
        info!("Parsed {} page(s) from {url}", pages.len());
        Ok(pages)
    }
}

/// Splits extracted text on form feeds, dropping blank pages.
pub fn split_pages(text: &str) -> Vec<PageData> {
    text.split('\u{c}')
        .filter(|page| !page.trim().is_empty())
        .enumerate()
        .map(|(i, page)| PageData {
            index: i + 1,
            title: page
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(String::from),
            text: page.trim().to_string(),
            numbers: RE_NUMBER
                .find_iter(page)
                .map(|m| m.as_str().to_string())
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use axum::{http::StatusCode, routing::get, Router};

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    fn deck_server() -> Router {
        Router::new()
            .route("/missing.pdf", get(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/page.html",
                get(|| async { ([("content-type", "text/html")], "<html></html>") }),
            )
            .route(
                "/broken.pdf",
                get(|| async { ([("content-type", "application/pdf")], "not a pdf") }),
            )
            .route(
                "/slow.pdf",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    ([("content-type", "application/pdf")], "%PDF-1.4")
                }),
            )
    }

    #[tokio::test]
    async fn test_non_2xx_download_reports_status() {
        let addr = serve(deck_server()).await;
        let source = HttpPdfSource::new(5).unwrap();
        let err = source
            .fetch(&format!("http://{addr}/missing.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, PdfError::Status(404)));
        assert_eq!(err.to_string(), "Failed to download PDF: HTTP 404");
    }

    #[tokio::test]
    async fn test_non_pdf_content_type_rejected() {
        let addr = serve(deck_server()).await;
        let source = HttpPdfSource::new(5).unwrap();
        let err = source
            .fetch(&format!("http://{addr}/page.html"))
            .await
            .unwrap_err();
        assert!(matches!(err, PdfError::NotAPdf));
        assert_eq!(err.to_string(), "The URL did not return a PDF file");
    }

    #[tokio::test]
    async fn test_unparseable_pdf_is_parse_error() {
        let addr = serve(deck_server()).await;
        let source = HttpPdfSource::new(5).unwrap();
        let err = source
            .fetch(&format!("http://{addr}/broken.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, PdfError::Parse(_)));
    }

    #[tokio::test]
    async fn test_slow_download_times_out() {
        let addr = serve(deck_server()).await;
        let source = HttpPdfSource::new(1).unwrap();
        let err = source
            .fetch(&format!("http://{addr}/slow.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, PdfError::Timeout));
        assert_eq!(err.to_string(), "PDF download timed out");
    }

    #[test]
    fn test_split_pages_on_form_feed() {
        let text = "Acme Pay\nPayments for SMBs\n\u{c}\n\u{c}Traction\nARR $1.2M, 35% MoM\n";
        let pages = split_pages(text);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].index, 1);
        assert_eq!(pages[0].title.as_deref(), Some("Acme Pay"));
        assert_eq!(pages[1].index, 2);
        assert_eq!(pages[1].title.as_deref(), Some("Traction"));
    }

    #[test]
    fn test_numbers_extracted() {
        let pages = split_pages("Raising 2,5 at 12.5% dilution over 18 months");
        assert_eq!(pages[0].numbers, vec!["2,5", "12.5%", "18"]);
    }

    #[test]
    fn test_text_without_form_feed_is_one_page() {
        let pages = split_pages("Only one slide");
        assert_eq!(pages.len(), 1);
        assert!(pages[0].numbers.is_empty());
    }

    #[test]
    fn test_blank_document_has_no_pages() {
        assert!(split_pages("  \n\u{c}\n ").is_empty());
    }
}
