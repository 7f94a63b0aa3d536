//! PDF rendering boundary.
//!
//! The PDF engine is an external service: we hand it the static HTML document and
//! the physical paper size and get bytes back. Nothing in this crate rasterises or
//! measures text.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::layout::page_format::PageFormat;

const RENDER_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("PDF service error (status {status}): {message}")]
    Service { status: u16, message: String },

    #[error("PDF service returned an empty document")]
    Empty,
}

#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str, format: PageFormat) -> Result<Bytes, PdfError>;
}

#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    html: &'a str,
    paper_width: String,
    paper_height: String,
    print_background: bool,
}

impl<'a> RenderRequest<'a> {
    fn new(html: &'a str, format: PageFormat) -> Self {
        Self {
            html,
            paper_width: format!("{}mm", format.width_mm()),
            paper_height: format!("{}mm", format.height_mm()),
            print_background: true,
        }
    }
}

/// Posts documents to an HTML-to-PDF service over HTTP.
#[derive(Clone)]
pub struct HttpPdfRenderer {
    client: Client,
    endpoint: String,
}

impl HttpPdfRenderer {
    pub fn new(endpoint: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(RENDER_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self { client, endpoint }
    }
}

#[async_trait]
impl PdfRenderer for HttpPdfRenderer {
    async fn render(&self, html: &str, format: PageFormat) -> Result<Bytes, PdfError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RenderRequest::new(html, format))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("PDF service returned {status}: {message}");
            return Err(PdfError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Err(PdfError::Empty);
        }
        debug!(bytes = body.len(), format = format.label(), "PDF rendered");
        Ok(body)
    }
}
