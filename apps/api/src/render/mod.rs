//! PDF Renderer Adapter — converts finished contract HTML into PDF bytes
//! by driving a headless Chromium instance over CDP.
//!
//! The pipeline treats the renderer as a black box behind `PdfRenderer`;
//! a render failure is reported per document and never aborts a batch.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use futures::StreamExt;
use thiserror::Error;
use tracing::debug;

const A4_WIDTH_IN: f64 = 8.27;
const A4_HEIGHT_IN: f64 = 11.69;
/// 1.5 cm expressed in inches, applied on all four sides.
const MARGIN_IN: f64 = 0.59;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("browser error: {0}")]
    Browser(String),
}

#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render_html(&self, html: &str) -> Result<Vec<u8>, RenderError>;
}

/// Production renderer: one short-lived Chromium per document, matching the
/// strictly sequential batch model (one render completes before the next
/// employee starts).
pub struct ChromiumRenderer {
    chrome_executable: Option<String>,
}

impl ChromiumRenderer {
    pub fn new(chrome_executable: Option<String>) -> Self {
        Self { chrome_executable }
    }

    fn browser_config(&self) -> Result<BrowserConfig, RenderError> {
        let mut builder = BrowserConfig::builder();
        if let Some(path) = &self.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(RenderError::Browser)
    }
}

#[async_trait]
impl PdfRenderer for ChromiumRenderer {
    async fn render_html(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        let (mut browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .map_err(browser_err)?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let result = print_page(&browser, html).await;

        let _ = browser.close().await;
        let _ = events.await;

        result
    }
}

async fn print_page(browser: &Browser, html: &str) -> Result<Vec<u8>, RenderError> {
    let page = browser.new_page("about:blank").await.map_err(browser_err)?;

    page.set_content(html).await.map_err(browser_err)?;
    // Let embedded images and fonts finish loading before capture.
    page.wait_for_navigation().await.map_err(browser_err)?;

    let params = PrintToPdfParams {
        print_background: Some(true),
        display_header_footer: Some(false),
        paper_width: Some(A4_WIDTH_IN),
        paper_height: Some(A4_HEIGHT_IN),
        margin_top: Some(MARGIN_IN),
        margin_bottom: Some(MARGIN_IN),
        margin_left: Some(MARGIN_IN),
        margin_right: Some(MARGIN_IN),
        ..Default::default()
    };

    let pdf = page.pdf(params).await.map_err(browser_err)?;
    debug!("rendered PDF ({} bytes)", pdf.len());

    let _ = page.close().await;
    Ok(pdf)
}

fn browser_err(e: impl std::fmt::Display) -> RenderError {
    RenderError::Browser(e.to_string())
}
