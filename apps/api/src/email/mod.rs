//! Outbound email: Postmark delivery plus the welcome/reminder bodies and
//! their send handlers.

pub mod body;
pub mod handlers;
pub mod postmark;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("delivery rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// One fully-composed message; the sender address belongs to the mailer.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}
