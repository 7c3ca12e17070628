//! Postmark HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Serialize;

use super::{MailError, Mailer, OutboundEmail};

const POSTMARK_API_URL: &str = "https://api.postmarkapp.com/email";
const MESSAGE_STREAM: &str = "outbound";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PostmarkMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
    message_stream: &'a str,
}

pub struct PostmarkClient {
    client: reqwest::Client,
    server_token: String,
    from: String,
}

impl PostmarkClient {
    pub fn new(server_token: String, from: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            server_token,
            from,
        }
    }
}

#[async_trait]
impl Mailer for PostmarkClient {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let message = PostmarkMessage {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            html_body: &email.html_body,
            text_body: &email.text_body,
            message_stream: MESSAGE_STREAM,
        };

        let response = self
            .client
            .post(POSTMARK_API_URL)
            .header(ACCEPT, "application/json")
            .header("X-Postmark-Server-Token", &self.server_token)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_with_postmark_field_names() {
        let message = PostmarkMessage {
            from: "hr@example.com",
            to: "budi@example.com",
            subject: "Selamat Bergabung",
            html_body: "<p>hi</p>",
            text_body: "hi",
            message_stream: MESSAGE_STREAM,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["From"], "hr@example.com");
        assert_eq!(json["To"], "budi@example.com");
        assert_eq!(json["HtmlBody"], "<p>hi</p>");
        assert_eq!(json["TextBody"], "hi");
        assert_eq!(json["MessageStream"], "outbound");
    }
}
