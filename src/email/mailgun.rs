use crate::domain::EmailAddress;
use crate::email::{EmailBackend, EmailMessage, EmailProvider, MessageId, SendError};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};

/// Mailgun's transactional message API: one authenticated, form-encoded POST
/// per send.
pub struct MailgunClient {
    http_client: Client,
    base_url: String,
    domain: String,
    api_key: Secret<String>,
    sender: EmailAddress,
    recipient: EmailAddress,
}

impl MailgunClient {
    pub fn new(
        base_url: String,
        domain: String,
        api_key: Secret<String>,
        sender: EmailAddress,
        recipient: EmailAddress,
        timeout: std::time::Duration,
    ) -> Self {
        let http_client = Client::builder().timeout(timeout).build().unwrap();
        Self {
            http_client,
            base_url,
            domain,
            api_key,
            sender,
            recipient,
        }
    }
}

#[derive(serde::Deserialize)]
struct MailgunResponse {
    id: Option<String>,
}

#[async_trait]
impl EmailBackend for MailgunClient {
    fn provider(&self) -> EmailProvider {
        EmailProvider::Mailgun
    }

    async fn send(&self, message: &EmailMessage) -> Result<Option<MessageId>, SendError> {
        let url = format!("{}/v3/{}/messages", self.base_url, self.domain);
        let response = self
            .http_client
            .post(&url)
            .basic_auth("api", Some(self.api_key.expose_secret()))
            .form(&[
                ("from", self.sender.as_ref()),
                ("to", self.recipient.as_ref()),
                ("subject", message.subject.as_str()),
                ("text", message.text_body.as_str()),
                ("html", message.html_body.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SendError::Rejected {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: MailgunResponse = response.json().await?;
        Ok(body.id.map(MessageId))
    }
}
