use crate::domain::EmailAddress;
use crate::email::{EmailBackend, EmailMessage, EmailProvider, MessageId, SendError};
use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};

/// Long-lived OAuth2 credentials for the mailbox the relay sends from.
#[derive(Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub refresh_token: Secret<String>,
}

/// The Gmail REST API. Every send exchanges the refresh token for a fresh
/// access token, then posts the base64url-encoded MIME document.
pub struct GmailClient {
    http_client: Client,
    token_url: String,
    api_base_url: String,
    credentials: GmailCredentials,
    sender: EmailAddress,
    recipient: EmailAddress,
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: Secret<String>,
}

#[derive(serde::Deserialize)]
struct GmailSendResponse {
    id: Option<String>,
}

impl GmailClient {
    pub fn new(
        token_url: String,
        api_base_url: String,
        credentials: GmailCredentials,
        sender: EmailAddress,
        recipient: EmailAddress,
        timeout: std::time::Duration,
    ) -> Self {
        let http_client = Client::builder().timeout(timeout).build().unwrap();
        Self {
            http_client,
            token_url,
            api_base_url,
            credentials,
            sender,
            recipient,
        }
    }

    /// Trade the refresh token for a short-lived access token. A rejected
    /// exchange fails the send before any mail is attempted.
    async fn exchange_refresh_token(&self) -> Result<Secret<String>, SendError> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                (
                    "client_secret",
                    self.credentials.client_secret.expose_secret().as_str(),
                ),
                (
                    "refresh_token",
                    self.credentials.refresh_token.expose_secret().as_str(),
                ),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SendError::OAuth {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Compose the RFC 2822 document Gmail expects in the `raw` field:
    /// multipart/alternative with CRLF line endings, base64url-encoded
    /// without padding.
    fn compose_raw(&self, message: &EmailMessage) -> String {
        let boundary = boundary();
        let mime = format!(
            "From: {from}\r\n\
             To: {to}\r\n\
             Subject: {subject}\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n\
             \r\n\
             --{boundary}\r\n\
             Content-Type: text/plain; charset=\"UTF-8\"\r\n\
             \r\n\
             {text}\r\n\
             --{boundary}\r\n\
             Content-Type: text/html; charset=\"UTF-8\"\r\n\
             \r\n\
             {html}\r\n\
             --{boundary}--",
            from = self.sender,
            to = self.recipient,
            subject = message.subject,
            boundary = boundary,
            text = message.text_body,
            html = message.html_body,
        );
        base64::encode_config(mime, base64::URL_SAFE_NO_PAD)
    }
}

fn boundary() -> String {
    let mut rng = thread_rng();
    let marker: String = std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(16)
        .collect();
    format!("booking-{}", marker)
}

#[async_trait]
impl EmailBackend for GmailClient {
    fn provider(&self) -> EmailProvider {
        EmailProvider::Gmail
    }

    async fn send(&self, message: &EmailMessage) -> Result<Option<MessageId>, SendError> {
        let access_token = self.exchange_refresh_token().await?;
        let url = format!("{}/gmail/v1/users/me/messages/send", self.api_base_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token.expose_secret())
            .json(&serde_json::json!({ "raw": self.compose_raw(message) }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SendError::Rejected {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: GmailSendResponse = response.json().await?;
        Ok(body.id.map(MessageId))
    }
}
