mod gmail;
mod mailgun;
mod message;

pub use gmail::{GmailClient, GmailCredentials};
pub use mailgun::MailgunClient;
pub use message::EmailMessage;

use async_trait::async_trait;

/// Which third-party provider transmits the composed email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    Mailgun,
    Gmail,
}

impl EmailProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailProvider::Mailgun => "Mailgun",
            EmailProvider::Gmail => "Gmail",
        }
    }
}

impl std::fmt::Display for EmailProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The provider-assigned id of an accepted message, when the provider
/// reports one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageId(pub String);

#[derive(thiserror::Error, Debug)]
pub enum SendError {
    /// The token exchange was rejected; no mail was attempted.
    #[error("failed oAuth: token endpoint returned {status}: {body}")]
    OAuth { status: u16, body: String },
    /// The provider's message endpoint answered with a non-2xx status.
    #[error("provider returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// One delivery attempt through a specific provider. Implementations make
/// exactly one attempt per call; nothing is retried or queued.
#[async_trait]
pub trait EmailBackend: Send + Sync {
    fn provider(&self) -> EmailProvider;

    async fn send(&self, message: &EmailMessage) -> Result<Option<MessageId>, SendError>;
}

/// The backend selected at startup, or the explicit "not configured" state
/// that makes the relay log submissions instead of failing them.
pub struct EmailDispatcher {
    provider: EmailProvider,
    backend: Option<Box<dyn EmailBackend>>,
}

impl EmailDispatcher {
    pub fn configured(backend: Box<dyn EmailBackend>) -> Self {
        let provider = backend.provider();
        Self {
            provider,
            backend: Some(backend),
        }
    }

    pub fn unconfigured(provider: EmailProvider) -> Self {
        Self {
            provider,
            backend: None,
        }
    }

    /// The intended provider, known even when its credentials are missing.
    pub fn provider(&self) -> EmailProvider {
        self.provider
    }

    pub fn backend(&self) -> Option<&dyn EmailBackend> {
        self.backend.as_deref()
    }
}

impl std::fmt::Debug for EmailDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailDispatcher")
            .field("provider", &self.provider)
            .field("configured", &self.backend.is_some())
            .finish()
    }
}
