use crate::domain::EmailAddress;
use crate::email::{
    EmailBackend, EmailDispatcher, EmailProvider, GmailClient, GmailCredentials, MailgunClient,
};
use secrecy::{ExposeSecret, Secret};
use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub email: EmailSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    /// Origins allowed to POST the consultation form. Requests without an
    /// `Origin` header (curl, server-to-server) are always admitted.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(serde::Deserialize, Clone)]
#[serde(default)]
pub struct EmailSettings {
    pub provider: EmailProvider,
    pub sender: String,
    pub recipient: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
    pub mailgun: MailgunSettings,
    pub gmail: GmailSettings,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            provider: EmailProvider::Mailgun,
            sender: String::new(),
            recipient: String::new(),
            timeout_milliseconds: 10_000,
            mailgun: MailgunSettings::default(),
            gmail: GmailSettings::default(),
        }
    }
}

#[derive(serde::Deserialize, Clone)]
#[serde(default)]
pub struct MailgunSettings {
    pub api_key: Secret<String>,
    pub domain: String,
    pub base_url: String,
}

impl Default for MailgunSettings {
    fn default() -> Self {
        Self {
            api_key: Secret::new(String::new()),
            domain: String::new(),
            base_url: "https://api.mailgun.net".to_string(),
        }
    }
}

impl MailgunSettings {
    fn is_configured(&self) -> bool {
        !self.api_key.expose_secret().trim().is_empty() && !self.domain.trim().is_empty()
    }
}

#[derive(serde::Deserialize, Clone)]
#[serde(default)]
pub struct GmailSettings {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub refresh_token: Secret<String>,
    pub token_url: String,
    pub api_base_url: String,
}

impl Default for GmailSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: Secret::new(String::new()),
            refresh_token: Secret::new(String::new()),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            api_base_url: "https://gmail.googleapis.com".to_string(),
        }
    }
}

impl GmailSettings {
    fn is_configured(&self) -> bool {
        !self.client_id.trim().is_empty()
            && !self.client_secret.expose_secret().trim().is_empty()
            && !self.refresh_token.expose_secret().trim().is_empty()
    }
}

impl EmailSettings {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_milliseconds)
    }

    /// Build the dispatcher the relay hands submissions to. Missing
    /// credentials yield the unconfigured state, so the form keeps working
    /// and submissions are logged. Present-but-invalid addresses are
    /// startup errors.
    pub fn dispatcher(&self) -> Result<EmailDispatcher, anyhow::Error> {
        if !self.is_configured() {
            return Ok(EmailDispatcher::unconfigured(self.provider));
        }
        let sender = self.sender()?;
        let recipient = self.recipient()?;
        let backend: Box<dyn EmailBackend> = match self.provider {
            EmailProvider::Mailgun => Box::new(MailgunClient::new(
                self.mailgun.base_url.clone(),
                self.mailgun.domain.clone(),
                self.mailgun.api_key.clone(),
                sender,
                recipient,
                self.timeout(),
            )),
            EmailProvider::Gmail => Box::new(GmailClient::new(
                self.gmail.token_url.clone(),
                self.gmail.api_base_url.clone(),
                GmailCredentials {
                    client_id: self.gmail.client_id.clone(),
                    client_secret: self.gmail.client_secret.clone(),
                    refresh_token: self.gmail.refresh_token.clone(),
                },
                sender,
                recipient,
                self.timeout(),
            )),
        };
        Ok(EmailDispatcher::configured(backend))
    }

    fn is_configured(&self) -> bool {
        if self.sender.trim().is_empty() || self.recipient.trim().is_empty() {
            return false;
        }
        match self.provider {
            EmailProvider::Mailgun => self.mailgun.is_configured(),
            EmailProvider::Gmail => self.gmail.is_configured(),
        }
    }

    fn sender(&self) -> Result<EmailAddress, anyhow::Error> {
        EmailAddress::parse(self.sender.clone())
            .map_err(|error| anyhow::anyhow!("Invalid sender address in configuration: {}", error))
    }

    fn recipient(&self) -> Result<EmailAddress, anyhow::Error> {
        EmailAddress::parse(self.recipient.clone()).map_err(|error| {
            anyhow::anyhow!("Invalid recipient address in configuration: {}", error)
        })
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    // Default to `local` when APP_ENVIRONMENT is unset.
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("Failed to parse APP_ENVIRONMENT");
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // e.g. APP_EMAIL__MAILGUN__API_KEY=... sets email.mailgun.api_key
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}
