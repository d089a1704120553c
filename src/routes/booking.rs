use crate::domain::{ConsultationPayload, ConsultationRequest, OriginPolicy};
use crate::email::{EmailDispatcher, EmailMessage, EmailProvider, MessageId, SendError};
use actix_web::http::{header, Method, StatusCode};
use actix_web::{web, HttpRequest, HttpResponse, HttpResponseBuilder, ResponseError};
use anyhow::Context;
use std::fmt::Formatter;

/// The JSON envelope every relay response uses, success or failure. Fields
/// that do not apply to the outcome are left out of the document entirely.
#[derive(serde::Serialize)]
pub struct RelayResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(rename = "mailgunId", skip_serializing_if = "Option::is_none")]
    pub mailgun_id: Option<String>,
    #[serde(rename = "gmailId", skip_serializing_if = "Option::is_none")]
    pub gmail_id: Option<String>,
}

impl RelayResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            note: None,
            mailgun_id: None,
            gmail_id: None,
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            note: None,
            mailgun_id: None,
            gmail_id: None,
        }
    }

    fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    fn with_message_id(mut self, provider: EmailProvider, id: MessageId) -> Self {
        match provider {
            EmailProvider::Mailgun => self.mailgun_id = Some(id.0),
            EmailProvider::Gmail => self.gmail_id = Some(id.0),
        }
        self
    }
}

#[derive(thiserror::Error)]
pub enum BookingError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Origin not allowed")]
    OriginNotAllowed,
    #[error("Invalid content type")]
    InvalidContentType,
    #[error("Failed to send email via {provider}")]
    SendFailed {
        provider: EmailProvider,
        #[source]
        source: SendError,
    },
    #[error("Server error")]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for BookingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for BookingError {
    fn status_code(&self) -> StatusCode {
        match self {
            BookingError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            BookingError::OriginNotAllowed => StatusCode::FORBIDDEN,
            BookingError::InvalidContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            BookingError::SendFailed { .. } => StatusCode::BAD_GATEWAY,
            BookingError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        respond(
            self.status_code(),
            &RelayResponse::failure(self.to_string()),
        )
    }
}

/// The single form endpoint. It is registered without a method guard so that
/// preflights and stray verbs get the handler's own answers instead of the
/// framework's.
#[tracing::instrument(
    name = "Relay a consultation request",
    skip(request, body, origin_policy, dispatcher),
    fields(
        http_method = %request.method(),
        submitter_email = tracing::field::Empty,
        provider = %dispatcher.provider()
    )
)]
pub async fn booking_email(
    request: HttpRequest,
    body: web::Bytes,
    origin_policy: web::Data<OriginPolicy>,
    dispatcher: web::Data<EmailDispatcher>,
) -> Result<HttpResponse, BookingError> {
    if request.method() == Method::OPTIONS {
        return Ok(preflight());
    }
    if request.method() != Method::POST {
        return Err(BookingError::MethodNotAllowed);
    }

    let origin = header_value(&request, header::ORIGIN);
    if !origin_policy.allows(&origin) {
        tracing::warn!(%origin, "Rejecting a submission from a disallowed origin");
        return Err(BookingError::OriginNotAllowed);
    }

    let content_type = header_value(&request, header::CONTENT_TYPE);
    if !content_type.to_ascii_lowercase().contains("application/json") {
        return Err(BookingError::InvalidContentType);
    }

    let payload: ConsultationPayload =
        serde_json::from_slice(&body).context("Failed to parse the request body as JSON")?;

    if payload.is_spam() {
        // Pretend success so the bot learns nothing.
        tracing::info!("Dropping a honeypot-flagged submission");
        return Ok(respond(StatusCode::OK, &RelayResponse::success("Thanks!")));
    }

    let client_ip = request
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("")
        .to_string();
    let user_agent = header_value(&request, header::USER_AGENT);
    let consultation = ConsultationRequest::new(payload, client_ip, user_agent);
    tracing::Span::current().record(
        "submitter_email",
        &tracing::field::display(&consultation.email),
    );

    match dispatcher.backend() {
        None => {
            tracing::warn!(
                "{} credentials are not configured; the consultation will not be emailed",
                dispatcher.provider()
            );
            tracing::info!(
                consultation = ?consultation,
                "Consultation request received (email not sent)"
            );
            Ok(respond(
                StatusCode::OK,
                &RelayResponse::success(
                    "Your consultation request has been submitted successfully! \
                     We'll contact you within 24 hours.",
                )
                .with_note(format!(
                    "{} not configured - consultation logged only",
                    dispatcher.provider()
                )),
            ))
        }
        Some(backend) => {
            let message = EmailMessage::render(&consultation);
            match backend.send(&message).await {
                Ok(message_id) => {
                    tracing::info!("Consultation request relayed");
                    let mut response =
                        RelayResponse::success("Your consultation request has been emailed!");
                    if let Some(id) = message_id {
                        response = response.with_message_id(dispatcher.provider(), id);
                    }
                    Ok(respond(StatusCode::OK, &response))
                }
                Err(error @ SendError::Rejected { .. }) => Err(BookingError::SendFailed {
                    provider: dispatcher.provider(),
                    source: error,
                }),
                Err(error) => Err(BookingError::UnexpectedError(
                    anyhow::Error::new(error).context("Failed to reach the email backend"),
                )),
            }
        }
    }
}

fn header_value(request: &HttpRequest, name: header::HeaderName) -> String {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn preflight() -> HttpResponse {
    let mut builder = HttpResponse::build(StatusCode::NO_CONTENT);
    decorate_cors(&mut builder);
    builder.finish()
}

/// Every response the endpoint produces carries the same permissive CORS
/// decoration, errors included.
fn respond(status: StatusCode, payload: &RelayResponse) -> HttpResponse {
    let mut builder = HttpResponse::build(status);
    decorate_cors(&mut builder);
    builder.json(payload)
}

fn decorate_cors(builder: &mut HttpResponseBuilder) {
    builder
        .insert_header(("Access-Control-Allow-Origin", "*"))
        .insert_header(("Access-Control-Allow-Methods", "POST, OPTIONS"))
        .insert_header(("Access-Control-Allow-Headers", "Content-Type"))
        .insert_header(("Access-Control-Max-Age", "86400"));
}

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
