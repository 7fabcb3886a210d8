use crate::domain::{ContactSubmission, SubmissionError};
use crate::email_client::{EmailClient, EmailClientError};
use crate::turnstile_client::TurnstileClient;
use actix_web::error::PayloadError;
use actix_web::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use futures::{Stream, StreamExt};
use lettre::message::Mailbox;
use lettre::Address;
use std::fmt::Formatter;

/// Largest body read before giving up. Far above anything a valid
/// submission needs, so oversized bodies are reported as too long.
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

#[derive(thiserror::Error)]
pub enum ContactError {
    #[error("Bad Request")]
    MalformedBody(#[source] serde_json::Error),
    #[error("Bad Request")]
    UnreadableBody(#[source] PayloadError),
    #[error("{0}")]
    ValidationError(#[from] SubmissionError),
    #[error("Turnstile verification failed")]
    VerificationRejected,
    #[error("Turnstile verification unavailable")]
    VerificationUnavailable(#[source] reqwest::Error),
    #[error("Failed to send message")]
    DispatchFailed(#[source] EmailClientError),
}

impl std::fmt::Debug for ContactError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ContactError {
    fn status_code(&self) -> StatusCode {
        match self {
            ContactError::MalformedBody(_)
            | ContactError::UnreadableBody(_)
            | ContactError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ContactError::VerificationRejected => StatusCode::FORBIDDEN,
            ContactError::VerificationUnavailable(e) if e.is_timeout() => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ContactError::DispatchFailed(EmailClientError::Timeout(_)) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ContactError::VerificationUnavailable(_) | ContactError::DispatchFailed(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(serde::Serialize)]
struct SuccessBody<'a> {
    success: bool,
    received: &'a serde_json::Value,
}

#[tracing::instrument(
    name = "Handling a contact form submission",
    skip(request, payload, turnstile_client, email_client),
    fields(submitter_email = tracing::field::Empty)
)]
pub async fn submit_contact(
    request: HttpRequest,
    payload: web::Payload,
    turnstile_client: web::Data<TurnstileClient>,
    email_client: web::Data<EmailClient>,
) -> Result<HttpResponse, ContactError> {
    let body = read_body(payload, MAX_BODY_SIZE).await?;
    let received: serde_json::Value =
        serde_json::from_slice(&body).map_err(ContactError::MalformedBody)?;
    let submission = ContactSubmission::try_from(received)?;
    tracing::Span::current().record(
        "submitter_email",
        &tracing::field::display(&submission.email),
    );

    let remote_ip = client_ip(&request);
    let is_human = turnstile_client
        .verify(&submission.token, remote_ip.as_deref())
        .await
        .map_err(ContactError::VerificationUnavailable)?;
    if !is_human {
        return Err(ContactError::VerificationRejected);
    }

    send_contact_email(&email_client, &submission)
        .await
        .map_err(ContactError::DispatchFailed)?;

    Ok(HttpResponse::Ok()
        .insert_header((ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .json(SuccessBody {
            success: true,
            received: submission.received(),
        }))
}

/// Collect the request body, refusing to buffer more than `limit` bytes.
async fn read_body<S>(mut payload: S, limit: usize) -> Result<web::Bytes, ContactError>
where
    S: Stream<Item = Result<web::Bytes, PayloadError>> + Unpin,
{
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(ContactError::UnreadableBody)?;
        if body.len() + chunk.len() > limit {
            return Err(SubmissionError::InputTooLong.into());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

#[tracing::instrument(name = "Send contact email", skip(email_client, submission))]
async fn send_contact_email(
    email_client: &EmailClient,
    submission: &ContactSubmission,
) -> Result<(), EmailClientError> {
    let subject = format!("New contact form submission from {}", submission.name);
    let plain_body = format!(
        "Message:\n{}\n\nFrom: {}",
        submission.message.as_ref(),
        submission.email
    );
    let html_body = format!(
        "<p><strong>Message:</strong></p>\n<p>{}</p>\n<p><strong>From:</strong> {}</p>",
        htmlescape::encode_minimal(submission.message.as_ref()),
        htmlescape::encode_minimal(submission.email.as_ref()),
    );

    email_client
        .send_email(reply_to(submission), &subject, &html_body, &plain_body)
        .await
}

// The shape check is looser than RFC 5322, so not every accepted address can
// head a mailbox. Names with control characters cannot be rendered as a
// display name and are left off.
fn reply_to(submission: &ContactSubmission) -> Option<Mailbox> {
    match submission.email.as_ref().parse::<Address>() {
        Ok(address) => {
            let name = submission.name.as_ref();
            let display_name = if name.chars().any(char::is_control) {
                None
            } else {
                Some(name.to_string())
            };
            Some(Mailbox::new(display_name, address))
        }
        Err(e) => {
            tracing::warn!(
                error.message = %e,
                "Submitter address is not a valid mailbox, sending without Reply-To"
            );
            None
        }
    }
}

fn client_ip(request: &HttpRequest) -> Option<String> {
    let connection_info = request.connection_info();
    let address = connection_info.realip_remote_addr()?;
    let ip = match address.parse::<std::net::SocketAddr>() {
        Ok(socket) => socket.ip().to_string(),
        Err(_) => address.to_string(),
    };
    Some(ip)
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
