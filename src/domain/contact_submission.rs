use crate::domain::{ContactEmail, ContactMessage, ContactName, TurnstileToken};
use serde_json::Value;

/// Why a submission was turned away before any external call was made.
///
/// The `Display` text is what the client sees.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Missing required fields")]
    MissingFields,
    #[error("Invalid field types")]
    InvalidFieldTypes,
    #[error("Input too long")]
    InputTooLong,
    #[error("Invalid email format")]
    InvalidEmail,
}

#[derive(Debug)]
pub struct ContactSubmission {
    pub name: ContactName,
    pub email: ContactEmail,
    pub message: ContactMessage,
    pub token: TurnstileToken,
    received: Value,
}

impl ContactSubmission {
    /// The JSON object exactly as the client sent it.
    pub fn received(&self) -> &Value {
        &self.received
    }
}

/// Checks run in a fixed order: presence, types, length, email shape.
/// The first failing stage decides the error.
impl TryFrom<Value> for ContactSubmission {
    type Error = SubmissionError;

    fn try_from(received: Value) -> Result<Self, Self::Error> {
        let is_missing = ["name", "email", "message"]
            .iter()
            .any(|key| !is_truthy(received.get(*key)));
        if is_missing {
            return Err(SubmissionError::MissingFields);
        }

        let text = |key: &str| received.get(key).and_then(Value::as_str).map(str::to_owned);
        let (name, email, message, token) =
            match (text("name"), text("email"), text("message"), text("token")) {
                (Some(name), Some(email), Some(message), Some(token)) => {
                    (name, email, message, token)
                }
                _ => return Err(SubmissionError::InvalidFieldTypes),
            };

        let name = ContactName::parse(name)?;
        let message = ContactMessage::parse(message)?;
        let email = ContactEmail::parse(email)?;

        Ok(Self {
            name,
            email,
            message,
            token: token.into(),
            received,
        })
    }
}

// Mirrors what a browser-side `if (!field)` check would let through.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}
