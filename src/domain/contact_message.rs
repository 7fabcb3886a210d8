use crate::domain::SubmissionError;

const MAX_MESSAGE_LENGTH: usize = 1000;

#[derive(Debug, Clone)]
pub struct ContactMessage(String);

impl ContactMessage {
    pub fn parse(s: String) -> Result<ContactMessage, SubmissionError> {
        // Submissions never get here empty; their presence check runs first.
        if s.is_empty() {
            return Err(SubmissionError::MissingFields);
        }
        if s.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(SubmissionError::InputTooLong);
        }
        Ok(Self(s))
    }
}

impl AsRef<str> for ContactMessage {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
