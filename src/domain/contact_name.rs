use crate::domain::SubmissionError;

const MAX_NAME_LENGTH: usize = 100;

#[derive(Debug, Clone)]
pub struct ContactName(String);

impl ContactName {
    pub fn parse(s: String) -> Result<ContactName, SubmissionError> {
        // Submissions never get here empty; their presence check runs first.
        if s.is_empty() {
            return Err(SubmissionError::MissingFields);
        }
        if s.chars().count() > MAX_NAME_LENGTH {
            return Err(SubmissionError::InputTooLong);
        }
        Ok(Self(s))
    }
}

impl AsRef<str> for ContactName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContactName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
