use crate::domain::SubmissionError;
use once_cell::sync::Lazy;
use regex::Regex;

// local@domain.tld, nothing more. U+FEFF counts as whitespace here, as it
// does for the browser-side check.
static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s\x{FEFF}@]+@[^\s\x{FEFF}@]+\.[^\s\x{FEFF}@]+$")
        .expect("email pattern is valid")
});

#[derive(Debug, Clone)]
pub struct ContactEmail(String);

impl ContactEmail {
    pub fn parse(s: String) -> Result<ContactEmail, SubmissionError> {
        if EMAIL_SHAPE.is_match(&s) {
            Ok(Self(s))
        } else {
            Err(SubmissionError::InvalidEmail)
        }
    }
}

impl AsRef<str> for ContactEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContactEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
