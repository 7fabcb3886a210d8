/// Challenge response produced by the Turnstile widget in the browser.
///
/// Any string is accepted here; an empty or forged token is rejected by the
/// verification service, not by us.
#[derive(Debug, Clone)]
pub struct TurnstileToken(String);

impl From<String> for TurnstileToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for TurnstileToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
