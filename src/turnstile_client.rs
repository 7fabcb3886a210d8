use crate::domain::TurnstileToken;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};

pub struct TurnstileClient {
    http_client: Client,
    verify_url: String,
    secret: Secret<String>,
}

impl TurnstileClient {
    pub fn new(verify_url: String, secret: Secret<String>, timeout: std::time::Duration) -> Self {
        let http_client = Client::builder().timeout(timeout).build().unwrap();
        Self {
            http_client,
            verify_url,
            secret,
        }
    }

    /// Ask Turnstile whether `token` is a genuine challenge response.
    ///
    /// `Ok(false)` means the service answered and said no; transport failures,
    /// non-2xx statuses and unparsable bodies are errors.
    #[tracing::instrument(name = "Verifying Turnstile token", skip(self, token))]
    pub async fn verify(
        &self,
        token: &TurnstileToken,
        remote_ip: Option<&str>,
    ) -> Result<bool, reqwest::Error> {
        let request_body = SiteVerifyRequest {
            secret: self.secret.expose_secret(),
            response: token.as_ref(),
            remoteip: remote_ip,
        };
        let outcome: SiteVerifyResponse = self
            .http_client
            .post(&self.verify_url)
            .form(&request_body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !outcome.success {
            tracing::warn!(
                error_codes = ?outcome.error_codes,
                "Turnstile rejected the token"
            );
        }
        Ok(outcome.success)
    }
}

#[derive(serde::Serialize)]
struct SiteVerifyRequest<'a> {
    secret: &'a str,
    response: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    remoteip: Option<&'a str>,
}

#[derive(serde::Deserialize)]
struct SiteVerifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}
