use contact_relay::configuration::{get_configuration, Settings};
use contact_relay::startup::Application;
use contact_relay::telemetry::{get_subscriber, init_subscriber};
use once_cell::sync::Lazy;
use secrecy::Secret;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Ensure that the `tracing` stack is only initialised once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub const TURNSTILE_PATH: &str = "/turnstile/v0/siteverify";
pub const TURNSTILE_SECRET: &str = "test-turnstile-secret";

pub struct TestApp {
    pub address: String,
    pub allowed_origin: String,
    pub turnstile_server: MockServer,
    pub smtp_server: FakeSmtpServer,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn post_contact(&self, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(&self.address)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_raw(&self, body: &'static str) -> reqwest::Response {
        self.api_client
            .post(&self.address)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn mock_turnstile_outcome(&self, success: bool) {
        Mock::given(path(TURNSTILE_PATH))
            .and(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "success": success })),
            )
            .mount(&self.turnstile_server)
            .await;
    }
}

pub fn valid_submission() -> serde_json::Value {
    serde_json::json!({
        "name": "Ana",
        "email": "ana@example.com",
        "message": "Hello",
        "token": "tok123"
    })
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Spawn the application with test doubles wired in, letting the caller
/// adjust the settings last.
pub async fn spawn_app_with(customise: impl FnOnce(&mut Settings)) -> TestApp {
    Lazy::force(&TRACING);

    let turnstile_server = MockServer::start().await;
    let smtp_server = FakeSmtpServer::start().await;

    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        // Use a random OS port
        c.application.host = "127.0.0.1".into();
        c.application.port = 0;
        c.turnstile.verify_url = format!("{}{}", turnstile_server.uri(), TURNSTILE_PATH);
        c.turnstile.secret = Secret::new(TURNSTILE_SECRET.to_string());
        c.turnstile.timeout_milliseconds = 2000;
        c.email_client.host = "127.0.0.1".into();
        c.email_client.port = smtp_server.port;
        c.email_client.implicit_tls = false;
        c.email_client.timeout_milliseconds = 2000;
        customise(&mut c);
        c
    };

    let application = Application::build(configuration.clone())
        .await
        .expect("Failed to build application.");
    let address = format!("http://127.0.0.1:{}", application.port());
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address,
        allowed_origin: configuration.application.allowed_origin,
        turnstile_server,
        smtp_server,
        api_client: reqwest::Client::new(),
    }
}

/// A port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Just enough of an SMTP server to accept mail from the application and keep
/// every DATA payload for inspection.
pub struct FakeSmtpServer {
    pub port: u16,
    messages: Arc<Mutex<Vec<String>>>,
}

impl FakeSmtpServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake SMTP server");
        let port = listener.local_addr().unwrap().port();
        let messages = Arc::new(Mutex::new(Vec::new()));

        let store = messages.clone();
        let _ = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let store = store.clone();
                let _ = tokio::spawn(async move {
                    let _ = serve_session(stream, store).await;
                });
            }
        });

        Self { port, messages }
    }

    pub fn received_messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

async fn serve_session(stream: TcpStream, store: Arc<Mutex<Vec<String>>>) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    writer.write_all(b"220 fake.smtp ESMTP ready\r\n").await?;
    while let Some(line) = lines.next_line().await? {
        let command = line.to_ascii_uppercase();
        if command.starts_with("EHLO") {
            writer
                .write_all(b"250-fake.smtp\r\n250 AUTH PLAIN LOGIN\r\n")
                .await?;
        } else if command.starts_with("AUTH") {
            writer
                .write_all(b"235 2.7.0 Authentication successful\r\n")
                .await?;
        } else if command == "DATA" {
            writer
                .write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n")
                .await?;
            let mut data = String::new();
            while let Some(line) = lines.next_line().await? {
                if line == "." {
                    break;
                }
                data.push_str(&line);
                data.push('\n');
            }
            store.lock().unwrap().push(data);
            writer.write_all(b"250 2.0.0 Ok: queued\r\n").await?;
        } else if command.starts_with("QUIT") {
            writer.write_all(b"221 2.0.0 Bye\r\n").await?;
            break;
        } else {
            writer.write_all(b"250 2.0.0 Ok\r\n").await?;
        }
    }
    Ok(())
}
