use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::http::Method;
use actix_web::web::Data;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tracing_actix_web::TracingLogger;

use crate::configuration::Settings;
use crate::email_client::{EmailClient, SmtpRelay};
use crate::routes;
use crate::turnstile_client::TurnstileClient;

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(configuration: Settings) -> Result<Self, anyhow::Error> {
        let email_settings = configuration.email_client;
        let sender = email_settings
            .sender()
            .context("Invalid sender email address in configuration")?;
        let recipient = email_settings
            .recipient()
            .context("Invalid recipient email address in configuration")?;
        let timeout = email_settings.timeout();
        let email_client = EmailClient::new(
            SmtpRelay {
                host: email_settings.host,
                port: email_settings.port,
                implicit_tls: email_settings.implicit_tls,
                username: email_settings.username,
                password: email_settings.password,
            },
            sender,
            recipient,
            timeout,
        );

        let turnstile_timeout = configuration.turnstile.timeout();
        let turnstile_client = TurnstileClient::new(
            configuration.turnstile.verify_url,
            configuration.turnstile.secret,
            turnstile_timeout,
        );

        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );
        let listener = TcpListener::bind(&address)
            .with_context(|| format!("Failed to bind {}", address))?;
        let port = listener.local_addr()?.port();
        let server = run(
            listener,
            turnstile_client,
            email_client,
            configuration.application.allowed_origin,
        )?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

/// The frontend origin allowed to call us cross-origin.
pub struct AllowedOrigin(pub String);

pub fn run(
    listener: TcpListener,
    turnstile_client: TurnstileClient,
    email_client: EmailClient,
    allowed_origin: String,
) -> Result<Server, std::io::Error> {
    let turnstile_client = Data::new(turnstile_client);
    let email_client = Data::new(email_client);
    let allowed_origin = Data::new(AllowedOrigin(allowed_origin));
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            // Every path is the contact endpoint.
            .service(
                web::resource("/{path:.*}")
                    .route(web::method(Method::OPTIONS).to(routes::preflight))
                    .route(web::post().to(routes::submit_contact))
                    .default_service(web::to(routes::method_not_allowed)),
            )
            .app_data(turnstile_client.clone())
            .app_data(email_client.clone())
            .app_data(allowed_origin.clone())
    })
    .listen(listener)?
    .run();
    Ok(server)
}
