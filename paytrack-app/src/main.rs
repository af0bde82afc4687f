//! # Paytrack Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize tracing
//! - Initialize the repository adapter
//! - Create the auth and payment services plus the mail worker
//! - Start the HTTP server

mod config;
mod telemetry;

use std::sync::Arc;

use paytrack_hex::inbound::HttpServer;
use paytrack_hex::{AuthService, LogMailer, MailOutbox, MailWorker, PaymentService, TokenService};
use paytrack_repo::build_repo;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = config::Config::from_env()?;
    let telemetry = telemetry::init(config.log_format, config.otel_endpoint.as_deref())?;

    tracing::info!("Starting paytrack server on {}", config.server_addr);

    // Build repository (handles connection, migration and seeding)
    let repo = Arc::new(build_repo(&config.database_url).await?);
    tracing::info!(backend = repo.backend(), "Repository ready");

    let tokens = TokenService::new(&config.jwt_secret, config.jwt_expiration);
    let (outbox, mail_rx) = MailOutbox::channel(config.mail_queue_capacity);
    let auth = AuthService::new(repo.clone(), tokens, outbox);
    let payments = PaymentService::new(repo);

    let server = HttpServer::with_config(auth, payments, config.server_config());

    let mailer = Arc::new(LogMailer::new(config.reset_url_base.clone()));
    let mail_worker = tokio::spawn(MailWorker::new(mailer, mail_rx).run(server.subscribe_shutdown()));

    server.run(&config.server_addr).await?;

    if let Err(e) = mail_worker.await {
        tracing::warn!("Mail worker ended abnormally: {}", e);
    }

    // Ensure traces are flushed before exit
    telemetry.shutdown();
    Ok(())
}
