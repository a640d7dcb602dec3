//! Intake bot - guided applicant intake over Telegram
//!
//! Collects an applicant's name, positions, résumé and contacts through a
//! step-by-step chat form, then records consented submissions to a CSV log and
//! a Google Sheet and notifies a reviewer.

mod config;
mod google;
mod phrases;
mod runtime;
mod sinks;
mod state_machine;
mod telegram;

use config::Config;
use google::{DriveUploader, GoogleSheetsSink, ServiceAccountAuth, ServiceAccountKey};
use phrases::Phrases;
use runtime::{Collaborators, FinalizePipeline, InMemorySessionStore, ProductionManager};
use sinks::CsvFileSink;
use state_machine::FormContext;
use std::sync::Arc;
use telegram::TelegramTransport;
use teloxide::Bot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional .env for local runs
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intake_bot=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = Config::from_env()?;
    tracing::info!(config = ?config, "Loaded configuration");

    let credentials_path = config.write_credentials()?;
    let key = ServiceAccountKey::from_file(credentials_path)?;

    let http = google::http_client()?;
    let auth = Arc::new(ServiceAccountAuth::new(key, http.clone())?);
    tracing::info!(account = %auth.client_email(), "Google service account loaded");

    let phrases = Phrases::for_locale(config.locale);
    let bot = Bot::new(&config.bot_token);
    let transport = Arc::new(TelegramTransport::new(bot.clone()));

    let uploader = DriveUploader::new(
        http.clone(),
        auth.clone(),
        config.drive_folder_id.clone(),
        transport.clone(),
    );
    let file_sink = CsvFileSink::new(config.log_path.clone(), phrases.sheet_header)
        .with_byte_order_mark(phrases.log_byte_order_mark);
    tracing::info!(path = %file_sink.path().display(), "Local submission log");
    let sheet_sink = GoogleSheetsSink::new(
        http,
        auth,
        config.spreadsheet_id.clone(),
        config.worksheet.clone(),
    );

    let pipeline = FinalizePipeline::new(
        phrases,
        config.reviewer,
        Collaborators {
            uploader: Arc::new(uploader),
            file_sink: Arc::new(file_sink),
            sheet_sink: Arc::new(sheet_sink),
            notifier: transport.clone(),
            transport: transport.clone(),
        },
    );

    let manager: Arc<ProductionManager> = Arc::new(
        ProductionManager::new(
            &FormContext::new(phrases),
            Arc::new(InMemorySessionStore::new()),
            transport,
            Arc::new(pipeline),
        )
        .with_idle_timeout(config.worker_idle_timeout),
    );

    tracing::info!(locale = %config.locale, reviewer = %config.reviewer, "Intake bot starting");
    telegram::run_dispatcher(bot, manager).await;

    Ok(())
}
