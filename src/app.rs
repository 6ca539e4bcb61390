//! Wiring - Builds the command dispatcher and serves a platform adapter

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::errors::BotError;
use crate::application::messaging::CommandDispatcher;
use crate::application::runtime::{BotRuntime, RunSummary};
use crate::application::services::query_service::DEFAULT_QUERY_PARAM;
use crate::application::services::{EventLogger, QueryService};
use crate::domain::entities::{CommandDefinition, CommandEvent, CommandPattern, InboundMessage};
use crate::domain::traits::{Bot, EventSink};
use crate::infrastructure::config::{Config, Credentials};
use crate::infrastructure::knowledge::WolframClient;
use crate::infrastructure::nlu::WitClient;

/// Capacity of the adapter → runtime message queue
const INBOUND_QUEUE: usize = 64;

/// HTTP client shared by all outbound API calls
pub fn http_client(config: &Config) -> Result<reqwest::Client, BotError> {
    reqwest::Client::builder()
        .timeout(config.request_timeout())
        .user_agent(concat!("wolfram-slack-bot/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| BotError::Internal(e.to_string()))
}

/// Build the query command and its dispatcher
pub fn build_dispatcher(
    config: &Config,
    credentials: &Credentials,
    http: reqwest::Client,
    events: Option<mpsc::UnboundedSender<CommandEvent>>,
) -> CommandDispatcher {
    let nlu = WitClient::new(&credentials.wit_ai_token)
        .with_client(http.clone())
        .with_base_url(&config.wit.api_base)
        .with_version(&config.wit.api_version);
    let knowledge = WolframClient::new(&credentials.wolfram_app_id)
        .with_client(http)
        .with_base_url(&config.wolfram.api_base);

    let param = CommandPattern::parse(&config.bot.command)
        .params()
        .last()
        .map(|p| p.to_string())
        .unwrap_or_else(|| DEFAULT_QUERY_PARAM.to_string());

    let service = QueryService::new(Arc::new(nlu), Arc::new(knowledge))
        .with_units(config.wolfram.units)
        .with_timeout(config.wolfram.timeout)
        .with_param(param);

    let mut dispatcher = match events {
        Some(events) => CommandDispatcher::new().with_events(events),
        None => CommandDispatcher::new(),
    };
    dispatcher.register_command(
        CommandDefinition::new(&config.bot.command, Arc::new(service))
            .with_description(&config.bot.description)
            .with_example(&config.bot.example),
    );
    dispatcher
}

/// Run the bot on `bot` until the adapter stops or `cancel` fires.
///
/// `listen` receives the inbound queue and must feed it until it returns.
pub async fn serve<F, Fut>(
    config: &Config,
    credentials: &Credentials,
    http: reqwest::Client,
    bot: Arc<dyn Bot>,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
    listen: F,
) -> Result<RunSummary, BotError>
where
    F: FnOnce(mpsc::Sender<InboundMessage>, CancellationToken) -> Fut,
    Fut: std::future::Future<Output = Result<(), BotError>> + Send + 'static,
{
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let logger = EventLogger::new(sink).spawn(event_rx, cancel.clone());

    let dispatcher = build_dispatcher(config, credentials, http, Some(event_tx));
    tracing::info!("Registered {} command(s)", dispatcher.commands().len());

    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);
    let listener: JoinHandle<Result<(), BotError>> =
        tokio::spawn(listen(inbound_tx, cancel.clone()));

    let runtime = BotRuntime::new(bot, Arc::new(dispatcher)).with_shutdown_grace(config.shutdown_grace());
    let summary = runtime.run(inbound_rx, cancel.clone()).await;

    // stop the listener and logger even when the feed closed on its own
    cancel.cancel();
    let listened = listener
        .await
        .map_err(|e| BotError::Internal(format!("listener task failed: {}", e)))?;
    if let Ok(written) = logger.await {
        tracing::debug!("Logged {} command events", written);
    }

    tracing::info!(
        "Stopped: {} received, {} completed, {} aborted",
        summary.received,
        summary.completed,
        summary.aborted
    );
    listened.map(|()| summary)
}
