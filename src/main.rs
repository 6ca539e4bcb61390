use clap::{Parser, Subcommand, ValueEnum};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use wolfram_slack_bot::app;
use wolfram_slack_bot::application::errors::BotError;
use wolfram_slack_bot::domain::traits::{Bot, EventSink};
use wolfram_slack_bot::infrastructure::adapters::{ConsoleAdapter, SlackAdapter};
use wolfram_slack_bot::infrastructure::config::{Config, Credentials};
use wolfram_slack_bot::infrastructure::events::{StdoutSink, TracingSink};

#[derive(Parser)]
#[command(name = "wolfram-slack-bot")]
#[command(about = "Answers chat questions with Wit.ai and Wolfram|Alpha", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file path (used if it exists)
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Where command events are written
    #[arg(long, value_enum, default_value_t = EventSinkKind::Tracing)]
    event_sink: EventSinkKind,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Slack and answer questions
    Run,
    /// Answer questions typed on stdin (no Slack needed)
    Console,
    /// Validate settings and required environment variables
    CheckConfig,
    /// Print the default settings file
    InitConfig,
    /// Show version
    Version,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EventSinkKind {
    Tracing,
    Stdout,
}

fn main() -> ExitCode {
    // Load .env before anything reads the environment
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    if let Err(e) = dotenv {
        tracing::debug!(".env not loaded: {} (using process environment)", e);
    }

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => run_bot(&cli, true),
        Commands::Console => run_bot(&cli, false),
        Commands::CheckConfig => check_config(&cli),
        Commands::InitConfig => init_config(),
        Commands::Version => {
            println!("wolfram-slack-bot v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load(cli: &Cli, slack: bool) -> Result<(Config, Credentials), BotError> {
    let config = Config::load_or_default(&cli.config)?.with_env_overrides();
    let credentials = Credentials::from_env(slack)?;
    Ok((config, credentials))
}

fn check_config(cli: &Cli) -> Result<(), BotError> {
    let (config, _) = load(cli, true)?;
    println!("Configuration OK (command: `{}`)", config.bot.command);
    Ok(())
}

fn init_config() -> Result<(), BotError> {
    let yaml = serde_yaml::to_string(&Config::default())
        .map_err(|e| BotError::Internal(e.to_string()))?;
    println!("{}", yaml);
    println!("\nSave this to config.yaml and adjust as needed.");
    Ok(())
}

fn run_bot(cli: &Cli, slack: bool) -> Result<(), BotError> {
    let (config, credentials) = load(cli, slack)?;
    tracing::info!("Starting {}", config.bot.name);

    let sink: Arc<dyn EventSink> = match cli.event_sink {
        EventSinkKind::Tracing => Arc::new(TracingSink),
        EventSinkKind::Stdout => Arc::new(StdoutSink),
    };

    let rt = tokio::runtime::Runtime::new().map_err(|e| BotError::Internal(e.to_string()))?;
    let result = rt.block_on(async {
        let http = app::http_client(&config)?;
        let cancel = CancellationToken::new();

        let shutdown = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl-C, shutting down");
                shutdown.cancel();
            }
        });

        match credentials.slack.clone() {
            Some(tokens) => {
                let mut adapter = SlackAdapter::new(tokens).with_client(http.clone());
                adapter.fetch_bot_info().await?;
                tracing::info!("Bot started: @{}", adapter.bot_info().name);

                let adapter = Arc::new(adapter);
                let listener = adapter.clone();
                app::serve(&config, &credentials, http, adapter, sink, cancel, move |tx, cancel| async move {
                    listener.listen(tx, cancel).await
                })
                .await?;
            }
            None => {
                let adapter = Arc::new(ConsoleAdapter::new());
                let listener = adapter.clone();
                app::serve(&config, &credentials, http, adapter, sink, cancel, move |tx, cancel| async move {
                    listener.listen(tx, cancel).await
                })
                .await?;
            }
        }
        Ok(())
    });

    // stdin reads sit on a blocking thread that would otherwise hold shutdown
    rt.shutdown_timeout(Duration::from_millis(500));
    result
}
