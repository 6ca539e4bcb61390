//! Bot runtime - Feeds inbound messages to the dispatcher, one task per request

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::application::messaging::CommandDispatcher;
use crate::domain::entities::InboundMessage;
use crate::domain::traits::{Bot, ReplyTarget};

/// Default time in-flight requests get to finish after shutdown is requested
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// What happened during one `BotRuntime::run`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub received: usize,
    pub completed: usize,
    pub aborted: usize,
}

pub struct BotRuntime {
    bot: Arc<dyn Bot>,
    dispatcher: Arc<CommandDispatcher>,
    shutdown_grace: Duration,
}

impl BotRuntime {
    pub fn new(bot: Arc<dyn Bot>, dispatcher: Arc<CommandDispatcher>) -> Self {
        Self {
            bot,
            dispatcher,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Serve messages until the feed closes or `cancel` fires.
    ///
    /// Intake stops immediately on cancellation. Requests already running
    /// get `shutdown_grace` to finish and are aborted after that. When the
    /// feed closes on its own every request runs to completion.
    pub async fn run(
        &self,
        mut inbound: mpsc::Receiver<InboundMessage>,
        cancel: CancellationToken,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut tasks = JoinSet::new();
        let mut cancelled = false;

        tracing::info!("Starting message loop...");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Shutdown requested, no longer accepting messages");
                    cancelled = true;
                    break;
                }
                message = inbound.recv() => match message {
                    Some(message) => {
                        summary.received += 1;
                        tasks.spawn(handle_message(
                            self.bot.clone(),
                            self.dispatcher.clone(),
                            message,
                        ));
                    }
                    None => {
                        tracing::info!("Message feed closed");
                        break;
                    }
                },
                Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                    summary.completed += 1;
                    log_join(result);
                }
            }
        }

        if !cancelled {
            while let Some(result) = tasks.join_next().await {
                summary.completed += 1;
                log_join(result);
            }
            return summary;
        }

        if !tasks.is_empty() {
            tracing::info!("Waiting up to {:?} for {} in-flight requests", self.shutdown_grace, tasks.len());
        }

        let drain = async {
            while let Some(result) = tasks.join_next().await {
                summary.completed += 1;
                log_join(result);
            }
        };
        if tokio::time::timeout(self.shutdown_grace, drain).await.is_err() {
            summary.aborted = tasks.len();
            tracing::warn!("Aborting {} requests still running after grace period", summary.aborted);
            tasks.shutdown().await;
        }

        summary
    }
}

async fn handle_message(bot: Arc<dyn Bot>, dispatcher: Arc<CommandDispatcher>, message: InboundMessage) {
    let target = ReplyTarget::from(&message);
    let Some(answer) = dispatcher.dispatch(message).await else {
        return;
    };

    tracing::info!(
        "Sending response to channel {}: {}",
        target.channel,
        answer.text.chars().take(100).collect::<String>()
    );
    if let Err(e) = bot.reply(&target, &answer.text).await {
        tracing::error!("Failed to send message: {}", e);
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!("Request handler panicked: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::BotError;
    use crate::domain::entities::{Answer, CommandDefinition};
    use crate::domain::traits::{BotInfo, CommandHandler, CommandRequest};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBot {
        replies: Mutex<Vec<(String, String)>>,
    }

    impl RecordingBot {
        fn replies(&self) -> Vec<(String, String)> {
            self.replies.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Bot for RecordingBot {
        async fn reply(&self, target: &ReplyTarget, text: &str) -> Result<(), BotError> {
            if target.channel == "broken" {
                return Err(BotError::Network("channel_not_found".to_string()));
            }
            self.replies
                .lock()
                .unwrap()
                .push((target.channel.clone(), text.to_string()));
            Ok(())
        }

        fn bot_info(&self) -> BotInfo {
            BotInfo {
                id: "test".to_string(),
                name: "test".to_string(),
            }
        }
    }

    /// Sleeps for the number of milliseconds given, panics on "boom"
    struct Sleepy;

    #[async_trait]
    impl CommandHandler for Sleepy {
        async fn handle(&self, request: CommandRequest) -> Answer {
            let arg = request.param("message").unwrap_or_default().to_string();
            if arg == "boom" {
                panic!("handler blew up");
            }
            let ms: u64 = arg.parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Answer::new(format!("slept {}", ms))
        }
    }

    fn runtime(bot: Arc<RecordingBot>, grace: Duration) -> BotRuntime {
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register_command(CommandDefinition::new("query - <message>", Arc::new(Sleepy)));
        BotRuntime::new(bot, Arc::new(dispatcher)).with_shutdown_grace(grace)
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_loop() {
        let bot = Arc::new(RecordingBot::default());
        let runtime = runtime(bot.clone(), Duration::from_secs(5));
        let (tx, rx) = mpsc::channel(8);

        tx.send(InboundMessage::new("C1", "query - boom")).await.unwrap();
        tx.send(InboundMessage::new("broken", "query - 0")).await.unwrap();
        tx.send(InboundMessage::new("C1", "not a command")).await.unwrap();
        tx.send(InboundMessage::new("C2", "query - 0")).await.unwrap();
        drop(tx);

        let summary = runtime.run(rx, CancellationToken::new()).await;

        assert_eq!(summary.received, 4);
        assert_eq!(summary.completed, 4);
        assert_eq!(summary.aborted, 0);
        assert_eq!(bot.replies(), vec![("C2".to_string(), "slept 0".to_string())]);
    }

    #[tokio::test]
    async fn test_requests_run_concurrently() {
        let bot = Arc::new(RecordingBot::default());
        let runtime = runtime(bot.clone(), Duration::from_secs(5));
        let (tx, rx) = mpsc::channel(8);

        tx.send(InboundMessage::new("slow", "query - 200")).await.unwrap();
        tx.send(InboundMessage::new("fast", "query - 1")).await.unwrap();
        drop(tx);

        runtime.run(rx, CancellationToken::new()).await;

        let channels: Vec<String> = bot.replies().into_iter().map(|(c, _)| c).collect();
        assert_eq!(channels, vec!["fast".to_string(), "slow".to_string()]);
    }

    #[tokio::test]
    async fn test_cancel_drains_in_flight_requests() {
        let bot = Arc::new(RecordingBot::default());
        let runtime = runtime(bot.clone(), Duration::from_secs(5));
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        tx.send(InboundMessage::new("C1", "query - 50")).await.unwrap();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let summary = runtime.run(rx, cancel).await;

        assert_eq!(summary.completed, 1);
        assert_eq!(bot.replies(), vec![("C1".to_string(), "slept 50".to_string())]);
        assert!(tx.send(InboundMessage::new("C1", "query - 0")).await.is_err());
    }

    #[tokio::test]
    async fn test_closed_feed_waits_past_grace_period() {
        let bot = Arc::new(RecordingBot::default());
        let runtime = runtime(bot.clone(), Duration::from_millis(10));
        let (tx, rx) = mpsc::channel(8);

        tx.send(InboundMessage::new("C1", "query - 100")).await.unwrap();
        drop(tx);

        let summary = runtime.run(rx, CancellationToken::new()).await;

        assert_eq!(summary.received, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.aborted, 0);
        assert_eq!(bot.replies(), vec![("C1".to_string(), "slept 100".to_string())]);
    }

    #[tokio::test]
    async fn test_cancel_aborts_after_grace_period() {
        let bot = Arc::new(RecordingBot::default());
        let runtime = runtime(bot.clone(), Duration::from_millis(20));
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        tx.send(InboundMessage::new("C1", "query - 60000")).await.unwrap();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let summary = runtime.run(rx, cancel).await;

        assert_eq!(summary.received, 1);
        assert_eq!(summary.aborted, 1);
        assert!(bot.replies().is_empty());
    }
}
