//! Slack adapter - Socket Mode intake, Web API replies

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;

use crate::application::errors::BotError;
use crate::domain::entities::InboundMessage;
use crate::domain::traits::{Bot, BotInfo, ReplyTarget};
use crate::infrastructure::config::SlackTokens;

/// Slack Web API base URL
const API_BASE: &str = "https://slack.com/api";

/// Delay before reopening a dropped Socket Mode connection
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Socket Mode envelope
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub envelope_id: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub reason: Option<String>,
}

/// The parts of an Events API event we care about
#[derive(Debug, Clone, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub subtype: Option<String>,
    pub bot_id: Option<String>,
    pub user: Option<String>,
    pub text: Option<String>,
    pub channel: Option<String>,
    pub channel_type: Option<String>,
    pub ts: Option<String>,
    pub thread_ts: Option<String>,
}

/// Common shape of Web API responses
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    error: Option<String>,
    url: Option<String>,
    user_id: Option<String>,
    user: Option<String>,
}

/// What the socket loop should do after an envelope
#[derive(Debug, PartialEq, Eq)]
enum Control {
    Continue,
    Reconnect,
}

/// How a Socket Mode connection ended
#[derive(Debug, PartialEq, Eq)]
enum Closed {
    /// Slack sent a `disconnect` envelope and expects a new connection
    Requested,
    /// The socket closed or the stream ended without notice
    Dropped,
    Cancelled,
}

/// Slack bot adapter
pub struct SlackAdapter {
    tokens: SlackTokens,
    client: Client,
    base: String,
    info: BotInfo,
}

impl SlackAdapter {
    pub fn new(tokens: SlackTokens) -> Self {
        Self {
            tokens,
            client: Client::new(),
            base: API_BASE.to_string(),
            info: BotInfo {
                id: "unknown".to_string(),
                name: "wolfram-slack-bot".to_string(),
            },
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/{}", self.base.trim_end_matches('/'), method)
    }

    async fn call(&self, method: &str, token: &str, body: serde_json::Value) -> Result<ApiResponse, BotError> {
        let response = self
            .client
            .post(self.api_url(method))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BotError::Network(format!("Slack API error: {}", response.status())));
        }

        let data: ApiResponse = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))?;

        if !data.ok {
            let error = data.error.unwrap_or_else(|| "unknown_error".to_string());
            return Err(match error.as_str() {
                "invalid_auth" | "not_authed" | "account_inactive" | "token_revoked" => {
                    BotError::Auth(error)
                }
                _ => BotError::Network(format!("{} failed: {}", method, error)),
            });
        }

        Ok(data)
    }

    /// Fetch bot identity with `auth.test`
    pub async fn fetch_bot_info(&mut self) -> Result<(), BotError> {
        let data = self
            .call("auth.test", &self.tokens.bot_token, serde_json::json!({}))
            .await?;

        self.info = BotInfo {
            id: data.user_id.unwrap_or_else(|| "unknown".to_string()),
            name: data.user.unwrap_or_else(|| self.info.name.clone()),
        };
        Ok(())
    }

    /// Ask Slack for a Socket Mode WebSocket URL
    pub async fn open_connection(&self) -> Result<String, BotError> {
        let data = self
            .call("apps.connections.open", &self.tokens.app_token, serde_json::json!({}))
            .await?;

        data.url
            .ok_or_else(|| BotError::Parse("apps.connections.open returned no url".to_string()))
    }

    /// Receive messages over Socket Mode until `cancel` fires.
    ///
    /// Connections Slack asks to refresh are reopened at once. Dropped or
    /// failed connections are reopened after `RECONNECT_DELAY`. Only
    /// authentication failures end the loop with an error.
    pub async fn listen(
        &self,
        inbound: mpsc::Sender<InboundMessage>,
        cancel: CancellationToken,
    ) -> Result<(), BotError> {
        tracing::info!("Starting Slack Socket Mode listener");

        while !cancel.is_cancelled() {
            match self.run_connection(&inbound, &cancel).await {
                Ok(Closed::Requested) | Ok(Closed::Cancelled) => continue,
                Ok(Closed::Dropped) => {
                    tracing::warn!("Socket Mode connection dropped, reconnecting in {:?}", RECONNECT_DELAY);
                }
                Err(BotError::Auth(e)) => return Err(BotError::Auth(e)),
                Err(e) => {
                    tracing::error!("Socket Mode connection failed: {}", e);
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }

        tracing::info!("Slack listener stopped");
        Ok(())
    }

    async fn run_connection(
        &self,
        inbound: &mpsc::Sender<InboundMessage>,
        cancel: &CancellationToken,
    ) -> Result<Closed, BotError> {
        let url = self.open_connection().await?;
        let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;
        tracing::info!("Connected to Slack Socket Mode");

        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = socket.close(None).await;
                    return Ok(Closed::Cancelled);
                }
                frame = socket.next() => frame,
            };

            let text = match frame {
                Some(Ok(WsMessage::Text(text))) => text,
                Some(Ok(WsMessage::Ping(data))) => {
                    socket
                        .send(WsMessage::Pong(data))
                        .await
                        .map_err(|e| BotError::Network(e.to_string()))?;
                    continue;
                }
                Some(Ok(WsMessage::Close(_))) | None => return Ok(Closed::Dropped),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(BotError::Network(e.to_string())),
            };

            let envelope: Envelope = match serde_json::from_str(&text) {
                Ok(envelope) => envelope,
                Err(e) => {
                    tracing::warn!("Ignoring unparseable Socket Mode frame: {}", e);
                    continue;
                }
            };

            if let Some(id) = &envelope.envelope_id {
                let ack = serde_json::json!({ "envelope_id": id }).to_string();
                socket
                    .send(WsMessage::Text(ack))
                    .await
                    .map_err(|e| BotError::Network(e.to_string()))?;
            }

            if self.handle_envelope(envelope, inbound).await == Control::Reconnect {
                let _ = socket.close(None).await;
                return Ok(Closed::Requested);
            }
        }
    }

    async fn handle_envelope(&self, envelope: Envelope, inbound: &mpsc::Sender<InboundMessage>) -> Control {
        match envelope.kind.as_str() {
            "hello" => {
                tracing::debug!("Socket Mode hello received");
                Control::Continue
            }
            "disconnect" => {
                tracing::info!(
                    "Slack requested disconnect: {}",
                    envelope.reason.as_deref().unwrap_or("unknown")
                );
                Control::Reconnect
            }
            "events_api" => {
                if let Some(message) = envelope.payload.as_ref().and_then(|p| self.to_message(p)) {
                    if inbound.send(message).await.is_err() {
                        tracing::warn!("Runtime stopped, dropping inbound message");
                    }
                }
                Control::Continue
            }
            other => {
                tracing::debug!("Ignoring {} envelope", other);
                Control::Continue
            }
        }
    }

    /// Turn an Events API payload into an inbound message.
    ///
    /// Channel traffic arrives as `app_mention`; plain `message` events are
    /// only taken from direct messages so a mention is not handled twice.
    pub fn to_message(&self, payload: &serde_json::Value) -> Option<InboundMessage> {
        let raw = payload.get("event")?.clone();
        let event: SlackEvent = serde_json::from_value(raw.clone()).ok()?;

        if event.subtype.is_some() || event.bot_id.is_some() {
            return None;
        }
        if event.user.as_deref() == Some(self.info.id.as_str()) {
            return None;
        }
        match event.kind.as_str() {
            "app_mention" => {}
            "message" if event.channel_type.as_deref() == Some("im") => {}
            _ => return None,
        }

        let mut message = InboundMessage::new(event.channel?, unescape(event.text.as_deref()?))
            .with_platform("slack")
            .with_raw(raw);
        if let Some(user) = event.user {
            message = message.with_user(user);
        }
        if let Some(thread_ts) = event.thread_ts {
            message = message.with_thread(thread_ts);
        }
        Some(message)
    }
}

/// Undo Slack's `&`, `<` and `>` escaping
fn unescape(text: &str) -> String {
    text.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&")
}

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
}

#[async_trait]
impl Bot for SlackAdapter {
    async fn reply(&self, target: &ReplyTarget, text: &str) -> Result<(), BotError> {
        tracing::debug!("Sending to {}: {}", target.channel, text);

        let request = PostMessageRequest {
            channel: &target.channel,
            text,
            thread_ts: target.thread_ts.as_deref(),
        };
        let body = serde_json::to_value(&request).map_err(|e| BotError::Internal(e.to_string()))?;

        self.call("chat.postMessage", &self.tokens.bot_token, body).await?;
        Ok(())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    fn adapter() -> SlackAdapter {
        SlackAdapter::new(SlackTokens {
            bot_token: "xoxb-test".to_string(),
            app_token: "xapp-test".to_string(),
        })
    }

    fn payload(event: serde_json::Value) -> serde_json::Value {
        json!({ "type": "event_callback", "event": event })
    }

    #[test]
    fn test_app_mention_becomes_message() {
        let message = adapter()
            .to_message(&payload(json!({
                "type": "app_mention",
                "user": "U1",
                "text": "<@UBOT> query - is 3 &lt; 4 &amp;&amp; 4 &gt; 3?",
                "channel": "C1",
                "ts": "1700000000.000100",
                "thread_ts": "1700000000.000001"
            })))
            .unwrap();

        assert_eq!(message.channel, "C1");
        assert_eq!(message.user.as_deref(), Some("U1"));
        assert_eq!(message.text, "<@UBOT> query - is 3 < 4 && 4 > 3?");
        assert_eq!(message.thread_ts.as_deref(), Some("1700000000.000001"));
        assert_eq!(message.platform, "slack");
        assert_eq!(message.raw.unwrap()["type"], "app_mention");
    }

    #[test]
    fn test_direct_messages_only_for_plain_message_events() {
        let slack = adapter();
        let dm = payload(json!({
            "type": "message", "channel_type": "im", "user": "U1",
            "text": "query - hi", "channel": "D1", "ts": "1.0"
        }));
        let channel = payload(json!({
            "type": "message", "channel_type": "channel", "user": "U1",
            "text": "query - hi", "channel": "C1", "ts": "1.0"
        }));

        assert!(slack.to_message(&dm).is_some());
        assert!(slack.to_message(&channel).is_none());
    }

    #[test]
    fn test_ignores_bots_and_subtypes() {
        let slack = adapter();
        let from_bot = payload(json!({
            "type": "message", "channel_type": "im", "bot_id": "B1",
            "text": "query - hi", "channel": "D1"
        }));
        let edited = payload(json!({
            "type": "message", "channel_type": "im", "subtype": "message_changed",
            "channel": "D1"
        }));

        assert!(slack.to_message(&from_bot).is_none());
        assert!(slack.to_message(&edited).is_none());
        assert!(slack.to_message(&json!({ "no": "event" })).is_none());
    }

    #[test]
    fn test_envelope_parsing() {
        let envelope: Envelope = serde_json::from_str(
            r#"{"envelope_id":"abc","type":"events_api","accepts_response_payload":false,"payload":{"event":{}}}"#,
        )
        .unwrap();
        assert_eq!(envelope.kind, "events_api");
        assert_eq!(envelope.envelope_id.as_deref(), Some("abc"));

        let disconnect: Envelope =
            serde_json::from_str(r#"{"type":"disconnect","reason":"refresh_requested"}"#).unwrap();
        assert_eq!(disconnect.reason.as_deref(), Some("refresh_requested"));
    }

    #[tokio::test]
    async fn test_envelope_handling_forwards_events() {
        let slack = adapter();
        let (tx, mut rx) = mpsc::channel(4);

        let envelope = Envelope {
            kind: "events_api".to_string(),
            envelope_id: Some("e1".to_string()),
            payload: Some(payload(json!({
                "type": "app_mention", "user": "U1", "text": "query - hi", "channel": "C1"
            }))),
            reason: None,
        };
        assert_eq!(slack.handle_envelope(envelope, &tx).await, Control::Continue);
        assert_eq!(rx.recv().await.unwrap().text, "query - hi");

        let disconnect = Envelope {
            kind: "disconnect".to_string(),
            envelope_id: None,
            payload: None,
            reason: Some("warning".to_string()),
        };
        assert_eq!(slack.handle_envelope(disconnect, &tx).await, Control::Reconnect);
    }

    #[tokio::test]
    async fn test_reply_posts_to_thread() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat.postMessage")
            .match_header("authorization", "Bearer xoxb-test")
            .match_body(Matcher::Json(json!({
                "channel": "C1",
                "text": "Bidhya Devi Bhandari",
                "thread_ts": "1.5"
            })))
            .with_status(200)
            .with_body(r#"{"ok":true,"channel":"C1","ts":"2.0"}"#)
            .create_async()
            .await;

        let slack = adapter().with_base_url(server.url());
        let target = ReplyTarget {
            channel: "C1".to_string(),
            thread_ts: Some("1.5".to_string()),
        };
        slack.reply(&target, "Bidhya Devi Bhandari").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_errors_are_mapped() {
        let mut server = Server::new_async().await;
        let _post = server
            .mock("POST", "/chat.postMessage")
            .with_status(200)
            .with_body(r#"{"ok":false,"error":"channel_not_found"}"#)
            .create_async()
            .await;
        let _open = server
            .mock("POST", "/apps.connections.open")
            .match_header("authorization", "Bearer xapp-test")
            .with_status(200)
            .with_body(r#"{"ok":false,"error":"invalid_auth"}"#)
            .create_async()
            .await;

        let slack = adapter().with_base_url(server.url());
        let err = slack.reply(&ReplyTarget::new("C404"), "hi").await.unwrap_err();
        assert!(matches!(err, BotError::Network(_)));

        let err = slack.open_connection().await.unwrap_err();
        assert!(matches!(err, BotError::Auth(_)));

        // auth failures stop the listener instead of retrying forever
        let (tx, _rx) = mpsc::channel(1);
        let result = slack.listen(tx, CancellationToken::new()).await;
        assert!(matches!(result, Err(BotError::Auth(_))));
    }

    #[tokio::test]
    async fn test_open_connection_and_bot_info() {
        let mut server = Server::new_async().await;
        let _open = server
            .mock("POST", "/apps.connections.open")
            .with_status(200)
            .with_body(r#"{"ok":true,"url":"wss://wss-primary.slack.com/link/?ticket=abc"}"#)
            .create_async()
            .await;
        let _auth = server
            .mock("POST", "/auth.test")
            .match_header("authorization", "Bearer xoxb-test")
            .with_status(200)
            .with_body(r#"{"ok":true,"user":"wolfy","user_id":"UBOT","team":"T"}"#)
            .create_async()
            .await;

        let mut slack = adapter().with_base_url(server.url());
        assert_eq!(
            slack.open_connection().await.unwrap(),
            "wss://wss-primary.slack.com/link/?ticket=abc"
        );

        slack.fetch_bot_info().await.unwrap();
        assert_eq!(slack.bot_info().id, "UBOT");
        assert_eq!(slack.bot_info().name, "wolfy");

        // the bot's own messages are ignored once its id is known
        let own = payload(json!({
            "type": "app_mention", "user": "UBOT", "text": "query - hi", "channel": "C1"
        }));
        assert!(slack.to_message(&own).is_none());
    }

    /// Local Socket Mode endpoint counting accepted connections. With
    /// `disconnect_first` the first connection asks for a refresh and later
    /// ones stay open; otherwise every connection is closed by the server.
    async fn socket_server(disconnect_first: bool) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/", listener.local_addr().unwrap());
        let accepted = Arc::new(AtomicUsize::new(0));

        let counter = accepted.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let index = counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    if !disconnect_first {
                        let _ = ws.close(None).await;
                    } else if index == 0 {
                        let disconnect = json!({ "type": "disconnect", "reason": "refresh_requested" });
                        let _ = ws.send(WsMessage::Text(disconnect.to_string())).await;
                    }
                    while let Some(Ok(_)) = ws.next().await {}
                });
            }
        });

        (url, accepted)
    }

    async fn listen_for(slack: SlackAdapter, window: Duration) -> Result<(), BotError> {
        let (tx, _rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            trigger.cancel();
        });
        slack.listen(tx, cancel).await
    }

    #[tokio::test]
    async fn test_dropped_connection_waits_before_reconnecting() {
        let (ws_url, accepted) = socket_server(false).await;
        let mut server = Server::new_async().await;
        let _open = server
            .mock("POST", "/apps.connections.open")
            .with_status(200)
            .with_body(json!({ "ok": true, "url": ws_url }).to_string())
            .create_async()
            .await;

        let slack = adapter().with_base_url(server.url());
        listen_for(slack, Duration::from_millis(500)).await.unwrap();

        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_requested_disconnect_reconnects_at_once() {
        let (ws_url, accepted) = socket_server(true).await;
        let mut server = Server::new_async().await;
        let _open = server
            .mock("POST", "/apps.connections.open")
            .with_status(200)
            .with_body(json!({ "ok": true, "url": ws_url }).to_string())
            .create_async()
            .await;

        let slack = adapter().with_base_url(server.url());
        listen_for(slack, Duration::from_millis(500)).await.unwrap();

        assert_eq!(accepted.load(Ordering::SeqCst), 2);
    }
}
