//! Socket ownership: one supervisor task per [`connect`](crate::TradingSocketClient::connect)
//! drives the socket, the heartbeat and the linear-backoff reconnect loop.

use crate::{client::TradingSocketClient, config::ClientConfig, error::ClientError};
use futures::{SinkExt, StreamExt};
use std::pin::pin;
use tokio::{
    net::TcpStream,
    sync::mpsc,
    time::{Instant, MissedTickBehavior},
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        Message,
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};
use tracing::{debug, info, warn};

/// Convenient type alias for the venue WebSocket.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Instructions from the client API to the supervisor task.
#[derive(Debug)]
pub(crate) enum Command {
    Send(String),
    Close,
}

/// How a socket session ended.
#[derive(Debug)]
enum SessionEnd {
    /// The client asked to disconnect.
    Requested,
    /// The venue closed with the normal close code.
    Clean,
    /// Anything else. Triggers reconnection.
    Unclean(String),
}

/// Open the venue socket within the configured connect timeout.
pub(crate) async fn open(config: &ClientConfig) -> Result<WsStream, ClientError> {
    let url = config.url_with_app_id();
    debug!(%url, "opening venue socket");

    match tokio::time::timeout(config.connect_timeout, connect_async(url.as_str())).await {
        Ok(Ok((websocket, _response))) => Ok(websocket),
        Ok(Err(error)) => Err(ClientError::Transport(format!(
            "failed to connect to {}: {error}",
            config.endpoint
        ))),
        Err(_) => Err(ClientError::Transport(format!(
            "connection to {} timed out after {:?}",
            config.endpoint, config.connect_timeout
        ))),
    }
}

/// Supervise the socket opened by `connect` until the client disconnects, the venue closes
/// cleanly, or the reconnect budget is exhausted.
pub(crate) async fn run(
    client: TradingSocketClient,
    mut websocket: WsStream,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut session: u64,
) {
    loop {
        match run_session(&client, websocket, &mut commands, session).await {
            SessionEnd::Requested => {
                debug!(session, "socket closed on request");
                return;
            }
            SessionEnd::Clean => {
                info!(session, "venue closed the connection cleanly");
                client.on_closed(session);
                return;
            }
            SessionEnd::Unclean(reason) => {
                if !client.on_connection_lost(session, reason) {
                    return;
                }
            }
        }

        match reconnect(&client, &mut commands, session).await {
            Some((reopened, next_session)) => {
                websocket = reopened;
                session = next_session;
                client.activate(session);
            }
            None => return,
        }
    }
}

async fn run_session(
    client: &TradingSocketClient,
    websocket: WsStream,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    session: u64,
) -> SessionEnd {
    let config = client.config();
    let (mut sink, mut stream) = websocket.split();

    let mut heartbeat = tokio::time::interval_at(
        Instant::now() + config.heartbeat_interval,
        config.heartbeat_interval,
    );
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Send(text)) => {
                    if config.debug {
                        debug!(session, %text, "outbound frame");
                    }
                    if let Err(error) = sink.send(Message::text(text)).await {
                        return SessionEnd::Unclean(format!("send failed: {error}"));
                    }
                }
                Some(Command::Close) | None => {
                    let close = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "client disconnect".into(),
                    };
                    if let Err(error) = sink.send(Message::Close(Some(close))).await {
                        debug!(%error, "failed to send close frame");
                    }
                    let _ = sink.close().await;
                    return SessionEnd::Requested;
                }
            },
            _ = heartbeat.tick() => {
                let Some(text) = client.heartbeat(session) else {
                    continue;
                };
                debug!(session, "sending heartbeat");
                if let Err(error) = sink.send(Message::text(text)).await {
                    return SessionEnd::Unclean(format!("heartbeat send failed: {error}"));
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => client.handle_frame(session, text.as_str()),
                Some(Ok(Message::Close(frame))) => {
                    return match frame {
                        Some(frame) if frame.code == CloseCode::Normal => SessionEnd::Clean,
                        Some(frame) => SessionEnd::Unclean(format!(
                            "venue closed with code {}: {}",
                            u16::from(frame.code),
                            frame.reason.as_str()
                        )),
                        None => SessionEnd::Unclean("venue closed without a close code".to_string()),
                    };
                }
                Some(Ok(Message::Binary(_))) => {
                    debug!(session, "ignoring binary frame");
                }
                Some(Ok(_)) => {
                    // Ping & Pong control frames are answered by tungstenite
                }
                Some(Err(error)) => return SessionEnd::Unclean(error.to_string()),
                None => return SessionEnd::Unclean("stream ended without a close frame".to_string()),
            }
        }
    }
}

/// Linear backoff reconnect: attempt `k` waits `base * k`. Returns the reopened socket and its
/// session, or `None` once the client disconnected or the attempt budget ran out.
async fn reconnect(
    client: &TradingSocketClient,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    session: u64,
) -> Option<(WsStream, u64)> {
    let config = client.config();

    loop {
        let attempt = client.next_reconnect_attempt(session)?;
        if attempt > config.max_reconnect_attempts {
            client.on_reconnect_exhausted(session);
            return None;
        }

        let delay = config.reconnect_delay(attempt);
        client.on_reconnecting(attempt, delay);

        let mut sleep = pin!(tokio::time::sleep(delay));
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                command = commands.recv() => match command {
                    Some(Command::Send(_)) => {
                        // Queued for the lost socket, never sent on the next one
                        debug!("dropping frame queued for the lost socket");
                    }
                    Some(Command::Close) | None => return None,
                },
            }
        }

        match open(config).await {
            Ok(websocket) => {
                return client
                    .resume_session(session)
                    .map(|next_session| (websocket, next_session));
            }
            Err(error) => {
                warn!(attempt, %error, "reconnect attempt failed");
            }
        }
    }
}
