use crate::{
    account::{AccountBalance, AccountContext},
    connection::Command,
    error::ClientError,
    event::ClientEvent,
    message::{InboundFrame, InboundMessage},
    pending::{PendingRegistry, Reply},
    request::{Request, RequestId, RequestIdGenerator},
    subscription::{
        SubscriptionHandle, TickSubscriptions,
        contract::{ActiveContract, ContractId},
    },
};
use derive_more::Display;
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Connection lifecycle of a [`TradingSocketClient`](crate::TradingSocketClient).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Display, Deserialize, Serialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    /// Socket open, authorization pending or rejected. Public calls still work.
    Connected,
    Authorized,
    Closing,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Authorized)
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self, ConnectionState::Authorized)
    }
}

/// Read-only snapshot of a client's connection.
#[derive(Clone, PartialEq, Debug)]
pub struct ClientStatus {
    pub connected: bool,
    pub authorized: bool,
    pub account: Option<AccountContext>,
    pub active_subscription_count: usize,
    pub active_contract_count: usize,
}

/// Correlated request that has been written to the socket and awaits its reply.
#[derive(Debug)]
pub(crate) struct Issued {
    pub request_id: RequestId,
    pub session: u64,
    pub operation: &'static str,
    pub rx: oneshot::Receiver<Reply>,
}

/// Mutable client state. Only ever touched under the client's lock, never across an `.await`.
#[derive(Debug, Default)]
pub(crate) struct ClientState {
    pub connection: ConnectionState,
    /// Incremented for every new socket and on teardown, invalidating stale tasks.
    pub session: u64,
    pub token: Option<String>,
    pub pending: PendingRegistry,
    pub ticks: TickSubscriptions,
    pub contracts: FnvHashMap<ContractId, ActiveContract>,
    pub account: Option<AccountContext>,
    pub balance: Option<AccountBalance>,
    pub reconnect_attempts: u32,
    pub commands: Option<mpsc::UnboundedSender<Command>>,
    request_ids: RequestIdGenerator,
}

impl ClientState {
    pub fn status(&self) -> ClientStatus {
        ClientStatus {
            connected: self.connection.is_connected(),
            authorized: self.connection.is_authorized(),
            account: self.account.clone(),
            active_subscription_count: self.ticks.len(),
            active_contract_count: self.contracts.len(),
        }
    }

    /// Start a new socket session: fresh correlation ids, `Connected` state.
    pub fn begin_session(&mut self) -> u64 {
        self.session += 1;
        self.request_ids = RequestIdGenerator::default();
        self.pending.clear_expired();
        self.connection = ConnectionState::Connected;
        self.session
    }

    /// Allocate the next correlation id for this socket.
    pub fn next_request_id(&mut self) -> RequestId {
        self.request_ids.next_id()
    }

    /// Encode and queue `request` on the socket, returning its correlation id.
    pub fn send(&mut self, request: &Request) -> Result<RequestId, ClientError> {
        if !self.connection.is_connected() {
            return Err(ClientError::Transport(format!(
                "cannot send {} while {}",
                request.operation(),
                self.connection
            )));
        }
        let Some(commands) = self.commands.as_ref() else {
            return Err(ClientError::Transport(format!(
                "cannot send {} without an open socket",
                request.operation()
            )));
        };

        let request_id = self.request_ids.next_id();
        let text = request.to_json(request_id).to_string();
        commands
            .send(Command::Send(text))
            .map_err(|_| ClientError::Transport("socket task has stopped".to_string()))?;
        Ok(request_id)
    }

    /// Queue a correlated `request` and register it in the pending registry.
    pub fn issue(&mut self, request: &Request) -> Result<Issued, ClientError> {
        let request_id = self.send(request)?;
        let rx = self
            .pending
            .register(request_id, request.operation(), self.session);
        Ok(Issued {
            request_id,
            session: self.session,
            operation: request.operation(),
            rx,
        })
    }

    /// Route one decoded inbound frame.
    ///
    /// Correlated replies resolve their pending request. Everything else is dispatched by
    /// message type and returned as events for the caller to broadcast once the lock is
    /// released.
    pub fn dispatch(&mut self, frame: InboundFrame) -> Vec<ClientEvent> {
        let InboundFrame {
            request_id,
            subscription_id,
            message,
        } = frame;

        if let (Some(request_id), Some(subscription_id)) = (request_id, subscription_id.as_ref()) {
            self.ticks
                .adopt_venue_id_by_request(request_id, self.session, subscription_id);
        }

        let mut reply = match message {
            InboundMessage::Error(error) => Err(ClientError::from_venue(error.code, error.message)),
            message => Ok(message),
        };

        if let Some(request_id) = request_id {
            match self.pending.resolve(request_id, reply) {
                None => return Vec::new(),
                Some(unsolicited) => reply = unsolicited,
            }
            if self.pending.was_expired(request_id) {
                debug!(%request_id, "ignoring late reply to expired request");
                return Vec::new();
            }
        }

        match reply {
            Ok(InboundMessage::Tick(tick)) => {
                if let Some(subscription_id) = &subscription_id {
                    self.ticks
                        .adopt_venue_id(&tick.symbol, self.session, subscription_id);
                }
                vec![ClientEvent::Tick(tick)]
            }
            Ok(InboundMessage::Balance(balance)) => {
                self.balance = Some(balance.clone());
                vec![ClientEvent::BalanceUpdate(balance)]
            }
            Ok(InboundMessage::ContractUpdate(update)) => {
                if let Some(contract) = self.contracts.get_mut(&update.contract_id) {
                    if contract.subscription_id.is_none() {
                        contract.subscription_id = subscription_id;
                    }
                    contract.last_known_state = Some(update.clone());
                }
                vec![ClientEvent::ContractUpdate(update)]
            }
            Ok(InboundMessage::Pong) => {
                debug!(request_id = ?request_id, "heartbeat pong");
                Vec::new()
            }
            Ok(InboundMessage::Forget { removed }) => {
                debug!(request_id = ?request_id, removed, "forget acknowledged");
                Vec::new()
            }
            Ok(InboundMessage::Unrecognized { msg_type, reason }) => {
                warn!(?msg_type, %reason, "dropping unrecognized inbound message");
                Vec::new()
            }
            Ok(other) => {
                debug!(
                    request_id = ?request_id,
                    kind = other.kind(),
                    "dropping reply with no pending request"
                );
                Vec::new()
            }
            Err(error) => {
                warn!(request_id = ?request_id, %error, "venue error on unsolicited message");
                vec![ClientEvent::Error(error)]
            }
        }
    }

    /// Forget a tick subscription locally, returning its handle if one was recorded.
    pub fn remove_tick_subscription(&mut self, symbol: &str) -> Option<SubscriptionHandle> {
        self.ticks.remove(symbol)
    }

    /// Record a tick subscription opened by `request_id` on the current socket.
    pub fn record_tick_subscription(&mut self, symbol: SmolStr, request_id: RequestId) {
        self.ticks
            .insert(symbol, SubscriptionHandle::new(request_id, self.session));
    }

    /// Socket lost while reconnection remains possible. Tick subscriptions and active contracts
    /// are kept but are not re-sent on the next socket.
    pub fn lose_session(&mut self) -> bool {
        let was_authorized = self.connection.is_authorized();
        let failed = self.pending.fail_all(ClientError::Transport(
            "connection lost before a reply was received".to_string(),
        ));
        if failed > 0 {
            warn!(failed, "failed pending requests after connection loss");
        }
        self.account = None;
        self.balance = None;
        self.connection = ConnectionState::Connecting;
        was_authorized
    }

    /// Return to `Disconnected`, dropping every subscription, contract, pending request and the
    /// account context.
    pub fn reset(&mut self) {
        self.connection = ConnectionState::Closing;
        self.pending
            .fail_all(ClientError::Transport("client disconnected".to_string()));
        self.pending.clear_expired();
        self.ticks.clear();
        self.contracts.clear();
        self.account = None;
        self.balance = None;
        self.token = None;
        self.reconnect_attempts = 0;
        self.commands = None;
        self.session += 1;
        self.connection = ConnectionState::Disconnected;
    }
}
