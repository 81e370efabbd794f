use crate::{
    account::{AccountBalance, AccountContext},
    config::{ClientConfig, MIN_API_TOKEN_LEN},
    connection::{self, Command},
    error::ClientError,
    event::ClientEvent,
    message::{InboundFrame, InboundMessage},
    request::Request,
    state::{ClientState, ClientStatus, ConnectionState, Issued},
    subscription::contract::{ActiveContract, ContractId},
    trade::{ActiveSymbol, BuyParams, Proposal, ProposalParams, TradeResult},
};
use parking_lot::Mutex;
use smol_str::SmolStr;
use std::{sync::Arc, time::Duration};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

/// Typed façade over one multiplexed WebSocket connection to the trading venue.
///
/// Cheap to clone; every clone drives the same connection. No network activity happens until
/// [`connect`](Self::connect) is called.
#[derive(Debug, Clone)]
pub struct TradingSocketClient {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    config: ClientConfig,
    state: Mutex<ClientState>,
    events: broadcast::Sender<ClientEvent>,
}

impl Default for TradingSocketClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl TradingSocketClient {
    pub fn new(config: ClientConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer_size.max(1));
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(ClientState::default()),
                events,
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Register a new event consumer. Dropping the receiver unregisters it.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.shared.events.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state.lock().connection
    }

    /// Snapshot of the connection, never a live view.
    pub fn status(&self) -> ClientStatus {
        self.shared.state.lock().status()
    }

    /// Snapshot of the authorized account, if any.
    pub fn account(&self) -> Option<AccountContext> {
        self.shared.state.lock().account.clone()
    }

    /// Latest known account balance, if any.
    pub fn balance(&self) -> Option<AccountBalance> {
        self.shared.state.lock().balance.clone()
    }

    /// Open the venue socket and start authorizing with `api_token`.
    ///
    /// Resolves once the socket is open. The authorization outcome is reported through
    /// [`ClientEvent::AuthorizationChanged`] and [`ClientEvent::Error`]. Returns immediately if
    /// already connected.
    ///
    /// If the venue does not answer the authorize request within the authorize timeout, an
    /// [`ClientError::Timeout`] error event fires and the socket stays open, unauthorized, for
    /// public calls. A late authorize reply is ignored; authorization is retried on the next
    /// reconnect or after `disconnect` and `connect`.
    pub async fn connect(&self, api_token: &str) -> Result<(), ClientError> {
        let api_token = api_token.trim();
        if api_token.len() < MIN_API_TOKEN_LEN {
            return Err(ClientError::InvalidRequest(format!(
                "API token must be at least {MIN_API_TOKEN_LEN} characters"
            )));
        }

        let claim = {
            let mut state = self.shared.state.lock();
            match state.connection {
                ConnectionState::Connected | ConnectionState::Authorized => return Ok(()),
                ConnectionState::Connecting | ConnectionState::Closing => {
                    return Err(ClientError::Transport(
                        "a connection attempt is already in progress".to_string(),
                    ));
                }
                ConnectionState::Disconnected => {}
            }
            state.connection = ConnectionState::Connecting;
            state.token = Some(api_token.to_string());
            state.session += 1;
            state.session
        };

        info!(endpoint = %self.config().endpoint, app_id = self.config().app_id, "connecting to venue");

        let websocket = match connection::open(self.config()).await {
            Ok(websocket) => websocket,
            Err(error) => {
                {
                    let mut state = self.shared.state.lock();
                    if state.session == claim {
                        state.connection = ConnectionState::Disconnected;
                        state.token = None;
                    }
                }
                error!(%error, "failed to open venue socket");
                self.emit(ClientEvent::Error(error.clone()));
                return Err(error);
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let session = {
            let mut state = self.shared.state.lock();
            if state.session != claim {
                return Err(ClientError::Transport(
                    "connection attempt cancelled by disconnect".to_string(),
                ));
            }
            state.commands = Some(tx);
            state.reconnect_attempts = 0;
            state.begin_session()
        };

        self.activate(session);
        tokio::spawn(connection::run(self.clone(), websocket, rx, session));
        Ok(())
    }

    /// Close the socket and drop all subscriptions, contracts, pending requests and the account.
    /// Idempotent.
    pub fn disconnect(&self) {
        let was_connected = {
            let mut state = self.shared.state.lock();
            if state.connection == ConnectionState::Disconnected && state.commands.is_none() {
                return;
            }
            // Connecting has either never reported `true` or already reported the loss
            let was_connected = state.connection.is_connected();
            state.connection = ConnectionState::Closing;
            if let Some(commands) = state.commands.take() {
                let _ = commands.send(Command::Close);
            }
            state.reset();
            was_connected
        };

        if was_connected {
            info!("disconnected from venue");
            self.emit(ClientEvent::ConnectionChanged(false));
            self.emit(ClientEvent::AuthorizationChanged(false));
        }
    }

    /// Subscribe to ticks for `symbol`. Re-subscribing re-sends the request and replaces the
    /// recorded handle.
    pub fn subscribe_ticks(&self, symbol: &str) -> Result<(), ClientError> {
        let symbol = SmolStr::new(symbol);
        let mut state = self.shared.state.lock();
        let request_id = state.send(&Request::TicksSubscribe {
            symbol: symbol.clone(),
        })?;
        debug!(%symbol, %request_id, "subscribed to ticks");
        state.record_tick_subscription(symbol, request_id);
        Ok(())
    }

    /// Unsubscribe from ticks for `symbol`. Unknown symbols are a no-op.
    ///
    /// The local record is removed immediately without waiting for the venue's acknowledgement.
    /// Subscriptions kept from before a reconnect are only removed locally.
    pub fn unsubscribe_ticks(&self, symbol: &str) -> Result<(), ClientError> {
        let mut state = self.shared.state.lock();
        let Some(handle) = state.remove_tick_subscription(symbol) else {
            return Ok(());
        };

        // Streams opened on a previous socket died with it
        if state.connection.is_connected() && handle.is_live_on(state.session) {
            state.send(&Request::Forget {
                key: handle.forget_key(),
            })?;
        }
        debug!(%symbol, "unsubscribed from ticks");
        Ok(())
    }

    /// Request a price proposal.
    pub async fn get_proposal(&self, params: ProposalParams) -> Result<Proposal, ClientError> {
        match self
            .request(Request::Proposal(params), self.config().request_timeout)
            .await?
        {
            InboundMessage::Proposal(proposal) => Ok(proposal),
            other => Err(unexpected("proposal", &other)),
        }
    }

    /// Buy a contract: request a proposal, then buy it. Requires authorization.
    ///
    /// The bought contract is tracked as an [`ActiveContract`] and subscribed to for updates.
    pub async fn buy_contract(&self, params: BuyParams) -> Result<TradeResult, ClientError> {
        self.require_authorized("buy")?;

        let price = params.max_price();
        let proposal = self.get_proposal(params.proposal).await?;
        debug!(proposal_id = %proposal.id, ask_price = proposal.ask_price, "proposal received");

        let result = match self
            .request(
                Request::Buy {
                    proposal_id: proposal.id,
                    price,
                },
                self.config().buy_timeout,
            )
            .await?
        {
            InboundMessage::Buy(result) => result,
            other => return Err(unexpected("buy", &other)),
        };

        info!(
            contract_id = result.contract_id,
            buy_price = result.buy_price,
            "contract bought"
        );
        self.shared
            .state
            .lock()
            .contracts
            .entry(result.contract_id)
            .or_insert_with(|| ActiveContract::new(result.contract_id));
        self.emit(ClientEvent::TradeResult(result.clone()));

        if let Err(error) = self.subscribe_contract(result.contract_id) {
            warn!(contract_id = result.contract_id, %error, "failed to subscribe to contract updates");
        }
        Ok(result)
    }

    /// Subscribe to lifecycle updates of `contract_id`. Requires authorization.
    pub fn subscribe_contract(&self, contract_id: ContractId) -> Result<(), ClientError> {
        let mut state = self.shared.state.lock();
        if !state.connection.is_authorized() {
            return Err(ClientError::not_authorized("proposal_open_contract"));
        }
        state.send(&Request::ContractSubscribe { contract_id })?;
        state
            .contracts
            .entry(contract_id)
            .or_insert_with(|| ActiveContract::new(contract_id));
        Ok(())
    }

    /// Stop tracking `contract_id`, forgetting its update stream when the venue id is known.
    /// Unknown contracts are a no-op.
    pub fn forget_contract(&self, contract_id: ContractId) -> Result<(), ClientError> {
        let mut state = self.shared.state.lock();
        let Some(contract) = state.contracts.remove(&contract_id) else {
            return Ok(());
        };

        if let Some(subscription_id) = contract.subscription_id
            && state.connection.is_connected()
        {
            state.send(&Request::Forget {
                key: subscription_id.to_string(),
            })?;
        }
        Ok(())
    }

    /// Snapshot of every tracked contract.
    pub fn active_contracts(&self) -> Vec<ActiveContract> {
        self.shared
            .state
            .lock()
            .contracts
            .values()
            .cloned()
            .collect()
    }

    /// Request an account balance snapshot. Requires authorization.
    pub async fn get_balance(&self) -> Result<AccountBalance, ClientError> {
        let issued = {
            let mut state = self.shared.state.lock();
            if !state.connection.is_authorized() {
                return Err(ClientError::not_authorized("balance"));
            }
            state.issue(&Request::Balance)?
        };
        self.complete_balance(issued).await
    }

    /// Subscribe to balance-change pushes. Requires authorization.
    pub fn subscribe_balance(&self) -> Result<(), ClientError> {
        let mut state = self.shared.state.lock();
        if !state.connection.is_authorized() {
            return Err(ClientError::not_authorized("balance"));
        }
        state.send(&Request::BalanceSubscribe)?;
        Ok(())
    }

    /// List the symbols currently offered by the venue.
    pub async fn get_active_symbols(&self) -> Result<Vec<ActiveSymbol>, ClientError> {
        match self
            .request(Request::ActiveSymbols, self.config().request_timeout)
            .await?
        {
            InboundMessage::ActiveSymbols(symbols) => Ok(symbols),
            other => Err(unexpected("active_symbols", &other)),
        }
    }

    async fn request(
        &self,
        request: Request,
        timeout: Duration,
    ) -> Result<InboundMessage, ClientError> {
        let issued = self.shared.state.lock().issue(&request)?;
        self.await_reply(issued, timeout).await
    }

    async fn await_reply(
        &self,
        issued: Issued,
        timeout: Duration,
    ) -> Result<InboundMessage, ClientError> {
        let Issued {
            request_id,
            session,
            operation,
            rx,
        } = issued;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(ClientError::Transport(format!(
                "{operation} request dropped before a reply was received"
            ))),
            Err(_) => {
                self.shared.state.lock().pending.expire(request_id, session);
                warn!(%request_id, operation, ?timeout, "request timed out");
                Err(ClientError::Timeout {
                    operation: operation.to_string(),
                    after: timeout,
                })
            }
        }
    }

    async fn complete_balance(&self, issued: Issued) -> Result<AccountBalance, ClientError> {
        match self
            .await_reply(issued, self.config().request_timeout)
            .await?
        {
            InboundMessage::Balance(balance) => {
                self.shared.state.lock().balance = Some(balance.clone());
                self.emit(ClientEvent::BalanceUpdate(balance.clone()));
                Ok(balance)
            }
            other => Err(unexpected("balance", &other)),
        }
    }

    fn require_authorized(&self, operation: &str) -> Result<(), ClientError> {
        if self.state().is_authorized() {
            Ok(())
        } else {
            Err(ClientError::not_authorized(operation))
        }
    }

    fn emit(&self, event: ClientEvent) {
        // No receivers is not an error
        let _ = self.shared.events.send(event);
    }

    fn emit_all(&self, events: Vec<ClientEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    fn is_current(&self, session: u64) -> bool {
        self.shared.state.lock().session == session
    }

    /// Socket `session` is open: notify consumers and start authorizing.
    pub(crate) fn activate(&self, session: u64) {
        {
            let mut state = self.shared.state.lock();
            if state.session != session {
                return;
            }
            state.connection = ConnectionState::Connected;
            state.reconnect_attempts = 0;
        }

        info!(session, "venue socket open");
        self.emit(ClientEvent::ConnectionChanged(true));
        tokio::spawn(self.clone().authorize(session));
    }

    async fn authorize(self, session: u64) {
        let issued = {
            let mut state = self.shared.state.lock();
            if state.session != session {
                return;
            }
            let Some(token) = state.token.clone() else {
                return;
            };
            state.issue(&Request::Authorize { token })
        };
        let issued = match issued {
            Ok(issued) => issued,
            Err(error) => {
                warn!(%error, "failed to send authorize request");
                return;
            }
        };

        match self
            .await_reply(issued, self.config().authorize_timeout)
            .await
        {
            Ok(InboundMessage::Authorize(account)) => {
                {
                    let mut state = self.shared.state.lock();
                    if state.session != session {
                        return;
                    }
                    state.account = Some(account.clone());
                    state.connection = ConnectionState::Authorized;
                }
                info!(
                    login_id = %account.login_id,
                    currency = %account.currency,
                    is_virtual = account.is_virtual,
                    "authorized"
                );
                self.emit(ClientEvent::AccountChanged(account));
                self.emit(ClientEvent::AuthorizationChanged(true));
                self.after_authorize(session).await;
            }
            Ok(other) => self.reject_authorization(session, unexpected("authorize", &other)),
            Err(error @ ClientError::Timeout { .. }) => {
                if !self.is_current(session) {
                    return;
                }
                warn!(%error, "no authorize reply, keeping connection open for public calls");
                self.emit(ClientEvent::Error(error));
            }
            Err(error) => self.reject_authorization(session, error),
        }
    }

    fn reject_authorization(&self, session: u64, error: ClientError) {
        if !self.is_current(session) {
            return;
        }
        warn!(%error, "authorize rejected");
        self.emit(ClientEvent::AuthorizationChanged(false));
        self.emit(ClientEvent::Error(error));
    }

    /// Balance snapshot then balance subscription, each after a short stagger.
    async fn after_authorize(&self, session: u64) {
        let stagger = self.config().post_auth_stagger;

        tokio::time::sleep(stagger).await;
        let issued = {
            let mut state = self.shared.state.lock();
            if state.session != session || !state.connection.is_authorized() {
                return;
            }
            state.issue(&Request::Balance)
        };
        match issued {
            Ok(issued) => {
                let client = self.clone();
                tokio::spawn(async move {
                    if let Err(error) = client.complete_balance(issued).await {
                        warn!(%error, "initial balance snapshot failed");
                    }
                });
            }
            Err(error) => warn!(%error, "failed to request balance snapshot"),
        }

        tokio::time::sleep(stagger).await;
        if !self.is_current(session) {
            return;
        }
        if let Err(error) = self.subscribe_balance() {
            warn!(%error, "failed to subscribe to balance updates");
        }
    }

    /// Build a heartbeat ping for `session`, `None` if the session is stale.
    pub(crate) fn heartbeat(&self, session: u64) -> Option<String> {
        let mut state = self.shared.state.lock();
        if state.session != session || !state.connection.is_connected() {
            return None;
        }
        let request_id = state.next_request_id();
        Some(Request::Ping.to_json(request_id).to_string())
    }

    /// Decode and dispatch one inbound text frame.
    pub(crate) fn handle_frame(&self, session: u64, text: &str) {
        if self.config().debug {
            debug!(session, %text, "inbound frame");
        }

        let frame = InboundFrame::decode(text);
        let events = {
            let mut state = self.shared.state.lock();
            if state.session != session {
                return;
            }
            state.dispatch(frame)
        };
        self.emit_all(events);
    }

    /// Socket lost uncleanly. Returns `false` if `session` is stale and the supervisor should
    /// stop.
    pub(crate) fn on_connection_lost(&self, session: u64, reason: String) -> bool {
        let was_authorized = {
            let mut state = self.shared.state.lock();
            if state.session != session {
                return false;
            }
            state.lose_session()
        };

        warn!(session, %reason, "venue connection lost");
        self.emit(ClientEvent::ConnectionChanged(false));
        if was_authorized {
            self.emit(ClientEvent::AuthorizationChanged(false));
        }
        self.emit(ClientEvent::Error(ClientError::Transport(reason)));
        true
    }

    /// Venue closed cleanly: no reconnection.
    pub(crate) fn on_closed(&self, session: u64) {
        {
            let mut state = self.shared.state.lock();
            if state.session != session {
                return;
            }
            state.reset();
        }
        self.emit(ClientEvent::ConnectionChanged(false));
        self.emit(ClientEvent::AuthorizationChanged(false));
    }

    /// Count a reconnect attempt for `session`, `None` if the session is stale.
    pub(crate) fn next_reconnect_attempt(&self, session: u64) -> Option<u32> {
        let mut state = self.shared.state.lock();
        if state.session != session {
            return None;
        }
        state.reconnect_attempts += 1;
        Some(state.reconnect_attempts)
    }

    pub(crate) fn on_reconnecting(&self, attempt: u32, delay: Duration) {
        info!(attempt, ?delay, "reconnecting to venue");
        self.emit(ClientEvent::Reconnecting { attempt, delay });
    }

    pub(crate) fn on_reconnect_exhausted(&self, session: u64) {
        {
            let mut state = self.shared.state.lock();
            if state.session != session {
                return;
            }
            state.reset();
        }
        let error = ClientError::ReconnectExhausted {
            attempts: self.config().max_reconnect_attempts,
        };
        error!(%error, "giving up on venue connection");
        self.emit(ClientEvent::Error(error));
    }

    /// New socket opened by the reconnect loop. Returns its session, `None` if `session` went
    /// stale while reconnecting.
    pub(crate) fn resume_session(&self, session: u64) -> Option<u64> {
        let mut state = self.shared.state.lock();
        if state.session != session {
            return None;
        }
        if !state.ticks.is_empty() {
            let symbols = state.ticks.symbols().cloned().collect::<Vec<_>>();
            warn!(?symbols, "tick subscriptions are not restored on the new socket");
        }
        Some(state.begin_session())
    }
}

fn unexpected(operation: &str, received: &InboundMessage) -> ClientError {
    ClientError::UnexpectedResponse {
        operation: operation.to_string(),
        received: received.kind().to_string(),
    }
}
