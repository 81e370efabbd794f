use crate::{
    account::{AccountBalance, AccountContext},
    error::ClientError,
    subscription::{contract::ContractUpdate, tick::TickData},
    trade::TradeResult,
};
use std::time::Duration;

/// Events broadcast by a [`TradingSocketClient`](crate::TradingSocketClient).
///
/// Any number of consumers may hold a receiver from
/// [`subscribe_events`](crate::TradingSocketClient::subscribe_events); dropping the receiver
/// unregisters it.
#[derive(Clone, PartialEq, Debug)]
pub enum ClientEvent {
    ConnectionChanged(bool),
    AuthorizationChanged(bool),
    AccountChanged(AccountContext),
    BalanceUpdate(AccountBalance),
    Tick(TickData),
    TradeResult(TradeResult),
    ContractUpdate(ContractUpdate),
    Error(ClientError),
    /// Reconnect attempt `attempt` will be made after `delay`.
    Reconnecting { attempt: u32, delay: Duration },
}
