//! # Venue Socket
//! Multiplexed WebSocket client for a contract trading venue.
//!
//! A single [`TradingSocketClient`] owns one socket and multiplexes over it:
//! * Token authorization and the resulting [`AccountContext`].
//! * Request/reply correlation via numeric `req_id`s, with per-request timeouts.
//! * Tick, balance and open-contract subscription streams.
//! * Proposal then buy trade placement.
//! * A periodic heartbeat and bounded linear-backoff reconnection.
//!
//! Everything the venue pushes is broadcast as a [`ClientEvent`] to any number of consumers.
//!
//! ## Example
//! ```rust,no_run
//! use venue_socket::{ClientConfig, ClientEvent, TradingSocketClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = TradingSocketClient::new(ClientConfig::default());
//!     let mut events = client.subscribe_events();
//!
//!     client.connect("my-api-token").await.unwrap();
//!     client.subscribe_ticks("R_10").unwrap();
//!
//!     while let Ok(event) = events.recv().await {
//!         if let ClientEvent::Tick(tick) = event {
//!             println!("{} {}", tick.symbol, tick.quote);
//!         }
//!     }
//! }
//! ```

/// Authorized account context and balances.
pub mod account;

/// [`TradingSocketClient`] façade: the public API.
pub mod client;

/// [`ClientConfig`] with venue defaults.
pub mod config;

/// Socket supervisor task: heartbeat & reconnection.
pub mod connection;

/// Deserialisation helpers for venue payloads.
pub mod de;

/// All [`Error`](std::error::Error)s generated in Venue Socket.
pub mod error;

/// Events broadcast to consumers.
pub mod event;

/// Inbound frame decoding.
pub mod message;

/// In-flight correlated requests.
pub mod pending;

/// Outbound requests and correlation ids.
pub mod request;

/// Connection state & the mutable client state behind the lock.
pub mod state;

/// Tick & open-contract subscriptions.
pub mod subscription;

/// Proposal, buy and symbol models.
pub mod trade;

pub use account::{AccountBalance, AccountContext};
pub use client::TradingSocketClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use event::ClientEvent;
pub use request::RequestId;
pub use state::{ClientStatus, ConnectionState};
pub use subscription::{
    contract::{ActiveContract, ContractId, ContractStatus, ContractUpdate},
    tick::TickData,
};
pub use trade::{
    ActiveSymbol, Basis, BuyParams, ContractType, DurationUnit, Proposal, ProposalParams,
    TradeResult,
};

