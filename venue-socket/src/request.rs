use crate::{
    subscription::contract::ContractId,
    trade::ProposalParams,
};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use smol_str::SmolStr;

/// Correlation id attached to every outbound message as `req_id`.
///
/// Unique and strictly increasing within the lifetime of one socket.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, From, Deserialize, Serialize,
)]
pub struct RequestId(pub u64);

/// Monotonic [`RequestId`] counter. A fresh generator is installed for every new socket.
#[derive(Debug)]
pub struct RequestIdGenerator {
    next: u64,
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl RequestIdGenerator {
    pub fn next_id(&mut self) -> RequestId {
        let id = RequestId(self.next);
        self.next += 1;
        id
    }
}

/// Outbound venue requests.
#[derive(Clone, PartialEq, Debug)]
pub enum Request {
    Authorize { token: String },
    Balance,
    BalanceSubscribe,
    TicksSubscribe { symbol: SmolStr },
    Forget { key: String },
    ContractSubscribe { contract_id: ContractId },
    Proposal(ProposalParams),
    Buy { proposal_id: SmolStr, price: f64 },
    Ping,
    ActiveSymbols,
}

impl Request {
    /// Short operation name used in logs and errors.
    pub fn operation(&self) -> &'static str {
        match self {
            Request::Authorize { .. } => "authorize",
            Request::Balance => "balance",
            Request::BalanceSubscribe => "balance_subscribe",
            Request::TicksSubscribe { .. } => "ticks",
            Request::Forget { .. } => "forget",
            Request::ContractSubscribe { .. } => "proposal_open_contract",
            Request::Proposal(_) => "proposal",
            Request::Buy { .. } => "buy",
            Request::Ping => "ping",
            Request::ActiveSymbols => "active_symbols",
        }
    }

    /// Encode the request as a venue JSON message carrying `req_id`.
    pub fn to_json(&self, request_id: RequestId) -> Value {
        let req_id = request_id.0;
        match self {
            Request::Authorize { token } => json!({
                "authorize": token,
                "req_id": req_id,
            }),
            Request::Balance => json!({
                "balance": 1,
                "req_id": req_id,
            }),
            Request::BalanceSubscribe => json!({
                "balance": 1,
                "subscribe": 1,
                "req_id": req_id,
            }),
            Request::TicksSubscribe { symbol } => json!({
                "ticks": symbol.as_str(),
                "subscribe": 1,
                "req_id": req_id,
            }),
            Request::Forget { key } => json!({
                "forget": key,
                "req_id": req_id,
            }),
            Request::ContractSubscribe { contract_id } => json!({
                "proposal_open_contract": 1,
                "contract_id": contract_id,
                "subscribe": 1,
                "req_id": req_id,
            }),
            Request::Proposal(params) => {
                let mut message = serde_json::to_value(params).unwrap_or_else(|_| json!({}));
                if let Value::Object(fields) = &mut message {
                    fields.insert("proposal".to_string(), json!(1));
                    fields.insert("req_id".to_string(), json!(req_id));
                }
                message
            }
            Request::Buy { proposal_id, price } => json!({
                "buy": proposal_id.as_str(),
                "price": price,
                "req_id": req_id,
            }),
            Request::Ping => json!({
                "ping": 1,
                "req_id": req_id,
            }),
            Request::ActiveSymbols => json!({
                "active_symbols": "brief",
                "product_type": "basic",
                "req_id": req_id,
            }),
        }
    }
}
