//! Inbound frame decoding.
//!
//! Every text frame decodes to an [`InboundFrame`]. Payloads the client does not understand
//! decode to [`InboundMessage::Unrecognized`] rather than failing, so one malformed frame can
//! never affect the frames that follow it.

use crate::{
    account::{AccountBalance, AccountContext},
    request::RequestId,
    subscription::{contract::ContractUpdate, tick::TickData},
    trade::{ActiveSymbol, Proposal, TradeResult},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use smol_str::SmolStr;

/// Structured venue error payload, `{"code": .., "message": ..}`.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct VenueError {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Decoded inbound frame with its correlation and stream metadata.
#[derive(Clone, PartialEq, Debug)]
pub struct InboundFrame {
    /// `req_id` echoed by the venue, present on solicited replies and on stream pushes.
    pub request_id: Option<RequestId>,
    /// `subscription.id` of the stream this frame belongs to.
    pub subscription_id: Option<SmolStr>,
    pub message: InboundMessage,
}

/// Closed set of inbound message shapes.
#[derive(Clone, PartialEq, Debug)]
pub enum InboundMessage {
    Authorize(AccountContext),
    Balance(AccountBalance),
    Tick(TickData),
    ContractUpdate(ContractUpdate),
    Proposal(Proposal),
    Buy(TradeResult),
    Forget { removed: bool },
    Pong,
    ActiveSymbols(Vec<ActiveSymbol>),
    Error(VenueError),
    Unrecognized { msg_type: Option<String>, reason: String },
}

impl InboundMessage {
    /// Message kind used in logs and `UnexpectedResponse` errors.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Authorize(_) => "authorize",
            InboundMessage::Balance(_) => "balance",
            InboundMessage::Tick(_) => "tick",
            InboundMessage::ContractUpdate(_) => "proposal_open_contract",
            InboundMessage::Proposal(_) => "proposal",
            InboundMessage::Buy(_) => "buy",
            InboundMessage::Forget { .. } => "forget",
            InboundMessage::Pong => "ping",
            InboundMessage::ActiveSymbols(_) => "active_symbols",
            InboundMessage::Error(_) => "error",
            InboundMessage::Unrecognized { .. } => "unrecognized",
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    msg_type: Option<String>,
    #[serde(default)]
    req_id: Option<u64>,
    #[serde(default)]
    error: Option<VenueError>,
    #[serde(default)]
    subscription: Option<SubscriptionRef>,
}

#[derive(Deserialize)]
struct SubscriptionRef {
    id: SmolStr,
}

impl InboundFrame {
    /// Decode a raw text frame. Never fails.
    pub fn decode(text: &str) -> Self {
        let value = match serde_json::from_str::<Value>(text) {
            Ok(value) => value,
            Err(error) => return Self::unrecognized(None, format!("invalid JSON: {error}")),
        };

        let envelope = match Envelope::deserialize(&value) {
            Ok(envelope) => envelope,
            Err(error) => return Self::unrecognized(None, format!("invalid envelope: {error}")),
        };

        let message = match (envelope.error, envelope.msg_type.as_deref()) {
            (Some(error), _) => InboundMessage::Error(error),
            (None, Some("authorize")) => payload(&value, "authorize", InboundMessage::Authorize),
            (None, Some("balance")) => payload(&value, "balance", InboundMessage::Balance),
            (None, Some("tick")) => payload(&value, "tick", InboundMessage::Tick),
            (None, Some("proposal_open_contract")) => payload(
                &value,
                "proposal_open_contract",
                InboundMessage::ContractUpdate,
            ),
            (None, Some("proposal")) => payload(&value, "proposal", InboundMessage::Proposal),
            (None, Some("buy")) => payload(&value, "buy", InboundMessage::Buy),
            (None, Some("active_symbols")) => {
                payload(&value, "active_symbols", InboundMessage::ActiveSymbols)
            }
            (None, Some("forget")) => InboundMessage::Forget {
                removed: value
                    .get("forget")
                    .map(|removed| removed.as_u64() == Some(1) || removed.as_bool() == Some(true))
                    .unwrap_or(false),
            },
            (None, Some("ping")) => InboundMessage::Pong,
            (None, msg_type) => InboundMessage::Unrecognized {
                msg_type: msg_type.map(str::to_string),
                reason: "unsupported msg_type".to_string(),
            },
        };

        Self {
            request_id: envelope.req_id.map(RequestId),
            subscription_id: envelope.subscription.map(|subscription| subscription.id),
            message,
        }
    }

    fn unrecognized(msg_type: Option<String>, reason: String) -> Self {
        Self {
            request_id: None,
            subscription_id: None,
            message: InboundMessage::Unrecognized { msg_type, reason },
        }
    }
}

fn payload<T, F>(value: &Value, field: &str, variant: F) -> InboundMessage
where
    T: DeserializeOwned,
    F: FnOnce(T) -> InboundMessage,
{
    match value.get(field).map(|payload| T::deserialize(payload)) {
        Some(Ok(payload)) => variant(payload),
        Some(Err(error)) => InboundMessage::Unrecognized {
            msg_type: Some(field.to_string()),
            reason: format!("invalid {field} payload: {error}"),
        },
        None => InboundMessage::Unrecognized {
            msg_type: Some(field.to_string()),
            reason: format!("missing {field} payload"),
        },
    }
}
