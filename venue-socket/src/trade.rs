use crate::{
    de::{de_id_as_string, de_str_or_f64},
    subscription::contract::ContractId,
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Contract types offered by the venue.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContractType {
    #[display("CALL")]
    Call,
    #[display("PUT")]
    Put,
    #[display("DIGITMATCH")]
    DigitMatch,
    #[display("DIGITDIFF")]
    DigitDiff,
    #[display("DIGITOVER")]
    DigitOver,
    #[display("DIGITUNDER")]
    DigitUnder,
    #[display("DIGITEVEN")]
    DigitEven,
    #[display("DIGITODD")]
    DigitOdd,
    #[display("MULTUP")]
    MultUp,
    #[display("MULTDOWN")]
    MultDown,
}

/// Whether the proposal `amount` is the stake or the payout.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Basis {
    #[default]
    Stake,
    Payout,
}

/// Unit of a contract `duration`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
pub enum DurationUnit {
    #[serde(rename = "t")]
    Ticks,
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "m")]
    Minutes,
    #[serde(rename = "h")]
    Hours,
    #[serde(rename = "d")]
    Days,
}

/// Parameters of a price proposal request.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct ProposalParams {
    pub amount: f64,
    pub basis: Basis,
    pub contract_type: ContractType,
    pub currency: SmolStr,
    pub duration: u32,
    pub duration_unit: DurationUnit,
    pub symbol: SmolStr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barrier: Option<String>,
}

/// Price proposal returned by the venue. Its `id` is required to buy.
///
/// ### Raw Payload Examples
/// ```json
/// {
///     "id": "5d4b9b3c-8f63-2f3e-0a5c-0b9a6a3e3c4f",
///     "ask_price": 10,
///     "payout": 19.55,
///     "spot": 2456.78,
///     "spot_time": 1700000000,
///     "longcode": "Win payout if Volatility 10 Index is strictly higher than entry spot at 5 ticks after contract start time."
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct Proposal {
    pub id: SmolStr,

    #[serde(deserialize_with = "de_str_or_f64")]
    pub ask_price: f64,

    #[serde(deserialize_with = "de_str_or_f64")]
    pub payout: f64,

    #[serde(default)]
    pub spot: Option<f64>,

    #[serde(default)]
    pub longcode: Option<String>,
}

/// Parameters of a buy: a proposal is requested first and bought at `price`.
#[derive(Clone, PartialEq, Debug)]
pub struct BuyParams {
    pub proposal: ProposalParams,
    /// Maximum price the caller accepts, defaults to the proposal `amount`.
    pub price: Option<f64>,
}

impl BuyParams {
    pub fn new(proposal: ProposalParams) -> Self {
        Self {
            proposal,
            price: None,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn max_price(&self) -> f64 {
        self.price.unwrap_or(self.proposal.amount)
    }
}

/// Result of a successful buy.
///
/// ### Raw Payload Examples
/// ```json
/// {
///     "contract_id": 2349870,
///     "transaction_id": 4689130,
///     "buy_price": 10,
///     "balance_after": 9990,
///     "payout": 19.55,
///     "longcode": "Win payout if ...",
///     "shortcode": "CALL_R_10_19.55_1700000000_5T_S0P_0",
///     "start_time": 1700000000
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct TradeResult {
    pub contract_id: ContractId,

    #[serde(deserialize_with = "de_id_as_string")]
    pub transaction_id: String,

    #[serde(deserialize_with = "de_str_or_f64")]
    pub buy_price: f64,

    #[serde(default)]
    pub balance_after: Option<f64>,

    #[serde(default)]
    pub payout: Option<f64>,

    #[serde(default)]
    pub longcode: Option<String>,

    #[serde(default)]
    pub shortcode: Option<String>,
}

/// Tradable symbol from an `active_symbols` listing.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct ActiveSymbol {
    pub symbol: SmolStr,

    pub display_name: String,

    #[serde(default)]
    pub market: Option<SmolStr>,

    #[serde(default)]
    pub submarket: Option<SmolStr>,

    #[serde(default)]
    pub pip: Option<f64>,

    #[serde(default, deserialize_with = "crate::de::de_opt_int_as_bool")]
    pub exchange_is_open: bool,

    #[serde(default, deserialize_with = "crate::de::de_opt_int_as_bool")]
    pub is_trading_suspended: bool,
}
