use crate::de::{de_opt_int_as_bool, de_str_or_f64};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Venue-assigned contract identifier.
pub type ContractId = u64;

/// Lifecycle state of an open contract, pushed on a `proposal_open_contract` stream.
///
/// ### Raw Payload Examples
/// ```json
/// {
///     "contract_id": 2349870,
///     "contract_type": "CALL",
///     "underlying": "R_10",
///     "status": "open",
///     "is_sold": 0,
///     "buy_price": 10,
///     "bid_price": 11.2,
///     "payout": 19.55,
///     "profit": 1.2,
///     "current_spot": 2456.91,
///     "entry_spot": 2456.78
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct ContractUpdate {
    pub contract_id: ContractId,

    #[serde(default)]
    pub contract_type: Option<SmolStr>,

    #[serde(default)]
    pub underlying: Option<SmolStr>,

    #[serde(default)]
    pub status: Option<ContractStatus>,

    #[serde(default, deserialize_with = "de_opt_int_as_bool")]
    pub is_sold: bool,

    #[serde(default)]
    pub buy_price: Option<f64>,

    #[serde(default)]
    pub bid_price: Option<f64>,

    #[serde(default)]
    pub payout: Option<f64>,

    #[serde(default)]
    pub profit: Option<f64>,

    #[serde(default, deserialize_with = "de_opt_spot")]
    pub current_spot: Option<f64>,

    #[serde(default, deserialize_with = "de_opt_spot")]
    pub entry_spot: Option<f64>,
}

/// Contract status reported by the venue.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Open,
    Won,
    Lost,
    Sold,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl ContractUpdate {
    /// Determine if the contract has settled and will not change further.
    pub fn is_settled(&self) -> bool {
        self.is_sold
            || matches!(
                self.status,
                Some(ContractStatus::Won | ContractStatus::Lost | ContractStatus::Sold)
            )
    }
}

/// Contract bought through this client, tracked until the client disconnects or the caller
/// forgets it.
#[derive(Clone, PartialEq, Debug)]
pub struct ActiveContract {
    pub contract_id: ContractId,
    /// Venue stream id of the contract-update subscription, once known.
    pub subscription_id: Option<SmolStr>,
    pub last_known_state: Option<ContractUpdate>,
}

impl ActiveContract {
    pub fn new(contract_id: ContractId) -> Self {
        Self {
            contract_id,
            subscription_id: None,
            last_known_state: None,
        }
    }
}

fn de_opt_spot<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Spot(#[serde(deserialize_with = "de_str_or_f64")] f64);

    Ok(Option::<Spot>::deserialize(deserializer)?.map(|Spot(spot)| spot))
}
