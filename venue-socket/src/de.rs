//! Deserialisation helpers for the loosely typed venue payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, de::Error};

/// Deserialize a `0`/`1` integer (or a JSON bool) flag as a `bool`.
pub fn de_int_as_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(flag) => Ok(flag),
        Flag::Int(0) => Ok(false),
        Flag::Int(1) => Ok(true),
        Flag::Int(other) => Err(D::Error::custom(format!(
            "expected 0 or 1 flag, found {other}"
        ))),
    }
}

/// Deserialize an optional `0`/`1` flag, treating an absent field as `false`.
pub fn de_opt_int_as_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "de_int_as_bool")] bool);

    Ok(Option::<Wrapper>::deserialize(deserializer)?
        .map(|Wrapper(flag)| flag)
        .unwrap_or_default())
}

/// Deserialize a number that the venue sometimes sends as a string.
pub fn de_str_or_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Float(f64),
        Str(String),
    }

    match Number::deserialize(deserializer)? {
        Number::Float(value) => Ok(value),
        Number::Str(value) => value.parse().map_err(D::Error::custom),
    }
}

/// Deserialize a venue id that may arrive as a JSON number or string into a `String`.
pub fn de_id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Int(u64),
        Str(String),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Int(id) => id.to_string(),
        Id::Str(id) => id,
    })
}

/// Convert epoch seconds to a `DateTime<Utc>`.
pub fn datetime_utc_from_epoch_secs(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}
