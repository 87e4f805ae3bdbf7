//! Serde helpers for the persisted JSON form of records.
//!
//! Stores written by earlier versions of this library encode numeric and
//! boolean fields as quoted text (`"Age":"31"`), omit zero-valued optional
//! fields, write `null` for unset lists and use `0001-01-01T00:00:00Z` as the
//! zero timestamp. These helpers make each of those conventions explicit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Seconds between `0001-01-01T00:00:00Z` and the Unix epoch.
const ZERO_TIME_UNIX_SECS: i64 = -62_135_596_800;

/// The zero timestamp used for unset time fields.
#[must_use]
pub fn zero_time() -> DateTime<Utc> {
    DateTime::from_timestamp(ZERO_TIME_UNIX_SECS, 0).unwrap_or_default()
}

/// `skip_serializing_if` predicate for zero-valued fields.
pub fn is_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Reads `null` as the default value.
pub fn null_as_default<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Deserialize<'de> + Default,
    D: Deserializer<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reads a present value, `null` included, as `Some`. Pair with
/// `#[serde(default)]` so a missing field stays `None`.
pub fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Scalars written as quoted text.
///
/// Encoding always produces a JSON string. Decoding accepts a string holding
/// the value, the bare scalar, or `null` (read as the default).
pub mod quoted {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use std::fmt::Display;
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr<T> {
        Null(()),
        Text(String),
        Bare(T),
    }

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr + Deserialize<'de> + Default,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        match Repr::<T>::deserialize(deserializer)? {
            Repr::Null(()) => Ok(T::default()),
            Repr::Text(text) => text
                .trim()
                .parse()
                .map_err(|e| de::Error::custom(format!("invalid quoted value {text:?}: {e}"))),
            Repr::Bare(value) => Ok(value),
        }
    }
}

/// Quoted lengths. Older writers stored a signed integer here; negative values
/// read as zero.
pub mod quoted_len {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        super::quoted::serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let signed: i64 = super::quoted::deserialize(deserializer)?;
        Ok(u64::try_from(signed).unwrap_or(0))
    }
}
