//! This module provides custom serde implementations.

/// Serialize a number as a string.
///
/// Controllers are free to run on JSON runtimes that lose precision above
/// 2^53, so sequences and heights travel as decimal strings.
pub mod number_as_string {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Implements the serde `serialize` function for a number.
    /// # Errors
    /// Returns an error if the number cannot be serialized.
    pub fn serialize<T, S>(number: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: ToString,
        S: Serializer,
    {
        serializer.serialize_str(&number.to_string())
    }

    /// Implements the serde `deserialize` function for a number.
    /// # Errors
    /// Returns an error if the string cannot be deserialized to a number.
    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serialize a byte vector as standard (padded) base64 text.
pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Implements the serde `serialize` function for bytes.
    /// # Errors
    /// Returns an error if the serializer rejects the string.
    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    /// Implements the serde `deserialize` function for bytes.
    /// # Errors
    /// Returns an error if the string is not valid base64.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

/// Read an explicit `null` as the type's default value.
///
/// Combine with `#[serde(default)]` so that absent and `null` fields both
/// decode to the default.
pub mod null_as_default {
    use serde::{Deserialize, Deserializer};

    /// Implements the serde `deserialize` function for nullable fields.
    /// # Errors
    /// Returns an error if the value is neither `null` nor a valid `T`.
    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: Deserialize<'de> + Default,
        D: Deserializer<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }
}
