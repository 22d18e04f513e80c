//! Requests sent by the controller to the `dibc` port.

use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::channel::ChannelTuple;

/// Errors raised while decoding a [`ChannelMessage`].
#[derive(Debug, Error)]
pub enum MessageError {
    /// The request is not a JSON object of the expected shape.
    #[error("malformed channel message: {0}")]
    Json(#[from] serde_json::Error),

    /// The request named a method outside of `ack`, `close` and `send`.
    #[error("unrecognized method {0}")]
    UnrecognizedMethod(String),
}

/// The operation a [`ChannelMessage`] asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Acknowledge the packet currently awaiting the controller.
    Ack,
    /// Start closing a channel.
    Close,
    /// Send a packet over a channel.
    Send,
}

impl Method {
    /// The literal used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ack => "ack",
            Self::Close => "close",
            Self::Send => "send",
        }
    }
}

impl FromStr for Method {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ack" => Ok(Self::Ack),
            "close" => Ok(Self::Close),
            "send" => Ok(Self::Send),
            other => Err(MessageError::UnrecognizedMethod(other.to_string())),
        }
    }
}

impl core::fmt::Display for Method {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the request before the method has been checked.
///
/// Absent and `null` fields read as empty, so a request without a method
/// fails as an unrecognized (empty) method rather than as malformed JSON.
#[derive(Deserialize)]
struct RawChannelMessage {
    #[serde(default, deserialize_with = "dibc_utils::serde::null_as_default::deserialize")]
    method: String,
    #[serde(default, deserialize_with = "dibc_utils::serde::null_as_default::deserialize")]
    tuple: ChannelTuple,
    #[serde(default, deserialize_with = "dibc_utils::serde::null_as_default::deserialize")]
    data64: String,
}

/// A request to the `dibc` port.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChannelMessage {
    /// Requested operation.
    pub method: Method,
    /// Channel the operation applies to.
    pub tuple: ChannelTuple,
    /// Payload bytes, base64 encoded.
    pub data64: String,
}

impl ChannelMessage {
    /// Decode a request received from the controller.
    ///
    /// # Errors
    /// Returns [`MessageError::Json`] if `text` is not a valid request object and
    /// [`MessageError::UnrecognizedMethod`] if the method is not one we serve.
    pub fn from_json(text: &str) -> Result<Self, MessageError> {
        let raw: RawChannelMessage = serde_json::from_str(text)?;
        Ok(Self {
            method: raw.method.parse()?,
            tuple: raw.tuple,
            data64: raw.data64,
        })
    }

    /// Acknowledge the pending packet with `reply` as the acknowledgement bytes.
    #[must_use]
    pub fn ack(tuple: ChannelTuple, reply: &[u8]) -> Self {
        Self::with_data(Method::Ack, tuple, reply)
    }

    /// Send `payload` over `tuple`, from `tuple.source` to `tuple.destination`.
    #[must_use]
    pub fn send(tuple: ChannelTuple, payload: &[u8]) -> Self {
        Self::with_data(Method::Send, tuple, payload)
    }

    /// Close the channel at `tuple.destination`.
    #[must_use]
    pub const fn close(tuple: ChannelTuple) -> Self {
        Self {
            method: Method::Close,
            tuple,
            data64: String::new(),
        }
    }

    fn with_data(method: Method, tuple: ChannelTuple, data: &[u8]) -> Self {
        Self {
            method,
            tuple,
            data64: STANDARD.encode(data),
        }
    }

    /// The decoded payload.
    ///
    /// Undecodable base64 is logged and read as an empty payload; it never
    /// fails the request.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        match STANDARD.decode(&self.data64) {
            Ok(data) => data,
            Err(error) => {
                tracing::warn!(data64 = %self.data64, %error, "could not decode packet data");
                Vec::new()
            }
        }
    }

    /// Render the request as wire text.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(self)?)
    }
}
