#![doc = include_str!("../README.md")]
#![deny(clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

pub mod channel;
pub mod event;
pub mod message;
pub mod packet;

pub use channel::{ChannelEndpoint, ChannelTuple, Order};
pub use event::ControllerEvent;
pub use message::{ChannelMessage, MessageError, Method};
pub use packet::{channel_capability_path, Packet};
