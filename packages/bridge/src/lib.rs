#![doc = include_str!("../README.md")]
#![deny(clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod controller;
mod error;
pub mod handler;
pub mod keeper;
pub mod module;
pub mod ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::BridgeConfig;
pub use context::BridgeContext;
pub use controller::{Controller, ControllerError, PortDispatch};
pub use error::BridgeError;
pub use handler::ChannelHandler;
pub use keeper::{ExecutionContext, Keeper, KeeperError};
pub use module::IbcModule;
pub use ports::{PortCaller, PortHandler, PortRouter};

pub use dibc_bridge_types as types;
