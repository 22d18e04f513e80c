#![doc = include_str!("../README.md")]
#![deny(clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod controller;
pub mod ledger;
pub mod logging;
pub mod replay;
