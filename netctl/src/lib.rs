//! Wallet network controller.
//!
//! Keeps a wallet pointed at one Ethereum-style network at a time. The
//! [`network::NetworkController`] switches between hosted, local, custom and
//! private networks, resolves which network an endpoint is actually on, and
//! hands out provider and block-tracker handles that survive every switch.
//!
//! The `netctl` binary wraps the controller in a CLI and a small HTTP API.

pub mod cmd;
pub mod config;
pub mod error;
pub mod network;
pub mod routes;
pub mod shutdown;
pub mod store;
pub mod telemetry;
