//! Network plumbing shared by adapters and strategies.
//!
//! - [`client`] — HTTP and WebSocket I/O facade ([`NetworkClient`],
//!   [`WsAssistant`], [`BlockingNetworkClient`])
//! - [`config`] — Production/testnet routing per endpoint kind
//!   ([`NetworkConfig`])

pub mod client;
pub mod config;

pub use client::{BlockingNetworkClient, NetworkClient, WsAssistant};
pub use config::{EndpointKind, Environment, NetworkConfig};
