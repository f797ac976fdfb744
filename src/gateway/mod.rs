//! Network file-transfer gateway
//!
//! Lifecycle supervision and connection acceptance for the service exposing
//! the sandboxed workspace filesystem to authenticated external clients.

pub mod acceptor;
pub mod lifecycle;

pub use lifecycle::{Gateway, GatewayState, GatewayStatus};
