//! Providers Module - External Collaborators
//!
//! Chain/wallet interfaces and the JSON-RPC implementation of the read side.

pub mod client;
pub mod rpc;

pub use client::*;
pub use rpc::*;
