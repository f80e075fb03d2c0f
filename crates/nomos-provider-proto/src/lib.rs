// SPDX-License-Identifier: MIT OR Apache-2.0
//! nomos-provider-proto
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The provider RPC wire contract and a typed client for it (spec §4.4,
//! §6, C4). A provider is any subprocess that, after printing its
//! handshake line, accepts newline-delimited JSON requests on a
//! loopback TCP port and answers with one response per request.

/// Typed client for a single provider connection.
pub mod client;
/// Request/response envelopes and error taxonomy.
pub mod wire;

pub use client::{ProviderClient, RpcError};
pub use wire::{
    HealthReport, HealthStatus, ProviderInfo, RequestOp, ResponseOp, RpcErrorCategory,
    RpcErrorWire, RpcRequest, RpcResponse, RpcResult,
};
