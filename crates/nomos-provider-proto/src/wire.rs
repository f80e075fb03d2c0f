// SPDX-License-Identifier: MIT OR Apache-2.0
//! The provider RPC wire contract (spec §6): request/response envelopes
//! and the standard error-category taxonomy, carried as newline-delimited
//! JSON over a loopback TCP connection.

use nomos_core::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard RPC error categories (spec §6), independent of transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcErrorCategory {
    /// A request argument was malformed.
    InvalidArgument,
    /// The requested path does not exist in the provider's data.
    NotFound,
    /// The provider cannot service the request in its current state
    /// (e.g. `Fetch` called before `Init`).
    FailedPrecondition,
    /// The caller is not permitted to perform the operation.
    PermissionDenied,
    /// The call's deadline elapsed before a response arrived.
    DeadlineExceeded,
    /// The provider is temporarily unavailable.
    Unavailable,
    /// An unexpected internal error in the provider.
    Internal,
    /// The call was cancelled by the caller.
    Cancelled,
}

impl fmt::Display for RpcErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::FailedPrecondition => "failed_precondition",
            Self::PermissionDenied => "permission_denied",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// An error returned by a provider over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorWire {
    /// The error's category.
    pub category: RpcErrorCategory,
    /// Human-readable message.
    pub message: String,
}

/// `Health`'s reported status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// No status has been determined yet.
    Unspecified,
    /// The provider is healthy.
    Ok,
    /// The provider is reachable but degraded.
    Degraded,
    /// The provider is still starting up.
    Starting,
}

/// A single RPC operation a provider can be asked to perform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RequestOp {
    /// Initialize the provider. Must be called exactly once before the
    /// first `Fetch`.
    Init {
        /// Alias this provider is registered under.
        alias: String,
        /// Free-form configuration for this provider instance.
        config: std::collections::BTreeMap<String, Value>,
        /// Absolute path of the source file that declared this provider.
        source_file_path: String,
    },
    /// Fetch a value at the given path. May be called concurrently.
    Fetch {
        /// Path segments to fetch.
        path: Vec<String>,
    },
    /// Retrieve static provider identity info. Callable any time.
    Info,
    /// Retrieve current health. Callable even before `Init`.
    Health,
    /// Request graceful shutdown. Best-effort; caller must tolerate
    /// failure.
    Shutdown,
}

/// A request envelope: a correlation id plus the operation.
///
/// The id lets a single connection multiplex concurrent `Fetch` calls
/// (spec §4.4/§5) without requiring one connection per in-flight call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Correlation id, unique per in-flight request on this connection.
    pub id: u64,
    /// The operation being requested.
    pub op: RequestOp,
}

/// Static provider identity, returned by `Info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Alias this provider is registered under.
    pub alias: String,
    /// Provider implementation version.
    pub version: String,
    /// Provider type name.
    pub r#type: String,
}

/// Health check result, returned by `Health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Current status.
    pub status: HealthStatus,
    /// Human-readable detail.
    pub message: String,
}

/// The successful payload of a response, one per [`RequestOp`] variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ResponseOp {
    /// `Init` succeeded.
    Init,
    /// `Fetch` succeeded, carrying the fetched value.
    Fetch {
        /// The fetched value.
        value: Value,
    },
    /// `Info` succeeded.
    Info(ProviderInfo),
    /// `Health` succeeded.
    Health(HealthReport),
    /// `Shutdown` succeeded.
    Shutdown,
}

/// A response envelope: either a successful payload or an error, tagged
/// with the correlation id of the request it answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Correlation id matching the originating [`RpcRequest`].
    pub id: u64,
    /// Outcome of the operation.
    pub result: RpcResult,
}

/// The `Ok`/`Err` outcome of an [`RpcResponse`], spelled out explicitly
/// because `Result` does not serialize the way the wire format wants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RpcResult {
    /// The operation succeeded.
    Ok {
        /// The successful payload.
        payload: ResponseOp,
    },
    /// The operation failed.
    Err {
        /// The error detail.
        error: RpcErrorWire,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_through_json() {
        let req = RpcRequest {
            id: 7,
            op: RequestOp::Fetch {
                path: vec!["a".into(), "b".into()],
            },
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: RpcRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, 7);
        assert!(matches!(back.op, RequestOp::Fetch { .. }));
    }

    #[test]
    fn error_response_round_trips() {
        let resp = RpcResponse {
            id: 3,
            result: RpcResult::Err {
                error: RpcErrorWire {
                    category: RpcErrorCategory::NotFound,
                    message: "no such path".into(),
                },
            },
        };
        let json = serde_json::to_string(&resp).unwrap();
        let back: RpcResponse = serde_json::from_str(&json).unwrap();
        match back.result {
            RpcResult::Err { error } => assert_eq!(error.category, RpcErrorCategory::NotFound),
            RpcResult::Ok { .. } => panic!("expected error"),
        }
    }
}
