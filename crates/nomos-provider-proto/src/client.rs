// SPDX-License-Identifier: MIT OR Apache-2.0
//! The typed RPC client a subprocess manager uses to talk to a running
//! provider over its loopback TCP port (spec §4.4, C4).

use crate::wire::{
    HealthReport, ProviderInfo, RequestOp, ResponseOp, RpcErrorCategory, RpcRequest, RpcResponse,
    RpcResult,
};
use nomos_core::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

/// Errors from talking to a provider over RPC.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Could not connect to the provider's port.
    #[error("failed to connect to provider at 127.0.0.1:{port}: {source}")]
    Connect {
        /// The port that was dialed.
        port: u16,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the request failed.
    #[error("failed to send request to provider: {0}")]
    Send(#[source] std::io::Error),

    /// The connection closed before a response arrived.
    #[error("provider closed the connection before responding")]
    ConnectionClosed,

    /// Reading the response failed.
    #[error("failed to read response from provider: {0}")]
    Recv(#[source] std::io::Error),

    /// The response was not valid JSON, or did not match the expected shape.
    #[error("malformed response from provider: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The response's correlation id did not match the request's.
    #[error("response id {got} did not match request id {want}")]
    IdMismatch {
        /// Id the request was sent with.
        want: u64,
        /// Id the response carried.
        got: u64,
    },

    /// The response carried a payload for a different operation than
    /// the one requested.
    #[error("provider returned a mismatched response shape")]
    ShapeMismatch,

    /// The provider returned an RPC-level error.
    #[error("provider returned {category}: {message}")]
    Provider {
        /// Error category from the wire contract.
        category: RpcErrorCategory,
        /// Human-readable detail.
        message: String,
    },
}

/// A connection to a running provider's RPC port.
///
/// Requests are written and responses read sequentially over one
/// connection, matching spec §4.4's model where the subprocess manager
/// (not this client) owns any pooling or concurrency policy above a
/// single provider instance.
pub struct ProviderClient {
    writer: WriteHalf<TcpStream>,
    reader: BufReader<ReadHalf<TcpStream>>,
    next_id: AtomicU64,
}

impl ProviderClient {
    /// Connect to a provider listening on `127.0.0.1:<port>`.
    pub async fn connect(port: u16) -> Result<Self, RpcError> {
        let stream = TcpStream::connect(("127.0.0.1", port))
            .await
            .map_err(|source| RpcError::Connect { port, source })?;
        let (read_half, write_half) = tokio::io::split(stream);
        Ok(Self {
            writer: write_half,
            reader: BufReader::new(read_half),
            next_id: AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn call(&mut self, op: RequestOp) -> Result<ResponseOp, RpcError> {
        let id = self.next_id();
        let request = RpcRequest { id, op };
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(RpcError::Send)?;
        self.writer.flush().await.map_err(RpcError::Send)?;

        let mut buf = String::new();
        let n = self
            .reader
            .read_line(&mut buf)
            .await
            .map_err(RpcError::Recv)?;
        if n == 0 {
            return Err(RpcError::ConnectionClosed);
        }
        let response: RpcResponse = serde_json::from_str(buf.trim_end())?;
        if response.id != id {
            return Err(RpcError::IdMismatch {
                want: id,
                got: response.id,
            });
        }
        match response.result {
            RpcResult::Ok { payload } => Ok(payload),
            RpcResult::Err { error } => Err(RpcError::Provider {
                category: error.category,
                message: error.message,
            }),
        }
    }

    /// Initialize the provider. Must be called exactly once before the
    /// first [`Self::fetch`].
    pub async fn init(
        &mut self,
        alias: &str,
        config: BTreeMap<String, Value>,
        source_file_path: &str,
    ) -> Result<(), RpcError> {
        let op = RequestOp::Init {
            alias: alias.to_string(),
            config,
            source_file_path: source_file_path.to_string(),
        };
        match self.call(op).await? {
            ResponseOp::Init => {
                debug!(target: "nomos.provider_proto", alias, "provider initialized");
                Ok(())
            }
            _ => Err(RpcError::ShapeMismatch),
        }
    }

    /// Fetch the value at `path`. May be called concurrently by the
    /// caller against distinct `ProviderClient` connections; a single
    /// connection still serializes its own requests.
    ///
    /// A provider may wrap its result in a single-key `{"value": ...}`
    /// mapping rather than returning the bare value; that wrapper is
    /// unwrapped here so callers always see the bare value (spec §4.4).
    pub async fn fetch(&mut self, path: &[String]) -> Result<Value, RpcError> {
        let op = RequestOp::Fetch {
            path: path.to_vec(),
        };
        match self.call(op).await? {
            ResponseOp::Fetch { value } => Ok(unwrap_value_envelope(value)),
            _ => Err(RpcError::ShapeMismatch),
        }
    }

    /// Retrieve static provider identity. Callable at any time.
    pub async fn info(&mut self) -> Result<ProviderInfo, RpcError> {
        match self.call(RequestOp::Info).await? {
            ResponseOp::Info(info) => Ok(info),
            _ => Err(RpcError::ShapeMismatch),
        }
    }

    /// Retrieve current health. Callable even before [`Self::init`].
    pub async fn health(&mut self) -> Result<HealthReport, RpcError> {
        match self.call(RequestOp::Health).await? {
            ResponseOp::Health(report) => Ok(report),
            _ => Err(RpcError::ShapeMismatch),
        }
    }

    /// Request graceful shutdown. Best-effort: callers should tolerate
    /// this failing, since the provider may already be exiting.
    pub async fn shutdown(&mut self) -> Result<(), RpcError> {
        match self.call(RequestOp::Shutdown).await {
            Ok(ResponseOp::Shutdown) => Ok(()),
            Ok(_) => Err(RpcError::ShapeMismatch),
            Err(e) => Err(e),
        }
    }
}

/// Unwrap a provider's single-key `{"value": <inner>}` response
/// envelope, if present, leaving any other shape untouched.
fn unwrap_value_envelope(value: Value) -> Value {
    if let Value::Mapping(map) = &value {
        if map.len() == 1 {
            if let Some(inner) = map.get("value") {
                return inner.clone();
            }
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{HealthStatus, RpcErrorWire};
    use std::collections::BTreeMap as StdBTreeMap;
    use tokio::net::TcpListener;

    async fn spawn_responder<F, Fut>(handler: F) -> u16
    where
        F: FnOnce(TcpStream) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            handler(stream).await;
        });
        port
    }

    async fn read_request(stream: &mut TcpStream) -> RpcRequest {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        serde_json::from_str(line.trim_end()).unwrap()
    }

    async fn write_response(stream: &mut TcpStream, response: &RpcResponse) {
        let mut line = serde_json::to_string(response).unwrap();
        line.push('\n');
        stream.write_all(line.as_bytes()).await.unwrap();
    }

    #[tokio::test]
    async fn fetch_unwraps_single_key_value_envelope() {
        let port = spawn_responder(|mut stream| async move {
            let req = read_request(&mut stream).await;
            let id = req.id;
            let mut wrapped = StdBTreeMap::new();
            wrapped.insert("value".to_string(), Value::Int(42));
            write_response(
                &mut stream,
                &RpcResponse {
                    id,
                    result: RpcResult::Ok {
                        payload: ResponseOp::Fetch {
                            value: Value::Mapping(wrapped),
                        },
                    },
                },
            )
            .await;
        })
        .await;

        let mut client = ProviderClient::connect(port).await.unwrap();
        let value = client.fetch(&["a".to_string()]).await.unwrap();
        assert_eq!(value, Value::Int(42));
    }

    #[tokio::test]
    async fn provider_error_surfaces_as_rpc_error() {
        let port = spawn_responder(|mut stream| async move {
            let req = read_request(&mut stream).await;
            write_response(
                &mut stream,
                &RpcResponse {
                    id: req.id,
                    result: RpcResult::Err {
                        error: RpcErrorWire {
                            category: RpcErrorCategory::NotFound,
                            message: "no such path".into(),
                        },
                    },
                },
            )
            .await;
        })
        .await;

        let mut client = ProviderClient::connect(port).await.unwrap();
        let err = client.fetch(&["missing".to_string()]).await.unwrap_err();
        match err {
            RpcError::Provider { category, .. } => assert_eq!(category, RpcErrorCategory::NotFound),
            other => panic!("expected Provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn health_callable_without_init() {
        let port = spawn_responder(|mut stream| async move {
            let req = read_request(&mut stream).await;
            assert!(matches!(req.op, RequestOp::Health));
            write_response(
                &mut stream,
                &RpcResponse {
                    id: req.id,
                    result: RpcResult::Ok {
                        payload: ResponseOp::Health(HealthReport {
                            status: HealthStatus::Starting,
                            message: "warming up".into(),
                        }),
                    },
                },
            )
            .await;
        })
        .await;

        let mut client = ProviderClient::connect(port).await.unwrap();
        let report = client.health().await.unwrap();
        assert_eq!(report.status, HealthStatus::Starting);
    }

    #[tokio::test]
    async fn connection_closed_before_response_is_reported() {
        let port = spawn_responder(|stream| async move {
            drop(stream);
        })
        .await;

        let mut client = ProviderClient::connect(port).await.unwrap();
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, RpcError::ConnectionClosed));
    }

    #[tokio::test]
    async fn mismatched_response_id_is_rejected() {
        let port = spawn_responder(|mut stream| async move {
            let req = read_request(&mut stream).await;
            write_response(
                &mut stream,
                &RpcResponse {
                    id: req.id + 1,
                    result: RpcResult::Ok {
                        payload: ResponseOp::Health(HealthReport {
                            status: HealthStatus::Ok,
                            message: String::new(),
                        }),
                    },
                },
            )
            .await;
        })
        .await;

        let mut client = ProviderClient::connect(port).await.unwrap();
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, RpcError::IdMismatch { .. }));
    }
}
