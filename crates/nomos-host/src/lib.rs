// SPDX-License-Identifier: MIT OR Apache-2.0
//! nomos-host
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The subprocess manager (spec §4.5, C5): a per-alias single-subprocess
//! pool with double-checked locking. Spawns provider binaries, parses
//! their `PROVIDER_PORT=<n>` handshake, owns the resulting RPC client,
//! and tears everything down on [`ProviderHost::shutdown`].

/// Exponential-backoff retry wrapper around [`ProviderHost::get_provider`].
pub mod retry;

use nomos_provider_proto::{ProviderClient, RpcError};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// How long to wait, per alias, for the `PROVIDER_PORT=<n>` handshake
/// line before giving up.
#[derive(Debug, Clone, Copy)]
pub struct HandshakeTimeout(pub Duration);

impl Default for HandshakeTimeout {
    fn default() -> Self {
        Self(Duration::from_secs(10))
    }
}

/// How long [`ProviderHost::shutdown`] waits for each subprocess to
/// exit gracefully before force-killing it.
#[derive(Debug, Clone, Copy)]
pub struct ShutdownTimeout(pub Duration);

impl Default for ShutdownTimeout {
    fn default() -> Self {
        Self(Duration::from_secs(5))
    }
}

/// Errors from starting, using, or stopping a provider subprocess.
#[derive(Debug, Error)]
pub enum HostError {
    /// The provider binary does not exist or is not a regular file.
    #[error("provider binary missing at {path}: {source}")]
    BinaryMissing {
        /// Path that was stat'd.
        path: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Spawning the subprocess failed.
    #[error("failed to spawn provider binary at {path}: {source}")]
    Spawn {
        /// Path of the binary that failed to spawn.
        path: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The subprocess exited (or its stdout closed) before printing a
    /// handshake line.
    #[error("provider {alias:?} closed stdout before announcing its port")]
    NoHandshake {
        /// Alias the handshake was expected for.
        alias: String,
    },

    /// A handshake line was read but did not parse as `PROVIDER_PORT=<n>`
    /// with `n` in `1..65535`.
    #[error("provider {alias:?} sent a malformed handshake line: {line:?}")]
    BadHandshake {
        /// Alias the handshake was expected for.
        alias: String,
        /// The offending line.
        line: String,
    },

    /// The handshake did not complete within [`HandshakeTimeout`].
    #[error("provider {alias:?} did not complete its handshake within the timeout")]
    HandshakeTimedOut {
        /// Alias the handshake was expected for.
        alias: String,
    },

    /// Connecting to, or calling `Health` on, the freshly spawned
    /// provider failed.
    #[error("provider {alias:?} failed its post-handshake health check: {source}")]
    HealthCheckFailed {
        /// Alias being started.
        alias: String,
        /// Underlying RPC error.
        #[source]
        source: RpcError,
    },

    /// An RPC call against an already-running provider failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// No provider is registered under this alias.
    #[error("no provider is running under alias {0:?}")]
    UnknownAlias(String),
}

/// A running provider subprocess: its child handle plus its RPC client.
///
/// Opaque to callers outside this crate; obtained from and passed back
/// through [`ProviderHost`] only.
pub struct ProcessHandle {
    child: Mutex<Child>,
    client: Mutex<ProviderClient>,
}

/// Owns every provider subprocess launched during one compile run.
///
/// Modeled as a `mapping<alias, ProcessHandle>` behind an `RwLock` with
/// double-checked lazy initialization: [`Self::get_provider`] takes a
/// read lock first and returns immediately on a cache hit, only
/// escalating to a write lock (with a re-check) to spawn.
pub struct ProviderHost {
    processes: RwLock<BTreeMap<String, Arc<ProcessHandle>>>,
    handshake_timeout: HandshakeTimeout,
    shutdown_timeout: ShutdownTimeout,
}

impl ProviderHost {
    /// Create an empty host with default timeouts.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeouts(HandshakeTimeout::default(), ShutdownTimeout::default())
    }

    /// Create an empty host with explicit timeouts.
    #[must_use]
    pub fn with_timeouts(handshake: HandshakeTimeout, shutdown: ShutdownTimeout) -> Self {
        Self {
            processes: RwLock::new(BTreeMap::new()),
            handshake_timeout: handshake,
            shutdown_timeout: shutdown,
        }
    }

    /// Get (starting if necessary) the RPC client for `alias`, spawning
    /// `binary_path` on first use.
    ///
    /// Repeated calls for the same alias after the first success are
    /// O(1) lock-read operations returning the cached client.
    pub async fn get_provider(
        &self,
        alias: &str,
        binary_path: &Path,
    ) -> Result<Arc<ProcessHandle>, HostError> {
        if let Some(handle) = self.processes.read().await.get(alias) {
            return Ok(Arc::clone(handle));
        }

        let mut processes = self.processes.write().await;
        if let Some(handle) = processes.get(alias) {
            return Ok(Arc::clone(handle));
        }

        let handle = Arc::new(self.start(alias, binary_path).await?);
        processes.insert(alias.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    async fn start(&self, alias: &str, binary_path: &Path) -> Result<ProcessHandle, HostError> {
        tokio::fs::metadata(binary_path)
            .await
            .map_err(|source| HostError::BinaryMissing {
                path: binary_path.display().to_string(),
                source,
            })?;

        let mut child = Command::new(binary_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| HostError::Spawn {
                path: binary_path.display().to_string(),
                source,
            })?;

        match self.handshake(alias, &mut child).await {
            Ok(port) => match self.connect_and_check(alias, port).await {
                Ok(client) => Ok(ProcessHandle {
                    child: Mutex::new(child),
                    client: Mutex::new(client),
                }),
                Err(e) => {
                    Self::kill_and_reap(&mut child).await;
                    Err(e)
                }
            },
            Err(e) => {
                Self::kill_and_reap(&mut child).await;
                Err(e)
            }
        }
    }

    async fn handshake(&self, alias: &str, child: &mut Child) -> Result<u16, HostError> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HostError::NoHandshake {
                alias: alias.to_string(),
            })?;
        let mut reader = BufReader::new(stdout);

        let read_loop = async {
            let mut line = String::new();
            loop {
                line.clear();
                let n = reader
                    .read_line(&mut line)
                    .await
                    .map_err(|_| HostError::NoHandshake {
                        alias: alias.to_string(),
                    })?;
                if n == 0 {
                    return Err(HostError::NoHandshake {
                        alias: alias.to_string(),
                    });
                }
                let trimmed = line.trim_end();
                if let Some(port_str) = trimmed.strip_prefix("PROVIDER_PORT=") {
                    let port: u16 =
                        port_str
                            .parse()
                            .map_err(|_| HostError::BadHandshake {
                                alias: alias.to_string(),
                                line: trimmed.to_string(),
                            })?;
                    if port == 0 {
                        return Err(HostError::BadHandshake {
                            alias: alias.to_string(),
                            line: trimmed.to_string(),
                        });
                    }
                    return Ok(port);
                }
                // Non-handshake stdout line: ignored per spec §4.4/§6.
            }
        };

        match tokio::time::timeout(self.handshake_timeout.0, read_loop).await {
            Ok(result) => result,
            Err(_) => Err(HostError::HandshakeTimedOut {
                alias: alias.to_string(),
            }),
        }
    }

    async fn connect_and_check(
        &self,
        alias: &str,
        port: u16,
    ) -> Result<ProviderClient, HostError> {
        let mut client =
            ProviderClient::connect(port)
                .await
                .map_err(|source| HostError::HealthCheckFailed {
                    alias: alias.to_string(),
                    source,
                })?;
        client
            .health()
            .await
            .map_err(|source| HostError::HealthCheckFailed {
                alias: alias.to_string(),
                source,
            })?;
        debug!(target: "nomos.host", alias, port, "provider started and healthy");
        Ok(client)
    }

    async fn kill_and_reap(child: &mut Child) {
        let _ = child.start_kill();
        let _ = child.wait().await;
    }

    /// Call `Init` against the running provider for `alias`. Must be
    /// called exactly once, after [`Self::get_provider`] has spawned it
    /// and before the first [`Self::fetch`].
    pub async fn init(
        &self,
        alias: &str,
        config: BTreeMap<String, nomos_core::Value>,
        source_file_path: &str,
    ) -> Result<(), HostError> {
        let handle = self
            .processes
            .read()
            .await
            .get(alias)
            .cloned()
            .ok_or_else(|| HostError::UnknownAlias(alias.to_string()))?;
        let mut client = handle.client.lock().await;
        Ok(client.init(alias, config, source_file_path).await?)
    }

    /// Call `Fetch` against the running provider for `alias`.
    pub async fn fetch(
        &self,
        alias: &str,
        path: &[String],
    ) -> Result<nomos_core::Value, HostError> {
        let handle = self
            .processes
            .read()
            .await
            .get(alias)
            .cloned()
            .ok_or_else(|| HostError::UnknownAlias(alias.to_string()))?;
        let mut client = handle.client.lock().await;
        Ok(client.fetch(path).await?)
    }

    /// Shut down every running provider.
    ///
    /// Each alias gets [`ShutdownTimeout`] to exit after an RPC
    /// `Shutdown` call; on timeout the subprocess is force-killed.
    /// Errors from individual providers are accumulated and joined
    /// rather than aborting the sweep early.
    pub async fn shutdown(&self) -> Result<(), HostShutdownError> {
        let mut processes = self.processes.write().await;
        let mut errors = Vec::new();

        for (alias, handle) in processes.iter() {
            if let Err(e) = self.shutdown_one(alias, handle).await {
                errors.push(e);
            }
        }
        processes.clear();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(HostShutdownError { errors })
        }
    }

    async fn shutdown_one(
        &self,
        alias: &str,
        handle: &Arc<ProcessHandle>,
    ) -> Result<(), String> {
        {
            let mut client = handle.client.lock().await;
            if let Err(e) = client.shutdown().await {
                warn!(target: "nomos.host", alias, error = %e, "provider shutdown RPC failed, proceeding to wait");
            }
        }

        let mut child = handle.child.lock().await;
        let waited = tokio::time::timeout(self.shutdown_timeout.0, child.wait()).await;
        match waited {
            Ok(Ok(_status)) => Ok(()),
            Ok(Err(e)) if is_benign_wait_error(&e) => Ok(()),
            Ok(Err(e)) => Err(format!("provider {alias:?} wait failed: {e}")),
            Err(_) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                Err(format!("provider {alias:?} forcefully terminated after shutdown timeout"))
            }
        }
    }
}

impl Default for ProviderHost {
    fn default() -> Self {
        Self::new()
    }
}

/// `true` for `Wait` errors that are the expected consequence of this
/// host having just killed the child itself.
fn is_benign_wait_error(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::NotFound | std::io::ErrorKind::InvalidInput
    )
}

/// Joined errors from [`ProviderHost::shutdown`], one per alias that
/// failed to shut down cleanly.
#[derive(Debug, Error)]
#[error("{count} provider(s) failed to shut down cleanly: {joined}", count = errors.len(), joined = errors.join("; "))]
pub struct HostShutdownError {
    errors: Vec<String>,
}

impl HostShutdownError {
    /// Per-alias failure messages.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn write_script(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("provider");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn missing_binary_is_reported() {
        let host = ProviderHost::new();
        let err = host
            .get_provider("db", Path::new("/nonexistent/provider"))
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::BinaryMissing { .. }));
    }

    #[tokio::test]
    async fn exiting_before_handshake_is_no_handshake() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "exit 0");
        let host = ProviderHost::new();
        let err = host.get_provider("db", &script).await.unwrap_err();
        assert!(matches!(err, HostError::NoHandshake { .. }));
    }

    #[tokio::test]
    async fn malformed_handshake_line_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "echo 'PROVIDER_PORT=not-a-number'");
        let host = ProviderHost::new();
        let err = host.get_provider("db", &script).await.unwrap_err();
        assert!(matches!(err, HostError::BadHandshake { .. }));
    }

    #[tokio::test]
    async fn non_handshake_lines_before_the_real_one_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        // Port 0 is itself invalid, so this line is skipped, then the
        // script exits without ever printing a valid one.
        let script = write_script(&dir, "echo 'hello from provider'\nexit 0");
        let host = ProviderHost::new();
        let err = host.get_provider("db", &script).await.unwrap_err();
        assert!(matches!(err, HostError::NoHandshake { .. }));
    }

    #[tokio::test]
    async fn fetch_against_unknown_alias_is_rejected() {
        let host = ProviderHost::new();
        let err = host.fetch("ghost", &["a".to_string()]).await.unwrap_err();
        assert!(matches!(err, HostError::UnknownAlias(alias) if alias == "ghost"));
    }

    #[tokio::test]
    async fn shutdown_of_an_empty_host_is_a_no_op() {
        let host = ProviderHost::new();
        host.shutdown().await.unwrap();
    }
}
