//! Node.js process bridge.
//!
//! Every call spawns `node` with an embedded script, writes a single JSON
//! request to its stdin and reads a single JSON response from its stdout.
//! Calls share nothing, so any number of them can run at once.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use velin_atelier::{CompilerOptions, PreprocessStep, RawDiagnostic};

/// Script run by `node -e` for every bridge call.
pub const BRIDGE_SCRIPT: &str = include_str!("bridge.js");

/// Environment variable overriding the Node.js executable.
pub const NODE_ENV_VAR: &str = "VELIN_NODE";

/// Error type for bridge operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// No Node.js executable could be found.
    #[error("node executable not found (install Node.js or set VELIN_NODE)")]
    NodeNotFound,

    /// The process could not be started.
    #[error("failed to spawn {}: {source}", .node.display())]
    Spawn {
        node: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the request or collecting the response failed.
    #[error("bridge I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The script crashed before producing a response.
    #[error("bridge exited with {status}: {stderr}")]
    Exited {
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// The response was not valid JSON or had an unexpected shape.
    #[error("malformed bridge response: {0}")]
    Protocol(#[from] serde_json::Error),
}

impl From<BridgeError> for RawDiagnostic {
    fn from(err: BridgeError) -> Self {
        RawDiagnostic {
            name: Some("BridgeError".into()),
            ..RawDiagnostic::new(err.to_string())
        }
    }
}

/// A request understood by the bridge script.
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub(crate) enum Request<'a> {
    Compile {
        root: &'a Path,
        code: &'a str,
        options: &'a CompilerOptions,
    },
    Preprocess {
        root: &'a Path,
        code: &'a str,
        steps: &'a [PreprocessStep],
        options: &'a CompilerOptions,
    },
    Config {
        root: &'a Path,
        file: &'a Path,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
enum Response {
    Ok(Value),
    Error(RawDiagnostic),
}

/// Decode a response body. The outer error is a protocol failure; the inner
/// one is a diagnostic raised by the compiler or preprocessor.
pub(crate) fn decode_response<T: DeserializeOwned>(
    body: &[u8],
) -> Result<Result<T, RawDiagnostic>, BridgeError> {
    match serde_json::from_slice(body)? {
        Response::Ok(value) => Ok(Ok(serde_json::from_value(value)?)),
        Response::Error(raw) => Ok(Err(raw)),
    }
}

/// Handle to a Node.js executable, scoped to one project.
#[derive(Debug, Clone)]
pub struct NodeBridge {
    node: PathBuf,
    project_root: PathBuf,
}

impl NodeBridge {
    pub fn new(node: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            node: node.into(),
            project_root: project_root.into(),
        }
    }

    /// Find `node` via `VELIN_NODE`, then `PATH`.
    pub fn locate(project_root: impl Into<PathBuf>) -> Result<Self, BridgeError> {
        if let Some(path) = std::env::var_os(NODE_ENV_VAR).map(PathBuf::from) {
            if path.exists() {
                return Ok(Self::new(path, project_root));
            }
        }

        match which::which("node") {
            Ok(path) => Ok(Self::new(path, project_root)),
            Err(_) => Err(BridgeError::NodeNotFound),
        }
    }

    pub fn node(&self) -> &Path {
        &self.node
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        request: &Request<'_>,
    ) -> Result<Result<T, RawDiagnostic>, BridgeError> {
        let payload = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.node)
            .arg("-e")
            .arg(BRIDGE_SCRIPT)
            .current_dir(&self.project_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BridgeError::Spawn {
                node: self.node.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(BridgeError::Exited {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tracing::debug!("bridge response: {} bytes", output.stdout.len());
        decode_response(&output.stdout)
    }
}
