//! Evaluation of `svelte.config.js` and other code-based config files.

use serde_json::Value;
use std::path::Path;
use velin_atelier::ConfigError;

use crate::bridge::{NodeBridge, Request};

/// Evaluates dynamic config files in Node.js.
///
/// Functions cannot cross the process boundary, so every entry of a
/// `preprocess` list comes back as a `{ "config": <file>, "index": <n> }`
/// descriptor that the bridge resolves again when preprocessing.
#[derive(Debug, Clone)]
pub struct ScriptConfigEvaluator {
    bridge: NodeBridge,
}

impl ScriptConfigEvaluator {
    pub fn new(bridge: NodeBridge) -> Self {
        Self { bridge }
    }

    pub async fn evaluate(&self, file: &Path) -> Result<Value, ConfigError> {
        tracing::debug!("evaluating config {}", file.display());
        let request = Request::Config {
            root: self.bridge.project_root(),
            file,
        };
        let evaluate_error = |message: String| ConfigError::Evaluate {
            path: file.to_path_buf(),
            message,
        };

        match self.bridge.call::<Value>(&request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(raw)) => Err(evaluate_error(raw.to_string())),
            Err(err) => Err(evaluate_error(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_failure_is_evaluate_error() {
        let evaluator = ScriptConfigEvaluator::new(NodeBridge::new("/nonexistent/node", "/tmp"));
        let err = evaluator
            .evaluate(Path::new("/tmp/svelte.config.js"))
            .await
            .unwrap_err();

        match err {
            ConfigError::Evaluate { path, message } => {
                assert_eq!(path, Path::new("/tmp/svelte.config.js"));
                assert!(message.starts_with("failed to spawn"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
