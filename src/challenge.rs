//! Solving the login-time JavaScript instrumentation challenge.
//!
//! During login the platform serves a small obfuscated JavaScript function
//! and expects its return value echoed back as proof a real browser executed
//! it. The function changes shape on the server side, so it is executed
//! rather than reimplemented: the solver extracts the function body, wraps
//! it in a harness, and evaluates it in an external `node` process. The
//! solver sits behind a trait so tests and embedders can substitute their
//! own evaluator.

use std::process::Stdio;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// Evaluates the instrumentation challenge and returns its JSON result.
#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    /// Solve the challenge contained in the served JavaScript source.
    async fn solve(&self, js_source: &str) -> Result<Value>;
}

static CHALLENGE_FN: LazyLock<Regex> = LazyLock::new(|| {
    // The served source defines exactly one nullary named function.
    Regex::new(r"(?s)function [a-zA-Z]+\(\) (\{.+\})").unwrap()
});

/// Solver that evaluates the challenge in a `node` subprocess.
pub struct NodeSolver {
    node_path: String,
}

impl NodeSolver {
    pub fn new() -> Self {
        Self {
            node_path: "node".into(),
        }
    }

    /// Use a specific interpreter binary instead of `node` from `PATH`.
    pub fn with_interpreter(node_path: impl Into<String>) -> Self {
        Self {
            node_path: node_path.into(),
        }
    }
}

impl Default for NodeSolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChallengeSolver for NodeSolver {
    async fn solve(&self, js_source: &str) -> Result<Value> {
        let body = extract_challenge_body(js_source)?;
        let script = build_harness(body);
        debug!(script_bytes = script.len(), "evaluating challenge script");

        let mut child = Command::new(&self.node_path)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::ChallengeSolver(format!("failed to spawn {}: {e}", self.node_path))
            })?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin.write_all(script.as_bytes()).await?;
        }
        drop(child.stdin.take());

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::ChallengeSolver(format!("interpreter failed: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ChallengeSolver(format!(
                "interpreter exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        parse_solver_output(&String::from_utf8_lossy(&output.stdout))
    }
}

fn extract_challenge_body(js_source: &str) -> Result<&str> {
    CHALLENGE_FN
        .captures(js_source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| {
            Error::ChallengeSolver("no challenge function found in served script".into())
        })
}

fn build_harness(body: &str) -> String {
    format!("const solve = function() {body};\nprocess.stdout.write(JSON.stringify(solve()));\n")
}

/// The harness prints exactly one JSON document; anything else means the
/// script misbehaved.
fn parse_solver_output(stdout: &str) -> Result<Value> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(Error::ChallengeSolver("interpreter produced no output".into()));
    }
    let mut lines = trimmed.lines();
    let first = lines.next().unwrap_or_default();
    if lines.next().is_some() {
        return Err(Error::ChallengeSolver(
            "interpreter produced more than one line of output".into(),
        ));
    }
    serde_json::from_str(first)
        .map_err(|e| Error::ChallengeSolver(format!("interpreter output is not JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_the_challenge_function_body() {
        let source = r#"!function(){};function fNgXq() {var x={'rf':{'a1b2':-12},'s':'sig'};return x;};"#;
        let body = extract_challenge_body(source).unwrap();
        assert!(body.starts_with('{'));
        assert!(body.contains("'rf'"));
    }

    #[test]
    fn missing_function_is_an_error() {
        let err = extract_challenge_body("var x = 1;").unwrap_err();
        assert!(matches!(err, Error::ChallengeSolver(_)));
    }

    #[test]
    fn single_json_line_parses() {
        let value = parse_solver_output(r#"{"rf":{"a":1},"s":"sig"}"#).unwrap();
        assert_eq!(value, json!({"rf": {"a": 1}, "s": "sig"}));
    }

    #[test]
    fn extra_output_is_rejected() {
        assert!(parse_solver_output("{\"a\":1}\nnoise").is_err());
        assert!(parse_solver_output("").is_err());
        assert!(parse_solver_output("undefined").is_err());
    }

    #[test]
    fn harness_wraps_body() {
        let script = build_harness("{return 42;}");
        assert!(script.contains("JSON.stringify"));
        assert!(script.contains("{return 42;}"));
    }
}
