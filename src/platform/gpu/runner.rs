//! Execution of the SMI tool with a hard timeout.
//!
//! Every failure (spawn error, timeout, non-zero exit, undecodable output) is
//! downgraded to an empty result so callers never special-case a query.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::process::Command;

use crate::error::{MonitorError, Result};

/// Hard limit for a single tool invocation.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Flag that switches rocm-smi to machine-readable output.
pub const JSON_FLAG: &str = "--json";

/// Output of one tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    Structured(Map<String, Value>),
    Raw(String),
}

impl CommandOutput {
    fn empty(structured: bool) -> Self {
        if structured {
            CommandOutput::Structured(Map::new())
        } else {
            CommandOutput::Raw(String::new())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CommandOutput::Structured(map) => map.is_empty(),
            CommandOutput::Raw(text) => text.is_empty(),
        }
    }

    /// The key-value mapping, or an empty one for raw output.
    pub fn into_structured(self) -> Map<String, Value> {
        match self {
            CommandOutput::Structured(map) => map,
            CommandOutput::Raw(_) => Map::new(),
        }
    }

    pub fn into_text(self) -> String {
        match self {
            CommandOutput::Raw(text) => text,
            CommandOutput::Structured(map) => {
                if map.is_empty() {
                    String::new()
                } else {
                    Value::Object(map).to_string()
                }
            }
        }
    }
}

/// Runs the tool and never fails.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `tool` with `args`.
    ///
    /// When `want_structured` is set, `--json` is appended (unless already present)
    /// and stdout is decoded into a mapping. Any failure yields an empty mapping or
    /// empty text.
    pub async fn run(&self, tool: &Path, args: &[&str], want_structured: bool) -> CommandOutput {
        match self.try_run(tool, args, want_structured).await {
            Ok(output) => output,
            Err(e) => {
                log::debug!("{} {} failed: {}", tool.display(), args.join(" "), e);
                CommandOutput::empty(want_structured)
            }
        }
    }

    pub async fn run_json(&self, tool: &Path, args: &[&str]) -> Map<String, Value> {
        self.run(tool, args, true).await.into_structured()
    }

    pub async fn run_text(&self, tool: &Path, args: &[&str]) -> String {
        self.run(tool, args, false).await.into_text()
    }

    async fn try_run(
        &self,
        tool: &Path,
        args: &[&str],
        want_structured: bool,
    ) -> Result<CommandOutput> {
        let mut cmd = Command::new(tool);
        cmd.args(args);
        if want_structured && !args.contains(&JSON_FLAG) {
            cmd.arg(JSON_FLAG);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Dropping the output future on timeout kills the child (kill_on_drop).
        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| MonitorError::command(format!("timed out after {:?}", self.timeout)))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MonitorError::command(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        if want_structured {
            decode_structured(&output.stdout).map(CommandOutput::Structured)
        } else {
            Ok(CommandOutput::Raw(
                String::from_utf8_lossy(&output.stdout).into_owned(),
            ))
        }
    }
}

/// Decode tool output into a top-level JSON object.
pub fn decode_structured(bytes: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(MonitorError::decode(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(MonitorError::decode(e.to_string())),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
