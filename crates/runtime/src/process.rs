//! Automation-tool child-process management.
//!
//! The tool is an externally installed command (for example a Playwright-
//! based automation server) speaking the protocol on its stdio. Resolution
//! order: runtime environment overrides first, then the configured command.

use std::process::Stdio;

use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable overriding the automation-tool command.
pub const TOOL_CMD_ENV: &str = "SCOUT_TOOL_CMD";
/// Environment variable overriding the automation-tool arguments
/// (whitespace-separated).
pub const TOOL_ARGS_ENV: &str = "SCOUT_TOOL_ARGS";

/// Command line used to launch the automation tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolProcessConfig {
	/// Executable name or path.
	pub command: String,
	/// Arguments passed to the executable.
	pub args: Vec<String>,
}

impl ToolProcessConfig {
	pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
		Self {
			command: command.into(),
			args,
		}
	}

	/// Resolves the effective command: environment overrides win over the
	/// configured default.
	pub fn resolve(default: &ToolProcessConfig) -> ToolProcessConfig {
		Self::resolve_from(
			std::env::var(TOOL_CMD_ENV).ok(),
			std::env::var(TOOL_ARGS_ENV).ok(),
			default,
		)
	}

	fn resolve_from(
		command: Option<String>,
		args: Option<String>,
		default: &ToolProcessConfig,
	) -> ToolProcessConfig {
		match command {
			Some(command) if !command.trim().is_empty() => {
				let args = args
					.map(|raw| {
						raw.split_whitespace()
							.map(str::to_string)
							.collect::<Vec<_>>()
					})
					.unwrap_or_default();
				debug!(target: "scout_runtime", %command, "using automation tool from environment");
				ToolProcessConfig::new(command, args)
			}
			_ => default.clone(),
		}
	}

	/// Spawns the tool with piped stdin/stdout. Stderr is inherited so the
	/// tool's own diagnostics reach the operator directly.
	pub fn spawn(&self) -> Result<SpawnedTool> {
		let mut child = Command::new(&self.command)
			.args(&self.args)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::inherit())
			.kill_on_drop(true)
			.spawn()
			.map_err(|error| {
				Error::SpawnFailed(format!("could not start '{}': {error}", self.command))
			})?;

		let stdin = child
			.stdin
			.take()
			.ok_or_else(|| Error::SpawnFailed("child stdin was not piped".to_string()))?;
		let stdout = child
			.stdout
			.take()
			.ok_or_else(|| Error::SpawnFailed("child stdout was not piped".to_string()))?;

		Ok(SpawnedTool {
			child,
			stdin,
			stdout,
		})
	}
}

impl Default for ToolProcessConfig {
	fn default() -> Self {
		Self::new("scout-browser-tool", Vec::new())
	}
}

/// A running automation-tool process with its stdio halves detached.
pub struct SpawnedTool {
	pub child: Child,
	pub stdin: ChildStdin,
	pub stdout: ChildStdout,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn resolve_prefers_environment_override() {
		let resolved = ToolProcessConfig::resolve_from(
			Some("npx".to_string()),
			Some("@automation/server --headless".to_string()),
			&ToolProcessConfig::default(),
		);
		assert_eq!(resolved.command, "npx");
		assert_eq!(resolved.args, vec!["@automation/server", "--headless"]);
	}

	#[test]
	fn resolve_falls_back_to_configured_default() {
		let default = ToolProcessConfig::new("my-tool", vec!["--port".to_string()]);
		let resolved = ToolProcessConfig::resolve_from(None, None, &default);
		assert_eq!(resolved, default);

		// A blank override does not shadow the default.
		let resolved = ToolProcessConfig::resolve_from(Some("  ".to_string()), None, &default);
		assert_eq!(resolved, default);
	}

	#[tokio::test]
	async fn spawn_failure_is_a_connection_error() {
		let config = ToolProcessConfig::new("definitely-not-a-real-binary-scout", Vec::new());
		let error = config.spawn().unwrap_err();
		assert!(error.is_connection_failure());
	}
}
