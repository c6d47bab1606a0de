//! Declarative browser workflows and their executor.
//!
//! A workflow is an ordered list of [`WorkflowStep`]s. Execution is
//! strictly sequential and fail-fast: the first step that fails aborts the
//! rest of the workflow and the error propagates to the caller, who decides
//! whether other workflows should still run.

use std::sync::Arc;
use std::time::Duration;

use scout_protocol::CallToolResult;
use scout_runtime::ToolInvoker;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default per-step window.
pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 10_000;

/// Tool names the executor translates steps into.
pub mod tool_names {
	pub const NAVIGATE: &str = "browser_navigate";
	pub const NAVIGATE_BACK: &str = "browser_navigate_back";
	pub const CLICK: &str = "browser_click";
	pub const FILL: &str = "browser_fill";
	pub const WAIT_FOR: &str = "browser_wait_for";
	pub const EVALUATE: &str = "browser_evaluate";
	pub const SCREENSHOT: &str = "browser_screenshot";
	pub const PRESS_KEY: &str = "browser_press_key";
}

/// Abstract browser action of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepAction {
	Navigate,
	Click,
	Fill,
	WaitFor,
	Evaluate,
	Screenshot,
	PressKey,
	NavigateBack,
}

/// One declarative step. Immutable once constructed; `value` must already
/// be resolved (no `{{placeholders}}`) by the time the executor sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
	pub action: StepAction,
	/// Ordered fallback selectors. The step tries each until one works.
	#[serde(default)]
	pub selectors: Vec<String>,
	/// URL for navigate, text for fill, script for evaluate, key for
	/// press-key.
	#[serde(default)]
	pub value: Option<String>,
	pub description: String,
	#[serde(default = "default_timeout")]
	pub timeout_ms: u64,
}

fn default_timeout() -> u64 {
	DEFAULT_STEP_TIMEOUT_MS
}

impl WorkflowStep {
	fn new(action: StepAction, description: impl Into<String>) -> Self {
		Self {
			action,
			selectors: Vec::new(),
			value: None,
			description: description.into(),
			timeout_ms: DEFAULT_STEP_TIMEOUT_MS,
		}
	}

	pub fn navigate(url: impl Into<String>, description: impl Into<String>) -> Self {
		let mut step = Self::new(StepAction::Navigate, description);
		step.value = Some(url.into());
		step
	}

	pub fn navigate_back(description: impl Into<String>) -> Self {
		Self::new(StepAction::NavigateBack, description)
	}

	pub fn click(selector: impl Into<String>, description: impl Into<String>) -> Self {
		let mut step = Self::new(StepAction::Click, description);
		step.selectors = vec![selector.into()];
		step
	}

	pub fn fill(
		selector: impl Into<String>,
		value: impl Into<String>,
		description: impl Into<String>,
	) -> Self {
		let mut step = Self::new(StepAction::Fill, description);
		step.selectors = vec![selector.into()];
		step.value = Some(value.into());
		step
	}

	pub fn wait_for(selector: impl Into<String>, description: impl Into<String>) -> Self {
		let mut step = Self::new(StepAction::WaitFor, description);
		step.selectors = vec![selector.into()];
		step
	}

	pub fn evaluate(script: impl Into<String>, description: impl Into<String>) -> Self {
		let mut step = Self::new(StepAction::Evaluate, description);
		step.value = Some(script.into());
		step
	}

	pub fn screenshot(description: impl Into<String>) -> Self {
		Self::new(StepAction::Screenshot, description)
	}

	pub fn press_key(key: impl Into<String>, description: impl Into<String>) -> Self {
		let mut step = Self::new(StepAction::PressKey, description);
		step.value = Some(key.into());
		step
	}

	/// Adds a fallback selector tried after the existing ones.
	pub fn with_fallback(mut self, selector: impl Into<String>) -> Self {
		self.selectors.push(selector.into());
		self
	}

	pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
		self.timeout_ms = timeout_ms;
		self
	}
}

/// Executes workflows against a [`ToolInvoker`].
#[derive(Clone)]
pub struct WorkflowExecutor {
	invoker: Arc<dyn ToolInvoker>,
	settle_delay: Duration,
}

impl WorkflowExecutor {
	pub fn new(invoker: Arc<dyn ToolInvoker>) -> Self {
		Self {
			invoker,
			settle_delay: Duration::ZERO,
		}
	}

	/// Pauses after navigate/click/back steps so page transitions settle
	/// before the next step runs.
	pub fn with_settle_delay(mut self, delay: Duration) -> Self {
		self.settle_delay = delay;
		self
	}

	/// Runs all steps in order, aborting on the first failure.
	pub async fn run(&self, steps: &[WorkflowStep]) -> Result<()> {
		for step in steps {
			self.run_step(step).await?;
		}
		Ok(())
	}

	/// Runs one step within its own timeout window.
	///
	/// Returns the parsed payload for evaluate steps and `Value::Null` for
	/// everything else.
	pub async fn run_step(&self, step: &WorkflowStep) -> Result<Value> {
		debug!(target: "scout", step = %step.description, action = ?step.action, "running step");
		let window = Duration::from_millis(step.timeout_ms);
		let outcome = tokio::time::timeout(window, self.dispatch(step))
			.await
			.map_err(|_| Error::StepTimeout {
				description: step.description.clone(),
				ms: step.timeout_ms,
			})??;

		if self.settle_delay > Duration::ZERO && transitions_page(step.action) {
			tokio::time::sleep(self.settle_delay).await;
		}
		Ok(outcome)
	}

	/// Evaluates a script and parses its output as JSON.
	///
	/// Malformed output degrades to an empty object instead of failing:
	/// extraction scripts run against live third-party markup and an odd
	/// page state must not kill the workflow.
	pub async fn evaluate_json(&self, script: &str, description: &str) -> Result<Value> {
		let step = WorkflowStep::evaluate(script, description);
		self.run_step(&step).await
	}

	/// Evaluates a script and returns its raw text output.
	pub async fn evaluate_value(&self, script: &str, description: &str) -> Result<String> {
		let step = WorkflowStep::evaluate(script, description);
		let result = self.invoke_within(&step, tool_names::EVALUATE, json!({ "script": script }))
			.await?;
		Ok(result.text().unwrap_or_default().trim().to_string())
	}

	async fn dispatch(&self, step: &WorkflowStep) -> Result<Value> {
		match step.action {
			StepAction::Navigate => {
				let url = required_value(step)?;
				self.invoke(tool_names::NAVIGATE, json!({ "url": url }))
					.await?;
				Ok(Value::Null)
			}
			StepAction::NavigateBack => {
				self.invoke(tool_names::NAVIGATE_BACK, json!({})).await?;
				Ok(Value::Null)
			}
			StepAction::Click => {
				self.invoke_with_selectors(step, |selector| {
					(tool_names::CLICK, json!({ "selector": selector }))
				})
				.await?;
				Ok(Value::Null)
			}
			StepAction::Fill => {
				let value = required_value(step)?;
				self.invoke_with_selectors(step, |selector| {
					(
						tool_names::FILL,
						json!({ "selector": selector, "value": value }),
					)
				})
				.await?;
				Ok(Value::Null)
			}
			StepAction::WaitFor => {
				let timeout_ms = step.timeout_ms;
				self.invoke_with_selectors(step, move |selector| {
					(
						tool_names::WAIT_FOR,
						json!({ "selector": selector, "timeoutMs": timeout_ms }),
					)
				})
				.await?;
				Ok(Value::Null)
			}
			StepAction::Evaluate => {
				let script = required_value(step)?;
				let result = self
					.invoke(tool_names::EVALUATE, json!({ "script": script }))
					.await?;
				Ok(parse_script_output(&result, &step.description))
			}
			StepAction::Screenshot => {
				self.invoke(tool_names::SCREENSHOT, json!({})).await?;
				Ok(Value::Null)
			}
			StepAction::PressKey => {
				let key = required_value(step)?;
				self.invoke(tool_names::PRESS_KEY, json!({ "key": key }))
					.await?;
				Ok(Value::Null)
			}
		}
	}

	/// Tries the step's selectors in order; the step fails only after all
	/// of them have.
	async fn invoke_with_selectors<F>(&self, step: &WorkflowStep, build: F) -> Result<CallToolResult>
	where
		F: Fn(&str) -> (&'static str, Value),
	{
		if step.selectors.is_empty() {
			return Err(Error::MissingValue {
				description: step.description.clone(),
			});
		}

		let mut last_error = None;
		for selector in &step.selectors {
			let (tool, args) = build(selector);
			match self.invoker.call_tool(tool, args).await {
				Ok(result) => return Ok(result),
				Err(error) => {
					debug!(
						target: "scout",
						step = %step.description,
						selector,
						%error,
						"selector failed, trying next"
					);
					last_error = Some(error);
				}
			}
		}
		Err(Error::SelectorsExhausted {
			description: step.description.clone(),
			last_error: last_error
				.map(|error| error.to_string())
				.unwrap_or_else(|| "no selectors".to_string()),
		})
	}

	async fn invoke(&self, tool: &'static str, args: Value) -> Result<CallToolResult> {
		Ok(self.invoker.call_tool(tool, args).await?)
	}

	async fn invoke_within(
		&self,
		step: &WorkflowStep,
		tool: &'static str,
		args: Value,
	) -> Result<CallToolResult> {
		let window = Duration::from_millis(step.timeout_ms);
		tokio::time::timeout(window, self.invoker.call_tool(tool, args))
			.await
			.map_err(|_| Error::StepTimeout {
				description: step.description.clone(),
				ms: step.timeout_ms,
			})?
			.map_err(Error::from)
	}
}

fn transitions_page(action: StepAction) -> bool {
	// Enter on a search input navigates too, so press-key settles as well.
	matches!(
		action,
		StepAction::Navigate
			| StepAction::NavigateBack
			| StepAction::Click
			| StepAction::PressKey
	)
}

fn required_value(step: &WorkflowStep) -> Result<&str> {
	step.value.as_deref().ok_or_else(|| Error::MissingValue {
		description: step.description.clone(),
	})
}

/// Parses an evaluate result as JSON, degrading to an empty object when
/// the script produced something unparseable.
fn parse_script_output(result: &CallToolResult, description: &str) -> Value {
	let Some(text) = result.text() else {
		return json!({});
	};
	match serde_json::from_str(text.trim()) {
		Ok(value) => value,
		Err(error) => {
			warn!(
				target: "scout",
				step = description,
				%error,
				"script output was not valid JSON, degrading to empty object"
			);
			json!({})
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::ScriptedInvoker;

	fn executor(invoker: ScriptedInvoker) -> WorkflowExecutor {
		WorkflowExecutor::new(Arc::new(invoker))
	}

	#[tokio::test]
	async fn steps_run_in_declared_order() {
		let invoker = ScriptedInvoker::new();
		let calls = invoker.call_log();
		let executor = executor(invoker);

		let steps = vec![
			WorkflowStep::navigate("https://example.com", "open site"),
			WorkflowStep::click("#search", "focus search"),
			WorkflowStep::fill("#search", "banking", "type keyword"),
		];
		executor.run(&steps).await.unwrap();

		let log = calls.lock().unwrap();
		let names: Vec<&str> = log.iter().map(|(name, _)| name.as_str()).collect();
		assert_eq!(
			names,
			vec![tool_names::NAVIGATE, tool_names::CLICK, tool_names::FILL]
		);
		assert_eq!(log[2].1["value"], "banking");
	}

	#[tokio::test]
	async fn first_failure_aborts_remaining_steps() {
		let invoker = ScriptedInvoker::new().fail_tool(tool_names::CLICK, "element not found");
		let calls = invoker.call_log();
		let executor = executor(invoker);

		let steps = vec![
			WorkflowStep::click("#gone", "click missing element"),
			WorkflowStep::navigate("https://example.com", "never reached"),
		];
		let error = executor.run(&steps).await.unwrap_err();
		assert!(matches!(error, Error::SelectorsExhausted { .. }));

		// Only the failing click was attempted.
		let log = calls.lock().unwrap();
		assert_eq!(log.len(), 1);
	}

	#[tokio::test]
	async fn fallback_selectors_are_tried_in_order() {
		let invoker = ScriptedInvoker::new().on(tool_names::CLICK, |args| {
			if args["selector"] == "#primary" {
				Err(scout_runtime::Error::Tool {
					message: "not visible".to_string(),
				})
			} else {
				Ok(ScriptedInvoker::text_result("clicked"))
			}
		});
		let calls = invoker.call_log();
		let executor = executor(invoker);

		let step = WorkflowStep::click("#primary", "click with fallback").with_fallback("#secondary");
		executor.run_step(&step).await.unwrap();

		let log = calls.lock().unwrap();
		assert_eq!(log.len(), 2);
		assert_eq!(log[0].1["selector"], "#primary");
		assert_eq!(log[1].1["selector"], "#secondary");
	}

	#[tokio::test]
	async fn malformed_evaluate_output_degrades_to_empty_object() {
		let invoker = ScriptedInvoker::new().on(tool_names::EVALUATE, |_| {
			Ok(ScriptedInvoker::text_result("<html>not json</html>"))
		});
		let executor = executor(invoker);

		let value = executor
			.evaluate_json("document.title", "read title")
			.await
			.unwrap();
		assert_eq!(value, json!({}));
	}

	#[tokio::test]
	async fn evaluate_returns_parsed_records() {
		let invoker = ScriptedInvoker::new().on(tool_names::EVALUATE, |_| {
			Ok(ScriptedInvoker::text_result(r#"[{"text": "banking"}]"#))
		});
		let executor = executor(invoker);

		let value = executor
			.evaluate_json("collect()", "collect records")
			.await
			.unwrap();
		assert_eq!(value[0]["text"], "banking");
	}

	#[tokio::test(start_paused = true)]
	async fn slow_step_times_out() {
		let invoker = ScriptedInvoker::new().stall_tool(tool_names::WAIT_FOR);
		let executor = executor(invoker);

		let step = WorkflowStep::wait_for("#modal", "wait for modal").with_timeout(50);
		let handle = tokio::spawn(async move { executor.run_step(&step).await });
		tokio::time::advance(Duration::from_millis(60)).await;

		let error = handle.await.unwrap().unwrap_err();
		assert!(matches!(error, Error::StepTimeout { ms: 50, .. }));
	}

	#[tokio::test]
	async fn navigate_without_url_is_rejected() {
		let executor = executor(ScriptedInvoker::new());
		let step = WorkflowStep {
			action: StepAction::Navigate,
			selectors: Vec::new(),
			value: None,
			description: "broken navigate".to_string(),
			timeout_ms: DEFAULT_STEP_TIMEOUT_MS,
		};
		let error = executor.run_step(&step).await.unwrap_err();
		assert!(matches!(error, Error::MissingValue { .. }));
	}
}
