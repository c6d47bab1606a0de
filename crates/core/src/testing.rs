//! Test support: a scripted [`ToolInvoker`].
//!
//! Engine components only see `dyn ToolInvoker`, so tests script the
//! browser side of a run: per-tool handlers, forced failures, and stalls.
//! Every call is recorded for assertions on ordering and arguments.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use scout_protocol::{CallToolResult, ToolContent};
use scout_runtime::{Error, Result, ToolInvoker};
use serde_json::Value;

type Handler = Box<dyn Fn(&Value) -> Result<CallToolResult> + Send + Sync>;

enum Behavior {
	Handler(Handler),
	Fail(String),
	Stall,
}

/// Records every tool call and answers according to scripted behaviors.
/// Tools without a scripted behavior succeed with an empty result.
#[derive(Default)]
pub struct ScriptedInvoker {
	behaviors: HashMap<String, Behavior>,
	calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl ScriptedInvoker {
	pub fn new() -> Self {
		Self::default()
	}

	/// Scripts a handler for one tool name. The handler sees the call
	/// arguments and produces the result.
	pub fn on<F>(mut self, tool: &str, handler: F) -> Self
	where
		F: Fn(&Value) -> Result<CallToolResult> + Send + Sync + 'static,
	{
		self.behaviors
			.insert(tool.to_string(), Behavior::Handler(Box::new(handler)));
		self
	}

	/// Makes every call to `tool` fail with a tool error.
	pub fn fail_tool(mut self, tool: &str, message: &str) -> Self {
		self.behaviors
			.insert(tool.to_string(), Behavior::Fail(message.to_string()));
		self
	}

	/// Makes every call to `tool` hang forever, for timeout tests.
	pub fn stall_tool(mut self, tool: &str) -> Self {
		self.behaviors.insert(tool.to_string(), Behavior::Stall);
		self
	}

	/// Shared handle to the call log, usable after the invoker has been
	/// moved into an engine component.
	pub fn call_log(&self) -> Arc<Mutex<Vec<(String, Value)>>> {
		Arc::clone(&self.calls)
	}

	/// A successful result with one text block.
	pub fn text_result(text: &str) -> CallToolResult {
		CallToolResult {
			content: vec![ToolContent::Text {
				text: text.to_string(),
			}],
			is_error: false,
		}
	}

	/// A successful result carrying a JSON payload as text, the way
	/// evaluate tools report extraction output.
	pub fn json_result(value: &Value) -> CallToolResult {
		Self::text_result(&value.to_string())
	}
}

impl ToolInvoker for ScriptedInvoker {
	fn call_tool(
		&self,
		name: &str,
		arguments: Value,
	) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>> {
		self.calls
			.lock()
			.expect("call log poisoned")
			.push((name.to_string(), arguments.clone()));

		match self.behaviors.get(name) {
			None => Box::pin(async { Ok(CallToolResult::default()) }),
			Some(Behavior::Handler(handler)) => {
				let result = handler(&arguments);
				Box::pin(async move { result })
			}
			Some(Behavior::Fail(message)) => {
				let message = message.clone();
				Box::pin(async move { Err(Error::Tool { message }) })
			}
			Some(Behavior::Stall) => Box::pin(std::future::pending()),
		}
	}
}
