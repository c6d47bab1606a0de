//! Tool client owning the automation-tool process and its connection.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use scout_protocol::{
	CallToolParams, CallToolResult, ClientInfo, InitializeParams, InitializeResult,
	ListToolsResult, PROTOCOL_VERSION, ToolDescriptor, methods,
};
use serde_json::Value;
use tokio::process::Child;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::process::ToolProcessConfig;
use crate::transport::LineTransport;

/// How long a disconnect waits for the child to exit before killing it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The seam between the engine and the runtime: anything that can invoke a
/// named tool. Production code uses [`ToolClient`]; tests substitute
/// scripted fakes.
pub trait ToolInvoker: Send + Sync {
	/// Invokes one named tool and returns its result.
	fn call_tool(
		&self,
		name: &str,
		arguments: Value,
	) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>>;

	/// Releases whatever the invoker holds for the browser session.
	/// Defaults to a no-op; the real client disconnects the tool process.
	fn shutdown(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
		Box::pin(async {})
	}
}

struct Active {
	connection: Arc<Connection>,
	child: Child,
	tools: Vec<ToolDescriptor>,
	handshake_complete: bool,
	writer_task: JoinHandle<()>,
	reader_task: JoinHandle<()>,
	dispatch_task: JoinHandle<()>,
}

/// Client for one automation-tool process.
///
/// Connects lazily: the first tool call spawns the process, performs the
/// capability handshake, and lists the available tools. All calls are
/// serialized through one internal lock; the remote browser can only do
/// one thing at a time anyway.
pub struct ToolClient {
	config: ToolProcessConfig,
	state: Mutex<Option<Active>>,
}

impl ToolClient {
	pub fn new(config: ToolProcessConfig) -> Self {
		Self {
			config,
			state: Mutex::new(None),
		}
	}

	/// Spawns the tool and completes the capability handshake, if not
	/// already connected.
	pub async fn connect(&self) -> Result<()> {
		let mut state = self.state.lock().await;
		self.connect_locked(&mut state).await
	}

	/// Returns true once the handshake has completed.
	pub async fn is_connected(&self) -> bool {
		self.state
			.lock()
			.await
			.as_ref()
			.is_some_and(|active| active.handshake_complete)
	}

	/// Returns the tools advertised by the server, connecting first if
	/// necessary.
	pub async fn tools(&self) -> Result<Vec<ToolDescriptor>> {
		let mut state = self.state.lock().await;
		if state.is_none() {
			self.connect_locked(&mut state).await?;
		}
		let active = state.as_ref().ok_or(Error::NotInitialized)?;
		Ok(active.tools.clone())
	}

	/// Invokes one named tool, auto-connecting if necessary.
	///
	/// An error envelope from the server and an in-band `isError` result
	/// both surface as [`Error::Tool`].
	pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult> {
		let mut state = self.state.lock().await;
		if state.is_none() {
			self.connect_locked(&mut state).await?;
		}
		let active = state.as_ref().ok_or(Error::NotInitialized)?;
		if !active.handshake_complete {
			return Err(Error::NotInitialized);
		}

		let params = CallToolParams {
			name: name.to_string(),
			arguments,
		};
		let raw = active
			.connection
			.send_request(methods::CALL_TOOL, serde_json::to_value(&params)?)
			.await?;
		let result: CallToolResult = serde_json::from_value(raw)
			.map_err(|error| Error::Protocol(format!("malformed tool result: {error}")))?;

		if result.is_error {
			let message = result.joined_text();
			return Err(Error::Tool {
				message: if message.is_empty() {
					format!("tool '{name}' reported failure")
				} else {
					message
				},
			});
		}
		Ok(result)
	}

	/// Disconnects: best-effort cancellation notification, rejects all
	/// in-flight requests, closes stdin, and waits [`SHUTDOWN_GRACE`] for
	/// the child before killing it.
	pub async fn disconnect(&self) {
		let Some(active) = self.state.lock().await.take() else {
			return;
		};
		let _ = active.connection.send_notification(
			methods::CANCELLED,
			serde_json::json!({ "reason": "client disconnecting" }),
		);
		shutdown(active).await;
	}

	async fn connect_locked(&self, state: &mut Option<Active>) -> Result<()> {
		if state
			.as_ref()
			.is_some_and(|active| active.handshake_complete)
		{
			return Ok(());
		}

		let config = ToolProcessConfig::resolve(&self.config);
		debug!(target: "scout_runtime", command = %config.command, "spawning automation tool");
		let spawned = config.spawn()?;

		let (transport, mut inbound_rx) = LineTransport::new(spawned.stdin, spawned.stdout);
		let (mut sender, receiver) = transport.into_parts();
		let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
		let connection = Arc::new(Connection::new(outbound_tx));

		let writer_task = tokio::spawn(async move {
			while let Some(message) = outbound_rx.recv().await {
				if let Err(error) = sender.send(message).await {
					warn!(target: "scout_runtime", %error, "transport write failed");
					break;
				}
			}
			// Sender drops here: the child sees EOF on its stdin.
		});
		let reader_task = tokio::spawn(async move {
			if let Err(error) = receiver.run().await {
				warn!(target: "scout_runtime", %error, "transport read failed");
			}
		});
		let dispatch_connection = Arc::clone(&connection);
		let dispatch_task = tokio::spawn(async move {
			while let Some(value) = inbound_rx.recv().await {
				dispatch_connection.dispatch(value);
			}
		});

		let mut active = Active {
			connection,
			child: spawned.child,
			tools: Vec::new(),
			handshake_complete: false,
			writer_task,
			reader_task,
			dispatch_task,
		};

		match handshake(&active.connection).await {
			Ok(tools) => {
				info!(
					target: "scout_runtime",
					tool_count = tools.len(),
					"connected to automation tool"
				);
				active.tools = tools;
				active.handshake_complete = true;
				*state = Some(active);
				Ok(())
			}
			Err(error) => {
				shutdown(active).await;
				Err(error)
			}
		}
	}
}

impl ToolInvoker for ToolClient {
	fn call_tool(
		&self,
		name: &str,
		arguments: Value,
	) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>> {
		let name = name.to_string();
		Box::pin(async move { ToolClient::call_tool(self, &name, arguments).await })
	}

	fn shutdown(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
		Box::pin(self.disconnect())
	}
}

/// Runs the capability handshake and the initial tool listing. The client
/// counts as connected only after both succeed.
async fn handshake(connection: &Connection) -> Result<Vec<ToolDescriptor>> {
	let params = InitializeParams {
		protocol_version: PROTOCOL_VERSION.to_string(),
		client_info: ClientInfo {
			name: "scout".to_string(),
			version: env!("CARGO_PKG_VERSION").to_string(),
		},
		capabilities: serde_json::json!({}),
	};
	let raw = connection
		.send_request(methods::INITIALIZE, serde_json::to_value(&params)?)
		.await
		.map_err(|error| Error::HandshakeFailed(error.to_string()))?;
	let initialized: InitializeResult = serde_json::from_value(raw)
		.map_err(|error| Error::HandshakeFailed(format!("malformed initialize response: {error}")))?;
	debug!(
		target: "scout_runtime",
		protocol = %initialized.protocol_version,
		server = initialized
			.server_info
			.as_ref()
			.map(|info| info.name.as_str())
			.unwrap_or("unknown"),
		"handshake accepted"
	);
	connection.send_notification(methods::INITIALIZED, Value::Null)?;

	let raw = connection
		.send_request(methods::LIST_TOOLS, serde_json::json!({}))
		.await
		.map_err(|error| Error::HandshakeFailed(format!("tools/list failed: {error}")))?;
	let listed: ListToolsResult = serde_json::from_value(raw)
		.map_err(|error| Error::HandshakeFailed(format!("malformed tools/list response: {error}")))?;
	Ok(listed.tools)
}

async fn shutdown(mut active: Active) {
	active.connection.close();
	match tokio::time::timeout(SHUTDOWN_GRACE, active.child.wait()).await {
		Ok(Ok(status)) => {
			debug!(target: "scout_runtime", %status, "automation tool exited");
		}
		Ok(Err(error)) => {
			warn!(target: "scout_runtime", %error, "failed waiting for automation tool");
		}
		Err(_) => {
			warn!(target: "scout_runtime", "automation tool did not exit in time; killing");
			if let Err(error) = active.child.kill().await {
				warn!(target: "scout_runtime", %error, "failed to kill automation tool");
			}
		}
	}
	active.reader_task.abort();
	active.dispatch_task.abort();
	active.writer_task.abort();
}
