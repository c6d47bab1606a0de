//! Wire types for the newline-delimited JSON protocol spoken with the
//! automation-tool process.
//!
//! The protocol has three message shapes: requests (`{id, method, params}`),
//! notifications (`{method, params}`, no id), and responses
//! (`{id, result}` or `{id, error}`). Every message occupies exactly one
//! line on the wire.

mod envelope;
mod handshake;
mod tools;

pub use envelope::{ErrorObject, Message, Notification, Request, Response};
pub use handshake::{ClientInfo, InitializeParams, InitializeResult, ServerInfo, PROTOCOL_VERSION};
pub use tools::{CallToolParams, CallToolResult, ListToolsResult, ToolContent, ToolDescriptor};

/// Method names used on the wire.
pub mod methods {
	/// Capability handshake request.
	pub const INITIALIZE: &str = "initialize";
	/// Notification confirming the handshake completed on our side.
	pub const INITIALIZED: &str = "notifications/initialized";
	/// Request listing the tools the server exposes.
	pub const LIST_TOOLS: &str = "tools/list";
	/// Request invoking one named tool.
	pub const CALL_TOOL: &str = "tools/call";
	/// Best-effort cancellation notification sent before disconnect.
	pub const CANCELLED: &str = "notifications/cancelled";
}
