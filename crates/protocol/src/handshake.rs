//! Capability-handshake payloads exchanged on connect.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol revision this client speaks.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Identity advertised by the client during the handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
	pub name: String,
	pub version: String,
}

/// Parameters of the `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
	pub protocol_version: String,
	pub client_info: ClientInfo,
	/// Client capability flags. Empty object for this client.
	#[serde(default)]
	pub capabilities: Value,
}

/// Identity reported by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
	pub name: String,
	#[serde(default)]
	pub version: Option<String>,
}

/// Result of the `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
	pub protocol_version: String,
	#[serde(default)]
	pub server_info: Option<ServerInfo>,
	/// Server capability flags, kept opaque: the client only requires that
	/// the handshake parsed, not any particular capability set.
	#[serde(default)]
	pub capabilities: Value,
}
