//! Tool listing and invocation payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tool advertised by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
	pub name: String,
	#[serde(default)]
	pub description: Option<String>,
	/// JSON schema of the tool's arguments, kept opaque.
	#[serde(default, rename = "inputSchema")]
	pub input_schema: Value,
}

/// Result of `tools/list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListToolsResult {
	#[serde(default)]
	pub tools: Vec<ToolDescriptor>,
}

/// Parameters of `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
	pub name: String,
	#[serde(default, skip_serializing_if = "Value::is_null")]
	pub arguments: Value,
}

/// One content block of a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
	/// Plain text, possibly JSON-encoded by the tool.
	Text { text: String },
	/// Binary payload (e.g. a screenshot), base64-encoded.
	Image {
		data: String,
		#[serde(rename = "mimeType")]
		mime_type: String,
	},
}

/// Result of `tools/call`.
///
/// A tool can fail in-band (`is_error`) without the request itself failing;
/// the client surfaces that as a tool error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallToolResult {
	#[serde(default)]
	pub content: Vec<ToolContent>,
	#[serde(default, rename = "isError")]
	pub is_error: bool,
}

impl CallToolResult {
	/// Returns the first text block, if any.
	pub fn text(&self) -> Option<&str> {
		self.content.iter().find_map(|block| match block {
			ToolContent::Text { text } => Some(text.as_str()),
			ToolContent::Image { .. } => None,
		})
	}

	/// Concatenates all text blocks. Used for error messages, where tools
	/// sometimes split output across blocks.
	pub fn joined_text(&self) -> String {
		self.content
			.iter()
			.filter_map(|block| match block {
				ToolContent::Text { text } => Some(text.as_str()),
				ToolContent::Image { .. } => None,
			})
			.collect::<Vec<_>>()
			.join("\n")
	}
}
