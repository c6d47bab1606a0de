//! Request/response/notification envelopes and the incoming-message
//! discriminated union.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outgoing request. Correlated with its response by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
	/// Strictly increasing per connection.
	pub id: u64,
	/// Method name to invoke.
	pub method: String,
	/// Method parameters as a JSON object.
	#[serde(default, skip_serializing_if = "Value::is_null")]
	pub params: Value,
}

/// Fire-and-forget message: carries a method but no id, so no response is
/// ever produced for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
	/// Method name.
	pub method: String,
	/// Method parameters as a JSON object.
	#[serde(default, skip_serializing_if = "Value::is_null")]
	pub params: Value,
}

/// Incoming response correlated to a request by `id`. Exactly one of
/// `result` and `error` is present in a well-formed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
	/// Request id this response answers.
	pub id: u64,
	/// Success payload.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	/// Failure payload.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorObject>,
}

/// Error payload of a failed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorObject {
	/// Numeric error code assigned by the server.
	#[serde(default)]
	pub code: i64,
	/// Human-readable error message.
	pub message: String,
	/// Optional structured details.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
}

/// Discriminated union of incoming protocol messages.
///
/// Variant order matters: anything carrying an `id` is tried as a
/// [`Response`] first; a message with a `method` and no `id` is a
/// [`Notification`]; everything else lands in the forward-compatible
/// [`Message::Unknown`] arm and is ignored by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	/// Response message (has an `id` field).
	Response(Response),
	/// Notification message (has `method`, no `id`).
	Notification(Notification),
	/// Unknown message shape (forward-compatible catch-all).
	Unknown(Value),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn request_serializes_with_id_and_method() {
		let request = Request {
			id: 7,
			method: "tools/call".to_string(),
			params: serde_json::json!({"name": "browser_navigate"}),
		};

		let value = serde_json::to_value(&request).unwrap();
		assert_eq!(value["id"], 7);
		assert_eq!(value["method"], "tools/call");
		assert_eq!(value["params"]["name"], "browser_navigate");
	}

	#[test]
	fn notification_omits_id() {
		let notification = Notification {
			method: "notifications/initialized".to_string(),
			params: Value::Null,
		};

		let value = serde_json::to_value(&notification).unwrap();
		assert!(value.get("id").is_none());
		assert!(value.get("params").is_none());
	}

	#[test]
	fn message_deserializes_success_response() {
		let json = r#"{"id": 42, "result": {"ok": true}}"#;
		let message: Message = serde_json::from_str(json).unwrap();

		match message {
			Message::Response(response) => {
				assert_eq!(response.id, 42);
				assert!(response.result.is_some());
				assert!(response.error.is_none());
			}
			other => panic!("expected Response, got {other:?}"),
		}
	}

	#[test]
	fn message_deserializes_error_response() {
		let json = r#"{"id": 3, "error": {"code": -32601, "message": "no such tool"}}"#;
		let message: Message = serde_json::from_str(json).unwrap();

		match message {
			Message::Response(response) => {
				let error = response.error.unwrap();
				assert_eq!(error.code, -32601);
				assert_eq!(error.message, "no such tool");
			}
			other => panic!("expected Response, got {other:?}"),
		}
	}

	#[test]
	fn message_deserializes_notification() {
		let json = r#"{"method": "progress", "params": {"percent": 50}}"#;
		let message: Message = serde_json::from_str(json).unwrap();

		match message {
			Message::Notification(notification) => {
				assert_eq!(notification.method, "progress");
				assert_eq!(notification.params["percent"], 50);
			}
			other => panic!("expected Notification, got {other:?}"),
		}
	}

	#[test]
	fn message_tolerates_unknown_shapes() {
		let json = r#"{"banner": "automation tool v2 ready"}"#;
		let message: Message = serde_json::from_str(json).unwrap();
		assert!(matches!(message, Message::Unknown(_)));
	}
}
