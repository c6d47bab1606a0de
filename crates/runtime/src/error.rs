//! Error types for the automation-tool runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the automation tool.
#[derive(Debug, Error)]
pub enum Error {
	/// The automation-tool process could not be started.
	#[error("failed to spawn automation tool: {0}")]
	SpawnFailed(String),

	/// The capability handshake did not complete.
	#[error("handshake with automation tool failed: {0}")]
	HandshakeFailed(String),

	/// A tool call was issued before the capability handshake completed.
	#[error("client is not initialized: capability handshake has not completed")]
	NotInitialized,

	/// The remote side reported a failure, either as an error envelope or
	/// as an in-band `isError` tool result.
	#[error("tool error: {message}")]
	Tool { message: String },

	/// No response arrived within the per-request window.
	#[error("request '{method}' timed out after {ms}ms")]
	RequestTimeout { method: String, ms: u64 },

	/// The connection was closed while requests were in flight.
	#[error("connection to automation tool closed")]
	ConnectionClosed,

	/// Stdio communication with the child process failed.
	#[error("transport error: {0}")]
	Transport(String),

	/// The remote side sent something the protocol does not allow.
	#[error("protocol error: {0}")]
	Protocol(String),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true if this error is fatal to a run: the process could not
	/// be spawned or never finished its handshake.
	pub fn is_connection_failure(&self) -> bool {
		matches!(self, Error::SpawnFailed(_) | Error::HandshakeFailed(_))
	}

	/// Returns true if this is a per-request timeout.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::RequestTimeout { .. })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn connection_failures_are_classified() {
		assert!(Error::SpawnFailed("no such file".to_string()).is_connection_failure());
		assert!(Error::HandshakeFailed("bad response".to_string()).is_connection_failure());
		assert!(!Error::ConnectionClosed.is_connection_failure());
	}

	#[test]
	fn timeout_is_classified() {
		let error = Error::RequestTimeout {
			method: "tools/call".to_string(),
			ms: 30_000,
		};
		assert!(error.is_timeout());
		assert!(!Error::NotInitialized.is_timeout());
	}
}
