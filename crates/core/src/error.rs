//! Engine error types.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the search engine.
///
/// Everything here is recoverable at the route boundary: the route executor
/// catches and records these instead of letting them abort sibling
/// searches. Only the progressive engine treats some of them as fatal.
#[derive(Debug, Error)]
pub enum Error {
	/// Error from the automation-tool runtime.
	#[error(transparent)]
	Runtime(#[from] scout_runtime::Error),

	/// A workflow step did not finish within its own window.
	#[error("step '{description}' timed out after {ms}ms")]
	StepTimeout { description: String, ms: u64 },

	/// Every fallback selector of a step failed.
	#[error("step '{description}' failed on all selectors: {last_error}")]
	SelectorsExhausted {
		description: String,
		last_error: String,
	},

	/// A step that requires a value was built without one.
	#[error("step '{description}' is missing a required value")]
	MissingValue { description: String },

	/// No strategy produced a usable results page.
	#[error("search for '{keyword}' failed: {message}")]
	SearchFailed { keyword: String, message: String },

	/// A progressive-search phase failed.
	#[error("phase '{phase}' failed: {message}")]
	Phase { phase: String, message: String },
}

impl Error {
	/// Returns true if the underlying cause is a connection failure, which
	/// is fatal to a whole run rather than to one step.
	pub fn is_connection_failure(&self) -> bool {
		matches!(self, Error::Runtime(inner) if inner.is_connection_failure())
	}
}
