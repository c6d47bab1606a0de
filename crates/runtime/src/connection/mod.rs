//! Request/response correlation layer on top of the transport.
//!
//! # Message flow
//!
//! 1. A caller invokes [`Connection::send_request`] with a method and params.
//! 2. The connection assigns the next id, parks a oneshot entry in the
//!    pending map, and queues the serialized request for the writer task.
//! 3. The dispatch loop feeds every received value into
//!    [`Connection::dispatch`], which resolves pending entries by id and
//!    fans notifications out to subscribers.
//! 4. If no response arrives within [`REQUEST_TIMEOUT_MS`], the pending
//!    entry is evicted and the caller gets a timeout error; a late response
//!    for an evicted id is dropped.


use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use scout_protocol::{Message, Notification, Request, Response};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use crate::error::{Error, Result};

/// Per-request response window.
pub const REQUEST_TIMEOUT_MS: u64 = 30_000;

type PendingMap = Mutex<HashMap<u64, oneshot::Sender<Result<Value>>>>;

/// Correlates outgoing requests with incoming responses.
///
/// The pending map is the only shared mutable state here and never escapes
/// this type. Invariant: every issued id has at most one live entry, removed
/// on response, timeout eviction, or close.
pub struct Connection {
	next_id: AtomicU64,
	pending: PendingMap,
	outbound: Mutex<Option<mpsc::UnboundedSender<Value>>>,
	notifications: broadcast::Sender<Notification>,
}

impl Connection {
	/// Creates a connection writing outgoing messages to `outbound`.
	pub fn new(outbound: mpsc::UnboundedSender<Value>) -> Self {
		let (notifications, _) = broadcast::channel(64);
		Self {
			next_id: AtomicU64::new(0),
			pending: Mutex::new(HashMap::new()),
			outbound: Mutex::new(Some(outbound)),
			notifications,
		}
	}

	/// Sends a request and awaits its correlated response.
	///
	/// Rejects with [`Error::RequestTimeout`] after [`REQUEST_TIMEOUT_MS`];
	/// the pending entry is evicted so a late response is dropped silently.
	pub async fn send_request(&self, method: &str, params: Value) -> Result<Value> {
		let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
		debug!(target: "scout_runtime", id, method, "sending request");

		let (tx, rx) = oneshot::channel();
		self.pending.lock().insert(id, tx);

		let request = Request {
			id,
			method: method.to_string(),
			params,
		};
		if let Err(error) = self.queue(serde_json::to_value(&request)?) {
			self.pending.lock().remove(&id);
			return Err(error);
		}

		match tokio::time::timeout(Duration::from_millis(REQUEST_TIMEOUT_MS), rx).await {
			Ok(Ok(result)) => result,
			// Sender dropped without a response: the connection closed.
			Ok(Err(_)) => Err(Error::ConnectionClosed),
			Err(_) => {
				self.pending.lock().remove(&id);
				Err(Error::RequestTimeout {
					method: method.to_string(),
					ms: REQUEST_TIMEOUT_MS,
				})
			}
		}
	}

	/// Sends a fire-and-forget notification. No pending entry is created.
	pub fn send_notification(&self, method: &str, params: Value) -> Result<()> {
		let notification = Notification {
			method: method.to_string(),
			params,
		};
		self.queue(serde_json::to_value(&notification)?)
	}

	/// Subscribes to notifications emitted by the remote side.
	pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
		self.notifications.subscribe()
	}

	/// Routes one incoming value to its pending entry or to notification
	/// subscribers. Never fails: unroutable messages are logged and dropped.
	pub fn dispatch(&self, value: Value) {
		match serde_json::from_value::<Message>(value) {
			Ok(Message::Response(response)) => self.dispatch_response(response),
			Ok(Message::Notification(notification)) => {
				debug!(target: "scout_runtime", method = %notification.method, "notification");
				// No subscribers is fine; notifications are advisory.
				let _ = self.notifications.send(notification);
			}
			Ok(Message::Unknown(value)) => {
				debug!(target: "scout_runtime", %value, "ignoring unknown message");
			}
			// Unreachable with the catch-all Unknown arm, kept for safety.
			Err(error) => {
				debug!(target: "scout_runtime", %error, "ignoring undecodable message");
			}
		}
	}

	fn dispatch_response(&self, response: Response) {
		let Some(tx) = self.pending.lock().remove(&response.id) else {
			debug!(
				target: "scout_runtime",
				id = response.id,
				"dropping response for unknown or evicted id"
			);
			return;
		};

		let result = match response.error {
			Some(error) => Err(Error::Tool {
				message: if error.code != 0 {
					format!("{} (code {})", error.message, error.code)
				} else {
					error.message
				},
			}),
			None => Ok(response.result.unwrap_or(Value::Null)),
		};
		let _ = tx.send(result);
	}

	/// Closes the connection: the outbound channel is dropped and every
	/// in-flight request is rejected with [`Error::ConnectionClosed`].
	pub fn close(&self) {
		self.outbound.lock().take();
		// Dropping the senders causes each waiting receiver to observe
		// closure, which send_request maps to ConnectionClosed.
		self.pending.lock().clear();
	}

	fn queue(&self, value: Value) -> Result<()> {
		let guard = self.outbound.lock();
		let Some(sender) = guard.as_ref() else {
			return Err(Error::ConnectionClosed);
		};
		sender.send(value).map_err(|_| Error::ConnectionClosed)
	}

	#[cfg(test)]
	pub(crate) fn pending_len(&self) -> usize {
		self.pending.lock().len()
	}
}
