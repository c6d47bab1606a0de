//! Exclusive browser-session management.
//!
//! The automation tool drives one browser. The [`SessionManager`] is the
//! sole mutual-exclusion primitive for it: overlapping [`acquire`] calls
//! serialize, so there are never two active sessions at once. The manager
//! is injected into whatever orchestrates a run; there is no ambient
//! global to reach for.
//!
//! [`acquire`]: SessionManager::acquire

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::client::ToolInvoker;

/// Hands out exclusive access to the shared tool invoker.
#[derive(Clone)]
pub struct SessionManager {
	invoker: Arc<dyn ToolInvoker>,
	lock: Arc<Mutex<()>>,
}

impl SessionManager {
	pub fn new(invoker: Arc<dyn ToolInvoker>) -> Self {
		Self {
			invoker,
			lock: Arc::new(Mutex::new(())),
		}
	}

	/// Waits for any active session to end, then starts a new one.
	///
	/// The returned guard is a capability token: holding it is the only
	/// way to reach the invoker, and dropping it releases the session.
	pub async fn acquire(&self) -> SessionGuard {
		let permit = Arc::clone(&self.lock).lock_owned().await;
		debug!(target: "scout_runtime", "browser session acquired");
		SessionGuard {
			invoker: Arc::clone(&self.invoker),
			_permit: permit,
		}
	}
}

/// Capability token for one exclusive browser session.
///
/// Dropping the guard releases the session lock; [`SessionGuard::end`]
/// additionally shuts the invoker down.
pub struct SessionGuard {
	invoker: Arc<dyn ToolInvoker>,
	_permit: OwnedMutexGuard<()>,
}

impl SessionGuard {
	/// The invoker this session has exclusive use of.
	pub fn invoker(&self) -> Arc<dyn ToolInvoker> {
		Arc::clone(&self.invoker)
	}

	/// Ends the session gracefully: shuts the invoker down, then releases
	/// the lock on drop.
	pub async fn end(self) {
		self.invoker.shutdown().await;
		debug!(target: "scout_runtime", "browser session ended");
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;
	use crate::client::ToolClient;
	use crate::process::ToolProcessConfig;

	fn test_manager() -> SessionManager {
		SessionManager::new(Arc::new(ToolClient::new(ToolProcessConfig::default())))
	}

	#[tokio::test]
	async fn overlapping_acquires_serialize() {
		let manager = test_manager();
		let active = Arc::new(AtomicUsize::new(0));
		let windows = Arc::new(AtomicUsize::new(0));

		let mut tasks = Vec::new();
		for _ in 0..8 {
			let manager = manager.clone();
			let active = Arc::clone(&active);
			let windows = Arc::clone(&windows);
			tasks.push(tokio::spawn(async move {
				let guard = manager.acquire().await;
				let now_active = active.fetch_add(1, Ordering::SeqCst) + 1;
				assert_eq!(now_active, 1, "two sessions were active at once");
				tokio::time::sleep(std::time::Duration::from_millis(5)).await;
				active.fetch_sub(1, Ordering::SeqCst);
				windows.fetch_add(1, Ordering::SeqCst);
				drop(guard);
			}));
		}
		for task in tasks {
			task.await.unwrap();
		}

		assert_eq!(windows.load(Ordering::SeqCst), 8);
		assert_eq!(active.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn dropping_guard_releases_the_session() {
		let manager = test_manager();

		let guard = manager.acquire().await;
		drop(guard);

		// Would deadlock if the first guard leaked the lock.
		let _second = manager.acquire().await;
	}

	#[tokio::test]
	async fn end_releases_the_session_after_shutdown() {
		let manager = test_manager();

		let guard = manager.acquire().await;
		guard.end().await;

		let _second = manager.acquire().await;
	}
}
