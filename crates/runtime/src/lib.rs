//! Runtime for driving the external automation-tool process.
//!
//! The layering, bottom up:
//!
//! - [`process`] spawns and terminates the automation-tool child process.
//! - [`transport`] frames newline-delimited JSON over the child's stdio.
//! - [`connection`] correlates requests with responses and fans out
//!   notifications.
//! - [`client`] owns all of the above and exposes the tool-call surface.
//! - [`session`] serializes access to the single browser the tool controls.

pub mod client;
pub mod connection;
pub mod error;
pub mod process;
pub mod session;
pub mod transport;

pub use client::{ToolClient, ToolInvoker};
pub use connection::Connection;
pub use error::{Error, Result};
pub use process::ToolProcessConfig;
pub use session::{SessionGuard, SessionManager};
