//! Newline-delimited JSON transport over the child's stdio.
//!
//! One JSON value per line in both directions. The receiver parses each line
//! independently: a line that is not valid JSON is logged and skipped, and
//! the stream keeps going. One corrupt line from the tool must not take
//! down the whole connection.

#[cfg(test)]
mod tests;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::{Error, Result};

/// Transport over a writable stdin half and a readable stdout half.
///
/// Constructed whole, then split with [`LineTransport::into_parts`] so the
/// sender and receiver can live on separate tasks.
pub struct LineTransport<W, R> {
	writer: W,
	reader: R,
	inbound_tx: mpsc::UnboundedSender<Value>,
}

impl<W, R> LineTransport<W, R>
where
	W: AsyncWrite + Unpin + Send,
	R: AsyncRead + Unpin + Send,
{
	/// Creates a transport and the channel on which received messages are
	/// delivered.
	pub fn new(writer: W, reader: R) -> (Self, mpsc::UnboundedReceiver<Value>) {
		let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
		(
			Self {
				writer,
				reader,
				inbound_tx,
			},
			inbound_rx,
		)
	}

	/// Splits the transport into its sender and receiver halves.
	pub fn into_parts(self) -> (LineSender<W>, LineReceiver<R>) {
		(
			LineSender {
				writer: self.writer,
			},
			LineReceiver {
				reader: BufReader::new(self.reader),
				inbound_tx: self.inbound_tx,
			},
		)
	}
}

/// Writing half: serializes one message per line.
pub struct LineSender<W> {
	writer: W,
}

impl<W: AsyncWrite + Unpin + Send> LineSender<W> {
	/// Writes `message` followed by a newline and flushes.
	pub async fn send(&mut self, message: Value) -> Result<()> {
		let mut frame = serde_json::to_vec(&message)?;
		frame.push(b'\n');
		self.writer
			.write_all(&frame)
			.await
			.map_err(|error| Error::Transport(format!("failed to write frame: {error}")))?;
		self.writer
			.flush()
			.await
			.map_err(|error| Error::Transport(format!("failed to flush frame: {error}")))?;
		Ok(())
	}
}

/// Reading half: splits the stream on newlines and forwards each parsed
/// value to the inbound channel.
pub struct LineReceiver<R> {
	reader: BufReader<R>,
	inbound_tx: mpsc::UnboundedSender<Value>,
}

impl<R: AsyncRead + Unpin + Send> LineReceiver<R> {
	/// Reads lines until EOF or until the inbound channel is dropped.
	///
	/// Returns `Ok(())` on clean EOF; read failures are transport errors.
	pub async fn run(mut self) -> Result<()> {
		let mut line = String::new();
		loop {
			line.clear();
			let read = self
				.reader
				.read_line(&mut line)
				.await
				.map_err(|error| Error::Transport(format!("failed to read line: {error}")))?;
			if read == 0 {
				return Ok(());
			}

			let trimmed = line.trim();
			if trimmed.is_empty() {
				continue;
			}

			match serde_json::from_str::<Value>(trimmed) {
				Ok(value) => {
					if self.inbound_tx.send(value).is_err() {
						// Receiver side is gone; nothing left to deliver to.
						return Ok(());
					}
				}
				Err(error) => {
					warn!(target: "scout_runtime", %error, "skipping unparseable protocol line");
				}
			}
		}
	}
}
