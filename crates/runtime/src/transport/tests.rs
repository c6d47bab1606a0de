use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

use super::*;

#[tokio::test]
async fn send_frames_one_message_per_line() {
	let (stdin_read, stdin_write) = duplex(1024);
	let (stdout_read, _stdout_write) = duplex(1024);

	let (transport, _rx) = LineTransport::new(stdin_write, stdout_read);
	let (mut sender, _receiver) = transport.into_parts();

	let message = serde_json::json!({
		"id": 1,
		"method": "tools/call",
		"params": {"name": "browser_navigate"}
	});
	sender.send(message.clone()).await.unwrap();

	let (mut read_half, _write_half) = tokio::io::split(stdin_read);
	let mut buffer = vec![0u8; 256];
	let read = read_half.read(&mut buffer).await.unwrap();
	let written = &buffer[..read];

	assert_eq!(written.last(), Some(&b'\n'));
	let parsed: Value = serde_json::from_slice(&written[..read - 1]).unwrap();
	assert_eq!(parsed, message);
}

#[tokio::test]
async fn receiver_delivers_messages_in_order() {
	let (_stdin_read, stdin_write) = duplex(4096);
	let (stdout_read, mut stdout_write) = duplex(4096);

	let (transport, mut rx) = LineTransport::new(stdin_write, stdout_read);
	let (_sender, receiver) = transport.into_parts();
	let read_task = tokio::spawn(receiver.run());

	let messages = vec![
		serde_json::json!({"id": 1, "result": {}}),
		serde_json::json!({"id": 2, "result": {}}),
		serde_json::json!({"method": "progress", "params": {"percent": 80}}),
	];
	for message in &messages {
		let mut frame = serde_json::to_vec(message).unwrap();
		frame.push(b'\n');
		stdout_write.write_all(&frame).await.unwrap();
	}
	stdout_write.flush().await.unwrap();

	for expected in &messages {
		let received = rx.recv().await.unwrap();
		assert_eq!(&received, expected);
	}

	drop(stdout_write);
	assert!(read_task.await.unwrap().is_ok());
}

#[tokio::test]
async fn malformed_line_is_skipped_and_stream_continues() {
	let (_stdin_read, stdin_write) = duplex(1024);
	let (stdout_read, mut stdout_write) = duplex(1024);

	let (transport, mut rx) = LineTransport::new(stdin_write, stdout_read);
	let (_sender, receiver) = transport.into_parts();
	let read_task = tokio::spawn(receiver.run());

	stdout_write
		.write_all(b"this is not json\n{\"id\": 9, \"result\": {\"ok\": true}}\n")
		.await
		.unwrap();
	stdout_write.flush().await.unwrap();

	let received = rx.recv().await.unwrap();
	assert_eq!(received["id"], 9);
	assert_eq!(received["result"]["ok"], true);

	drop(stdout_write);
	assert!(read_task.await.unwrap().is_ok());
}

#[tokio::test]
async fn blank_lines_are_ignored() {
	let (_stdin_read, stdin_write) = duplex(1024);
	let (stdout_read, mut stdout_write) = duplex(1024);

	let (transport, mut rx) = LineTransport::new(stdin_write, stdout_read);
	let (_sender, receiver) = transport.into_parts();
	let read_task = tokio::spawn(receiver.run());

	stdout_write
		.write_all(b"\n\n{\"method\": \"ping\"}\n")
		.await
		.unwrap();
	stdout_write.flush().await.unwrap();

	let received = rx.recv().await.unwrap();
	assert_eq!(received["method"], "ping");

	drop(stdout_write);
	assert!(read_task.await.unwrap().is_ok());
}

#[tokio::test]
async fn large_message_round_trips() {
	let (_stdin_read, stdin_write) = duplex(1024 * 1024);
	let (stdout_read, mut stdout_write) = duplex(1024 * 1024);

	let (transport, mut rx) = LineTransport::new(stdin_write, stdout_read);
	let (_sender, receiver) = transport.into_parts();
	let read_task = tokio::spawn(receiver.run());

	let payload = "x".repeat(100_000);
	let message = serde_json::json!({"id": 1, "result": {"data": payload}});
	let mut frame = serde_json::to_vec(&message).unwrap();
	frame.push(b'\n');
	stdout_write.write_all(&frame).await.unwrap();
	stdout_write.flush().await.unwrap();

	let received = rx.recv().await.unwrap();
	assert_eq!(received, message);

	drop(stdout_write);
	assert!(read_task.await.unwrap().is_ok());
}

#[tokio::test]
async fn eof_terminates_receiver_cleanly() {
	let (_stdin_read, stdin_write) = duplex(1024);
	let (stdout_read, stdout_write) = duplex(1024);

	let (transport, _rx) = LineTransport::new(stdin_write, stdout_read);
	let (_sender, receiver) = transport.into_parts();

	drop(stdout_write);

	assert!(receiver.run().await.is_ok());
}
