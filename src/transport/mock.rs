//! Mock transport for testing.
//!
//! Scripts the modem side of the conversation: queued chunks are handed out
//! by `receive`, everything sent is recorded, and failure flags let tests
//! exercise the disconnect/reconnect paths without a physical port.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{Transport, TransportError};

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    receive_queue: VecDeque<Vec<u8>>,
    sent_data: Vec<Vec<u8>>,
    connect_count: u32,
    fail_connect: bool,
    fail_next_send: bool,
}

/// Scripted transport. Cloning shares the underlying state, so a test can
/// keep a handle while the worker owns the transport.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a chunk for a later `receive` call.
    pub fn push_incoming(&self, data: &[u8]) {
        self.lock().receive_queue.push_back(data.to_vec());
    }

    /// Everything sent so far, decoded as single-byte text.
    pub fn sent_text(&self) -> Vec<String> {
        self.lock()
            .sent_data
            .iter()
            .map(|chunk| chunk.iter().map(|&b| b as char).collect())
            .collect()
    }

    pub fn clear_sent(&self) {
        self.lock().sent_data.clear();
    }

    /// Number of successful `connect` calls observed.
    pub fn connect_count(&self) -> u32 {
        self.lock().connect_count
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.lock().fail_connect = fail;
    }

    /// Make the next send fail and drop the connection, as a broken serial
    /// link would.
    pub fn fail_next_send(&self) {
        self.lock().fail_next_send = true;
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.connected {
            return Ok(());
        }
        if state.fail_connect {
            return Err(TransportError::ConnectionFailed(
                "mock connect failure".to_string(),
            ));
        }
        state.connected = true;
        state.connect_count += 1;
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.lock().connected = false;
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let mut state = self.lock();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        if state.fail_next_send {
            state.fail_next_send = false;
            state.connected = false;
            return Err(TransportError::SendFailed("mock send failure".to_string()));
        }
        state.sent_data.push(data.to_vec());
        Ok(())
    }

    async fn receive(
        &mut self,
        buffer: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, TransportError> {
        let mut state = self.lock();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        match state.receive_queue.pop_front() {
            Some(chunk) => {
                let n = chunk.len().min(buffer.len());
                buffer[..n].copy_from_slice(&chunk[..n]);
                Ok(n)
            }
            None => Ok(0),
        }
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_receive_and_sent_log() {
        let mut transport = MockTransport::new();
        transport.connect().await.unwrap();

        transport.push_incoming(b"OK");
        let mut buf = [0u8; 16];
        let n = transport
            .receive(&mut buf, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"OK");

        transport.send(b"AT\r\n").await.unwrap();
        assert_eq!(transport.sent_text(), vec!["AT\r\n".to_string()]);
    }

    #[tokio::test]
    async fn test_send_failure_drops_connection() {
        let mut transport = MockTransport::new();
        transport.connect().await.unwrap();

        transport.fail_next_send();
        assert!(transport.send(b"AT\r\n").await.is_err());
        assert!(!transport.is_connected());
    }
}
