//! Transport layer.
//!
//! A thin seam between the modem logic and the physical link, so the worker
//! loop can be exercised against a scripted transport in tests.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod mock;
pub mod serial;

pub use mock::MockTransport;
pub use serial::SerialTransport;

/// Transport layer error types
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Send operation failed
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Receive operation failed
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Transport is not connected
    #[error("Not connected")]
    NotConnected,
}

/// Physical link to the modem.
///
/// All methods are only ever called from the single worker task; the trait
/// does not need to support concurrent access.
#[async_trait]
pub trait Transport: Send {
    /// Open the link. Idempotent when already connected.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Close the link, dropping the handle.
    async fn disconnect(&mut self);

    /// Write all of `data`. An I/O error drops the handle so
    /// [`Transport::is_connected`] turns false.
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Read up to `buffer.len()` bytes, waiting at most `timeout`.
    /// Returns 0 when no data arrived in time.
    async fn receive(
        &mut self,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError>;

    /// Whether the link currently holds an open handle.
    fn is_connected(&self) -> bool;
}
