//! Serial transport over tokio-serial.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, error};

use super::{Transport, TransportError};

/// Serial port link to the GSM modem.
#[derive(Debug)]
pub struct SerialTransport {
    device: String,
    baud_rate: u32,
    read_timeout: Duration,
    connection: Option<SerialStream>,
}

impl SerialTransport {
    pub fn new(device: impl Into<String>, baud_rate: u32, read_timeout: Duration) -> Self {
        Self {
            device: device.into(),
            baud_rate,
            read_timeout,
            connection: None,
        }
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.connection.is_some() {
            return Ok(());
        }

        debug!("Opening serial port: {}", self.device);

        let port_result = tokio_serial::new(&self.device, self.baud_rate)
            .timeout(self.read_timeout)
            .open_native_async();

        match port_result {
            Ok(mut port) => {
                #[cfg(unix)]
                port.set_exclusive(false).map_err(|e| {
                    TransportError::ConnectionFailed(format!(
                        "Failed to set exclusive mode: {e}"
                    ))
                })?;

                self.connection = Some(port);
                debug!("Opened serial port: {}", self.device);
                Ok(())
            }
            Err(e) => {
                let error_msg = format!("Failed to open serial port {}: {e}", self.device);
                error!("{error_msg}");
                Err(TransportError::ConnectionFailed(error_msg))
            }
        }
    }

    async fn disconnect(&mut self) {
        if self.connection.take().is_some() {
            // Serial port is closed when dropped
            debug!("Closed serial port: {}", self.device);
        }
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let port = self.connection.as_mut().ok_or(TransportError::NotConnected)?;

        let send_operation = async {
            port.write_all(data).await?;
            port.flush().await?;
            Ok::<_, std::io::Error>(())
        };

        match timeout(self.read_timeout, send_operation).await {
            Ok(Ok(())) => {
                debug!("Sent {} bytes via serial port", data.len());
                Ok(())
            }
            Ok(Err(e)) => {
                let error_msg = format!("Failed to send data: {e}");
                error!("{error_msg}");
                // Connection might be broken, drop it
                self.connection = None;
                Err(TransportError::SendFailed(error_msg))
            }
            Err(_) => {
                self.connection = None;
                Err(TransportError::SendFailed(format!(
                    "Send timed out after {:?}",
                    self.read_timeout
                )))
            }
        }
    }

    async fn receive(
        &mut self,
        buffer: &mut [u8],
        wait: Duration,
    ) -> Result<usize, TransportError> {
        let port = self.connection.as_mut().ok_or(TransportError::NotConnected)?;

        match timeout(wait, port.read(buffer)).await {
            Ok(Ok(bytes_read)) => {
                if bytes_read > 0 {
                    debug!("Received {} bytes via serial port", bytes_read);
                }
                Ok(bytes_read)
            }
            Ok(Err(e)) => {
                let error_msg = format!("Failed to receive data: {e}");
                error!("{error_msg}");
                self.connection = None;
                Err(TransportError::ReceiveFailed(error_msg))
            }
            // Timeout means no data pending, which is the common idle case
            Err(_) => Ok(0),
        }
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_connected_initially() {
        let transport =
            SerialTransport::new("/dev/ttyUSB0", 9600, Duration::from_millis(1000));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_send_while_disconnected() {
        let mut transport =
            SerialTransport::new("/dev/ttyUSB0", 9600, Duration::from_millis(1000));
        let result = transport.send(b"AT\r\n").await;
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_invalid_device_fails() {
        let mut transport = SerialTransport::new(
            "/nonexistent/ttyGSM99",
            9600,
            Duration::from_millis(100),
        );
        let result = transport.connect().await;
        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
        assert!(!transport.is_connected());
    }
}
