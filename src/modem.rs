//! Modem connection manager and outbound command primitives.
//!
//! Owns the transport on behalf of the worker task. The modem is considered
//! connected only after the full initialization handshake has been written;
//! any transport failure downgrades it back to disconnected, and the next
//! `ensure_connected` replays the handshake from scratch.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::GsmConfig;
use crate::parser::decode_chunk;
use crate::transport::Transport;

/// SMS body terminator control byte (Ctrl+Z).
const SMS_TERMINATOR: char = '\x1a';

/// Read chunk size used by the worker loop.
pub const READ_CHUNK_SIZE: usize = 200;

/// GSM modem driven over a [`Transport`].
pub struct Modem<T: Transport> {
    transport: T,
    config: GsmConfig,
    connected: bool,
}

impl<T: Transport> Modem<T> {
    pub fn new(transport: T, config: GsmConfig) -> Self {
        Self {
            transport,
            config,
            connected: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected && self.transport.is_connected()
    }

    /// Mark the modem as disconnected after a transport failure.
    fn mark_disconnected(&mut self) {
        if self.connected {
            warn!("Modem connection lost");
        }
        self.connected = false;
    }

    /// Establish the modem connection, replaying the init handshake when
    /// needed. Idempotent; returns false when the transport or any init
    /// command fails, leaving the state disconnected.
    pub async fn ensure_connected(&mut self) -> bool {
        if self.is_connected() {
            return true;
        }
        self.connected = false;

        if let Err(e) = self.transport.connect().await {
            warn!("Modem connect error: {e}");
            return false;
        }

        let init_commands = [
            "AT".to_string(),
            "ATE0".to_string(),
            "AT+CMGF=1".to_string(),
            "AT+CNMI=1,2,0,0,0".to_string(),
            format!("AT+CUSD=1,\"{}\"", self.config.balance_ussd),
        ];

        for command in &init_commands {
            if let Err(e) = self.transport.send(format!("{command}\r\n").as_bytes()).await {
                warn!("Unable to initialize modem: {e}");
                return false;
            }
        }

        self.connected = true;
        info!(
            "Using {} at {} baud",
            self.config.device, self.config.baud_rate
        );
        true
    }

    /// The single outbound primitive: write a CRLF-terminated command, wait
    /// for the modem to settle, then drain and decode any pending response.
    /// Returns an empty string when not connected or on any transport error.
    pub async fn write(&mut self, command: &str) -> String {
        if !self.is_connected() {
            return String::new();
        }

        if let Err(e) = self.transport.send(format!("{command}\r\n").as_bytes()).await {
            warn!("Modem write: {e}");
            self.mark_disconnected();
            return String::new();
        }

        tokio::time::sleep(self.config.settle_delay()).await;

        // Drain whatever the modem answered
        let mut data = Vec::new();
        let mut buf = [0u8; READ_CHUNK_SIZE];
        loop {
            match self
                .transport
                .receive(&mut buf, Duration::from_millis(10))
                .await
            {
                Ok(0) => break,
                Ok(n) => data.extend_from_slice(&buf[..n]),
                Err(e) => {
                    warn!("Modem read: {e}");
                    self.mark_disconnected();
                    return String::new();
                }
            }
        }

        decode_chunk(&data).trim().to_string()
    }

    /// Read one bounded chunk of unsolicited data. Returns the number of
    /// bytes read into `buf`; transport errors downgrade to disconnected and
    /// read as 0.
    pub async fn read_chunk(&mut self, buf: &mut [u8]) -> usize {
        if !self.is_connected() {
            return 0;
        }

        match self.transport.receive(buf, self.config.read_timeout()).await {
            Ok(n) => n,
            Err(e) => {
                warn!("Modem read: {e}");
                self.mark_disconnected();
                0
            }
        }
    }

    /// Compose and send one SMS.
    pub async fn send_sms(&mut self, destination: &str, text: &str) {
        debug!("Sending SMS to {destination}");
        self.write(&format!("AT+CMGS=\"{destination}\"")).await;
        self.write(text).await;
        self.write(&SMS_TERMINATOR.to_string()).await;
    }

    /// Fan one message out to every configured contact.
    pub async fn send_message(&mut self, text: &str) {
        if self.config.contacts.is_empty() {
            warn!("No GSM contacts configured when sending message");
            return;
        }

        for destination in self.config.contacts.clone() {
            self.send_sms(&destination, text).await;
        }
    }

    /// Place a voice call.
    pub async fn dial(&mut self, destination: &str) {
        debug!("Dialing {destination}");
        self.write(&format!("ATD{destination}")).await;
    }

    /// Close the transport on shutdown.
    pub async fn close(&mut self) {
        self.connected = false;
        self.transport.disconnect().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    fn test_config() -> GsmConfig {
        GsmConfig {
            contacts: vec!["+351911234567".to_string(), "+351967654321".to_string()],
            settle_delay_ms: 1,
            read_timeout_ms: 10,
            ..Default::default()
        }
    }

    fn test_modem() -> (Modem<MockTransport>, MockTransport) {
        let transport = MockTransport::new();
        let modem = Modem::new(transport.clone(), test_config());
        (modem, transport)
    }

    #[tokio::test]
    async fn test_init_handshake() {
        let (mut modem, transport) = test_modem();

        assert!(!modem.is_connected());
        assert!(modem.ensure_connected().await);
        assert!(modem.is_connected());

        let sent = transport.sent_text();
        assert_eq!(
            sent,
            vec![
                "AT\r\n",
                "ATE0\r\n",
                "AT+CMGF=1\r\n",
                "AT+CNMI=1,2,0,0,0\r\n",
                "AT+CUSD=1,\"*111#\"\r\n",
            ]
        );

        // Idempotent: a second call does not touch the transport
        transport.clear_sent();
        assert!(modem.ensure_connected().await);
        assert!(transport.sent_text().is_empty());
    }

    #[tokio::test]
    async fn test_connect_failure_stays_disconnected() {
        let (mut modem, transport) = test_modem();
        transport.set_fail_connect(true);

        assert!(!modem.ensure_connected().await);
        assert!(!modem.is_connected());
    }

    #[tokio::test]
    async fn test_write_not_connected_returns_empty() {
        let (mut modem, transport) = test_modem();
        assert_eq!(modem.write("AT").await, "");
        assert!(transport.sent_text().is_empty());
    }

    #[tokio::test]
    async fn test_write_drains_response() {
        let (mut modem, transport) = test_modem();
        assert!(modem.ensure_connected().await);
        transport.clear_sent();

        transport.push_incoming(b"\r\nOK\r\n");
        let response = modem.write("AT").await;
        assert_eq!(response, "OK");
        assert_eq!(transport.sent_text(), vec!["AT\r\n".to_string()]);
    }

    #[tokio::test]
    async fn test_write_failure_downgrades_and_reinit() {
        let (mut modem, transport) = test_modem();
        assert!(modem.ensure_connected().await);
        assert_eq!(transport.connect_count(), 1);

        transport.fail_next_send();
        assert_eq!(modem.write("AT").await, "");
        assert!(!modem.is_connected());

        // Reconnect replays the full init sequence
        transport.clear_sent();
        assert!(modem.ensure_connected().await);
        assert_eq!(transport.connect_count(), 2);
        assert_eq!(transport.sent_text().len(), 5);
    }

    #[tokio::test]
    async fn test_send_sms_sequence() {
        let (mut modem, transport) = test_modem();
        assert!(modem.ensure_connected().await);
        transport.clear_sent();

        modem.send_sms("+351911234567", "ACCEPTED: zone frontdoor bypass").await;

        let sent = transport.sent_text();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0], "AT+CMGS=\"+351911234567\"\r\n");
        assert_eq!(sent[1], "ACCEPTED: zone frontdoor bypass\r\n");
        assert_eq!(sent[2], "\u{1a}\r\n");
    }

    #[tokio::test]
    async fn test_send_message_fans_out() {
        let (mut modem, transport) = test_modem();
        assert!(modem.ensure_connected().await);
        transport.clear_sent();

        modem.send_message("other: power failure").await;

        // Three writes per contact, two contacts
        let sent = transport.sent_text();
        assert_eq!(sent.len(), 6);
        assert_eq!(sent[0], "AT+CMGS=\"+351911234567\"\r\n");
        assert_eq!(sent[3], "AT+CMGS=\"+351967654321\"\r\n");
    }

    #[tokio::test]
    async fn test_dial() {
        let (mut modem, transport) = test_modem();
        assert!(modem.ensure_connected().await);
        transport.clear_sent();

        modem.dial("+351911234567").await;
        assert_eq!(transport.sent_text(), vec!["ATD+351911234567\r\n".to_string()]);
    }
}
