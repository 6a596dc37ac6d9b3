//! Shared domain types and collaborator traits.
//!
//! The channel consumes two external collaborators: the alarm engine
//! ([`AlarmControl`]) and the shared notification stream
//! ([`NotificationHandler`]). Both are injected once before the worker task
//! starts and never swapped afterwards.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Notification severity, ordered from least to most urgent.
///
/// Only notifications at [`Severity::Critical`] are relayed over GSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        };
        write!(f, "{s}")
    }
}

/// A live event as reported by the alarm panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Major event code
    pub major: u32,
    /// Minor event code
    pub minor: u32,
    /// Human-readable event description
    pub message: String,
}

impl RawEvent {
    pub fn new(major: u32, minor: u32, message: impl Into<String>) -> Self {
        Self {
            major,
            minor,
            message: message.into(),
        }
    }

    /// Whether this event warrants the GSM escalation path.
    ///
    /// Covers the alarm/fire/panic major categories plus the
    /// system-trouble/tamper sub-codes.
    pub fn is_critical(&self) -> bool {
        self.major == 37 || (self.major == 2 && self.minor == 6) || (self.major == 40 && self.minor <= 5)
    }
}

/// Alarm element kinds addressable over SMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Zone,
    Partition,
    Output,
}

impl ElementType {
    /// Parse a lower-cased element type token.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "zone" => Some(ElementType::Zone),
            "partition" => Some(ElementType::Partition),
            "output" => Some(ElementType::Output),
            _ => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementType::Zone => "zone",
            ElementType::Partition => "partition",
            ElementType::Output => "output",
        };
        write!(f, "{s}")
    }
}

/// A validated SMS command, ready for dispatch to the alarm engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub element_type: ElementType,
    pub label: String,
    pub action: String,
}

/// Control surface exposed by the alarm engine.
///
/// Each call returns `true` when the alarm accepted the command and `false`
/// when it refused it (unknown label, conflicting state, ...).
#[async_trait]
pub trait AlarmControl: Send + Sync {
    async fn control_zone(&self, label: &str, action: &str) -> bool;
    async fn control_partition(&self, label: &str, action: &str) -> bool;
    async fn control_output(&self, label: &str, action: &str) -> bool;
}

/// Sink for audit notifications shared by all channels.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    async fn notify(&self, source: &str, message: &str, severity: Severity);
}
