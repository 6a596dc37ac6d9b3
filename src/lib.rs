//! GSM Channel Service (`gsmsrv`)
//!
//! A notification and command channel bridging the alarm engine to a GSM
//! cellular modem over a serial link. The alarm can be driven by SMS from a
//! trusted contact list, and critical events are pushed out as SMS and voice
//! calls when no other channel is available.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  post_event/notify  ┌─────────────┐
//! │ Alarm engine │────────────────────►│  WorkQueue  │
//! │  + channels  │                     └──────┬──────┘
//! └──────▲───────┘                            │ one item per idle iteration
//!        │ control_* / notify         ┌───────▼───────┐   AT commands   ┌───────┐
//!        └────────────────────────────│  Worker task  │◄───────────────►│ Modem │
//!                                     │ (owns Modem)  │   over serial   └───────┘
//!                                     └───────────────┘
//! ```
//!
//! A single worker task owns the serial transport exclusively; external
//! callers interact only through the non-blocking `post_*` surface and the
//! one-time collaborator injection before the worker starts. The modem is
//! lazily (re-)initialized after any transport failure.

pub mod channel;
pub mod command;
pub mod config;
pub mod error;
pub mod modem;
pub mod parser;
pub mod queue;
pub mod transport;
pub mod types;

pub use channel::{GsmChannel, CHANNEL_NAME};
pub use config::GsmConfig;
pub use error::{GsmError, Result};
pub use types::{AlarmControl, Command, ElementType, NotificationHandler, RawEvent, Severity};
