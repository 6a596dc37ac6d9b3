//! GSM channel: enqueue surface and worker loop.
//!
//! The channel exposes a non-blocking enqueue surface to the alarm engine
//! and the other channels, and runs a single worker task that owns the modem
//! exclusively. Each loop iteration drains inbound modem traffic first and
//! services at most one outbound work item, so inbound commands always take
//! precedence over notifications.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::command::parse_command;
use crate::config::GsmConfig;
use crate::modem::{Modem, READ_CHUNK_SIZE};
use crate::parser::{parse_unsolicited, Unsolicited};
use crate::queue::{WorkItem, WorkKind, WorkQueue, CHANNEL_PRIORITY};
use crate::transport::Transport;
use crate::types::{AlarmControl, Command, ElementType, NotificationHandler, RawEvent, Severity};

/// Channel name, used as notification source and self-filter.
pub const CHANNEL_NAME: &str = "gsm";

/// How long one loop iteration waits on the work queue. Short enough to keep
/// the loop responsive to the stop signal.
const QUEUE_POLL_TIMEOUT: Duration = Duration::from_millis(250);

/// GSM notification and command channel.
///
/// Collaborators are injected before [`GsmChannel::spawn`]; the enqueue
/// surface (`post_*`) is safe from any task or thread at any time.
pub struct GsmChannel {
    config: GsmConfig,
    queue: Arc<WorkQueue>,
    alarm: Option<Arc<dyn AlarmControl>>,
    notifier: Option<Arc<dyn NotificationHandler>>,
    token: CancellationToken,
}

impl GsmChannel {
    pub fn new(config: GsmConfig) -> Self {
        Self {
            config,
            queue: Arc::new(WorkQueue::new()),
            alarm: None,
            notifier: None,
            token: CancellationToken::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        CHANNEL_NAME
    }

    /// Register the alarm engine. Without it, inbound SMS commands are
    /// ignored entirely.
    pub fn set_alarm(&mut self, alarm: Arc<dyn AlarmControl>) {
        self.alarm = Some(alarm);
    }

    /// Register the shared notification stream.
    pub fn set_notifier(&mut self, notifier: Arc<dyn NotificationHandler>) {
        self.notifier = Some(notifier);
    }

    /// Token observed by the worker loop; cancel it to stop the channel.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn stop(&self) {
        debug!("Stopping GSM channel");
        self.token.cancel();
    }

    /// Enqueue a live event. Only events in the critical set (alarm, fire,
    /// panic, and the tamper/trouble sub-codes) are admitted.
    pub fn post_event(&self, event: RawEvent) {
        if !event.is_critical() {
            return;
        }
        self.queue.push(CHANNEL_PRIORITY, WorkKind::Event(event));
    }

    /// Accept a property change. Always a no-op for this channel.
    pub fn post_change(&self, _element: &str, _label: &str, _property: &str, _value: &str) {}

    /// Enqueue a cross-channel notification. Self-originated and
    /// sub-critical notifications are dropped here, at enqueue time.
    pub fn post_notify(&self, source: &str, message: &str, severity: Severity) {
        if source == CHANNEL_NAME {
            return;
        }
        if severity < Severity::Critical {
            return;
        }
        self.queue.push(
            CHANNEL_PRIORITY,
            WorkKind::Notify {
                source: source.to_string(),
                message: message.to_string(),
                severity,
            },
        );
    }

    /// Number of pending outbound work items.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Spawn the worker task that owns `transport` for the channel lifetime.
    pub fn spawn<T: Transport + Sync + 'static>(&self, transport: T) -> JoinHandle<()> {
        let worker = GsmWorker {
            modem: Modem::new(transport, self.config.clone()),
            config: self.config.clone(),
            queue: Arc::clone(&self.queue),
            alarm: self.alarm.clone(),
            notifier: self.notifier.clone(),
            token: self.token.clone(),
        };

        tokio::spawn(worker.run())
    }
}

/// The single task driving all modem I/O.
struct GsmWorker<T: Transport> {
    modem: Modem<T>,
    config: GsmConfig,
    queue: Arc<WorkQueue>,
    alarm: Option<Arc<dyn AlarmControl>>,
    notifier: Option<Arc<dyn NotificationHandler>>,
    token: CancellationToken,
}

impl<T: Transport> GsmWorker<T> {
    async fn run(mut self) {
        info!("Starting GSM channel");

        loop {
            if self.token.is_cancelled() {
                break;
            }

            if !self.modem.ensure_connected().await {
                warn!("Could not connect to modem");
                tokio::select! {
                    () = self.token.cancelled() => break,
                    () = tokio::time::sleep(self.config.reconnect_delay()) => {}
                }
                continue;
            }

            let mut buf = [0u8; READ_CHUNK_SIZE];
            let n = self.modem.read_chunk(&mut buf).await;
            if n > 0 {
                self.handle_incoming(&buf[..n]).await;
                continue;
            }

            let item = tokio::select! {
                () = self.token.cancelled() => break,
                item = self.queue.pop_timeout(QUEUE_POLL_TIMEOUT) => item,
            };
            if let Some(item) = item {
                self.handle_item(item).await;
            }
        }

        self.modem.close().await;
        info!("GSM channel stopped");
    }

    /// Route one recognized unsolicited message.
    async fn handle_incoming(&mut self, data: &[u8]) {
        match parse_unsolicited(data) {
            Some(Unsolicited::Sms {
                sender,
                timestamp,
                body,
            }) => {
                self.handle_message(timestamp, &sender, &body).await;
            }
            Some(Unsolicited::Ussd { payload }) => {
                debug!("USSD response: {payload}");
                self.notify(&payload, Severity::Info).await;
            }
            None => {}
        }
    }

    /// Service one outbound work item. Errors here are isolated to the item.
    async fn handle_item(&mut self, item: WorkItem) {
        match item.into_kind() {
            WorkKind::Event(event) => self.handle_event(&event).await,
            WorkKind::Notify {
                source, message, ..
            } => {
                self.modem
                    .send_message(&format!("{source}: {message}"))
                    .await;
            }
            WorkKind::Change { .. } => {}
        }
    }

    /// Escalation path: every admitted event is extreme enough to wake
    /// everyone up, so dial every contact. No suppression, no deduplication.
    async fn handle_event(&mut self, event: &RawEvent) {
        error!(
            "Critical event ({}/{}): {} - calling contacts",
            event.major, event.minor, event.message
        );

        for contact in self.config.contacts.clone() {
            self.modem.dial(&contact).await;
        }
    }

    /// Process one inbound SMS as a command.
    ///
    /// Every processed message yields exactly one audit notification; only
    /// trusted senders receive an SMS reply.
    async fn handle_message(&mut self, timestamp: NaiveDateTime, source: &str, body: &str) {
        debug!("Received message {timestamp} {source} {body}");

        let Some(alarm) = self.alarm.clone() else {
            debug!("No alarm registered, ignoring message");
            return;
        };

        if !self.config.is_trusted(source) {
            warn!("REJECTED (untrusted source): {body}");
            self.notify(&format!("REJECTED: {source}: {body}"), Severity::Info)
                .await;
            // No reply SMS: the sender is untrusted
            return;
        }

        let accepted = match parse_command(body) {
            Ok(command) => self.dispatch(alarm.as_ref(), &command).await,
            Err(e) => {
                warn!("{e}");
                false
            }
        };

        let verdict = if accepted { "ACCEPTED" } else { "REJECTED" };
        if accepted {
            info!("{verdict}: {body}");
        } else {
            warn!("{verdict}: {body}");
        }

        self.modem.send_sms(source, &format!("{verdict}: {body}")).await;
        self.notify(&format!("{verdict}: {source}: {body}"), Severity::Info)
            .await;
    }

    /// Forward a validated command to the alarm engine. A refusal counts as
    /// a rejection.
    async fn dispatch(&self, alarm: &dyn AlarmControl, command: &Command) -> bool {
        let accepted = match command.element_type {
            ElementType::Zone => {
                alarm.control_zone(&command.label, &command.action).await
            }
            ElementType::Partition => {
                alarm
                    .control_partition(&command.label, &command.action)
                    .await
            }
            ElementType::Output => {
                alarm.control_output(&command.label, &command.action).await
            }
        };

        if !accepted {
            warn!(
                "{} command refused: {}={}",
                command.element_type, command.label, command.action
            );
        }

        accepted
    }

    async fn notify(&self, message: &str, severity: Severity) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(CHANNEL_NAME, message, severity).await;
        }
    }
}
