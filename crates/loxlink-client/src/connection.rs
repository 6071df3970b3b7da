//! Connection manager.
//!
//! One tokio task owns a connection: the message state machine, the
//! keepalive monitor and both timers. Inbound messages, timer ticks and
//! handle commands are serialized through a single `tokio::select!` loop,
//! and everything the connection has to say is sent as a
//! [`ConnectionEvent`] on one channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use loxlink_protocol::{KEEPALIVE_PROBE, Message};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::error::{ClientError, ClientResult};
use crate::event::ConnectionEvent;
use crate::liveness::KeepaliveMonitor;
use crate::state::MessageStateMachine;
use crate::transport::{self, ABNORMAL_CLOSURE, Outbound, TransportEvent};

/// Close code used when the client ends the session.
const NORMAL_CLOSURE: u16 = 1000;

#[derive(Debug)]
enum Command {
    Send(String),
    Close,
}

/// Entry points for starting a connection.
pub struct Connection;

impl Connection {
    /// Connects to the device described by `config`.
    ///
    /// Returns immediately. The handshake runs in the spawned connection
    /// task; its outcome arrives as [`ConnectionEvent::Connected`] or
    /// [`ConnectionEvent::ConnectFailed`]. Must be called within a tokio
    /// runtime.
    pub fn connect(config: ConnectionConfig) -> (ConnectionHandle, mpsc::Receiver<ConnectionEvent>) {
        let (handle, commands, open) = ConnectionHandle::new();
        let (events_tx, events_rx) = mpsc::channel(config.event_capacity.max(1));

        tokio::spawn(async move {
            if let Err(e) = config.validate() {
                warn!(error = %e, "refusing to connect");
                connect_failed(&events_tx, e).await;
                return;
            }

            match transport::connect(&config).await {
                Ok((outbound, inbound)) => {
                    Session::new(config, events_tx, outbound, open)
                        .run(inbound, commands)
                        .await;
                }
                Err(e) => {
                    warn!(host = %config.host, error = %e, "connect failed");
                    connect_failed(&events_tx, e).await;
                }
            }
        });

        (handle, events_rx)
    }

    /// Runs a session over an already established link.
    ///
    /// `inbound` carries what the link receives and `outbound` what it
    /// should send. The session starts registered, exactly as after a
    /// successful handshake. A configuration that fails
    /// [`ConnectionConfig::validate`] ends the session with
    /// [`ConnectionEvent::ConnectFailed`] before it registers.
    pub fn attach(
        config: ConnectionConfig,
        inbound: mpsc::Receiver<TransportEvent>,
        outbound: mpsc::Sender<Outbound>,
    ) -> (ConnectionHandle, mpsc::Receiver<ConnectionEvent>) {
        let (handle, commands, open) = ConnectionHandle::new();
        let (events_tx, events_rx) = mpsc::channel(config.event_capacity.max(1));

        tokio::spawn(async move {
            if let Err(e) = config.validate() {
                warn!(error = %e, "refusing to attach");
                connect_failed(&events_tx, e).await;
                return;
            }
            Session::new(config, events_tx, outbound, open)
                .run(inbound, commands)
                .await;
        });

        (handle, events_rx)
    }
}

async fn connect_failed(events: &mpsc::Sender<ConnectionEvent>, error: ClientError) {
    let _ = events
        .send(ConnectionEvent::ConnectFailed {
            reason: error.to_string(),
        })
        .await;
}

/// Handle for sending to and closing a running connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    commands: mpsc::UnboundedSender<Command>,
    open: Arc<AtomicBool>,
}

impl ConnectionHandle {
    fn new() -> (Self, mpsc::UnboundedReceiver<Command>, Arc<AtomicBool>) {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));
        (
            Self {
                commands,
                open: open.clone(),
            },
            commands_rx,
            open,
        )
    }

    /// Returns true while the link is open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Queues `text` for sending.
    ///
    /// Fire-and-forget: when the link is not open the message is dropped
    /// without any event. Otherwise a [`ConnectionEvent::Sent`] follows
    /// once it has been handed to the transport.
    pub fn send(&self, text: impl Into<String>) {
        let text = text.into();
        if !self.is_open() {
            debug!(message = %text, "not connected, dropping message");
            return;
        }
        if self.commands.send(Command::Send(text)).is_err() {
            debug!("connection task gone, dropping message");
        }
    }

    /// Closes the link.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] if the link is not open.
    pub fn close(&self) -> ClientResult<()> {
        if !self.is_open() {
            return Err(ClientError::NotConnected);
        }
        self.commands
            .send(Command::Close)
            .map_err(|_| ClientError::NotConnected)
    }
}

struct Session {
    config: ConnectionConfig,
    events: mpsc::Sender<ConnectionEvent>,
    outbound: mpsc::Sender<Outbound>,
    open: Arc<AtomicBool>,
    machine: MessageStateMachine,
    monitor: KeepaliveMonitor,
}

impl Session {
    fn new(
        config: ConnectionConfig,
        events: mpsc::Sender<ConnectionEvent>,
        outbound: mpsc::Sender<Outbound>,
        open: Arc<AtomicBool>,
    ) -> Self {
        let monitor = KeepaliveMonitor::new(config.staleness_limit());
        Self {
            config,
            events,
            outbound,
            open,
            machine: MessageStateMachine::new(),
            monitor,
        }
    }

    async fn run(
        mut self,
        mut inbound: mpsc::Receiver<TransportEvent>,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        self.register().await;

        let now = Instant::now();
        let keepalive_period = self.config.keepalive_interval;
        let check_period = self.config.staleness_check_interval;
        let mut keepalive = interval_at(now + keepalive_period, keepalive_period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut staleness = interval_at(now + check_period, check_period);
        staleness.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut keepalive_active = true;
        let mut staleness_active = true;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Send(text)) => self.send(text).await,
                    Some(Command::Close) => {
                        self.close_by_client().await;
                        break;
                    }
                    None => {
                        debug!("all handles dropped, closing");
                        self.close_by_client().await;
                        break;
                    }
                },
                event = inbound.recv() => match event {
                    Some(TransportEvent::Message(message)) => self.on_message(message).await,
                    Some(TransportEvent::Closed { code, reason }) => {
                        self.on_closed(code, &reason).await;
                        break;
                    }
                    Some(TransportEvent::Error(reason)) => {
                        self.on_error(reason).await;
                        break;
                    }
                    None => {
                        self.on_closed(ABNORMAL_CLOSURE, "transport gone").await;
                        break;
                    }
                },
                _ = keepalive.tick(), if keepalive_active => {
                    keepalive_active = self.probe();
                }
                _ = staleness.tick(), if staleness_active => {
                    if self.monitor.is_stale(Instant::now()) {
                        warn!(
                            limit_ms = self.config.staleness_limit().as_millis() as u64,
                            "no keepalive acknowledgment, link is stale"
                        );
                        staleness_active = false;
                        self.emit(ConnectionEvent::Closed {
                            graceful: false,
                            reason: "timeout".to_string(),
                        })
                        .await;
                    }
                }
            }
        }

        self.open.store(false, Ordering::Release);
        debug!("connection task finished");
    }

    async fn register(&mut self) {
        self.machine.reset();
        self.monitor.reset();
        self.open.store(true, Ordering::Release);
        info!(host = %self.config.host, "connected");
        self.emit(ConnectionEvent::Connected).await;
    }

    /// Sends a keepalive probe. Returns false once the link can no longer take it.
    fn probe(&mut self) -> bool {
        self.monitor.record_probe(Instant::now());
        match self.outbound.try_send(Outbound::Text(KEEPALIVE_PROBE.to_string())) {
            Ok(()) => {
                debug!("keepalive probe sent");
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!("send queue full, skipping keepalive probe");
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!("transport closed, stopping keepalive");
                false
            }
        }
    }

    async fn send(&mut self, text: String) {
        match self.outbound.try_send(Outbound::Text(text.clone())) {
            Ok(()) => {
                self.machine.record_request(text.as_str());
                debug!(message = %text, "sent");
                self.emit(ConnectionEvent::Sent(text)).await;
            }
            Err(TrySendError::Full(_)) => warn!(message = %text, "send queue full, dropping"),
            Err(TrySendError::Closed(_)) => debug!(message = %text, "transport closed, dropping"),
        }
    }

    async fn on_message(&mut self, message: Message) {
        let event = self.machine.handle(message);

        if let ConnectionEvent::Header(header) = &event
            && header.is_keepalive_ack()
        {
            let latency = self.monitor.record_ack(Instant::now());
            debug!(latency_ms = latency.as_millis() as u64, "keepalive acknowledged");
            self.emit(ConnectionEvent::Keepalive(latency)).await;
        }

        self.emit(event).await;
    }

    async fn on_closed(&mut self, code: u16, reason: &str) {
        self.open.store(false, Ordering::Release);
        let graceful = self
            .machine
            .last_header()
            .is_some_and(|header| header.is_out_of_service());
        let reason = if reason.is_empty() {
            format!("connection closed ({code})")
        } else {
            format!("{reason} ({code})")
        };
        info!(graceful, reason = %reason, "connection closed");
        self.emit(ConnectionEvent::Closed { graceful, reason }).await;
    }

    async fn on_error(&mut self, reason: String) {
        self.open.store(false, Ordering::Release);
        warn!(reason = %reason, "connection error");
        self.emit(ConnectionEvent::ConnectionError { reason }).await;
    }

    /// Ends the session from this side. The writer stops once the session
    /// drops its sender, so a queue that is full or gone only loses the
    /// close frame.
    async fn close_by_client(&mut self) {
        match self.outbound.try_send(Outbound::Close) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("send queue full, closing without close frame"),
            Err(TrySendError::Closed(_)) => debug!("transport already closed"),
        }
        self.on_closed(NORMAL_CLOSURE, "closed by client").await;
    }

    async fn emit(&self, event: ConnectionEvent) {
        if self.events.send(event).await.is_err() {
            debug!("event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn connect_with_invalid_config_fails() {
        let (handle, mut events) = Connection::connect(ConnectionConfig::new(""));
        let event = events.recv().await.unwrap();
        assert!(matches!(event, ConnectionEvent::ConnectFailed { .. }));
        assert!(events.recv().await.is_none());
        assert!(!handle.is_open());
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = ConnectionConfig::new(addr.to_string())
            .with_keepalive_interval(Duration::from_secs(1));
        let (_handle, mut events) = Connection::connect(config);
        let event = events.recv().await.unwrap();
        assert!(
            matches!(event, ConnectionEvent::ConnectFailed { .. }),
            "got {event:?}"
        );
    }

    #[tokio::test]
    async fn attach_with_overflowing_interval_fails() {
        let (_inbound, inbound_rx) = mpsc::channel(1);
        let (outbound_tx, _outbound) = mpsc::channel(1);
        let config = ConnectionConfig::new("192.168.1.77")
            .with_keepalive_interval(Duration::from_secs(u64::MAX));

        let (handle, mut events) = Connection::attach(config, inbound_rx, outbound_tx);
        let event = events.recv().await.unwrap();
        assert!(
            matches!(&event, ConnectionEvent::ConnectFailed { reason } if reason.contains("overflows")),
            "got {event:?}"
        );
        assert!(events.recv().await.is_none());
        assert!(!handle.is_open());
    }

    #[test]
    fn handle_without_task_is_closed() {
        let (handle, _commands, _open) = ConnectionHandle::new();
        assert!(!handle.is_open());
        assert!(matches!(handle.close(), Err(ClientError::NotConnected)));
        handle.send("dropped");
    }
}
