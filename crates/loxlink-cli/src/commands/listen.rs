//! The `listen` command: connect, send the configured commands, print events.

use std::io::Write;
use std::time::Duration;

use loxlink_client::{Connection, ConnectionEvent, ConnectionHandle};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::LoxlinkConfig;
use crate::error::{CliError, CliResult};
use crate::output::{OutputFormat, render};

/// How long an interrupted listen waits for the link to report closing.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Runs until the link closes, `count` events were printed, or Ctrl-C.
pub async fn listen(
    config: &LoxlinkConfig,
    commands: &[String],
    count: Option<usize>,
    format: OutputFormat,
) -> CliResult<()> {
    let connection = config.connection_config()?;
    info!(host = %connection.host, "connecting");
    let (handle, mut events) = Connection::connect(connection);

    let mut stdout = std::io::stdout();
    tokio::select! {
        result = pump(&handle, &mut events, commands, count, format, &mut stdout) => {
            return result.map(|seen| debug!(events = seen, "listen finished"));
        }
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    shutdown(&handle);
    if !wait_closed(&mut events, CLOSE_TIMEOUT).await {
        warn!(timeout_ms = CLOSE_TIMEOUT.as_millis() as u64, "link did not report closing");
    }
    Ok(())
}

/// Prints events from `events` to `out` and returns how many were printed.
///
/// The configured commands are sent as soon as the link is up. A stale
/// link is closed here, since the connection leaves that to its owner.
pub async fn pump<W: Write>(
    handle: &ConnectionHandle,
    events: &mut mpsc::Receiver<ConnectionEvent>,
    commands: &[String],
    count: Option<usize>,
    format: OutputFormat,
    out: &mut W,
) -> CliResult<usize> {
    let mut seen = 0;

    while let Some(event) = events.recv().await {
        writeln!(out, "{}", render(&event, format))?;
        seen += 1;

        match &event {
            ConnectionEvent::Connected => {
                for command in commands {
                    handle.send(command.as_str());
                }
            }
            ConnectionEvent::ConnectFailed { reason } => {
                return Err(CliError::Connect(reason.clone()));
            }
            ConnectionEvent::ConnectionError { reason } => {
                return Err(CliError::Connection(reason.clone()));
            }
            ConnectionEvent::Closed { .. } if handle.is_open() => {
                warn!("link went stale, closing");
                shutdown(handle);
            }
            ConnectionEvent::Closed { .. } => break,
            _ => {}
        }

        if count.is_some_and(|limit| seen >= limit) {
            shutdown(handle);
            break;
        }
    }

    out.flush()?;
    Ok(seen)
}

/// Waits up to `limit` for a terminal event or the end of `events`.
///
/// Returns false if the limit passed first.
pub async fn wait_closed(events: &mut mpsc::Receiver<ConnectionEvent>, limit: Duration) -> bool {
    let closed = async {
        while let Some(event) = events.recv().await {
            if event.is_terminal() {
                break;
            }
        }
    };
    tokio::time::timeout(limit, closed).await.is_ok()
}

fn shutdown(handle: &ConnectionHandle) {
    if let Err(e) = handle.close() {
        debug!(error = %e, "link already closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loxlink_client::{ConnectionConfig, Outbound, TransportEvent};
    use loxlink_protocol::{Header, Message, command};

    fn header(identifier: u8, payload_length: u32) -> Message {
        Message::Binary(
            Header {
                frame_kind: 0x03,
                identifier,
                info: 0,
                reserved: 0,
                payload_length,
            }
            .encode()
            .to_vec(),
        )
    }

    #[tokio::test]
    async fn prints_until_closed() {
        let (inbound, inbound_rx) = mpsc::channel(8);
        let (outbound_tx, _outbound) = mpsc::channel(8);
        for event in [
            TransportEvent::Message(header(0, 5)),
            TransportEvent::Message(Message::Text("hello".into())),
            TransportEvent::Closed {
                code: 1000,
                reason: "bye".into(),
            },
        ] {
            inbound.send(event).await.unwrap();
        }

        let (handle, mut events) =
            Connection::attach(ConnectionConfig::default(), inbound_rx, outbound_tx);
        let mut out = Vec::new();
        let seen = pump(&handle, &mut events, &[], None, OutputFormat::Tty, &mut out)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(seen, 4);
        assert_eq!(lines[0], "connect");
        assert!(lines[1].starts_with("header kind=0x03 id=0"));
        assert_eq!(lines[2], "message_text hello");
        assert_eq!(lines[3], "close unexpected: bye (1000)");
    }

    #[tokio::test]
    async fn sends_commands_and_stops_at_count() {
        let (_inbound, inbound_rx) = mpsc::channel(8);
        let (outbound_tx, mut outbound) = mpsc::channel(8);
        let (handle, mut events) =
            Connection::attach(ConnectionConfig::default(), inbound_rx, outbound_tx);

        let commands = vec![command::ENABLE_STATUS_UPDATES.to_string()];
        let mut out = Vec::new();
        let seen = pump(&handle, &mut events, &commands, Some(1), OutputFormat::Json, &mut out)
            .await
            .unwrap();

        assert_eq!(seen, 1);
        assert_eq!(
            outbound.recv().await,
            Some(Outbound::Text(command::ENABLE_STATUS_UPDATES.into()))
        );
        assert_eq!(outbound.recv().await, Some(Outbound::Close));

        let line: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(line["event"], "connect");
    }

    #[tokio::test]
    async fn connection_error_fails_command() {
        let (inbound, inbound_rx) = mpsc::channel(8);
        let (outbound_tx, _outbound) = mpsc::channel(8);
        inbound
            .send(TransportEvent::Error("connection reset".into()))
            .await
            .unwrap();

        let (handle, mut events) =
            Connection::attach(ConnectionConfig::default(), inbound_rx, outbound_tx);
        let mut out = Vec::new();
        let result = pump(&handle, &mut events, &[], None, OutputFormat::Tty, &mut out).await;

        assert!(matches!(result, Err(CliError::Connection(reason)) if reason == "connection reset"));
    }

    #[tokio::test]
    async fn shutdown_waits_for_close() {
        let (_inbound, inbound_rx) = mpsc::channel(8);
        let (outbound_tx, mut outbound) = mpsc::channel(8);
        let (handle, mut events) =
            Connection::attach(ConnectionConfig::default(), inbound_rx, outbound_tx);
        assert_eq!(events.recv().await, Some(ConnectionEvent::Connected));

        shutdown(&handle);
        assert!(wait_closed(&mut events, CLOSE_TIMEOUT).await);
        assert!(!handle.is_open());
        assert_eq!(outbound.recv().await, Some(Outbound::Close));
    }

    #[tokio::test]
    async fn wait_closed_gives_up() {
        let (_inbound, inbound_rx) = mpsc::channel(8);
        let (outbound_tx, _outbound) = mpsc::channel(8);
        let (handle, mut events) =
            Connection::attach(ConnectionConfig::default(), inbound_rx, outbound_tx);

        assert!(!wait_closed(&mut events, Duration::from_millis(100)).await);
        assert!(handle.is_open());
    }
}
