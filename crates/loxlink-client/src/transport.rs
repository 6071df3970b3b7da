//! WebSocket transport.
//!
//! Performs the handshake and bridges the socket to a pair of channels, so
//! the connection task only ever sees [`TransportEvent`]s and sends
//! [`Outbound`] commands. A reader task and a writer task own the two
//! halves of the stream.

use futures_util::{SinkExt, StreamExt};
use loxlink_protocol::{Message, WS_PROTOCOL};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{
    self,
    client::IntoClientRequest,
    http::{HeaderValue, header::SEC_WEBSOCKET_PROTOCOL},
};
use tracing::{debug, info, trace, warn};

use crate::config::ConnectionConfig;
use crate::error::ClientResult;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Close code reported when the stream ends without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Close code reported for a close frame without a status.
pub const NO_STATUS: u16 = 1005;

/// What the transport reports to the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A text or binary data frame.
    Message(Message),
    /// The link closed. Always the last event.
    Closed { code: u16, reason: String },
    /// The link failed. Always the last event.
    Error(String),
}

/// Commands for the writer side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    /// Send a close frame and shut the socket.
    Close,
}

/// Opens the WebSocket for `config` and returns the channel pair bridging it.
///
/// # Errors
///
/// Returns an error if the endpoint URL is invalid or the handshake fails.
pub async fn connect(
    config: &ConnectionConfig,
) -> ClientResult<(mpsc::Sender<Outbound>, mpsc::Receiver<TransportEvent>)> {
    let url = config.ws_url()?;

    let mut request = url.as_str().into_client_request()?;
    request
        .headers_mut()
        .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(WS_PROTOCOL));

    debug!(url = %url, protocol = WS_PROTOCOL, "opening websocket");
    let (stream, response) = tokio_tungstenite::connect_async(request).await?;
    info!(url = %url, status = %response.status(), "websocket handshake complete");

    let (sink, stream) = stream.split();
    let (event_tx, event_rx) = mpsc::channel(config.event_capacity);
    let (outbound_tx, outbound_rx) = mpsc::channel(config.send_capacity);

    tokio::spawn(read_loop(stream, event_tx.clone()));
    tokio::spawn(write_loop(sink, outbound_rx, event_tx));

    Ok((outbound_tx, event_rx))
}

async fn read_loop(
    mut stream: futures_util::stream::SplitStream<WsStream>,
    events: mpsc::Sender<TransportEvent>,
) {
    loop {
        let event = match stream.next().await {
            Some(Ok(tungstenite::Message::Text(text))) => {
                TransportEvent::Message(Message::Text(text.to_string()))
            }
            Some(Ok(tungstenite::Message::Binary(data))) => {
                TransportEvent::Message(Message::Binary(data.to_vec()))
            }
            Some(Ok(tungstenite::Message::Close(frame))) => {
                let (code, reason) = frame
                    .map(|f| (f.code.into(), f.reason.to_string()))
                    .unwrap_or((NO_STATUS, String::new()));
                debug!(code, reason = %reason, "received close frame");
                let _ = events.send(TransportEvent::Closed { code, reason }).await;
                return;
            }
            // Pings are answered by tungstenite itself.
            Some(Ok(other)) => {
                trace!(?other, "ignoring control frame");
                continue;
            }
            Some(Err(e)) => {
                warn!(error = %e, "websocket read failed");
                let _ = events.send(TransportEvent::Error(e.to_string())).await;
                return;
            }
            None => {
                let _ = events
                    .send(TransportEvent::Closed {
                        code: ABNORMAL_CLOSURE,
                        reason: "stream ended".to_string(),
                    })
                    .await;
                return;
            }
        };

        if events.send(event).await.is_err() {
            debug!("connection gone, stopping reader");
            return;
        }
    }
}

async fn write_loop(
    mut sink: futures_util::stream::SplitSink<WsStream, tungstenite::Message>,
    mut outbound: mpsc::Receiver<Outbound>,
    events: mpsc::Sender<TransportEvent>,
) {
    while let Some(command) = outbound.recv().await {
        let result = match command {
            Outbound::Text(text) => sink.send(tungstenite::Message::Text(text.into())).await,
            Outbound::Close => {
                if let Err(e) = sink.send(tungstenite::Message::Close(None)).await {
                    debug!(error = %e, "close frame not sent");
                }
                break;
            }
        };

        if let Err(e) = result {
            warn!(error = %e, "websocket write failed");
            let _ = events.send(TransportEvent::Error(e.to_string())).await;
            return;
        }
    }

    if let Err(e) = sink.close().await {
        debug!(error = %e, "websocket sink close failed");
    }
}
