//! Connection manager for the `remotecontrol` WebSocket protocol.
//!
//! [`Connection::connect`] spawns a task that owns the link to one device.
//! The task decodes every message through the [`MessageStateMachine`],
//! sends keepalive probes, watches for staleness, and reports everything
//! as [`ConnectionEvent`]s on a channel. The returned [`ConnectionHandle`]
//! sends requests and closes the link.
//!
//! ```no_run
//! use loxlink_client::{Connection, ConnectionConfig, ConnectionEvent};
//! use loxlink_protocol::command;
//!
//! # async fn run() {
//! let (handle, mut events) = Connection::connect(ConnectionConfig::new("192.168.1.77"));
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ConnectionEvent::Connected => handle.send(command::ENABLE_STATUS_UPDATES),
//!         ConnectionEvent::ValueTable(values) => println!("{} values", values.len()),
//!         other if other.is_terminal() => break,
//!         _ => {}
//!     }
//! }
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod liveness;
pub mod logging;
pub mod state;
pub mod transport;

pub use config::ConnectionConfig;
pub use connection::{Connection, ConnectionHandle};
pub use error::{ClientError, ClientResult};
pub use event::ConnectionEvent;
pub use liveness::KeepaliveMonitor;
pub use state::MessageStateMachine;
pub use transport::{Outbound, TransportEvent};
