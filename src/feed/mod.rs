//! Sensor feed input: WebSocket connection, message decoding and the
//! per-group latest-value store.

pub mod aggregator;
pub mod codec;
pub mod connection;
pub mod transport;

pub use aggregator::{GroupAggregator, GroupSnapshot};
pub use codec::{DecodeError, Reading, decode};
pub use connection::{ConnectionManager, ConnectionState, ConnectivityState};
pub use transport::{Transport, TransportError, TransportEvent, TransportStream, WebSocketTransport};
