// networking/src/lib.rs

//! Peer request/response correlation and block propagation
//!
//! This crate implements the layer between the consensus engine and the raw
//! datagram transport:
//! - Peer bookkeeping (connected and known-but-offline peers)
//! - The wire protocol frames
//! - Request/response correlation with timeouts over connected and
//!   connectionless peers
//! - Fire-and-forget propagation of blocks, stakes and transactions

pub mod correlator;
pub mod peer;
pub mod propagate;
pub mod protocol;
pub mod transport;

pub use correlator::{InboundHandler, PeerCorrelator, ResponseCallback};
pub use peer::{PeerId, PeerInfo, PeerManager, PeerStatus};
pub use propagate::Propagator;
pub use protocol::{
    AckMessage, BlockRangeRequest, BlockRangeResponse, Frame, MessageKind, NewBlockMessage,
    StakeAnnounceMessage, TransactionMessage,
};
pub use transport::{OutboxTransport, Transport};

use std::time::Duration;

/// How long an unconnected correlation entry may wait before it is
/// considered expired and purged on the next send attempt for its key.
pub const UNCONNECTED_RESPONSE_TIMEOUT: Duration = Duration::from_secs(7);

/// How long a connected request waits before the correlator fires the
/// timeout sentinel.
pub const CONNECTED_REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Budget for fire-and-forget broadcasts; never blocks the caller past it.
pub const BROADCAST_TIMEOUT: Duration = Duration::from_secs(8);

/// Result type for networking operations
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Errors that can occur during networking operations
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Peer error: {0}")]
    PeerError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Timeout")]
    Timeout,
}
