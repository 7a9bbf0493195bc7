// networking/src/protocol.rs

use crate::{NetworkError, NetworkResult};
use consensus::Stake;
use ledger_core::{Block, Transaction};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Message channel tags; request kinds pair with the response kind the
/// correlator waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// A freshly sealed block pushed to peers
    NewBlock,
    /// Acknowledgement for `NewBlock`
    BlockAck,
    /// Catch-up request for a block range
    BlockRangeRequest,
    BlockRangeResponse,
    /// Fire-and-forget stake announcement
    StakeAnnounce,
    StakeAck,
    /// Fire-and-forget transaction announcement
    TxAnnounce,
    TxAck,
}

/// One wire message: a channel tag plus a bincode payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub kind: MessageKind,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn encode<T: Serialize>(kind: MessageKind, message: &T) -> NetworkResult<Self> {
        let payload = bincode::serialize(message)
            .map_err(|e| NetworkError::SerializationError(e.to_string()))?;
        Ok(Self { kind, payload })
    }

    pub fn decode<T: DeserializeOwned>(&self) -> NetworkResult<T> {
        bincode::deserialize(&self.payload)
            .map_err(|e| NetworkError::SerializationError(e.to_string()))
    }

    pub fn to_bytes(&self) -> NetworkResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| NetworkError::SerializationError(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> NetworkResult<Self> {
        bincode::deserialize(bytes).map_err(|e| NetworkError::SerializationError(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBlockMessage {
    pub block: Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckMessage {
    pub ok: bool,
    pub message: String,
}

impl AckMessage {
    pub fn ok() -> Self {
        Self {
            ok: true,
            message: String::new(),
        }
    }

    pub fn rejected(message: &str) -> Self {
        Self {
            ok: false,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRangeRequest {
    pub from_height: u64,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRangeResponse {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeAnnounceMessage {
    pub stake: Stake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionMessage {
    pub transaction: Transaction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_roundtrip() {
        let message = AckMessage::rejected("stale block");
        let frame = Frame::encode(MessageKind::BlockAck, &message).unwrap();

        let bytes = frame.to_bytes().unwrap();
        let parsed = Frame::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.kind, MessageKind::BlockAck);

        let decoded: AckMessage = parsed.decode().unwrap();
        assert!(!decoded.ok);
        assert_eq!(decoded.message, "stale block");
    }

    #[test]
    fn test_stake_announce_roundtrip() {
        let stake = Stake {
            address: "0xstaker".into(),
            amount: 42.5,
            time_stamp: 1_700_000_000,
        };
        let frame =
            Frame::encode(MessageKind::StakeAnnounce, &StakeAnnounceMessage { stake }).unwrap();
        let decoded: StakeAnnounceMessage = frame.decode().unwrap();
        assert_eq!(decoded.stake.amount, 42.5);
    }
}
