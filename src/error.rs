use thiserror::Error;

use crate::chord::membership::{JoinStep, LeaveStep};
use crate::chord::types::NodeId;
use crate::network::messages::MessageType;

#[derive(Error, Debug)]
pub enum TriadError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection to {peer} failed: {reason}")]
    ConnectionFailed { peer: NodeId, reason: String },

    #[error("Peer unreachable: {0}")]
    PeerUnreachable(String),

    #[error("No reply from {peer} within {millis} ms")]
    Timeout { peer: NodeId, millis: u128 },

    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("RPC server error: {0}")]
    ServerFailed(String),
}

#[derive(Error, Debug)]
pub enum ChordError {
    #[error("Node is already connected to a ring")]
    AlreadyConnected,

    #[error("Node is not connected to a ring")]
    NotConnected,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Finger index {0} is outside the finger table")]
    InvalidFingerIndex(usize),

    #[error("Predecessor search for {target} gave up after {hops} hops")]
    RoutingExhausted { target: NodeId, hops: usize },

    #[error("Predecessor search for {target} stalled at {at}")]
    RoutingStalled { target: NodeId, at: NodeId },

    #[error("Node actor unavailable: {0}")]
    ActorUnavailable(String),

    #[error("Join failed during {step}: {source}")]
    JoinFailed {
        step: JoinStep,
        #[source]
        source: Box<ChordError>,
    },

    #[error("Leave failed during {step}: {source}")]
    LeaveFailed {
        step: LeaveStep,
        #[source]
        source: Box<ChordError>,
    },

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Message(#[from] MessageError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MessageError {
    #[error("Unknown message type {0}")]
    UnknownType(u32),

    #[error("Unknown node status {0}")]
    InvalidStatus(u32),

    #[error("{0:?} is not a request")]
    NotARequest(MessageType),

    #[error("Invalid message length {0}")]
    InvalidLength(usize),

    #[error("Expected {expected:?} but received {received:?}")]
    UnexpectedReply {
        expected: MessageType,
        received: MessageType,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}
