use crate::chord::types::{NodeId, NodeStatus};
use crate::error::MessageError;
use crate::network::messages::MessageType;

impl From<MessageType> for u32 {
    fn from(kind: MessageType) -> Self {
        kind as u32
    }
}

impl TryFrom<u32> for MessageType {
    type Error = MessageError;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        tag.checked_sub(1)
            .and_then(|position| MessageType::ALL.get(position as usize))
            .copied()
            .ok_or(MessageError::UnknownType(tag))
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        NodeId(value)
    }
}

impl From<NodeId> for u32 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl From<NodeStatus> for u32 {
    fn from(status: NodeStatus) -> Self {
        match status {
            NodeStatus::Disconnected => 0,
            NodeStatus::Connected => 1,
        }
    }
}

impl TryFrom<u32> for NodeStatus {
    type Error = MessageError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(NodeStatus::Disconnected),
            1 => Ok(NodeStatus::Connected),
            other => Err(MessageError::InvalidStatus(other)),
        }
    }
}
