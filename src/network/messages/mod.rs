pub mod conversions;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::chord::types::NodeId;
use crate::error::MessageError;

/*
Every message is MESSAGE_LEN bytes on the wire: a type tag followed by two
payload words, all big-endian u32s. Requests carry odd tags and each
acknowledgement is its request's tag plus one.
*/

pub const MESSAGE_LEN: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageType {
    Quit = 1,
    QuitAck,
    GetStatus,
    GetStatusAck,
    SetStatus,
    SetStatusAck,
    GetSuccessor,
    GetSuccessorAck,
    SetSuccessor,
    SetSuccessorAck,
    GetPredecessor,
    GetPredecessorAck,
    SetPredecessor,
    SetPredecessorAck,
    GetClosestPrecedingFinger,
    GetClosestPrecedingFingerAck,
    FindSuccessor,
    FindSuccessorAck,
    FindPredecessor,
    FindPredecessorAck,
    UpdateFingerTableJoin,
    UpdateFingerTableJoinAck,
    UpdateFingerTableLeave,
    UpdateFingerTableLeaveAck,
}

impl MessageType {
    pub const ALL: [MessageType; 24] = [
        MessageType::Quit,
        MessageType::QuitAck,
        MessageType::GetStatus,
        MessageType::GetStatusAck,
        MessageType::SetStatus,
        MessageType::SetStatusAck,
        MessageType::GetSuccessor,
        MessageType::GetSuccessorAck,
        MessageType::SetSuccessor,
        MessageType::SetSuccessorAck,
        MessageType::GetPredecessor,
        MessageType::GetPredecessorAck,
        MessageType::SetPredecessor,
        MessageType::SetPredecessorAck,
        MessageType::GetClosestPrecedingFinger,
        MessageType::GetClosestPrecedingFingerAck,
        MessageType::FindSuccessor,
        MessageType::FindSuccessorAck,
        MessageType::FindPredecessor,
        MessageType::FindPredecessorAck,
        MessageType::UpdateFingerTableJoin,
        MessageType::UpdateFingerTableJoinAck,
        MessageType::UpdateFingerTableLeave,
        MessageType::UpdateFingerTableLeaveAck,
    ];

    pub fn is_request(self) -> bool {
        (self as u32) % 2 == 1
    }

    /// The acknowledgement answering this request. Acks map to themselves.
    pub fn ack(self) -> MessageType {
        match self {
            MessageType::Quit => MessageType::QuitAck,
            MessageType::GetStatus => MessageType::GetStatusAck,
            MessageType::SetStatus => MessageType::SetStatusAck,
            MessageType::GetSuccessor => MessageType::GetSuccessorAck,
            MessageType::SetSuccessor => MessageType::SetSuccessorAck,
            MessageType::GetPredecessor => MessageType::GetPredecessorAck,
            MessageType::SetPredecessor => MessageType::SetPredecessorAck,
            MessageType::GetClosestPrecedingFinger => MessageType::GetClosestPrecedingFingerAck,
            MessageType::FindSuccessor => MessageType::FindSuccessorAck,
            MessageType::FindPredecessor => MessageType::FindPredecessorAck,
            MessageType::UpdateFingerTableJoin => MessageType::UpdateFingerTableJoinAck,
            MessageType::UpdateFingerTableLeave => MessageType::UpdateFingerTableLeaveAck,
            ack => ack,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageType,
    pub data: u32,
    pub data2: u32,
}

impl Message {
    pub fn new(kind: MessageType) -> Self {
        Self {
            kind,
            data: 0,
            data2: 0,
        }
    }

    pub fn with_data(kind: MessageType, data: u32) -> Self {
        Self {
            kind,
            data,
            data2: 0,
        }
    }

    /// Finger updates carry the finger index in `data` and the node id in `data2`
    pub fn finger_update(kind: MessageType, index: usize, id: NodeId) -> Self {
        Self {
            kind,
            data: index as u32,
            data2: id.0,
        }
    }

    pub fn node(&self) -> NodeId {
        NodeId(self.data)
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(MESSAGE_LEN);
        buf.put_u32(self.kind.into());
        buf.put_u32(self.data);
        buf.put_u32(self.data2);
        buf.freeze()
    }

    pub fn decode(mut buf: &[u8]) -> Result<Self, MessageError> {
        if buf.len() != MESSAGE_LEN {
            return Err(MessageError::InvalidLength(buf.len()));
        }
        let kind = MessageType::try_from(buf.get_u32())?;
        let data = buf.get_u32();
        let data2 = buf.get_u32();
        Ok(Self { kind, data, data2 })
    }

    /// Accept this reply only if it carries the expected type
    pub fn expect(self, expected: MessageType) -> Result<Self, MessageError> {
        if self.kind == expected {
            Ok(self)
        } else {
            Err(MessageError::UnexpectedReply {
                expected,
                received: self.kind,
            })
        }
    }
}
