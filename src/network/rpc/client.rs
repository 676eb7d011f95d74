use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::chord::peer::{Peer, PeerDirectory};
use crate::chord::types::{NodeId, NodeStatus};
use crate::error::{ChordError, NetworkError};
use crate::network::messages::{Message, MessageType, MESSAGE_LEN};
use crate::network::rpc::RpcSettings;

/// Stub for one remote node. Every call opens a fresh connection from an
/// ephemeral port, sends one request and waits for its acknowledgement.
#[derive(Clone, Debug)]
pub struct ChordRpcClient {
    target: NodeId,
    addr: SocketAddr,
    timeout: Duration,
    probe_timeout: Duration,
}

impl ChordRpcClient {
    pub fn new(target: NodeId, settings: RpcSettings) -> Self {
        Self {
            target,
            addr: settings.socket_addr(target),
            timeout: settings.timeout,
            probe_timeout: settings.probe_timeout,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    async fn exchange(&self, request: Message) -> Result<Message, ChordError> {
        let mut stream = TcpStream::connect(self.addr)
            .await
            .map_err(|e| NetworkError::ConnectionFailed {
                peer: self.target,
                reason: e.to_string(),
            })?;
        stream
            .write_all(&request.encode())
            .await
            .map_err(|e| NetworkError::PeerUnreachable(format!("{}: {}", self.addr, e)))?;

        let mut buf = [0u8; MESSAGE_LEN];
        stream
            .read_exact(&mut buf)
            .await
            .map_err(|e| NetworkError::PeerUnreachable(format!("{}: {}", self.addr, e)))?;
        Ok(Message::decode(&buf)?)
    }

    async fn call_within(&self, request: Message, limit: Duration) -> Result<Message, ChordError> {
        debug!("-> {} {:?}", self.target, request);
        let reply = tokio::time::timeout(limit, self.exchange(request))
            .await
            .map_err(|_| NetworkError::Timeout {
                peer: self.target,
                millis: limit.as_millis(),
            })??;
        debug!("<- {} {:?}", self.target, reply);
        Ok(reply.expect(request.kind.ack())?)
    }

    async fn call(&self, request: Message) -> Result<Message, ChordError> {
        self.call_within(request, self.timeout).await
    }

    /// Ask the node's server to stop
    pub async fn quit(&self) -> Result<(), ChordError> {
        self.call(Message::new(MessageType::Quit)).await?;
        Ok(())
    }
}

#[async_trait]
impl Peer for ChordRpcClient {
    fn id(&self) -> NodeId {
        self.target
    }

    async fn status(&self) -> Result<NodeStatus, ChordError> {
        let reply = self.call(Message::new(MessageType::GetStatus)).await?;
        Ok(NodeStatus::try_from(reply.data)?)
    }

    async fn set_status(&self, status: NodeStatus) -> Result<(), ChordError> {
        self.call(Message::with_data(MessageType::SetStatus, status.into()))
            .await?;
        Ok(())
    }

    async fn successor(&self) -> Result<NodeId, ChordError> {
        let reply = self.call(Message::new(MessageType::GetSuccessor)).await?;
        Ok(reply.node())
    }

    async fn set_successor(&self, successor: NodeId) -> Result<(), ChordError> {
        self.call(Message::with_data(MessageType::SetSuccessor, successor.0))
            .await?;
        Ok(())
    }

    async fn predecessor(&self) -> Result<NodeId, ChordError> {
        let reply = self.call(Message::new(MessageType::GetPredecessor)).await?;
        Ok(reply.node())
    }

    async fn set_predecessor(&self, predecessor: NodeId) -> Result<(), ChordError> {
        self.call(Message::with_data(MessageType::SetPredecessor, predecessor.0))
            .await?;
        Ok(())
    }

    async fn closest_preceding_finger(&self, id: NodeId) -> Result<NodeId, ChordError> {
        let reply = self
            .call(Message::with_data(MessageType::GetClosestPrecedingFinger, id.0))
            .await?;
        Ok(reply.node())
    }

    async fn find_successor(&self, id: NodeId) -> Result<NodeId, ChordError> {
        let reply = self
            .call(Message::with_data(MessageType::FindSuccessor, id.0))
            .await?;
        Ok(reply.node())
    }

    async fn find_predecessor(&self, id: NodeId) -> Result<NodeId, ChordError> {
        let reply = self
            .call(Message::with_data(MessageType::FindPredecessor, id.0))
            .await?;
        Ok(reply.node())
    }

    async fn update_finger_table_join(&self, index: usize, id: NodeId) -> Result<(), ChordError> {
        self.call(Message::finger_update(MessageType::UpdateFingerTableJoin, index, id))
            .await?;
        Ok(())
    }

    async fn update_finger_table_leave(
        &self,
        index: usize,
        id: NodeId,
    ) -> Result<(), ChordError> {
        self.call(Message::finger_update(MessageType::UpdateFingerTableLeave, index, id))
            .await?;
        Ok(())
    }

    async fn probe(&self) -> NodeStatus {
        let reply = self
            .call_within(Message::new(MessageType::GetStatus), self.probe_timeout)
            .await;
        match reply.and_then(|m| Ok(NodeStatus::try_from(m.data)?)) {
            Ok(status) => status,
            Err(e) => {
                debug!("Probe of {} failed: {}", self.target, e);
                NodeStatus::Disconnected
            }
        }
    }
}

/// Resolves every id to an RPC stub at `address(id):port`
#[derive(Clone, Debug)]
pub struct TcpDirectory {
    settings: RpcSettings,
}

impl TcpDirectory {
    pub fn new(settings: RpcSettings) -> Self {
        Self { settings }
    }
}

impl PeerDirectory for TcpDirectory {
    fn resolve(&self, id: NodeId) -> Arc<dyn Peer> {
        Arc::new(ChordRpcClient::new(id, self.settings))
    }
}
