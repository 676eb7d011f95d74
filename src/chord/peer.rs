use std::sync::Arc;

use async_trait::async_trait;

use crate::chord::types::{NodeId, NodeStatus};
use crate::error::ChordError;

/// One ring member, local or remote.
///
/// Routing and membership code talks to every node, including its own, through
/// this trait, so none of it needs to know whether a call crosses the network.
#[async_trait]
pub trait Peer: Send + Sync {
    fn id(&self) -> NodeId;

    async fn status(&self) -> Result<NodeStatus, ChordError>;
    async fn set_status(&self, status: NodeStatus) -> Result<(), ChordError>;

    async fn successor(&self) -> Result<NodeId, ChordError>;
    async fn set_successor(&self, successor: NodeId) -> Result<(), ChordError>;

    async fn predecessor(&self) -> Result<NodeId, ChordError>;
    async fn set_predecessor(&self, predecessor: NodeId) -> Result<(), ChordError>;

    async fn closest_preceding_finger(&self, id: NodeId) -> Result<NodeId, ChordError>;
    async fn find_successor(&self, id: NodeId) -> Result<NodeId, ChordError>;
    async fn find_predecessor(&self, id: NodeId) -> Result<NodeId, ChordError>;

    async fn update_finger_table_join(&self, index: usize, id: NodeId) -> Result<(), ChordError>;
    async fn update_finger_table_leave(&self, index: usize, id: NodeId)
        -> Result<(), ChordError>;

    /// Liveness check used by the join/leave heuristics. Never fails: an
    /// unreachable or silent peer reads as disconnected.
    async fn probe(&self) -> NodeStatus {
        self.status().await.unwrap_or(NodeStatus::Disconnected)
    }
}

/// Resolves identifiers of other ring members to peer handles
pub trait PeerDirectory: Send + Sync {
    fn resolve(&self, id: NodeId) -> Arc<dyn Peer>;
}
