use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::chord::actor::ChordHandle;
use crate::chord::peer::{Peer, PeerDirectory};
use crate::chord::types::{NodeId, NodeState, NodeStatus};
use crate::chord::{DEFAULT_MAX_HOPS, KEYSPACE_BITS};
use crate::error::ChordError;

/// The local ring member: the node record behind its actor plus a way to
/// reach everyone else. Routing lives in `routing.rs`, join/leave in
/// `membership.rs`.
#[derive(Clone)]
pub struct ChordService {
    pub(crate) node_id: NodeId,
    pub(crate) handle: ChordHandle,
    pub(crate) directory: Arc<dyn PeerDirectory>,
    pub(crate) max_hops: usize,
}

impl fmt::Debug for ChordService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChordService")
            .field("node_id", &self.node_id)
            .field("max_hops", &self.max_hops)
            .finish()
    }
}

impl ChordService {
    pub fn new(handle: ChordHandle, directory: Arc<dyn PeerDirectory>) -> Self {
        Self {
            node_id: handle.node_id(),
            handle,
            directory,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops.max(1);
        self
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn handle(&self) -> &ChordHandle {
        &self.handle
    }

    pub async fn snapshot(&self) -> Result<NodeState, ChordError> {
        self.handle.snapshot().await
    }

    /// Handle for `id`: this service itself when `id` is ours, otherwise the directory's
    pub fn peer(&self, id: NodeId) -> Arc<dyn Peer> {
        if id == self.node_id {
            Arc::new(self.clone())
        } else {
            self.directory.resolve(id)
        }
    }

    pub(crate) fn check_finger_index(index: usize) -> Result<(), ChordError> {
        if index < KEYSPACE_BITS {
            Ok(())
        } else {
            Err(ChordError::InvalidFingerIndex(index))
        }
    }
}

#[async_trait]
impl Peer for ChordService {
    fn id(&self) -> NodeId {
        self.node_id
    }

    async fn status(&self) -> Result<NodeStatus, ChordError> {
        self.handle.status().await
    }

    async fn set_status(&self, status: NodeStatus) -> Result<(), ChordError> {
        self.handle.set_status(status).await
    }

    async fn successor(&self) -> Result<NodeId, ChordError> {
        self.handle.successor().await
    }

    async fn set_successor(&self, successor: NodeId) -> Result<(), ChordError> {
        self.handle.set_successor(successor).await
    }

    async fn predecessor(&self) -> Result<NodeId, ChordError> {
        self.handle.predecessor().await
    }

    async fn set_predecessor(&self, predecessor: NodeId) -> Result<(), ChordError> {
        self.handle.set_predecessor(predecessor).await
    }

    async fn closest_preceding_finger(&self, id: NodeId) -> Result<NodeId, ChordError> {
        ChordService::closest_preceding_finger(self, id).await
    }

    async fn find_successor(&self, id: NodeId) -> Result<NodeId, ChordError> {
        ChordService::find_successor(self, id).await
    }

    async fn find_predecessor(&self, id: NodeId) -> Result<NodeId, ChordError> {
        ChordService::find_predecessor(self, id).await
    }

    async fn update_finger_table_join(&self, index: usize, id: NodeId) -> Result<(), ChordError> {
        ChordService::update_finger_table_join(self, index, id).await
    }

    async fn update_finger_table_leave(
        &self,
        index: usize,
        id: NodeId,
    ) -> Result<(), ChordError> {
        ChordService::update_finger_table_leave(self, index, id).await
    }
}
