use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use crate::chord::actor::ChordHandle;
use crate::chord::peer::{Peer, PeerDirectory};
use crate::chord::service::ChordService;
use crate::chord::types::{NodeId, NodeStatus};
use crate::chord::KEYSPACE_BITS;
use crate::error::{ChordError, NetworkError};

#[derive(Default)]
pub struct MemoryDirectory {
    nodes: RwLock<HashMap<NodeId, ChordService>>,
    resolved: Mutex<Vec<NodeId>>,
}

impl MemoryDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Start a disconnected node with its own actor and register it
    pub fn spawn_node(self: &Arc<Self>, id: u32) -> ChordService {
        let (handle, actor) = ChordHandle::new(NodeId(id));
        tokio::spawn(actor.run());
        let directory: Arc<dyn PeerDirectory> = self.clone();
        let service = ChordService::new(handle, directory);
        self.nodes.write().unwrap().insert(NodeId(id), service.clone());
        service
    }

    /// Make a node unreachable for everyone else
    pub fn remove(&self, id: u32) {
        self.nodes.write().unwrap().remove(&NodeId(id));
    }

    /// Ids resolved since the last call, in order
    pub fn take_resolved(&self) -> Vec<NodeId> {
        std::mem::take(&mut *self.resolved.lock().unwrap())
    }
}

impl PeerDirectory for MemoryDirectory {
    fn resolve(&self, id: NodeId) -> Arc<dyn Peer> {
        self.resolved.lock().unwrap().push(id);
        match self.nodes.read().unwrap().get(&id) {
            Some(service) => Arc::new(service.clone()),
            None => Arc::new(UnreachablePeer(id)),
        }
    }
}

/// Stands in for a node nobody can reach
pub struct UnreachablePeer(pub NodeId);

impl UnreachablePeer {
    fn fail<T>(&self) -> Result<T, ChordError> {
        Err(NetworkError::PeerUnreachable(format!("{} is not in the directory", self.0)).into())
    }
}

#[async_trait]
impl Peer for UnreachablePeer {
    fn id(&self) -> NodeId {
        self.0
    }

    async fn status(&self) -> Result<NodeStatus, ChordError> {
        self.fail()
    }

    async fn set_status(&self, _status: NodeStatus) -> Result<(), ChordError> {
        self.fail()
    }

    async fn successor(&self) -> Result<NodeId, ChordError> {
        self.fail()
    }

    async fn set_successor(&self, _successor: NodeId) -> Result<(), ChordError> {
        self.fail()
    }

    async fn predecessor(&self) -> Result<NodeId, ChordError> {
        self.fail()
    }

    async fn set_predecessor(&self, _predecessor: NodeId) -> Result<(), ChordError> {
        self.fail()
    }

    async fn closest_preceding_finger(&self, _id: NodeId) -> Result<NodeId, ChordError> {
        self.fail()
    }

    async fn find_successor(&self, _id: NodeId) -> Result<NodeId, ChordError> {
        self.fail()
    }

    async fn find_predecessor(&self, _id: NodeId) -> Result<NodeId, ChordError> {
        self.fail()
    }

    async fn update_finger_table_join(&self, _index: usize, _id: NodeId) -> Result<(), ChordError> {
        self.fail()
    }

    async fn update_finger_table_leave(
        &self,
        _index: usize,
        _id: NodeId,
    ) -> Result<(), ChordError> {
        self.fail()
    }
}

/// The member of `ring` responsible for `id`: the first one at or after it, clockwise
pub fn ring_successor(ring: &[u32], id: u32) -> u32 {
    let mut sorted = ring.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .copied()
        .find(|&member| member >= id)
        .unwrap_or(sorted[0])
}

pub fn ring_predecessor(ring: &[u32], id: u32) -> u32 {
    let mut sorted = ring.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .rev()
        .copied()
        .find(|&member| member < id)
        .unwrap_or(sorted[sorted.len() - 1])
}

/// Spawn every node of `ring` with exact pointers and finger tables, all connected
pub async fn static_ring(directory: &Arc<MemoryDirectory>, ring: &[u32]) -> Vec<ChordService> {
    let mut services = Vec::with_capacity(ring.len());
    for &id in ring {
        let service = directory.spawn_node(id);
        let handle = service.handle();
        handle.set_status(NodeStatus::Connected).await.unwrap();
        handle
            .set_predecessor(NodeId(ring_predecessor(ring, id)))
            .await
            .unwrap();
        for index in 0..KEYSPACE_BITS {
            let start = NodeId(id).finger_start(index);
            handle
                .set_finger(index, NodeId(ring_successor(ring, start.0)))
                .await
                .unwrap();
        }
        services.push(service);
    }
    services
}
