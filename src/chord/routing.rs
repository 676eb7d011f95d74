use std::net::Ipv4Addr;

use log::{debug, warn};

use crate::chord::ring;
use crate::chord::service::ChordService;
use crate::chord::types::NodeId;
use crate::error::ChordError;

impl ChordService {
    /// The furthest finger that still precedes `id`, or our own id if none does
    pub async fn closest_preceding_finger(&self, id: NodeId) -> Result<NodeId, ChordError> {
        let state = self.handle.snapshot().await?;
        Ok(state.closest_preceding_finger(id, &[]))
    }

    /// Walk the ring towards `id` until reaching the node `n` with `id` in (n, successor(n)].
    ///
    /// Each hop asks the current node for its closest preceding finger, locally
    /// or over RPC. A node that fails to answer is skipped and the walk restarts
    /// from our own finger table without it. The walk stalls when a hop would
    /// stay in place or land on a node already found unreachable.
    pub async fn find_predecessor(&self, id: NodeId) -> Result<NodeId, ChordError> {
        let state = self.handle.snapshot().await?;
        if ring::in_ex(state.id, state.successor, id) {
            return Ok(state.id);
        }

        let mut unreachable: Vec<NodeId> = Vec::new();
        let mut current = state.id;
        let mut current_successor = state.successor;

        for _ in 0..self.max_hops {
            if ring::ex_in(current, current_successor, id) {
                return Ok(current);
            }

            let next = if current == state.id {
                state.closest_preceding_finger(id, &unreachable)
            } else {
                match self.peer(current).closest_preceding_finger(id).await {
                    Ok(next) => next,
                    Err(e) => {
                        warn!("Skipping {} while routing to {}: {}", current, id, e);
                        unreachable.push(current);
                        current = state.id;
                        current_successor = state.successor;
                        continue;
                    }
                }
            };

            if next == current || unreachable.contains(&next) {
                return Err(ChordError::RoutingStalled {
                    target: id,
                    at: current,
                });
            }

            let next_successor = if next == state.id {
                state.successor
            } else {
                match self.peer(next).successor().await {
                    Ok(successor) => successor,
                    Err(e) => {
                        warn!("Skipping {} while routing to {}: {}", next, id, e);
                        unreachable.push(next);
                        current = state.id;
                        current_successor = state.successor;
                        continue;
                    }
                }
            };

            debug!("Routing to {}: hop {} -> {}", id, current, next);
            current = next;
            current_successor = next_successor;
        }

        Err(ChordError::RoutingExhausted {
            target: id,
            hops: self.max_hops,
        })
    }

    /// The node responsible for `id`
    pub async fn find_successor(&self, id: NodeId) -> Result<NodeId, ChordError> {
        let state = self.handle.snapshot().await?;
        if ring::ex_in(state.predecessor, state.id, id) {
            return Ok(state.id);
        }
        let predecessor = self.find_predecessor(id).await?;
        self.peer(predecessor).successor().await
    }

    /// Address of the node responsible for `id`
    pub async fn lookup(&self, id: NodeId) -> Result<Ipv4Addr, ChordError> {
        Ok(self.find_successor(id).await?.address())
    }
}
