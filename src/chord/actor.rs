use std::collections::HashSet;

use log::{debug, info};
use tokio::sync::{mpsc, oneshot};

use crate::chord::ring;
use crate::chord::types::{NodeId, NodeState, NodeStatus};
use crate::error::ChordError;

/// Actor Messages
/// Each message includes a oneshot sender, so the actor processes the message and sends the response back through the corresponding sender
#[derive(Debug)]
pub enum ChordMessage {
    // Whole-record access
    Snapshot {
        respond_to: oneshot::Sender<NodeState>,
    },
    Reset {
        status: NodeStatus,
        respond_to: oneshot::Sender<()>,
    },

    // Field access
    GetStatus {
        respond_to: oneshot::Sender<NodeStatus>,
    },
    SetStatus {
        status: NodeStatus,
        respond_to: oneshot::Sender<()>,
    },
    GetSuccessor {
        respond_to: oneshot::Sender<NodeId>,
    },
    SetSuccessor {
        node: NodeId,
        respond_to: oneshot::Sender<()>,
    },
    GetPredecessor {
        respond_to: oneshot::Sender<NodeId>,
    },
    SetPredecessor {
        node: NodeId,
        respond_to: oneshot::Sender<()>,
    },
    SetFinger {
        index: usize,
        node: NodeId,
        respond_to: oneshot::Sender<bool>,
    },

    // Finger maintenance
    AdoptJoinFinger {
        index: usize,
        node: NodeId,
        respond_to: oneshot::Sender<Option<NodeId>>,
    },
    ReplaceFinger {
        index: usize,
        departed: NodeId,
        replacement: NodeId,
        respond_to: oneshot::Sender<bool>,
    },
    BeginLeaveRipple {
        index: usize,
        departed: NodeId,
        respond_to: oneshot::Sender<bool>,
    },
    EndLeaveRipple {
        index: usize,
        departed: NodeId,
    },
}

/// The Actor that owns the node record.
/// It never touches the network, so RPC cascades that loop back into this
/// process can always be served.
pub struct ChordActor {
    state: NodeState,
    leave_ripples: HashSet<(usize, NodeId)>,
    receiver: mpsc::Receiver<ChordMessage>,
}

impl ChordActor {
    pub fn new(node_id: NodeId, receiver: mpsc::Receiver<ChordMessage>) -> Self {
        Self {
            state: NodeState::new(node_id),
            leave_ripples: HashSet::new(),
            receiver,
        }
    }

    pub async fn run(mut self) {
        while let Some(msg) = self.receiver.recv().await {
            self.handle_message(msg);
        }
        debug!("Actor for node {} stopped", self.state.id);
    }

    fn handle_message(&mut self, msg: ChordMessage) {
        match msg {
            ChordMessage::Snapshot { respond_to } => {
                let _ = respond_to.send(self.state.clone());
            }
            ChordMessage::Reset { status, respond_to } => {
                info!("Node {} reset to a {} singleton", self.state.id, status);
                self.state.reset(status);
                let _ = respond_to.send(());
            }
            ChordMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(self.state.status);
            }
            ChordMessage::SetStatus { status, respond_to } => {
                self.state.status = status;
                let _ = respond_to.send(());
            }
            ChordMessage::GetSuccessor { respond_to } => {
                let _ = respond_to.send(self.state.successor);
            }
            ChordMessage::SetSuccessor { node, respond_to } => {
                debug!("Node {} successor -> {}", self.state.id, node);
                self.state.set_successor(node);
                let _ = respond_to.send(());
            }
            ChordMessage::GetPredecessor { respond_to } => {
                let _ = respond_to.send(self.state.predecessor);
            }
            ChordMessage::SetPredecessor { node, respond_to } => {
                debug!("Node {} predecessor -> {}", self.state.id, node);
                self.state.predecessor = node;
                let _ = respond_to.send(());
            }
            ChordMessage::SetFinger {
                index,
                node,
                respond_to,
            } => {
                let _ = respond_to.send(self.state.set_finger(index, node));
            }
            ChordMessage::AdoptJoinFinger {
                index,
                node,
                respond_to,
            } => {
                let _ = respond_to.send(self.adopt_join_finger(index, node));
            }
            ChordMessage::ReplaceFinger {
                index,
                departed,
                replacement,
                respond_to,
            } => {
                let _ = respond_to.send(self.replace_finger(index, departed, replacement));
            }
            ChordMessage::BeginLeaveRipple {
                index,
                departed,
                respond_to,
            } => {
                let _ = respond_to.send(self.leave_ripples.insert((index, departed)));
            }
            ChordMessage::EndLeaveRipple { index, departed } => {
                self.leave_ripples.remove(&(index, departed));
            }
        }
    }

    /// Take `node` as finger `index` if it falls strictly inside the gap that
    /// finger currently covers. Returns the predecessor to ripple to.
    fn adopt_join_finger(&mut self, index: usize, node: NodeId) -> Option<NodeId> {
        let current = self.state.fingers.get(index)?.successor;
        if !ring::ex_ex(self.state.id, current, node) {
            return None;
        }
        debug!(
            "Node {} finger {} adopts {} (was {})",
            self.state.id, index, node, current
        );
        self.state.set_finger(index, node);
        Some(self.state.predecessor)
    }

    fn replace_finger(&mut self, index: usize, departed: NodeId, replacement: NodeId) -> bool {
        match self.state.fingers.get(index) {
            Some(finger) if finger.successor == departed => {
                debug!(
                    "Node {} finger {} drops {} for {}",
                    self.state.id, index, departed, replacement
                );
                self.state.set_finger(index, replacement)
            }
            _ => false,
        }
    }
}

/// Actor handle for interacting with the ChordActor
/// Both the RPC server and the command layer go through a ChordHandle
#[derive(Clone, Debug)]
pub struct ChordHandle {
    node_id: NodeId,
    sender: mpsc::Sender<ChordMessage>,
}

impl ChordHandle {
    pub fn new(node_id: NodeId) -> (Self, ChordActor) {
        let (sender, receiver) = mpsc::channel(32);
        let actor = ChordActor::new(node_id, receiver);
        (Self { node_id, sender }, actor)
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ChordMessage,
    ) -> Result<T, ChordError> {
        let (send, recv) = oneshot::channel();
        self.sender
            .send(build(send))
            .await
            .map_err(|_| ChordError::ActorUnavailable("Actor is dead".into()))?;
        recv.await
            .map_err(|_| ChordError::ActorUnavailable("Actor died during request".into()))
    }

    pub async fn snapshot(&self) -> Result<NodeState, ChordError> {
        self.request(|respond_to| ChordMessage::Snapshot { respond_to })
            .await
    }

    pub async fn reset(&self, status: NodeStatus) -> Result<(), ChordError> {
        self.request(|respond_to| ChordMessage::Reset { status, respond_to })
            .await
    }

    pub async fn status(&self) -> Result<NodeStatus, ChordError> {
        self.request(|respond_to| ChordMessage::GetStatus { respond_to })
            .await
    }

    pub async fn set_status(&self, status: NodeStatus) -> Result<(), ChordError> {
        self.request(|respond_to| ChordMessage::SetStatus { status, respond_to })
            .await
    }

    pub async fn successor(&self) -> Result<NodeId, ChordError> {
        self.request(|respond_to| ChordMessage::GetSuccessor { respond_to })
            .await
    }

    pub async fn set_successor(&self, node: NodeId) -> Result<(), ChordError> {
        self.request(|respond_to| ChordMessage::SetSuccessor { node, respond_to })
            .await
    }

    pub async fn predecessor(&self) -> Result<NodeId, ChordError> {
        self.request(|respond_to| ChordMessage::GetPredecessor { respond_to })
            .await
    }

    pub async fn set_predecessor(&self, node: NodeId) -> Result<(), ChordError> {
        self.request(|respond_to| ChordMessage::SetPredecessor { node, respond_to })
            .await
    }

    pub async fn set_finger(&self, index: usize, node: NodeId) -> Result<(), ChordError> {
        let stored = self
            .request(|respond_to| ChordMessage::SetFinger {
                index,
                node,
                respond_to,
            })
            .await?;
        if stored {
            Ok(())
        } else {
            Err(ChordError::InvalidFingerIndex(index))
        }
    }

    pub async fn adopt_join_finger(
        &self,
        index: usize,
        node: NodeId,
    ) -> Result<Option<NodeId>, ChordError> {
        self.request(|respond_to| ChordMessage::AdoptJoinFinger {
            index,
            node,
            respond_to,
        })
        .await
    }

    pub async fn replace_finger(
        &self,
        index: usize,
        departed: NodeId,
        replacement: NodeId,
    ) -> Result<bool, ChordError> {
        self.request(|respond_to| ChordMessage::ReplaceFinger {
            index,
            departed,
            replacement,
            respond_to,
        })
        .await
    }

    /// Returns false when this ripple is already being handled here
    pub async fn begin_leave_ripple(
        &self,
        index: usize,
        departed: NodeId,
    ) -> Result<bool, ChordError> {
        self.request(|respond_to| ChordMessage::BeginLeaveRipple {
            index,
            departed,
            respond_to,
        })
        .await
    }

    pub async fn end_leave_ripple(&self, index: usize, departed: NodeId) -> Result<(), ChordError> {
        self.sender
            .send(ChordMessage::EndLeaveRipple { index, departed })
            .await
            .map_err(|_| ChordError::ActorUnavailable("Actor is dead".into()))
    }
}
