use std::fmt;

use log::{debug, error, info};

use crate::chord::ring;
use crate::chord::service::ChordService;
use crate::chord::types::{NodeId, NodeStatus};
use crate::chord::KEYSPACE_BITS;
use crate::error::ChordError;

/// Steps of the join procedure, in order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinStep {
    ProbeContact,
    InitFingerTable,
    UpdateOthers,
    Activate,
}

impl fmt::Display for JoinStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinStep::ProbeContact => "contact probe",
            JoinStep::InitFingerTable => "finger table initialisation",
            JoinStep::UpdateOthers => "finger updates of other nodes",
            JoinStep::Activate => "activation",
        };
        write!(f, "{}", name)
    }
}

/// Steps of the leave procedure, in order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaveStep {
    DeinitFingerTable,
    UpdateOthers,
    Deactivate,
}

impl fmt::Display for LeaveStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LeaveStep::DeinitFingerTable => "splice out of the ring",
            LeaveStep::UpdateOthers => "finger updates of other nodes",
            LeaveStep::Deactivate => "deactivation",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Joined the ring the contact belongs to
    Bootstrapped {
        successor: NodeId,
        predecessor: NodeId,
    },
    /// The contact was not part of a ring, so this node started one
    NewRing,
}

fn join_failed(step: JoinStep, completed: Option<JoinStep>, source: ChordError) -> ChordError {
    match completed {
        Some(done) => error!("Join failed during {} (completed: {}): {}", step, done, source),
        None => error!("Join failed during {} (nothing completed): {}", step, source),
    }
    ChordError::JoinFailed {
        step,
        source: Box::new(source),
    }
}

fn leave_failed(step: LeaveStep, completed: Option<LeaveStep>, source: ChordError) -> ChordError {
    match completed {
        Some(done) => error!("Leave failed during {} (completed: {}): {}", step, done, source),
        None => error!("Leave failed during {} (nothing completed): {}", step, source),
    }
    ChordError::LeaveFailed {
        step,
        source: Box::new(source),
    }
}

impl ChordService {
    /// Join the ring `contact` belongs to, or start a new one if it is not connected
    pub async fn join(&self, contact: NodeId) -> Result<JoinOutcome, ChordError> {
        if self.handle.status().await? == NodeStatus::Connected {
            return Err(ChordError::AlreadyConnected);
        }

        info!("Node {} joining through {}", self.node_id, contact);
        if self.peer(contact).probe().await != NodeStatus::Connected {
            info!("Contact {} is not in a ring, starting a new one", contact);
            self.handle.reset(NodeStatus::Connected).await?;
            return Ok(JoinOutcome::NewRing);
        }

        if let Err(e) = self.enter_ring(contact).await {
            // A disconnected node only ever points at itself
            self.handle.reset(NodeStatus::Disconnected).await?;
            return Err(e);
        }

        let state = self.handle.snapshot().await?;
        info!(
            "Node {} joined: predecessor {}, successor {}",
            self.node_id, state.predecessor, state.successor
        );
        Ok(JoinOutcome::Bootstrapped {
            successor: state.successor,
            predecessor: state.predecessor,
        })
    }

    async fn enter_ring(&self, contact: NodeId) -> Result<(), ChordError> {
        self.init_finger_table(contact)
            .await
            .map_err(|e| join_failed(JoinStep::InitFingerTable, Some(JoinStep::ProbeContact), e))?;
        self.update_others_join()
            .await
            .map_err(|e| join_failed(JoinStep::UpdateOthers, Some(JoinStep::InitFingerTable), e))?;
        self.handle
            .set_status(NodeStatus::Connected)
            .await
            .map_err(|e| join_failed(JoinStep::Activate, Some(JoinStep::UpdateOthers), e))
    }

    /// Splice this node out of the ring and clear it from other nodes' fingers
    pub async fn leave(&self) -> Result<(), ChordError> {
        if self.handle.status().await? != NodeStatus::Connected {
            return Err(ChordError::NotConnected);
        }

        info!("Node {} leaving the ring", self.node_id);
        self.deinit_finger_table()
            .await
            .map_err(|e| leave_failed(LeaveStep::DeinitFingerTable, None, e))?;
        self.update_others_leave()
            .await
            .map_err(|e| leave_failed(LeaveStep::UpdateOthers, Some(LeaveStep::DeinitFingerTable), e))?;
        self.handle
            .reset(NodeStatus::Disconnected)
            .await
            .map_err(|e| leave_failed(LeaveStep::Deactivate, Some(LeaveStep::UpdateOthers), e))?;

        info!("Node {} left the ring", self.node_id);
        Ok(())
    }

    /// Re-announce this node to its neighbours and to every finger that should point at it.
    /// Used when neighbours lost track of a connected node.
    pub async fn repair(&self) -> Result<(), ChordError> {
        let state = self.handle.snapshot().await?;
        if state.status != NodeStatus::Connected {
            return Err(ChordError::NotConnected);
        }

        info!("Node {} repairing its ring links", self.node_id);
        self.peer(state.successor)
            .set_predecessor(self.node_id)
            .await?;
        self.peer(state.predecessor)
            .set_successor(self.node_id)
            .await?;
        self.update_others_join().await
    }

    /// Build our finger table by asking `contact`, then splice in between
    /// our successor and its old predecessor.
    pub async fn init_finger_table(&self, contact: NodeId) -> Result<(), ChordError> {
        let contact = self.peer(contact);
        let me = self.node_id;

        let successor = contact.find_successor(me.finger_start(0)).await?;
        self.handle.set_successor(successor).await?;

        let predecessor = self.peer(successor).predecessor().await?;
        self.handle.set_predecessor(predecessor).await?;

        self.peer(successor).set_predecessor(me).await?;
        self.peer(predecessor).set_successor(me).await?;
        debug!(
            "Node {} spliced between {} and {}",
            me, predecessor, successor
        );

        let mut previous = successor;
        for index in 0..KEYSPACE_BITS - 1 {
            let next_start = me.finger_start(index + 1);
            let next = if ring::in_ex(me, previous, next_start) {
                previous
            } else {
                contact.find_successor(next_start).await?
            };
            self.handle.set_finger(index + 1, next).await?;
            previous = next;
        }
        Ok(())
    }

    /// Pick the node whose finger `index` might need to point at us: the
    /// predecessor of id - 2^index, unless a connected node sits exactly there.
    async fn finger_update_target(&self, index: usize) -> Result<NodeId, ChordError> {
        let candidate = self.node_id.minus_power_of_two(index);
        let predecessor = self.find_predecessor(candidate).await?;
        debug!(
            "finger {} (checking status of {} / {})",
            index,
            candidate,
            candidate.address()
        );
        if self.peer(candidate).probe().await == NodeStatus::Connected {
            Ok(candidate)
        } else {
            Ok(predecessor)
        }
    }

    pub async fn update_others_join(&self) -> Result<(), ChordError> {
        for index in 0..KEYSPACE_BITS {
            let target = self.finger_update_target(index).await?;
            self.peer(target)
                .update_finger_table_join(index, self.node_id)
                .await?;
        }
        Ok(())
    }

    /// Adopt `id` as finger `index` if it falls inside that finger's gap, and
    /// if so hand the same update to our predecessor.
    pub async fn update_finger_table_join(&self, index: usize, id: NodeId) -> Result<(), ChordError> {
        Self::check_finger_index(index)?;
        if let Some(predecessor) = self.handle.adopt_join_finger(index, id).await? {
            self.peer(predecessor)
                .update_finger_table_join(index, id)
                .await?;
        }
        Ok(())
    }

    /// Point our successor and predecessor at each other
    pub async fn deinit_finger_table(&self) -> Result<(), ChordError> {
        let state = self.handle.snapshot().await?;
        self.peer(state.successor)
            .set_predecessor(state.predecessor)
            .await?;
        self.peer(state.predecessor)
            .set_successor(state.successor)
            .await?;
        debug!(
            "Node {} spliced out from between {} and {}",
            self.node_id, state.predecessor, state.successor
        );
        Ok(())
    }

    pub async fn update_others_leave(&self) -> Result<(), ChordError> {
        for index in 0..KEYSPACE_BITS {
            let target = self.finger_update_target(index).await?;
            self.peer(target)
                .update_finger_table_leave(index, self.node_id)
                .await?;
        }
        Ok(())
    }

    /// Drop the departed node `id` from finger `index`, then pass the update
    /// on to our predecessor whether or not anything changed here.
    ///
    /// The pass-on stops at a node whose predecessor is itself, or when the
    /// update has gone once around the ring and reaches a node still handling it.
    pub async fn update_finger_table_leave(
        &self,
        index: usize,
        id: NodeId,
    ) -> Result<(), ChordError> {
        Self::check_finger_index(index)?;
        if !self.handle.begin_leave_ripple(index, id).await? {
            debug!(
                "Node {} already handling leave of {} for finger {}",
                self.node_id, id, index
            );
            return Ok(());
        }
        let result = self.leave_ripple_step(index, id).await;
        self.handle.end_leave_ripple(index, id).await?;
        result
    }

    async fn leave_ripple_step(&self, index: usize, id: NodeId) -> Result<(), ChordError> {
        let state = self.handle.snapshot().await?;
        if state.fingers[index].successor == id {
            let replacement = self.peer(id).successor().await?;
            self.handle.replace_finger(index, id, replacement).await?;
        }

        let predecessor = self.handle.predecessor().await?;
        if predecessor != self.node_id {
            self.peer(predecessor)
                .update_finger_table_leave(index, id)
                .await?;
        }
        Ok(())
    }
}
