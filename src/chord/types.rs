use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::chord::ring;
use crate::chord::KEYSPACE_BITS;
use crate::error::ChordError;

/*
Identifiers are not hashed: a node's position in the ring is its IPv4 address
read as a big-endian u32, so routing and addressing share one namespace.
*/

/// NodeId represents a position in the 32-bit Chord ring
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(pub u32);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({} / {})", self.0, self.address())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl NodeId {
    /// Returns the dotted-quad address this identifier maps to
    pub fn address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.0)
    }

    /// Parses a dotted-quad address into its ring identifier
    pub fn from_address(s: &str) -> Result<Self, ChordError> {
        s.parse()
    }

    /// Start of finger `index`: id + 2^index (mod 2^32)
    pub fn finger_start(&self, index: usize) -> NodeId {
        NodeId(self.0.wrapping_add(power_of_two(index)))
    }

    /// Exclusive end of finger `index`: id + 2^(index + 1) (mod 2^32)
    pub fn finger_end(&self, index: usize) -> NodeId {
        NodeId(self.0.wrapping_add(power_of_two(index + 1)))
    }

    /// id - 2^index (mod 2^32), the last identifier whose finger `index` may point at us
    pub fn minus_power_of_two(&self, index: usize) -> NodeId {
        NodeId(self.0.wrapping_sub(power_of_two(index)))
    }
}

// 2^KEYSPACE_BITS wraps to zero, which is exactly id + 2^32 (mod 2^32)
fn power_of_two(exponent: usize) -> u32 {
    1u32.checked_shl(exponent as u32).unwrap_or(0)
}

impl From<Ipv4Addr> for NodeId {
    fn from(addr: Ipv4Addr) -> Self {
        NodeId(u32::from(addr))
    }
}

impl From<NodeId> for Ipv4Addr {
    fn from(id: NodeId) -> Self {
        id.address()
    }
}

impl FromStr for NodeId {
    type Err = ChordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<Ipv4Addr>()
            .map(NodeId::from)
            .map_err(|_| ChordError::InvalidAddress(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NodeStatus {
    #[default]
    Disconnected,
    Connected,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Disconnected => write!(f, "disconnected"),
            NodeStatus::Connected => write!(f, "connected"),
        }
    }
}

/// One finger: the interval [start, end) and the node believed to own `start`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Finger {
    pub start: NodeId,
    pub end: NodeId,
    pub successor: NodeId,
}

/// The node record. Owned by the `ChordActor`; everyone else sees snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeState {
    pub id: NodeId,
    pub status: NodeStatus,
    pub predecessor: NodeId,
    pub successor: NodeId,
    pub fingers: [Finger; KEYSPACE_BITS],
}

impl NodeState {
    /// A disconnected singleton ring
    pub fn new(id: NodeId) -> Self {
        let fingers = std::array::from_fn(|index| Finger {
            start: id.finger_start(index),
            end: id.finger_end(index),
            successor: id,
        });
        Self {
            id,
            status: NodeStatus::Disconnected,
            predecessor: id,
            successor: id,
            fingers,
        }
    }

    /// Back to the singleton shape with the given status
    pub fn reset(&mut self, status: NodeStatus) {
        *self = NodeState::new(self.id);
        self.status = status;
    }

    pub fn set_successor(&mut self, successor: NodeId) {
        self.successor = successor;
        self.fingers[0].successor = successor;
    }

    /// Returns false when `index` is outside the table
    pub fn set_finger(&mut self, index: usize, successor: NodeId) -> bool {
        if index == 0 {
            self.set_successor(successor);
            return true;
        }
        match self.fingers.get_mut(index) {
            Some(finger) => {
                finger.successor = successor;
                true
            }
            None => false,
        }
    }

    /// Scan fingers from the furthest down and return the first strictly inside (self, id).
    /// Nodes listed in `skip` are passed over. Falls back to our own id.
    pub fn closest_preceding_finger(&self, id: NodeId, skip: &[NodeId]) -> NodeId {
        self.fingers
            .iter()
            .rev()
            .map(|finger| finger.successor)
            .find(|candidate| ring::ex_ex(self.id, id, *candidate) && !skip.contains(candidate))
            .unwrap_or(self.id)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "         id: {} ({})", self.id, self.id.address())?;
        writeln!(f, "     status: {}", self.status)?;
        writeln!(
            f,
            "predecessor: {} ({})",
            self.predecessor,
            self.predecessor.address()
        )?;
        writeln!(
            f,
            "  successor: {} ({})",
            self.successor,
            self.successor.address()
        )?;
        for (index, finger) in self.fingers.iter().enumerate() {
            writeln!(
                f,
                "finger {:2} range: [ {:>10} / {:>15}, {:>10} / {:>15} ) successor: {:>10} / {:>15}",
                index,
                finger.start,
                finger.start.address().to_string(),
                finger.end,
                finger.end.address().to_string(),
                finger.successor,
                finger.successor.address().to_string(),
            )?;
        }
        Ok(())
    }
}
