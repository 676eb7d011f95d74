pub mod client;
pub mod server;
pub mod thread;

use std::net::{SocketAddr, SocketAddrV4};
use std::time::Duration;

use crate::chord::types::NodeId;

/// Transport settings shared by the server and every outbound stub
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RpcSettings {
    /// Well-known port every node listens on
    pub port: u16,
    pub timeout: Duration,
    /// Bound on the status probe used by the join/leave heuristics
    pub probe_timeout: Duration,
}

impl RpcSettings {
    pub fn socket_addr(&self, id: NodeId) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(id.address(), self.port))
    }
}
