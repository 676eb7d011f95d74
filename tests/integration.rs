use std::net::{Ipv4Addr, TcpListener};

use anyhow::Result;
use triad::chord::membership::JoinOutcome;
use triad::chord::peer::Peer;
use triad::chord::types::{NodeId, NodeStatus};
use triad::config::NodeConfig;
use triad::network::node::ChordPeer;
use triad::network::rpc::client::ChordRpcClient;

fn free_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

fn config(address: Ipv4Addr, port: u16) -> NodeConfig {
    NodeConfig {
        address,
        rpc_port: port,
        rpc_timeout_ms: 3_000,
        probe_timeout_ms: 300,
        ..NodeConfig::default()
    }
}

async fn start(address: Ipv4Addr, port: u16) -> Result<ChordPeer> {
    let mut peer = ChordPeer::new(&config(address, port)).await;
    peer.start_rpc_server().await?;
    Ok(peer)
}

#[tokio::test]
async fn two_nodes_form_and_dissolve_a_ring_over_tcp() -> Result<()> {
    let port = free_port()?;
    let a = start(Ipv4Addr::new(127, 0, 0, 1), port).await?;
    let b = start(Ipv4Addr::new(127, 0, 0, 5), port).await?;
    let nobody = NodeId::from(Ipv4Addr::new(127, 0, 0, 9));

    assert_eq!(a.join(nobody).await?, JoinOutcome::NewRing);
    assert_eq!(
        b.join(a.node_id()).await?,
        JoinOutcome::Bootstrapped {
            successor: a.node_id(),
            predecessor: a.node_id(),
        }
    );

    let state = a.snapshot().await?;
    assert_eq!((state.predecessor, state.successor), (b.node_id(), b.node_id()));
    let state = b.snapshot().await?;
    assert_eq!((state.predecessor, state.successor), (a.node_id(), a.node_id()));

    let between = NodeId::from(Ipv4Addr::new(127, 0, 0, 3));
    assert_eq!(a.lookup(between).await?, b.address());
    assert_eq!(b.lookup(between).await?, b.address());
    assert_eq!(a.lookup(NodeId(0)).await?, a.address());
    assert_eq!(b.lookup(NodeId(u32::MAX)).await?, a.address());

    assert_eq!(a.status_of(b.node_id()).await, NodeStatus::Connected);
    assert_eq!(b.status_of(nobody).await, NodeStatus::Disconnected);

    b.leave().await?;
    let state = a.snapshot().await?;
    assert_eq!((state.predecessor, state.successor), (a.node_id(), a.node_id()));
    assert_eq!(b.snapshot().await?.status, NodeStatus::Disconnected);
    assert_eq!(a.status_of(b.node_id()).await, NodeStatus::Disconnected);

    let (mut a, mut b) = (a, b);
    a.quit().await?;
    b.quit().await?;
    Ok(())
}

#[tokio::test]
async fn stubs_reach_the_remote_node_record() -> Result<()> {
    let port = free_port()?;
    let a = start(Ipv4Addr::new(127, 0, 0, 1), port).await?;
    a.join(a.node_id()).await?;

    let stub = ChordRpcClient::new(a.node_id(), config(Ipv4Addr::LOCALHOST, port).rpc_settings());
    assert_eq!(stub.status().await?, NodeStatus::Connected);
    assert_eq!(stub.probe().await, NodeStatus::Connected);

    let other = NodeId::from(Ipv4Addr::new(127, 0, 0, 7));
    stub.set_predecessor(other).await?;
    assert_eq!(stub.predecessor().await?, other);
    stub.set_successor(other).await?;
    assert_eq!(stub.successor().await?, other);
    assert_eq!(a.snapshot().await?.fingers[0].successor, other);

    assert_eq!(stub.find_predecessor(NodeId::from(Ipv4Addr::new(127, 0, 0, 4))).await?, a.node_id());
    assert_eq!(
        stub.closest_preceding_finger(NodeId::from(Ipv4Addr::new(127, 0, 0, 8))).await?,
        other
    );

    stub.set_status(NodeStatus::Disconnected).await?;
    assert_eq!(stub.status().await?, NodeStatus::Disconnected);

    // A bad finger index makes the server hang up instead of acknowledging
    assert!(stub.update_finger_table_join(40, other).await.is_err());

    let mut a = a;
    a.quit().await?;
    Ok(())
}

#[tokio::test]
async fn quit_from_a_peer_stops_the_server() -> Result<()> {
    let port = free_port()?;
    let mut a = start(Ipv4Addr::new(127, 0, 0, 1), port).await?;
    let stub = ChordRpcClient::new(a.node_id(), config(Ipv4Addr::LOCALHOST, port).rpc_settings());

    stub.quit().await?;
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert!(a.is_stopped());
    assert_eq!(stub.probe().await, NodeStatus::Disconnected);

    // Already stopped: shutting down again is a no-op
    a.quit().await?;
    Ok(())
}
