use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::chord::actor::ChordHandle;
use crate::chord::membership::JoinOutcome;
use crate::chord::service::ChordService;
use crate::chord::types::{NodeId, NodeState, NodeStatus};
use crate::config::NodeConfig;
use crate::error::{ChordError, NetworkError};
use crate::network::rpc::client::{ChordRpcClient, TcpDirectory};
use crate::network::rpc::thread::RpcThread;
use crate::network::rpc::RpcSettings;

const SERVER_STARTUP_WAIT: Duration = Duration::from_secs(5);
const SERVER_STOP_WAIT: Duration = Duration::from_secs(5);

/// One running node: its actor, its RPC server and the service tying them together
pub struct ChordPeer {
    service: ChordService,
    settings: RpcSettings,
    bind_addr: SocketAddr,
    _actor_handle: JoinHandle<()>,
    rpc_handle: Option<JoinHandle<Result<(), NetworkError>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ChordPeer {
    pub async fn new(config: &NodeConfig) -> Self {
        let node_id = NodeId::from(config.address);
        let settings = config.rpc_settings();

        let (handle, actor) = ChordHandle::new(node_id);
        let actor_handle = tokio::spawn(actor.run());

        let service = ChordService::new(handle, Arc::new(TcpDirectory::new(settings)))
            .with_max_hops(config.max_hops);

        info!("Node {} ({}) created", node_id, config.address);
        Self {
            service,
            settings,
            bind_addr: settings.socket_addr(node_id),
            _actor_handle: actor_handle,
            rpc_handle: None,
            shutdown_tx: None,
        }
    }

    pub async fn start_rpc_server(&mut self) -> Result<(), NetworkError> {
        if self.rpc_handle.is_some() {
            return Ok(());
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let thread = RpcThread::new(
            self.service.clone(),
            self.bind_addr,
            self.settings.timeout,
            shutdown_rx,
            ready_tx,
        );

        debug!(
            "Server configuration: bind_addr={}, node_id={}",
            self.bind_addr,
            self.node_id()
        );
        let mut handle = tokio::spawn(thread.run());

        // The thread drops `ready_tx` without sending if binding fails
        match tokio::time::timeout(SERVER_STARTUP_WAIT, ready_rx).await {
            Ok(Ok(())) => {
                info!("RPC server is ready and listening on {}", self.bind_addr);
                self.rpc_handle = Some(handle);
                self.shutdown_tx = Some(shutdown_tx);
                Ok(())
            }
            Ok(Err(_)) => match (&mut handle).await {
                Ok(Err(e)) => {
                    error!("RPC server failed to start: {}", e);
                    Err(e)
                }
                _ => Err(NetworkError::ServerFailed(
                    "Server failed to initialize".into(),
                )),
            },
            Err(_) => {
                error!("RPC server startup timed out");
                handle.abort();
                Err(NetworkError::ServerFailed("Server startup timed out".into()))
            }
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.service.node_id()
    }

    pub fn address(&self) -> Ipv4Addr {
        self.node_id().address()
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    pub fn service(&self) -> &ChordService {
        &self.service
    }

    pub async fn join(&self, contact: NodeId) -> Result<JoinOutcome, ChordError> {
        self.service.join(contact).await
    }

    pub async fn leave(&self) -> Result<(), ChordError> {
        self.service.leave().await
    }

    pub async fn repair(&self) -> Result<(), ChordError> {
        self.service.repair().await
    }

    pub async fn lookup(&self, id: NodeId) -> Result<Ipv4Addr, ChordError> {
        self.service.lookup(id).await
    }

    /// Status of any node, this one included; unreachable reads as disconnected
    pub async fn status_of(&self, id: NodeId) -> NodeStatus {
        self.service.peer(id).probe().await
    }

    pub async fn snapshot(&self) -> Result<NodeState, ChordError> {
        self.service.snapshot().await
    }

    /// True once the RPC server has stopped, e.g. after a remote `Quit`
    pub fn is_stopped(&self) -> bool {
        self.rpc_handle
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Stop our own server the way any peer would: by sending it `Quit`.
    /// Falls back to the shutdown signal if the request cannot be delivered.
    pub async fn quit(&mut self) -> Result<(), NetworkError> {
        let Some(mut handle) = self.rpc_handle.take() else {
            return Ok(());
        };

        if !handle.is_finished() {
            let client = ChordRpcClient::new(self.node_id(), self.settings);
            if let Err(e) = client.quit().await {
                warn!("Quit request to own server failed: {}", e);
                if let Some(shutdown_tx) = self.shutdown_tx.take() {
                    let _ = shutdown_tx.send(());
                }
            }
        }

        match tokio::time::timeout(SERVER_STOP_WAIT, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(NetworkError::ServerFailed(format!("Server task failed: {}", e))),
            Err(_) => {
                handle.abort();
                Err(NetworkError::ServerFailed("Server did not stop in time".into()))
            }
        }
    }
}
