use std::net::SocketAddr;
use std::time::Duration;

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use log::{error, info};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::chord::service::ChordService;
use crate::error::NetworkError;
use crate::network::rpc::server::ChordRpcServer;

pub struct RpcThread {
    service: ChordService,
    bind_addr: SocketAddr,
    read_timeout: Duration,
    shutdown_rx: Option<oneshot::Receiver<()>>,
    ready_tx: Option<oneshot::Sender<()>>,
}

impl RpcThread {
    pub fn new(
        service: ChordService,
        bind_addr: SocketAddr,
        read_timeout: Duration,
        shutdown_rx: oneshot::Receiver<()>,
        ready_tx: oneshot::Sender<()>,
    ) -> Self {
        Self {
            service,
            bind_addr,
            read_timeout,
            shutdown_rx: Some(shutdown_rx),
            ready_tx: Some(ready_tx),
        }
    }

    pub async fn run(mut self) -> Result<(), NetworkError> {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .map_err(|e| NetworkError::Bind {
                addr: self.bind_addr.to_string(),
                reason: e.to_string(),
            })?;

        info!("Starting RPC server on {}", self.bind_addr);

        let shutdown: BoxFuture<'static, ()> = match self.shutdown_rx.take() {
            Some(shutdown_rx) => shutdown_rx.map(|_| ()).boxed(),
            None => future::pending().boxed(),
        };

        if let Some(ready_tx) = self.ready_tx.take() {
            let _ = ready_tx.send(());
        }

        let server = ChordRpcServer::new(self.service, self.read_timeout);
        match server.serve(listener, shutdown).await {
            Ok(()) => {
                info!("RPC server shut down gracefully");
                Ok(())
            }
            Err(e) => {
                error!("RPC server encountered a fatal error: {:?}", e);
                Err(NetworkError::ServerFailed(e.to_string()))
            }
        }
    }
}
