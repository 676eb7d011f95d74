use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::chord::service::ChordService;
use crate::chord::types::NodeStatus;
use crate::error::{ChordError, MessageError, NetworkError};
use crate::network::messages::{Message, MessageType, MESSAGE_LEN};

/// Serves inbound requests for the local node, one task per connection
#[derive(Debug)]
pub struct ChordRpcServer {
    service: ChordService,
    read_timeout: Duration,
}

impl ChordRpcServer {
    /// `read_timeout` bounds how long a connection may take to deliver its request
    pub fn new(service: ChordService, read_timeout: Duration) -> Self {
        Self {
            service,
            read_timeout,
        }
    }

    /// Accept connections until a `Quit` request is served or `shutdown` resolves
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), NetworkError> {
        let (quit_tx, mut quit_rx) = mpsc::channel::<()>(1);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let service = self.service.clone();
                        let quit_tx = quit_tx.clone();
                        let read_timeout = self.read_timeout;
                        tokio::spawn(async move {
                            handle_connection(service, stream, remote, read_timeout, quit_tx).await;
                        });
                    }
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                    }
                },
                _ = quit_rx.recv() => {
                    info!("Quit requested, stopping RPC server");
                    return Ok(());
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping RPC server");
                    return Ok(());
                }
            }
        }
    }
}

async fn handle_connection(
    service: ChordService,
    mut stream: TcpStream,
    remote: SocketAddr,
    read_timeout: Duration,
    quit_tx: mpsc::Sender<()>,
) {
    let mut buf = [0u8; MESSAGE_LEN];
    match tokio::time::timeout(read_timeout, stream.read_exact(&mut buf)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            warn!("Failed to read request from {}: {}", remote, e);
            return;
        }
        Err(_) => {
            warn!("No request from {} within {:?}, closing", remote, read_timeout);
            return;
        }
    }

    let request = match Message::decode(&buf) {
        Ok(request) => request,
        Err(e) => {
            warn!("Dropping malformed request from {}: {}", remote, e);
            return;
        }
    };
    debug!("Received {:?} from {}", request, remote);

    let reply = match dispatch(&service, request).await {
        Ok(reply) => reply,
        Err(e) => {
            error!("Failed to serve {:?} from {}: {}", request.kind, remote, e);
            return;
        }
    };

    if let Err(e) = stream.write_all(&reply.encode()).await {
        warn!("Failed to reply to {}: {}", remote, e);
    }
    if request.kind == MessageType::Quit {
        let _ = quit_tx.send(()).await;
    }
}

/// Compute the reply to one request against the local node
pub async fn dispatch(service: &ChordService, request: Message) -> Result<Message, ChordError> {
    let handle = service.handle();
    let ack = request.kind.ack();
    let reply = match request.kind {
        MessageType::Quit => Message::new(ack),
        MessageType::GetStatus => Message::with_data(ack, handle.status().await?.into()),
        MessageType::SetStatus => {
            handle
                .set_status(NodeStatus::try_from(request.data)?)
                .await?;
            Message::new(ack)
        }
        MessageType::GetSuccessor => Message::with_data(ack, handle.successor().await?.0),
        MessageType::SetSuccessor => {
            handle.set_successor(request.node()).await?;
            Message::new(ack)
        }
        MessageType::GetPredecessor => Message::with_data(ack, handle.predecessor().await?.0),
        MessageType::SetPredecessor => {
            handle.set_predecessor(request.node()).await?;
            Message::new(ack)
        }
        MessageType::GetClosestPrecedingFinger => Message::with_data(
            ack,
            service.closest_preceding_finger(request.node()).await?.0,
        ),
        MessageType::FindSuccessor => {
            Message::with_data(ack, service.find_successor(request.node()).await?.0)
        }
        MessageType::FindPredecessor => {
            Message::with_data(ack, service.find_predecessor(request.node()).await?.0)
        }
        MessageType::UpdateFingerTableJoin => {
            service
                .update_finger_table_join(request.data as usize, request.data2.into())
                .await?;
            Message::new(ack)
        }
        MessageType::UpdateFingerTableLeave => {
            service
                .update_finger_table_leave(request.data as usize, request.data2.into())
                .await?;
            Message::new(ack)
        }
        other => return Err(MessageError::NotARequest(other).into()),
    };
    Ok(reply)
}
