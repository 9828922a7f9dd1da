use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::connection_manager::ConnectionId;

/// Write half of a client socket
#[async_trait]
pub trait SocketWriter: Send {
    async fn send_message(&mut self, message: String) -> Result<(), SocketError>;

    async fn close(&mut self) -> Result<(), SocketError>;
}

/// Read half of a client socket
#[async_trait]
pub trait SocketReader: Send {
    /// Next text frame, or None once the client has gone away
    async fn receive_message(&mut self) -> Result<Option<String>, SocketError>;
}

/// Who is on the other end of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionContext {
    pub id: ConnectionId,
    pub player: String,
    /// Set for room connections, None for the global connection
    pub room_id: Option<String>,
}

/// Handler for incoming WebSocket messages
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle_message(&self, context: &ConnectionContext, message: String);
}

#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("Send failed: {0}")]
    SendFailed(String),
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),
}

#[async_trait]
impl SocketWriter for SplitSink<WebSocket, Message> {
    async fn send_message(&mut self, message: String) -> Result<(), SocketError> {
        self.send(Message::Text(message))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.send(Message::Close(None))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }
}

#[async_trait]
impl SocketReader for SplitStream<WebSocket> {
    async fn receive_message(&mut self) -> Result<Option<String>, SocketError> {
        loop {
            match self.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                // Binary, ping and pong frames carry nothing for us
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(SocketError::ReceiveFailed(e.to_string())),
            }
        }
    }
}

/// A registered client connection.
///
/// Outbound payloads are written by their own task so a slow client never stalls
/// inbound handling. The connection ends when the client disconnects or its
/// outbound queue is closed by the delivery fabric.
pub struct Connection {
    context: ConnectionContext,
    outbound_receiver: mpsc::Receiver<String>,
    message_handler: Arc<dyn MessageHandler>,
}

impl Connection {
    pub fn new(
        context: ConnectionContext,
        outbound_receiver: mpsc::Receiver<String>,
        message_handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            context,
            outbound_receiver,
            message_handler,
        }
    }

    pub async fn run(
        self,
        writer: Box<dyn SocketWriter>,
        mut reader: Box<dyn SocketReader>,
    ) -> Result<(), SocketError> {
        let Connection {
            context,
            outbound_receiver,
            message_handler,
        } = self;

        let mut write_task = tokio::spawn(write_loop(context.id, writer, outbound_receiver));

        let result = loop {
            tokio::select! {
                inbound = reader.receive_message() => match inbound {
                    Ok(Some(message)) => message_handler.handle_message(&context, message).await,
                    Ok(None) => {
                        debug!(connection_id = context.id, "Client disconnected");
                        break Ok(());
                    }
                    Err(e) => break Err(e),
                },
                _ = &mut write_task => {
                    debug!(connection_id = context.id, "Outbound side finished");
                    break Ok(());
                }
            }
        };

        write_task.abort();
        info!(connection_id = context.id, player = %context.player, "Connection closed");
        result
    }
}

async fn write_loop(
    connection_id: ConnectionId,
    mut writer: Box<dyn SocketWriter>,
    mut outbound_receiver: mpsc::Receiver<String>,
) {
    while let Some(message) = outbound_receiver.recv().await {
        if let Err(e) = writer.send_message(message).await {
            warn!(connection_id = connection_id, error = %e, "Failed to write to socket");
            return;
        }
    }
    let _ = writer.close().await;
}
