//! Per-connection handler: outbox registration, event routing, and
//! disconnect cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register an outbox so broadcasts can reach this connection
//!   2. Loop: decode inbound frames → dispatcher; drain outbox → socket
//!   3. On exit, the guard runs the disconnect transition

use std::sync::Arc;

use readyroom_protocol::{ClientEvent, Codec, ErrorInfo, ServerEvent};
use readyroom_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::ReadyRoomError;
use crate::server::ServerState;

/// Drop guard that removes the connection from every room when the
/// handler exits, including on error or panic.
///
/// `Drop` is synchronous, so the async cleanup runs in a spawned task.
struct DisconnectGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for DisconnectGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.outboxes.lock().await.remove(&conn_id);
            let mut dispatcher = state.dispatcher.lock().await;
            let outbound = dispatcher.disconnect(conn_id);
            state.deliver(outbound).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), ReadyRoomError> {
    let conn_id = conn.id();
    tracing::info!(%conn_id, "new connection");

    let (outbox, mut frames) = mpsc::unbounded_channel::<Vec<u8>>();
    state.outboxes.lock().await.insert(conn_id, outbox);
    let _guard = DisconnectGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    loop {
        tokio::select! {
            inbound = conn.recv() => match inbound {
                Ok(Some(data)) => handle_frame(&conn, &state, &data).await?,
                Ok(None) => {
                    tracing::info!(%conn_id, "client disconnected");
                    break;
                }
                Err(e) => {
                    tracing::info!(
                        %conn_id,
                        error = %e,
                        "client disconnected (recv error)"
                    );
                    break;
                }
            },
            Some(frame) = frames.recv() => {
                conn.send(&frame).await?;
            }
        }
    }

    // _guard drops here → disconnect transition fires.
    Ok(())
}

/// Decodes one inbound frame and runs it through the dispatcher.
///
/// Undecodable frames are answered with an `error` event to this
/// connection only; the connection stays open.
async fn handle_frame<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    data: &[u8],
) -> Result<(), ReadyRoomError> {
    let conn_id = conn.id();
    let event: ClientEvent = match state.codec.decode(data) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "failed to decode event");
            let message = format!("invalid event: {e}");
            return send_error(conn, &state.codec, &message).await;
        }
    };

    tracing::debug!(
        %conn_id,
        event = event.name(),
        room_id = %event.room_id(),
        "event received"
    );

    let mut dispatcher = state.dispatcher.lock().await;
    let outbound = dispatcher.handle(conn_id, event);
    state.deliver(outbound).await;
    Ok(())
}

/// Sends an `error` event straight to the client.
async fn send_error(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    message: &str,
) -> Result<(), ReadyRoomError> {
    let event = ServerEvent::Error(ErrorInfo {
        message: message.to_string(),
    });
    let bytes = codec.encode(&event)?;
    conn.send(&bytes).await?;
    Ok(())
}
