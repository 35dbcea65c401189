use actix::dev::SendError;
use log::{info, warn};

use crate::models::{AppState, ServerMessage, WsPayload};

/// Deliver a message to every occupied seat and spectator of a room.
///
/// Best-effort per recipient: a connection with no live session is routed
/// through the same removal path as an explicit disconnect, and delivery
/// to the rest continues. Per-connection ordering follows from each
/// session actor's mailbox. Neither lock is held while actors process the
/// payload, and the room lock is never held across a send.
pub fn broadcast(state: &AppState, room_id: &str, message: &ServerMessage) {
    let connection_ids = {
        let rooms = state.rooms.lock().unwrap();
        match rooms.get(room_id) {
            Some(room) => room.connection_ids(),
            None => return,
        }
    };
    let sessions = state.sessions.lock().unwrap().clone();

    let payload = match serde_json::to_string(message) {
        Ok(s) => s,
        Err(e) => {
            warn!("room {}: failed to serialize broadcast: {}", room_id, e);
            return;
        }
    };

    let mut lost = Vec::new();
    for conn_id in connection_ids {
        match sessions.get(&conn_id) {
            Some(addr) => match addr.try_send(WsPayload(payload.clone())) {
                // A full mailbox drops this payload but keeps the session.
                Ok(()) | Err(SendError::Full(_)) => {}
                Err(SendError::Closed(_)) => lost.push(conn_id),
            },
            None => lost.push(conn_id),
        }
    }

    if !lost.is_empty() {
        let mut rooms = state.rooms.lock().unwrap();
        if let Some(room) = rooms.get_mut(room_id) {
            for conn_id in &lost {
                info!("room {}: dropping lost connection {}", room_id, conn_id);
                room.remove_connection(conn_id);
            }
        }
    }
}
