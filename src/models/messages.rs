use actix::Message;
use serde::{Deserialize, Serialize};

use crate::game::clock::ClockReadout;

/// Message sent from client to server over the room channel.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Move { uci: String },
    Chat { text: String },
}

/// Message sent from server to every participant of a room.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Init {
        fen: String,
        remaining: ClockReadout,
        turn: String,
    },
    Move {
        fen: String,
        remaining: ClockReadout,
        turn: String,
    },
    Illegal {
        reason: String,
    },
    Chat {
        user: String,
        text: String,
    },
    Gameover {
        result: String,
    },
    Error {
        message: String,
    },
}

/// Serialized payload forwarded to a connection's websocket actor.
#[derive(Message)]
#[rtype(result = "()")]
pub struct WsPayload(pub String);
