use actix_web_actors::ws;
use log::info;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use crate::bot;
use crate::game::finalize::finalize_room;
use crate::game::room::{MoveError, Outcome, Role};
use crate::game::rules;
use crate::models::{ClientMessage, ServerMessage};
use crate::websocket::fanout::broadcast;
use crate::websocket::handler::RoomSocket;

impl RoomSocket {
    /// Attach this connection to its room: take a seat or spectate, start
    /// the game if both seats are now ready, and send the initial state.
    pub(super) fn join_room(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        let (role, init, bot_turn) = {
            let mut rooms = self.app_state.rooms.lock().unwrap();
            let Some(room) = rooms.get_mut(&self.room_id) else {
                // The room existed at handshake time; treat a vanished one
                // as a dead connection.
                self.send_error(ctx, "no such room");
                ctx.close(None);
                return;
            };
            let role = room.add_participant(&self.id, &self.username);
            room.try_start(Instant::now());
            let init = ServerMessage::Init {
                fen: room.fen(),
                remaining: room.clocks.readout(),
                turn: rules::side_name(room.turn).to_string(),
            };
            (role, init, room.bot_to_move())
        };

        match role {
            Role::Player(side) => {
                info!("{} seated as {} in room {}", self.username, rules::side_name(side), self.room_id)
            }
            Role::Spectator => info!("{} spectating room {}", self.username, self.room_id),
        }

        if let Ok(text) = serde_json::to_string(&init) {
            ctx.text(text);
        }
        self.app_state.persist_rooms();

        if bot_turn {
            self.spawn_bot_turn();
        }
    }

    pub(super) fn handle_message(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match msg {
            ClientMessage::Move { uci } => self.handle_move(&uci, ctx),
            ClientMessage::Chat { text } => self.handle_chat(text),
        }
    }

    /// Feed one candidate move through the room state machine and fan the
    /// result out. Rejections go back to the sender only; applied moves,
    /// forfeits and game ends are broadcast to the whole room.
    fn handle_move(&mut self, uci: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let result = {
            let mut rooms = self.app_state.rooms.lock().unwrap();
            let Some(room) = rooms.get_mut(&self.room_id) else {
                self.send_error(ctx, "no such room");
                return;
            };
            let now = Instant::now();
            match room.side_of(&self.id) {
                None => {
                    self.send_illegal(ctx, "spectators cannot move");
                    return;
                }
                Some(side) if room.started && side != room.turn => {
                    // An out-of-turn submission still observes the lazy
                    // forfeit: the side to move is charged before the
                    // attempt is rejected.
                    match room.check_time_forfeit(now) {
                        Some(winner) => Err(MoveError::TimeForfeit { winner }),
                        None => {
                            self.send_illegal(ctx, "not your turn");
                            return;
                        }
                    }
                }
                Some(_) => room.apply_move(uci, now),
            }
        };

        match result {
            Ok(applied) => {
                broadcast(
                    &self.app_state,
                    &self.room_id,
                    &ServerMessage::Move {
                        fen: applied.fen,
                        remaining: applied.remaining,
                        turn: rules::side_name(applied.turn).to_string(),
                    },
                );
                self.app_state.persist_rooms();
                if let Some(outcome) = applied.outcome {
                    self.announce_gameover(outcome);
                } else {
                    let bot_turn = {
                        let rooms = self.app_state.rooms.lock().unwrap();
                        rooms.get(&self.room_id).is_some_and(|room| room.bot_to_move())
                    };
                    if bot_turn {
                        self.spawn_bot_turn();
                    }
                }
            }
            Err(MoveError::TimeForfeit { winner }) => {
                // The forfeit is the game-ending event, not a rejection.
                self.app_state.persist_rooms();
                self.announce_gameover(Outcome::win(winner));
            }
            Err(e) => self.send_illegal(ctx, &e.to_string()),
        }
    }

    /// Free-text relay to the whole room; content is not validated.
    fn handle_chat(&mut self, text: String) {
        broadcast(
            &self.app_state,
            &self.room_id,
            &ServerMessage::Chat {
                user: self.username.clone(),
                text,
            },
        );
    }

    fn announce_gameover(&self, outcome: Outcome) {
        broadcast(
            &self.app_state,
            &self.room_id,
            &ServerMessage::Gameover {
                result: outcome.notation().to_string(),
            },
        );
        finalize_room(&self.app_state, &self.room_id);
    }

    fn spawn_bot_turn(&self) {
        let turn: Pin<Box<dyn Future<Output = ()>>> =
            Box::pin(bot::take_turn(self.app_state.clone(), self.room_id.clone()));
        actix_rt::spawn(turn);
    }

    pub(super) fn send_illegal(&self, ctx: &mut ws::WebsocketContext<Self>, reason: &str) {
        let msg = ServerMessage::Illegal {
            reason: reason.to_string(),
        };
        if let Ok(text) = serde_json::to_string(&msg) {
            ctx.text(text);
        }
    }

    pub(super) fn send_error(&self, ctx: &mut ws::WebsocketContext<Self>, message: &str) {
        let msg = ServerMessage::Error {
            message: message.to_string(),
        };
        if let Ok(text) = serde_json::to_string(&msg) {
            ctx.text(text);
        }
    }
}
