//! Automated opponent: asks an external suggestion service for a move and
//! falls back to a random legal move when the service has nothing usable.

use actix_web::web;
use chess::Board;
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::game::finalize::finalize_room;
use crate::game::room::{MoveError, Outcome};
use crate::game::rules;
use crate::models::{AppState, ServerMessage};
use crate::websocket::broadcast;

/// Client for the cloud-eval move-suggestion service.
///
/// Strictly best-effort: every transport error, non-success status or
/// malformed body collapses to "no suggestion".
pub struct SuggestClient {
    http: reqwest::Client,
    url: String,
}

impl SuggestClient {
    pub fn new(url: String, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("chess-arena/0.1")
            .build()?;
        Ok(SuggestClient { http, url })
    }

    /// Best-move suggestion for a FEN, or `None`.
    pub async fn best_move(&self, fen: &str) -> Option<String> {
        let response = self
            .http
            .get(&self.url)
            .query(&[("fen", fen), ("multiPv", "1")])
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let body: serde_json::Value = response.json().await.ok()?;
        if let Some(moves) = body["pvs"][0]["moves"].as_str() {
            if let Some(first) = moves.split_whitespace().next() {
                return Some(first.to_string());
            }
        }
        body["bestMove"].as_str().map(str::to_string)
    }
}

/// Resolve a suggestion (or nothing) to a legal move in the position.
///
/// The suggestion text goes through the same ordered parser strategies as
/// a player move and is accepted only if it lands in the legal-move set;
/// otherwise a uniformly random legal move stands in. `None` means the
/// position has no legal moves at all.
pub fn choose_move(fen: &str, suggestion: Option<&str>) -> Option<String> {
    let board = Board::from_str(fen).ok()?;
    let legal = rules::legal_moves(&board);

    if let Some(text) = suggestion {
        if let Some(mv) = rules::parse_move(&board, text) {
            if legal.contains(&mv) {
                return Some(mv.to_string());
            }
            warn!("suggestion {} is not legal here, falling back", text);
        }
    }

    legal.choose(&mut rand::thread_rng()).map(|mv| mv.to_string())
}

/// Play one automated-opponent turn for the given room.
///
/// The position is snapshotted under the room lock and all I/O (the
/// suggestion query, the broadcast) happens outside it; the chosen move is
/// re-validated by `apply_move` when the lock is re-acquired. If the bot
/// still has the move afterwards, a fresh task is spawned rather than
/// recursing, and the thinking delay bounds the iteration rate.
pub async fn take_turn(state: web::Data<AppState>, room_id: String) {
    let fen = {
        let rooms = state.rooms.lock().unwrap();
        match rooms.get(&room_id) {
            Some(room) if room.bot_to_move() => room.fen(),
            _ => return,
        }
    };

    let suggestion = state.suggest.best_move(&fen).await;
    let Some(uci) = choose_move(&fen, suggestion.as_deref()) else {
        // No legal moves: the game already ended under us.
        adjudicate_terminal(&state, &room_id);
        return;
    };

    // Cosmetic thinking time; the clock charge happens in apply_move
    // exactly as it would for a human.
    let delay = Duration::from_millis(rand::thread_rng().gen_range(200..=800));
    actix_rt::time::sleep(delay).await;

    let result = {
        let mut rooms = state.rooms.lock().unwrap();
        match rooms.get_mut(&room_id) {
            Some(room) if room.bot_to_move() => room.apply_move(&uci, Instant::now()),
            _ => return,
        }
    };

    match result {
        Ok(applied) => {
            info!("room {}: bot played {}", room_id, uci);
            broadcast(
                &state,
                &room_id,
                &ServerMessage::Move {
                    fen: applied.fen,
                    remaining: applied.remaining,
                    turn: rules::side_name(applied.turn).to_string(),
                },
            );
            state.persist_rooms();
            if let Some(outcome) = applied.outcome {
                broadcast(
                    &state,
                    &room_id,
                    &ServerMessage::Gameover {
                        result: outcome.notation().to_string(),
                    },
                );
                finalize_room(&state, &room_id);
            } else {
                let again = {
                    let rooms = state.rooms.lock().unwrap();
                    rooms.get(&room_id).is_some_and(|room| room.bot_to_move())
                };
                if again {
                    // Box the future so the recursive spawn type-checks.
                    let next: Pin<Box<dyn Future<Output = ()>>> =
                        Box::pin(take_turn(state.clone(), room_id));
                    actix_rt::spawn(next);
                }
            }
        }
        Err(MoveError::TimeForfeit { winner }) => {
            broadcast(
                &state,
                &room_id,
                &ServerMessage::Gameover {
                    result: Outcome::win(winner).notation().to_string(),
                },
            );
            state.persist_rooms();
            finalize_room(&state, &room_id);
        }
        Err(e) => {
            // apply_move re-validated against state that moved under us.
            warn!("room {}: bot move {} rejected: {}", room_id, uci, e);
        }
    }
}

/// Record the outcome the rules oracle reports for a position with no
/// legal moves, defaulting to a draw, then announce and finalize.
fn adjudicate_terminal(state: &web::Data<AppState>, room_id: &str) {
    let result = {
        let mut rooms = state.rooms.lock().unwrap();
        let Some(room) = rooms.get_mut(room_id) else {
            return;
        };
        if room.outcome.is_none() {
            room.outcome = Some(rules::terminal_outcome(&room.game).unwrap_or(Outcome::Draw));
        }
        room.outcome.map(|o| o.notation().to_string())
    };
    if let Some(result) = result {
        broadcast(state, room_id, &ServerMessage::Gameover { result });
        finalize_room(state, room_id);
    }
}
