use chess::{Color, Game};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use thiserror::Error;

use crate::game::clock::{ClockPair, ClockReadout};
use crate::game::rules;

/// Reserved identity for the automated opponent. Never rated.
pub const BOT_NAME: &str = "AI";

/// Final result of a game, from white's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    WhiteWins,
    BlackWins,
    Draw,
}

impl Outcome {
    pub fn win(side: Color) -> Outcome {
        match side {
            Color::White => Outcome::WhiteWins,
            Color::Black => Outcome::BlackWins,
        }
    }

    /// Conventional result notation, as persisted and broadcast.
    pub fn notation(self) -> &'static str {
        match self {
            Outcome::WhiteWins => "1-0",
            Outcome::BlackWins => "0-1",
            Outcome::Draw => "1/2-1/2",
        }
    }

    pub fn score_for(self, side: Color) -> f64 {
        match (self, side) {
            (Outcome::WhiteWins, Color::White) | (Outcome::BlackWins, Color::Black) => 1.0,
            (Outcome::Draw, _) => 0.5,
            _ => 0.0,
        }
    }
}

/// One of the two playing slots of a room.
#[derive(Debug, Clone, Default)]
pub struct Seat {
    pub player: Option<String>,
    pub conn: Option<String>,
}

impl Seat {
    fn occupy(&mut self, player: &str, conn: &str) {
        self.player = Some(player.to_string());
        self.conn = Some(conn.to_string());
    }

    /// A seat counts as ready when a player is bound and either has a live
    /// connection or is the automated opponent, which never connects.
    fn is_ready(&self) -> bool {
        match self.player.as_deref() {
            Some(BOT_NAME) => true,
            Some(_) => self.conn.is_some(),
            None => false,
        }
    }
}

/// What a newly attached connection ended up as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player(Color),
    Spectator,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("game has not started")]
    NotStarted,
    #[error("game is already over")]
    GameOver,
    #[error("invalid move format")]
    InvalidFormat,
    #[error("illegal move")]
    Illegal,
    #[error("time forfeit")]
    TimeForfeit { winner: Color },
}

/// State snapshot handed back by a successful move application.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveApplied {
    pub fen: String,
    pub remaining: ClockReadout,
    pub turn: Color,
    pub outcome: Option<Outcome>,
}

/// Summary record persisted after every mutation and on finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_id: String,
    pub white: Option<String>,
    pub black: Option<String>,
    pub started: bool,
    pub time_control: f64,
    pub increment: f64,
    pub fen: String,
    pub moves: Vec<String>,
    pub result: Option<String>,
}

/// Lobby view of a room, for the public room listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyEntry {
    pub room_id: String,
    pub started: bool,
    pub white: Option<String>,
    pub black: Option<String>,
    pub time_control: f64,
    pub increment: f64,
    pub fen: String,
}

/// One live or completed game: board, seats, spectators, clocks and status.
///
/// All read-then-write access goes through the registry's per-room lock;
/// none of these methods perform I/O.
pub struct Room {
    pub id: String,
    pub game: Game,
    pub moves: Vec<String>,
    pub white: Seat,
    pub black: Seat,
    pub spectators: HashSet<String>,
    pub clocks: ClockPair,
    pub turn: Color,
    pub started: bool,
    pub is_private: bool,
    pub outcome: Option<Outcome>,
    pub finalized: bool,
    pub time_control: f64,
    pub increment: f64,
}

impl Room {
    pub fn new(id: String, time_control_secs: f64, increment_secs: f64, is_private: bool) -> Self {
        Room {
            id,
            game: Game::new(),
            moves: Vec::new(),
            white: Seat::default(),
            black: Seat::default(),
            spectators: HashSet::new(),
            clocks: ClockPair::new(time_control_secs, increment_secs),
            turn: Color::White,
            started: false,
            is_private,
            outcome: None,
            finalized: false,
            time_control: time_control_secs,
            increment: increment_secs,
        }
    }

    pub fn seat(&self, side: Color) -> &Seat {
        match side {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    /// Which side, if any, the given connection is seated at.
    pub fn side_of(&self, conn: &str) -> Option<Color> {
        if self.white.conn.as_deref() == Some(conn) {
            Some(Color::White)
        } else if self.black.conn.as_deref() == Some(conn) {
            Some(Color::Black)
        } else {
            None
        }
    }

    /// Attach a connection: reclaim a seat reserved for this identity,
    /// else fill white, else black, else spectate. The same identity never
    /// occupies both seats; a second join by a seated player spectates.
    pub fn add_participant(&mut self, conn: &str, username: &str) -> Role {
        if self.white.player.as_deref() == Some(username) && self.white.conn.is_none() {
            self.white.conn = Some(conn.to_string());
            return Role::Player(Color::White);
        }
        if self.black.player.as_deref() == Some(username) && self.black.conn.is_none() {
            self.black.conn = Some(conn.to_string());
            return Role::Player(Color::Black);
        }

        let already_seated = self.white.player.as_deref() == Some(username)
            || self.black.player.as_deref() == Some(username);
        if !already_seated {
            if self.white.player.is_none() {
                self.white.occupy(username, conn);
                return Role::Player(Color::White);
            }
            if self.black.player.is_none() {
                self.black.occupy(username, conn);
                return Role::Player(Color::Black);
            }
        }

        self.spectators.insert(conn.to_string());
        Role::Spectator
    }

    /// Vacate whatever slot the connection holds. Safe to call for a
    /// connection that was never registered. Losing a seated player knocks
    /// an active game back to not-started; once the game is finished the
    /// seat's player binding is part of the record and survives the
    /// disconnect, only the connection is dropped.
    pub fn remove_connection(&mut self, conn: &str) {
        let finished = self.outcome.is_some();
        for seat in [&mut self.white, &mut self.black] {
            if seat.conn.as_deref() == Some(conn) {
                info!("room {}: seat vacated by {}", self.id, conn);
                seat.conn = None;
                if !finished {
                    seat.player = None;
                    self.started = false;
                }
            }
        }
        self.spectators.remove(conn);
    }

    /// Transition to active once both seats are ready. Returns whether the
    /// transition happened on this call.
    pub fn try_start(&mut self, now: Instant) -> bool {
        if self.started || self.outcome.is_some() {
            return false;
        }
        if !self.white.is_ready() || !self.black.is_ready() {
            return false;
        }
        self.started = true;
        self.turn = self.game.current_position().side_to_move();
        self.clocks.stamp(now);
        info!("room {}: game started", self.id);
        true
    }

    /// Apply one candidate move as a single atomic unit: charge the mover's
    /// clock (possibly forfeiting), parse, validate, push, credit the
    /// increment, flip the turn, then check for a terminal position.
    ///
    /// Rejected moves leave every piece of state untouched; a time forfeit
    /// ends the game and is reported through the error.
    pub fn apply_move(&mut self, text: &str, now: Instant) -> Result<MoveApplied, MoveError> {
        if self.outcome.is_some() {
            return Err(MoveError::GameOver);
        }
        if !self.started {
            return Err(MoveError::NotStarted);
        }

        let mover = self.turn;
        if self.clocks.charge_elapsed(mover, now) {
            let winner = !mover;
            self.outcome = Some(Outcome::win(winner));
            info!("room {}: {} forfeits on time", self.id, rules::side_name(mover));
            return Err(MoveError::TimeForfeit { winner });
        }

        let board = self.game.current_position();
        let mv = rules::parse_move(&board, text).ok_or(MoveError::InvalidFormat)?;
        if !rules::is_legal(&board, mv) {
            return Err(MoveError::Illegal);
        }

        self.game.make_move(mv);
        self.moves.push(mv.to_string());
        self.clocks.credit_increment(mover);
        self.turn = !mover;
        self.clocks.stamp(now);

        self.outcome = rules::terminal_outcome(&self.game);
        if let Some(outcome) = self.outcome {
            info!("room {}: game over, {}", self.id, outcome.notation());
        }

        Ok(MoveApplied {
            fen: self.game.current_position().to_string(),
            remaining: self.clocks.readout(),
            turn: self.turn,
            outcome: self.outcome,
        })
    }

    /// Observe the lazy time forfeit without applying a move.
    ///
    /// Any participant's submission may surface an expired clock, not just
    /// the flagged side's own. The charge is committed only when the flag
    /// has actually fallen; a negative observation leaves the clocks alone.
    pub fn check_time_forfeit(&mut self, now: Instant) -> Option<Color> {
        if !self.started || self.outcome.is_some() {
            return None;
        }
        let mover = self.turn;
        if !self.clocks.flag_fallen(mover, now) {
            return None;
        }
        self.clocks.charge_elapsed(mover, now);
        let winner = !mover;
        self.outcome = Some(Outcome::win(winner));
        info!("room {}: {} forfeits on time", self.id, rules::side_name(mover));
        Some(winner)
    }

    /// Whether the side to move is bound to the automated opponent.
    pub fn bot_to_move(&self) -> bool {
        self.started
            && self.outcome.is_none()
            && self.seat(self.turn).player.as_deref() == Some(BOT_NAME)
    }

    pub fn fen(&self) -> String {
        self.game.current_position().to_string()
    }

    /// Connections that receive room broadcasts: both seats plus spectators.
    pub fn connection_ids(&self) -> Vec<String> {
        let mut ids = Vec::with_capacity(self.spectators.len() + 2);
        for seat in [&self.white, &self.black] {
            if let Some(conn) = &seat.conn {
                ids.push(conn.clone());
            }
        }
        ids.extend(self.spectators.iter().cloned());
        ids
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.id.clone(),
            white: self.white.player.clone(),
            black: self.black.player.clone(),
            started: self.started,
            time_control: self.time_control,
            increment: self.increment,
            fen: self.fen(),
            moves: self.moves.clone(),
            result: self.outcome.map(|o| o.notation().to_string()),
        }
    }

    pub fn lobby_entry(&self) -> LobbyEntry {
        LobbyEntry {
            room_id: self.id.clone(),
            started: self.started,
            white: self.white.player.clone(),
            black: self.black.player.clone(),
            time_control: self.time_control,
            increment: self.increment,
            fen: self.fen(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::Board;
    use std::str::FromStr;
    use std::time::Duration;

    fn active_room() -> (Room, Instant) {
        let mut room = Room::new("test".into(), 60.0, 2.0, false);
        room.add_participant("conn-a", "alice");
        room.add_participant("conn-b", "bob");
        let start = Instant::now();
        assert!(room.try_start(start));
        (room, start)
    }

    #[test]
    fn seats_fill_white_then_black_then_spectators() {
        let mut room = Room::new("test".into(), 60.0, 0.0, false);
        assert_eq!(room.add_participant("c1", "alice"), Role::Player(Color::White));
        assert_eq!(room.add_participant("c2", "bob"), Role::Player(Color::Black));
        assert_eq!(room.add_participant("c3", "carol"), Role::Spectator);
        assert_eq!(room.side_of("c1"), Some(Color::White));
        assert_eq!(room.side_of("c3"), None);
    }

    #[test]
    fn the_same_identity_cannot_occupy_both_seats() {
        let mut room = Room::new("test".into(), 60.0, 0.0, false);
        assert_eq!(room.add_participant("c1", "alice"), Role::Player(Color::White));
        assert_eq!(room.add_participant("c2", "alice"), Role::Spectator);
        assert!(room.black.player.is_none());
    }

    #[test]
    fn reserved_seat_is_reclaimed_by_its_identity() {
        let mut room = Room::new("test".into(), 60.0, 0.0, true);
        room.black.player = Some(BOT_NAME.to_string());
        assert_eq!(room.add_participant("c1", "alice"), Role::Player(Color::White));
        // A bot seat with no connection still counts as ready.
        assert!(room.try_start(Instant::now()));
    }

    #[test]
    fn start_requires_both_seats() {
        let mut room = Room::new("test".into(), 60.0, 0.0, false);
        assert!(!room.try_start(Instant::now()));
        room.add_participant("c1", "alice");
        assert!(!room.try_start(Instant::now()));
        room.add_participant("c2", "bob");
        assert!(room.try_start(Instant::now()));
        assert!(!room.try_start(Instant::now()));
    }

    #[test]
    fn history_and_position_stay_consistent() {
        let (mut room, start) = active_room();
        let script = ["e2e4", "e7e5", "g1f3", "b8c6"];
        for (i, mv) in script.iter().enumerate() {
            let applied = room
                .apply_move(mv, start + Duration::from_millis(i as u64 * 100))
                .unwrap();
            assert_eq!(room.moves.len(), i + 1);
            assert_eq!(applied.fen, room.fen());
        }

        // Replaying the history from the initial position reproduces the fen.
        let mut replay = Game::new();
        for mv in &room.moves {
            let board = replay.current_position();
            replay.make_move(rules::parse_move(&board, mv).unwrap());
        }
        assert_eq!(replay.current_position().to_string(), room.fen());
    }

    #[test]
    fn turn_alternates_after_every_accepted_move() {
        let (mut room, start) = active_room();
        assert_eq!(room.turn, Color::White);
        room.apply_move("e2e4", start).unwrap();
        assert_eq!(room.turn, Color::Black);
        room.apply_move("e7e5", start).unwrap();
        assert_eq!(room.turn, Color::White);
    }

    #[test]
    fn rejected_moves_change_nothing() {
        let (mut room, start) = active_room();
        let fen_before = room.fen();
        let clocks_before = room.clocks.readout();

        assert_eq!(
            room.apply_move("garbage", start + Duration::from_millis(10)),
            Err(MoveError::InvalidFormat)
        );
        assert_eq!(
            room.apply_move("e2e5", start + Duration::from_millis(10)),
            Err(MoveError::Illegal)
        );

        assert_eq!(room.fen(), fen_before);
        assert!(room.moves.is_empty());
        assert_eq!(room.turn, Color::White);
        assert_eq!(room.clocks.readout().black, clocks_before.black);
    }

    #[test]
    fn expired_clock_forfeits_even_for_a_legal_move() {
        let mut room = Room::new("test".into(), 1.0, 0.0, false);
        room.add_participant("c1", "alice");
        room.add_participant("c2", "bob");
        let start = Instant::now();
        room.try_start(start);

        let err = room
            .apply_move("e2e4", start + Duration::from_secs(5))
            .unwrap_err();
        assert_eq!(err, MoveError::TimeForfeit { winner: Color::Black });
        assert_eq!(room.outcome, Some(Outcome::BlackWins));
        assert!(room.moves.is_empty());
        assert!(room.apply_move("e2e4", start).is_err());
    }

    #[test]
    fn mover_is_charged_elapsed_time_and_credited_the_increment() {
        let (mut room, start) = active_room();
        let applied = room.apply_move("e2e4", start + Duration::from_secs(3)).unwrap();
        // 60 - 3 elapsed + 2 increment.
        assert!((applied.remaining.white - 59.0).abs() < 0.5);
        assert_eq!(applied.remaining.black, 60.0);
    }

    #[test]
    fn checkmate_ends_the_game_for_the_mover() {
        let (mut room, start) = active_room();
        for mv in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            let _ = room.apply_move(mv, start);
        }
        assert_eq!(room.outcome, Some(Outcome::BlackWins));
        assert_eq!(room.apply_move("a2a3", start), Err(MoveError::GameOver));
    }

    #[test]
    fn disconnect_reverts_to_not_started_and_rejoin_restarts() {
        let (mut room, start) = active_room();
        room.apply_move("e2e4", start).unwrap();

        room.remove_connection("conn-b");
        assert!(!room.started);
        assert!(room.black.player.is_none());
        assert_eq!(room.apply_move("e7e5", start), Err(MoveError::NotStarted));

        // Removal of an unknown connection is a no-op.
        room.remove_connection("never-registered");

        assert_eq!(room.add_participant("conn-b2", "bob"), Role::Player(Color::Black));
        assert!(room.try_start(start + Duration::from_secs(1)));
        // History survived the disconnect; black is still to move.
        assert_eq!(room.moves, vec!["e2e4".to_string()]);
        assert_eq!(room.turn, Color::Black);
        room.apply_move("e7e5", start + Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn finished_rooms_keep_their_seat_bindings_on_disconnect() {
        let (mut room, start) = active_room();
        for mv in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            let _ = room.apply_move(mv, start);
        }
        assert_eq!(room.outcome, Some(Outcome::BlackWins));

        room.remove_connection("conn-a");
        room.remove_connection("conn-b");
        // The record keeps both players; only the connections are gone.
        assert_eq!(room.white.player.as_deref(), Some("alice"));
        assert_eq!(room.black.player.as_deref(), Some("bob"));
        assert!(room.white.conn.is_none());
        assert!(room.black.conn.is_none());
        assert_eq!(room.summary().white.as_deref(), Some("alice"));
    }

    #[test]
    fn the_opponent_can_observe_a_time_forfeit() {
        let mut room = Room::new("test".into(), 1.0, 0.0, false);
        room.add_participant("c1", "alice");
        room.add_participant("c2", "bob");
        let start = Instant::now();
        room.try_start(start);

        // Black's submission, not white's, surfaces white's fallen flag.
        assert_eq!(
            room.check_time_forfeit(start + Duration::from_secs(5)),
            Some(Color::Black)
        );
        assert_eq!(room.outcome, Some(Outcome::BlackWins));
        assert_eq!(room.clocks.remaining(Color::White), 0.0);
        assert_eq!(room.check_time_forfeit(start + Duration::from_secs(6)), None);
    }

    #[test]
    fn checking_for_forfeit_early_does_not_charge_the_clock() {
        let (mut room, start) = active_room();
        assert_eq!(room.check_time_forfeit(start + Duration::from_secs(3)), None);
        assert_eq!(room.clocks.remaining(Color::White), 60.0);
        // The next move is still charged the full elapsed time.
        let applied = room.apply_move("e2e4", start + Duration::from_secs(5)).unwrap();
        assert!((applied.remaining.white - 57.0).abs() < 0.5);
    }

    #[test]
    fn spectators_receive_broadcasts_but_hold_no_seat() {
        let (mut room, _) = active_room();
        room.add_participant("conn-s", "carol");
        let ids = room.connection_ids();
        assert!(ids.contains(&"conn-a".to_string()));
        assert!(ids.contains(&"conn-b".to_string()));
        assert!(ids.contains(&"conn-s".to_string()));

        room.remove_connection("conn-s");
        assert!(room.started, "losing a spectator does not stop the game");
    }

    #[test]
    fn san_notation_is_accepted_as_a_fallback() {
        let (mut room, start) = active_room();
        room.apply_move("Nf3", start).unwrap();
        assert_eq!(room.moves, vec!["g1f3".to_string()]);
    }

    #[test]
    fn summary_reflects_the_live_state() {
        let (mut room, start) = active_room();
        room.apply_move("e2e4", start).unwrap();
        let summary = room.summary();
        assert_eq!(summary.white.as_deref(), Some("alice"));
        assert_eq!(summary.moves.len(), 1);
        assert_eq!(summary.result, None);
        assert_eq!(summary.fen, Board::from_str(&summary.fen).unwrap().to_string());
    }
}
