use chess::Color;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Remaining time for both sides, in seconds, as sent over the wire.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ClockReadout {
    pub white: f64,
    pub black: f64,
}

/// Per-room countdown clocks with increment-on-move.
///
/// Only ever touched inside the room's critical section; the last-stamp
/// timestamp is the accounting reference for the side to move.
#[derive(Debug, Clone)]
pub struct ClockPair {
    white: f64,
    black: f64,
    increment: f64,
    last_stamp: Option<Instant>,
}

impl ClockPair {
    pub fn new(time_control_secs: f64, increment_secs: f64) -> Self {
        ClockPair {
            white: time_control_secs,
            black: time_control_secs,
            increment: increment_secs,
            last_stamp: None,
        }
    }

    pub fn remaining(&self, side: Color) -> f64 {
        match side {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    /// Record `now` as the reference point for the next elapsed-time charge.
    pub fn stamp(&mut self, now: Instant) {
        self.last_stamp = Some(now);
    }

    /// Subtract wall-clock time since the last stamp from `side`.
    ///
    /// Returns `true` if the side's flag fell: the remaining time went
    /// strictly negative. The committed value is clamped to zero so a
    /// negative reading is never observable outside this call.
    pub fn charge_elapsed(&mut self, side: Color, now: Instant) -> bool {
        let Some(last) = self.last_stamp else {
            return false;
        };
        let elapsed = now.duration_since(last).as_secs_f64();
        let slot = match side {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        };
        *slot -= elapsed;
        if *slot < 0.0 {
            *slot = 0.0;
            return true;
        }
        false
    }

    /// Whether `side` would forfeit if charged at `now`, without
    /// committing the charge.
    pub fn flag_fallen(&self, side: Color, now: Instant) -> bool {
        match self.last_stamp {
            Some(last) => self.remaining(side) - now.duration_since(last).as_secs_f64() < 0.0,
            None => false,
        }
    }

    /// Credit the configured increment to the side that just moved.
    pub fn credit_increment(&mut self, side: Color) {
        match side {
            Color::White => self.white += self.increment,
            Color::Black => self.black += self.increment,
        }
    }

    pub fn reset(&mut self, value: f64) {
        self.white = value;
        self.black = value;
        self.last_stamp = None;
    }

    pub fn readout(&self) -> ClockReadout {
        ClockReadout {
            white: self.white,
            black: self.black,
        }
    }
}
