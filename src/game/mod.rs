pub mod clock;
pub mod elo;
pub mod finalize;
pub mod room;
pub mod rules;

pub use clock::{ClockPair, ClockReadout};
pub use room::{MoveError, Outcome, Role, Room, BOT_NAME};
