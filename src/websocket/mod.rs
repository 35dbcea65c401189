pub mod fanout;
pub mod game_flow;
pub mod handler;

pub use fanout::broadcast;
pub use handler::{ws_index, RoomSocket};
