pub mod app_state;
pub mod messages;

pub use app_state::AppState;
pub use messages::{ClientMessage, ServerMessage, WsPayload};
