use chess::Color;
use log::{info, warn};

use crate::game::room::BOT_NAME;
use crate::models::AppState;

/// Run end-of-game bookkeeping for a finished room: rating updates for
/// real players and the final summary record.
///
/// The finalized flag is flipped under the room lock, so a race between
/// two terminating paths applies the rating change at most once. Rooms
/// that are not finished yet, or were already finalized, are left alone.
pub fn finalize_room(state: &AppState, room_id: &str) {
    let snapshot = {
        let mut rooms = state.rooms.lock().unwrap();
        let Some(room) = rooms.get_mut(room_id) else {
            return;
        };
        let Some(outcome) = room.outcome else {
            return;
        };
        if room.finalized {
            return;
        }
        room.finalized = true;
        (
            room.summary(),
            room.white.player.clone(),
            room.black.player.clone(),
            outcome,
        )
    };
    let (summary, white, black, outcome) = snapshot;
    info!("room {}: finalizing, result {}", room_id, outcome.notation());

    if let (Some(white), Some(black)) = (white, black) {
        // The automated opponent is never rated.
        if white != BOT_NAME && black != BOT_NAME {
            state.users.apply_result(
                &white,
                &black,
                outcome.score_for(Color::White),
                outcome.score_for(Color::Black),
            );
        }
    }

    if let Err(e) = state.games.record(summary) {
        warn!("room {}: failed to persist final summary: {}", room_id, e);
    }
}
