use actix::Recipient;
use log::warn;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::bot::SuggestClient;
use crate::config::Config;
use crate::game::room::Room;
use crate::models::messages::WsPayload;
use crate::store::{GameStore, UserStore};

/// Application state shared between connections.
///
/// Rooms, live sessions and session tokens are process-scoped registries
/// with their own locks; the stores carry their own locking discipline.
pub struct AppState {
    pub rooms: Mutex<HashMap<String, Room>>,
    pub sessions: Mutex<HashMap<String, Recipient<WsPayload>>>,
    pub tokens: Mutex<HashMap<String, String>>,
    pub users: UserStore,
    pub games: GameStore,
    pub suggest: SuggestClient,
}

impl AppState {
    pub fn new(config: &Config) -> io::Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(AppState {
            rooms: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
            users: UserStore::open(config.data_dir.join("users.json")),
            games: GameStore::open(config.data_dir.join("games.json")),
            suggest: SuggestClient::new(config.suggest_url.clone(), config.suggest_timeout)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?,
        })
    }

    /// Allocate a fresh room. Ids are millisecond-time-derived and bumped
    /// past collisions so they stay distinguishable within one process.
    pub fn create_room(&self, time_control_secs: f64, increment_secs: f64, is_private: bool) -> String {
        let mut rooms = self.rooms.lock().unwrap();
        let mut id = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        while rooms.contains_key(&id.to_string()) {
            id += 1;
        }
        let id = id.to_string();
        rooms.insert(
            id.clone(),
            Room::new(id.clone(), time_control_secs, increment_secs, is_private),
        );
        id
    }

    /// Resolve a session token to its username.
    pub fn authenticate(&self, token: &str) -> Option<String> {
        self.tokens.lock().unwrap().get(token).cloned()
    }

    pub fn issue_token(&self, username: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens
            .lock()
            .unwrap()
            .insert(token.clone(), username.to_string());
        token
    }

    /// Snapshot every room's summary to the game store. Persistence is a
    /// side effect of gameplay, never a precondition: failures are logged
    /// and the game carries on.
    pub fn persist_rooms(&self) {
        let summaries = {
            let rooms = self.rooms.lock().unwrap();
            rooms.values().map(|room| room.summary()).collect()
        };
        if let Err(e) = self.games.record_many(summaries) {
            warn!("failed to persist room summaries: {}", e);
        }
    }
}
