use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::game::elo;

/// Persisted per-user rating record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub rating: i32,
    pub games_played: u32,
}

impl Default for UserRecord {
    fn default() -> Self {
        UserRecord {
            rating: 1200,
            games_played: 0,
        }
    }
}

/// Process-wide user/rating store backed by a single JSON document.
///
/// Read-modify-persist runs under the store lock; every write replaces the
/// whole file atomically.
pub struct UserStore {
    path: PathBuf,
    users: Mutex<HashMap<String, UserRecord>>,
}

impl UserStore {
    pub fn open(path: PathBuf) -> Self {
        let users: HashMap<String, UserRecord> = super::load_json_or_default(&path);
        info!("user store: {} users loaded from {}", users.len(), path.display());
        UserStore {
            path,
            users: Mutex::new(users),
        }
    }

    pub fn get(&self, username: &str) -> Option<UserRecord> {
        self.users.lock().unwrap().get(username).cloned()
    }

    /// Fetch the record for `username`, creating a default one if absent.
    pub fn ensure(&self, username: &str) -> io::Result<UserRecord> {
        let mut users = self.users.lock().unwrap();
        if let Some(record) = users.get(username) {
            return Ok(record.clone());
        }
        let record = UserRecord::default();
        users.insert(username.to_string(), record.clone());
        super::write_json_atomic(&self.path, &*users)?;
        Ok(record)
    }

    /// Apply a finished game's scores to both players' ratings.
    ///
    /// Both new ratings are computed from the ratings as they stood before
    /// the game; neither update feeds into the other. Unknown players are
    /// skipped without touching the store.
    pub fn apply_result(&self, white: &str, black: &str, white_score: f64, black_score: f64) {
        let mut users = self.users.lock().unwrap();
        let (Some(w), Some(b)) = (users.get(white).cloned(), users.get(black).cloned()) else {
            warn!("skipping rating update: {} or {} not in user store", white, black);
            return;
        };

        let new_white = elo::updated_rating(w.rating, b.rating, white_score);
        let new_black = elo::updated_rating(b.rating, w.rating, black_score);
        users.insert(
            white.to_string(),
            UserRecord {
                rating: new_white,
                games_played: w.games_played + 1,
            },
        );
        users.insert(
            black.to_string(),
            UserRecord {
                rating: new_black,
                games_played: b.games_played + 1,
            },
        );
        info!(
            "rating update: {} {} -> {}, {} {} -> {}",
            white, w.rating, new_white, black, b.rating, new_black
        );

        if let Err(e) = super::write_json_atomic(&self.path, &*users) {
            warn!("failed to persist user store: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn ensure_creates_a_default_record_once() {
        let dir = tempdir().unwrap();
        let store = UserStore::open(dir.path().join("users.json"));
        let record = store.ensure("alice").unwrap();
        assert_eq!(record.rating, 1200);
        assert_eq!(record.games_played, 0);
        // A second ensure returns the stored record, not a fresh default.
        assert_eq!(store.ensure("alice").unwrap(), store.get("alice").unwrap());
    }

    #[test]
    fn a_decisive_result_moves_both_ratings() {
        let dir = tempdir().unwrap();
        let store = UserStore::open(dir.path().join("users.json"));
        store.ensure("alice").unwrap();
        store.ensure("bob").unwrap();

        store.apply_result("alice", "bob", 1.0, 0.0);
        let alice = store.get("alice").unwrap();
        let bob = store.get("bob").unwrap();
        assert_eq!(alice.rating, 1216);
        assert_eq!(bob.rating, 1184);
        assert_eq!(alice.games_played, 1);
        assert_eq!(bob.games_played, 1);
    }

    #[test]
    fn unknown_players_leave_the_store_untouched() {
        let dir = tempdir().unwrap();
        let store = UserStore::open(dir.path().join("users.json"));
        store.ensure("alice").unwrap();
        store.apply_result("alice", "ghost", 1.0, 0.0);
        assert_eq!(store.get("alice").unwrap().rating, 1200);
    }

    #[test]
    fn store_survives_a_reload_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");
        {
            let store = UserStore::open(path.clone());
            store.ensure("alice").unwrap();
            store.ensure("bob").unwrap();
            store.apply_result("alice", "bob", 0.5, 0.5);
        }
        let reopened = UserStore::open(path);
        assert_eq!(reopened.get("alice").unwrap().rating, 1200);
        assert_eq!(reopened.get("alice").unwrap().games_played, 1);
    }
}
