use log::info;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::game::room::RoomSummary;

/// Game-summary store: one JSON document mapping room id to its summary.
///
/// Live rooms are snapshotted here after every mutation and the final
/// record lands at finalization. Summaries from earlier runs are kept.
pub struct GameStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, RoomSummary>>,
}

impl GameStore {
    pub fn open(path: PathBuf) -> Self {
        let entries: HashMap<String, RoomSummary> = super::load_json_or_default(&path);
        info!("game store: {} summaries loaded from {}", entries.len(), path.display());
        GameStore {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn get(&self, room_id: &str) -> Option<RoomSummary> {
        self.entries.lock().unwrap().get(room_id).cloned()
    }

    pub fn record(&self, summary: RoomSummary) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(summary.room_id.clone(), summary);
        super::write_json_atomic(&self.path, &*entries)
    }

    pub fn record_many(&self, summaries: Vec<RoomSummary>) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap();
        for summary in summaries {
            entries.insert(summary.room_id.clone(), summary);
        }
        super::write_json_atomic(&self.path, &*entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn summary(id: &str, result: Option<&str>) -> RoomSummary {
        RoomSummary {
            room_id: id.to_string(),
            white: Some("alice".to_string()),
            black: Some("bob".to_string()),
            started: result.is_none(),
            time_control: 300.0,
            increment: 2.0,
            fen: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".to_string(),
            moves: vec![],
            result: result.map(str::to_string),
        }
    }

    #[test]
    fn records_are_upserted_by_room_id() {
        let dir = tempdir().unwrap();
        let store = GameStore::open(dir.path().join("games.json"));
        store.record(summary("1", None)).unwrap();
        store.record(summary("1", Some("1-0"))).unwrap();
        assert_eq!(store.get("1").unwrap().result.as_deref(), Some("1-0"));
    }

    #[test]
    fn earlier_runs_survive_a_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("games.json");
        {
            let store = GameStore::open(path.clone());
            store.record(summary("old", Some("0-1"))).unwrap();
        }
        let store = GameStore::open(path);
        store.record_many(vec![summary("new", None)]).unwrap();
        assert!(store.get("old").is_some());
        assert!(store.get("new").is_some());
    }

    #[test]
    fn no_temp_file_is_left_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("games.json");
        let store = GameStore::open(path.clone());
        store.record(summary("1", None)).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
