pub mod games;
pub mod users;

pub use games::GameStore;
pub use users::{UserRecord, UserStore};

use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

/// Write a whole JSON document with write-temp-then-rename semantics so a
/// crash mid-write never leaves a partial file behind.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let data = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)
}

/// Load a JSON document, falling back to the default on a missing or
/// unreadable file. Corruption is not fatal; the store starts fresh.
pub(crate) fn load_json_or_default<T>(path: &Path) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    match fs::read(path) {
        Ok(data) => serde_json::from_slice(&data).unwrap_or_else(|e| {
            log::warn!("ignoring unreadable store {}: {}", path.display(), e);
            T::default()
        }),
        Err(_) => T::default(),
    }
}
