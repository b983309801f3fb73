//! Dated world snapshot archive.
//!
//! Each daily refresh that yields a populated snapshot is written to
//! `<data_dir>/YYYY-MM-DD.json`, one file per reset day.

use crate::error::DaemonResult;
use std::path::{Path, PathBuf};
use stw_client::WorldSnapshot;
use tracing::info;

#[derive(Debug, Clone)]
pub struct WorldArchive {
    dir: PathBuf,
}

impl WorldArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the snapshot for its fetch date, creating the directory
    /// on first use. An existing file for the same date is replaced.
    pub fn save(&self, snapshot: &WorldSnapshot) -> DaemonResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let filename = format!("{}.json", snapshot.fetched_at.format("%Y-%m-%d"));
        let path = self.dir.join(filename);
        let json = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&path, json)?;
        info!(path = %path.display(), "World snapshot archived");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_snapshot() -> WorldSnapshot {
        serde_json::from_value(json!({
            "missions": [{"id": "m1"}],
            "missionAlerts": [{"id": "a1"}],
            "theaters": [{"id": "t1"}],
        }))
        .unwrap()
    }

    #[test]
    fn test_save_writes_dated_file() {
        let dir = std::env::temp_dir().join(format!("stw-world-{}", std::process::id()));
        let archive = WorldArchive::new(&dir);
        let snapshot = sample_snapshot();

        let path = archive.save(&snapshot).unwrap();
        let expected = format!("{}.json", snapshot.fetched_at.format("%Y-%m-%d"));
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), expected);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["missions"][0]["id"], "m1");

        // Same date overwrites rather than piling up files.
        archive.save(&snapshot).unwrap();
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
