//! Save-file discovery and versioning. The wire format itself is opaque to
//! the core (§6.3) -- `GameState` is just a serializable value -- but
//! listing save slots and detecting a version mismatch is ambient
//! infrastructure every deployment needs, so it is kept.
//!
//! Grounded in the teacher's `save_files.rs` (`SaveSlot`, `SaveSummary`,
//! `SaveFileStatus`, the `LazyLock<RwLock<PathBuf>>` active-directory
//! pattern), parameterized over the new `GameState` and using `ron` for
//! the on-disk format, the teacher's choice.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::world::GameState;

/// The on-disk schema version. Bumped whenever `GameState`'s shape changes
/// in a way that breaks older saves.
pub const SAVE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveEnvelope {
    pub format_version: u32,
    pub player_name: String,
    pub moves: u64,
    pub state: GameState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveFileStatus {
    Current,
    VersionMismatch { found: u32, expected: u32 },
    Corrupt,
}

#[derive(Debug, Clone)]
pub struct SaveSlot {
    pub path: PathBuf,
    pub status: SaveFileStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("save directory is not accessible: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode save data")]
    Encode(#[from] ron::Error),
    #[error("failed to decode save data: {0}")]
    Decode(#[from] ron::error::SpannedError),
}

/// Lists every `.ron` file in `dir` as a [`SaveSlot`], classifying each by
/// whether it can actually be loaded and whether its format version
/// matches [`SAVE_FORMAT_VERSION`].
pub fn list_save_slots(dir: &Path) -> Result<Vec<SaveSlot>, SaveError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut slots = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("ron") {
            continue;
        }
        let status = match fs::read_to_string(&path) {
            Ok(contents) => match ron::from_str::<SaveEnvelope>(&contents) {
                Ok(envelope) if envelope.format_version == SAVE_FORMAT_VERSION => SaveFileStatus::Current,
                Ok(envelope) => SaveFileStatus::VersionMismatch { found: envelope.format_version, expected: SAVE_FORMAT_VERSION },
                Err(_) => SaveFileStatus::Corrupt,
            },
            Err(_) => SaveFileStatus::Corrupt,
        };
        slots.push(SaveSlot { path, status });
    }
    Ok(slots)
}

pub fn save_to(path: &Path, envelope: &SaveEnvelope) -> Result<(), SaveError> {
    let serialized = ron::ser::to_string_pretty(envelope, ron::ser::PrettyConfig::default())?;
    fs::write(path, serialized)?;
    Ok(())
}

pub fn load_from(path: &Path) -> Result<SaveEnvelope, SaveError> {
    let contents = fs::read_to_string(path)?;
    Ok(ron::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::tests_support::empty_state;

    #[test]
    fn missing_directory_yields_no_slots() {
        let slots = list_save_slots(Path::new("/nonexistent/amble-saves")).unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn save_then_load_round_trips_player_moves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slot1.ron");
        let mut state = empty_state();
        state.player.moves = 42;
        let envelope = SaveEnvelope {
            format_version: SAVE_FORMAT_VERSION,
            player_name: "Ada".into(),
            moves: 42,
            state,
        };
        save_to(&path, &envelope).unwrap();
        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.state.player.moves, 42);
        assert_eq!(loaded.player_name, "Ada");
    }

    #[test]
    fn version_mismatch_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.ron");
        let envelope = SaveEnvelope { format_version: 0, player_name: "Old".into(), moves: 1, state: empty_state() };
        save_to(&path, &envelope).unwrap();
        let slots = list_save_slots(dir.path()).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].status, SaveFileStatus::VersionMismatch { found: 0, expected: SAVE_FORMAT_VERSION });
    }
}
