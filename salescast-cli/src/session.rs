//! Session visibility preferences on disk.

use std::path::{Path, PathBuf};

use anyhow::Result;
use salescast_core::VisibilityPreferences;
use tracing::warn;

/// `<data dir>/salescast/session.json`, or `./salescast/session.json` when
/// the platform has no data directory.
pub fn default_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("salescast")
        .join("session.json")
}

/// Load preferences from disk. Returns defaults if the file is missing or corrupt.
pub fn load(path: &Path) -> VisibilityPreferences {
    let Ok(content) = std::fs::read_to_string(path) else {
        return VisibilityPreferences::default();
    };
    VisibilityPreferences::from_json(&content).unwrap_or_else(|err| {
        warn!(path = %path.display(), %err, "ignoring corrupt session file");
        VisibilityPreferences::default()
    })
}

/// Save preferences to disk. Creates parent directories if needed.
pub fn save(path: &Path, prefs: &VisibilityPreferences) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, prefs.to_json()?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut prefs = VisibilityPreferences::new();
        prefs.set("price", true);
        prefs.set("revenue", false);

        save(&path, &prefs).unwrap();
        assert_eq!(load(&path), prefs);
    }

    #[test]
    fn missing_file_returns_defaults() {
        let loaded = load(Path::new("/nonexistent/path/session.json"));
        assert!(loaded.is_empty());
    }

    #[test]
    fn corrupt_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not valid json {{{").unwrap();
        assert!(load(&path).is_empty());
    }

    #[test]
    fn default_path_ends_with_session_file() {
        assert!(default_path().ends_with("salescast/session.json"));
    }
}
