use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Optional `provault.toml`. CLI flags win over config values, config values
/// over built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VaultConfig {
    pub database: Option<String>,
    pub port: Option<u16>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("provault.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("provault.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<VaultConfig>> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: VaultConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(Some(&dir.path().join("provault.toml"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn config_values_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("provault.toml");
        std::fs::write(&path, "database = \"data/backups.db\"\nport = 4100\n").unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.database.as_deref(), Some("data/backups.db"));
        assert_eq!(loaded.port, Some(4100));
    }

    #[test]
    fn ensure_db_dir_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("store.db");

        ensure_db_dir(&db).unwrap();
        assert!(db.parent().unwrap().exists());
    }
}
