use rusqlite::{Connection, OptionalExtension};
use std::path::PathBuf;

use crate::error::CredentialError;

/// Settings key holding the archive API key
pub const API_KEY_SETTING: &str = "nasa_api_key";

/// Small key/value settings database.
/// The API key is the only thing the viewer persists across sessions.
pub struct SettingsStore {
    conn: Connection,
    db_path: PathBuf,
}

impl SettingsStore {
    /// Open the settings database in the user's data directory:
    /// - Linux: ~/.local/share/apod-viewer/settings.db
    /// - macOS: ~/Library/Application Support/apod-viewer/settings.db
    /// - Windows: %APPDATA%\apod-viewer\settings.db
    pub fn open_default() -> Result<Self, CredentialError> {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or(CredentialError::DataDir)?;
        path.push("apod-viewer");
        path.push("settings.db");
        Self::open(path)
    }

    /// Open or create the database at `db_path`
    pub fn open(db_path: PathBuf) -> Result<Self, CredentialError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)?;
        log::debug!("Settings database opened at {}", db_path.display());

        let store = SettingsStore { conn, db_path };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), CredentialError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL,
                updated_at      INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        let value = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        self.conn.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<bool, CredentialError> {
        let removed = self.conn.execute("DELETE FROM settings WHERE key = ?1", [key])?;
        Ok(removed > 0)
    }
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}

/// Where the archive credential comes from
///
/// Chosen once at startup from the configured credential mode.
pub trait CredentialProvider {
    /// The key to use, or `None` when the user has to be asked
    fn api_key(&self) -> Result<Option<String>, CredentialError>;

    /// Accept a key the user typed in
    fn remember(&self, input: &str) -> Result<String, CredentialError>;

    /// Drop a remembered key so the next lookup asks again
    fn forget(&self) -> Result<(), CredentialError>;

    /// Whether `api_key` can ever come back empty
    fn needs_prompt(&self) -> bool;
}

/// Key persisted in the settings database, asked for when missing
#[derive(Debug)]
pub struct StoredCredential {
    store: SettingsStore,
}

impl StoredCredential {
    pub fn new(store: SettingsStore) -> Self {
        Self { store }
    }
}

impl CredentialProvider for StoredCredential {
    fn api_key(&self) -> Result<Option<String>, CredentialError> {
        Ok(self
            .store
            .get(API_KEY_SETTING)?
            .filter(|key| !key.trim().is_empty()))
    }

    fn remember(&self, input: &str) -> Result<String, CredentialError> {
        let key = input.trim();
        if key.is_empty() {
            return Err(CredentialError::Missing);
        }
        self.store.set(API_KEY_SETTING, key)?;
        log::info!("API key stored in {}", self.store.path().display());
        Ok(key.to_string())
    }

    fn forget(&self) -> Result<(), CredentialError> {
        if self.store.remove(API_KEY_SETTING)? {
            log::info!("Stored API key removed");
        }
        Ok(())
    }

    fn needs_prompt(&self) -> bool {
        true
    }
}

/// Fixed public demo key; never prompts, never persists
#[derive(Debug, Clone)]
pub struct DemoCredential {
    key: String,
}

impl DemoCredential {
    pub fn new(key: String) -> Self {
        Self { key }
    }
}

impl CredentialProvider for DemoCredential {
    fn api_key(&self) -> Result<Option<String>, CredentialError> {
        if self.key.trim().is_empty() {
            return Err(CredentialError::Missing);
        }
        Ok(Some(self.key.clone()))
    }

    fn remember(&self, _input: &str) -> Result<String, CredentialError> {
        self.api_key()?.ok_or(CredentialError::Missing)
    }

    fn forget(&self) -> Result<(), CredentialError> {
        Ok(())
    }

    fn needs_prompt(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::open(dir.path().join("nested").join("settings.db")).unwrap()
    }

    #[test]
    fn test_settings_roundtrip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        assert_eq!(store.get("color").unwrap(), None);
        store.set("color", "red").unwrap();
        store.set("color", "blue").unwrap();
        assert_eq!(store.get("color").unwrap().as_deref(), Some("blue"));
        assert!(store.remove("color").unwrap());
        assert!(!store.remove("color").unwrap());
    }

    #[test]
    fn test_stored_credential_prompts_until_remembered() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StoredCredential::new(store(&dir));

        assert!(provider.needs_prompt());
        assert_eq!(provider.api_key().unwrap(), None);
        assert!(matches!(provider.remember("   "), Err(CredentialError::Missing)));

        assert_eq!(provider.remember(" abc123 ").unwrap(), "abc123");
        assert_eq!(provider.api_key().unwrap().as_deref(), Some("abc123"));

        // Survives reopening
        drop(provider);
        let reopened = StoredCredential::new(store(&dir));
        assert_eq!(reopened.api_key().unwrap().as_deref(), Some("abc123"));
        reopened.forget().unwrap();
        assert_eq!(reopened.api_key().unwrap(), None);
        reopened.forget().unwrap();
    }

    #[test]
    fn test_demo_credential() {
        let provider = DemoCredential::new("DEMO_KEY".to_string());
        assert!(!provider.needs_prompt());
        assert_eq!(provider.api_key().unwrap().as_deref(), Some("DEMO_KEY"));
        assert_eq!(provider.remember("ignored").unwrap(), "DEMO_KEY");
        provider.forget().unwrap();
        assert_eq!(provider.api_key().unwrap().as_deref(), Some("DEMO_KEY"));

        let empty = DemoCredential::new(String::new());
        assert!(matches!(empty.api_key(), Err(CredentialError::Missing)));
    }
}
