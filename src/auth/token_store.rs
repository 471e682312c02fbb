use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Attributes attached to a credential token. A token is authorized when
/// its level is greater than zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenAttr {
    pub level: i64,
    pub note: String,
}

/// Credential store: an opaque-token → attribute map persisted as JSON.
///
/// The decoded map lives in memory for the process lifetime; the file is
/// written only on mutation. A missing file loads as an empty store.
pub struct TokenStore {
    path: PathBuf,
    tokens: RwLock<HashMap<String, TokenAttr>>,
}

impl TokenStore {
    pub fn load(path: &Path) -> Result<Self, TokenStoreError> {
        let tokens = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(TokenStoreError::Parse)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(TokenStoreError::Io(e)),
        };
        info!(path = %path.display(), tokens = tokens.len(), "token store loaded");
        Ok(Self {
            path: path.to_path_buf(),
            tokens: RwLock::new(tokens),
        })
    }

    /// Look up a token, regardless of its level.
    pub fn get(&self, token: &str) -> Option<TokenAttr> {
        self.tokens
            .read()
            .ok()
            .and_then(|tokens| tokens.get(token).cloned())
    }

    /// Look up a token and require it to be authorized (level > 0).
    pub fn authed(&self, token: &str) -> Option<TokenAttr> {
        self.get(token).filter(|attr| attr.level > 0)
    }

    /// Snapshot of the whole map, for the listing endpoint.
    pub fn all(&self) -> HashMap<String, TokenAttr> {
        self.tokens
            .read()
            .map(|tokens| tokens.clone())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.read().map(|tokens| tokens.is_empty()).unwrap_or(true)
    }

    /// Mint a new level-1 token with the given note, persist, and return it.
    pub fn create(&self, note: &str) -> Result<String, TokenStoreError> {
        let token = Uuid::new_v4().simple().to_string();
        let mut tokens = self.tokens.write().map_err(|_| TokenStoreError::Poisoned)?;
        tokens.insert(
            token.clone(),
            TokenAttr {
                level: 1,
                note: note.to_string(),
            },
        );
        self.persist(&tokens)?;
        debug!(note, "minted new token");
        Ok(token)
    }

    fn persist(&self, tokens: &HashMap<String, TokenAttr>) -> Result<(), TokenStoreError> {
        let raw = serde_json::to_string_pretty(tokens).map_err(TokenStoreError::Parse)?;
        std::fs::write(&self.path, raw).map_err(TokenStoreError::Io)
    }
}

#[derive(Debug)]
pub enum TokenStoreError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Poisoned,
}

impl std::fmt::Display for TokenStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenStoreError::Io(e) => write!(f, "token store I/O error: {}", e),
            TokenStoreError::Parse(e) => write!(f, "token store encoding error: {}", e),
            TokenStoreError::Poisoned => write!(f, "token store lock poisoned"),
        }
    }
}

impl std::error::Error for TokenStoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::load(&dir.path().join("tokens.json")).unwrap();
        assert!(store.is_empty());
        assert!(store.get("anything").is_none());
    }

    #[test]
    fn created_tokens_are_authed_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let store = TokenStore::load(&path).unwrap();
        let token = store.create("autogen").unwrap();
        assert_eq!(store.authed(&token).unwrap().note, "autogen");

        // A fresh load sees the same token.
        let reloaded = TokenStore::load(&path).unwrap();
        assert_eq!(reloaded.authed(&token).unwrap().level, 1);
    }

    #[test]
    fn level_zero_tokens_are_not_authed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, r#"{"lurker":{"level":0,"note":"revoked"}}"#).unwrap();

        let store = TokenStore::load(&path).unwrap();
        assert!(store.get("lurker").is_some());
        assert!(store.authed("lurker").is_none());
        assert!(store.authed("unknown").is_none());
    }
}
