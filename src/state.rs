use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::auth::token_store::TokenStore;
use crate::cache::ContentCache;
use crate::config::Config;
use crate::ws::registry::PeerRegistry;

/// Shared application state, injected into handlers through axum `State`.
pub struct AppState {
    pub config: Config,
    pub cache: ContentCache,
    pub registry: PeerRegistry,
    pub level: LevelState,
    pub tokens: TokenStore,
}

impl AppState {
    pub fn new(config: Config, num_levels: usize, tokens: TokenStore) -> Self {
        let staleness = std::time::Duration::from_secs(config.cache_staleness_secs);
        Self {
            config,
            cache: ContentCache::with_staleness(staleness),
            registry: PeerRegistry::new(),
            level: LevelState::new(num_levels),
            tokens,
        }
    }
}

/// Current advisory level, clamped to the catalogue range `[0, num_levels - 1]`.
///
/// A plain atomic is enough here: each mutation is a single clamped
/// read-modify-write and readers only need eventual consistency across the
/// broadcast path.
pub struct LevelState {
    level: AtomicI64,
    max: i64,
}

impl LevelState {
    pub fn new(num_levels: usize) -> Self {
        Self {
            level: AtomicI64::new(0),
            max: num_levels.saturating_sub(1) as i64,
        }
    }

    pub fn current(&self) -> i64 {
        self.level.load(Ordering::SeqCst)
    }

    /// Store `requested` clamped into range; returns the stored value.
    pub fn set(&self, requested: i64) -> i64 {
        let clamped = requested.clamp(0, self.max);
        self.level.store(clamped, Ordering::SeqCst);
        clamped
    }

    /// Move one level up, saturating at the top of the catalogue.
    pub fn increase(&self) -> i64 {
        let prev = self
            .level
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                Some((v + 1).min(self.max))
            })
            .unwrap_or(self.max);
        (prev + 1).min(self.max)
    }

    /// Move one level down, saturating at zero.
    pub fn decrease(&self) -> i64 {
        let prev = self
            .level
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                Some((v - 1).max(0))
            })
            .unwrap_or(0);
        (prev - 1).max(0)
    }
}

#[derive(Debug)]
pub enum LevelCatalogueError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Empty,
}

impl std::fmt::Display for LevelCatalogueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelCatalogueError::Io(e) => write!(f, "failed to read level catalogue: {}", e),
            LevelCatalogueError::Parse(e) => write!(f, "failed to parse level catalogue: {}", e),
            LevelCatalogueError::Empty => write!(f, "level catalogue defines no levels"),
        }
    }
}

impl std::error::Error for LevelCatalogueError {}

/// Number of levels defined by the catalogue file: the count of top-level
/// keys in its JSON object. Clamping needs at least one level.
pub fn load_level_count(path: &Path) -> Result<usize, LevelCatalogueError> {
    let raw = std::fs::read_to_string(path).map_err(LevelCatalogueError::Io)?;
    let catalogue: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&raw).map_err(LevelCatalogueError::Parse)?;
    if catalogue.is_empty() {
        return Err(LevelCatalogueError::Empty);
    }
    Ok(catalogue.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clamps_at_both_bounds() {
        let level = LevelState::new(10);
        assert_eq!(level.set(-5), 0);
        assert_eq!(level.set(99), 9);
        assert_eq!(level.set(5), 5);
        assert_eq!(level.current(), 5);
    }

    #[test]
    fn increase_saturates_at_the_top() {
        let level = LevelState::new(3);
        assert_eq!(level.increase(), 1);
        assert_eq!(level.increase(), 2);
        assert_eq!(level.increase(), 2);
        assert_eq!(level.current(), 2);
    }

    #[test]
    fn decrease_saturates_at_zero() {
        let level = LevelState::new(3);
        assert_eq!(level.decrease(), 0);
        level.set(2);
        assert_eq!(level.decrease(), 1);
        assert_eq!(level.decrease(), 0);
        assert_eq!(level.decrease(), 0);
    }

    #[test]
    fn catalogue_count_comes_from_top_level_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("levels.json");
        std::fs::write(&path, r#"{"0":{"name":"calm"},"1":{"name":"uneasy"},"2":{"name":"angry"}}"#)
            .unwrap();
        assert_eq!(load_level_count(&path).unwrap(), 3);
    }

    #[test]
    fn empty_catalogue_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("levels.json");
        std::fs::write(&path, "{}").unwrap();
        assert!(matches!(
            load_level_count(&path),
            Err(LevelCatalogueError::Empty)
        ));
    }
}
