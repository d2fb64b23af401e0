use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info};
use sled::{Db, Tree};

use super::{SessionToken, TOKEN_KEY};
use crate::error::Result;

/// Where the bearer token survives between runs.
pub trait TokenStore: Send {
    fn read(&self) -> Result<Option<SessionToken>>;
    fn write(&self, token: &SessionToken) -> Result<()>;
    fn remove(&self) -> Result<()>;
}

/// sled-backed store; one key in the `session` tree.
pub struct SledTokenStore {
    db: Db,
}

impl SledTokenStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn open(path: &str) -> Result<Self> {
        Ok(Self::new(sled::open(path)?))
    }

    fn session_tree(&self) -> Result<Tree> {
        Ok(self.db.open_tree("session")?)
    }
}

impl TokenStore for SledTokenStore {
    fn read(&self) -> Result<Option<SessionToken>> {
        let tree = self.session_tree()?;

        if let Some(bytes) = tree.get(TOKEN_KEY)? {
            let token: SessionToken = serde_json::from_slice(&bytes)?;
            Ok(Some(token))
        } else {
            Ok(None)
        }
    }

    fn write(&self, token: &SessionToken) -> Result<()> {
        let tree = self.session_tree()?;
        tree.insert(TOKEN_KEY, serde_json::to_vec(token)?)?;
        tree.flush()?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        let tree = self.session_tree()?;
        tree.remove(TOKEN_KEY)?;
        tree.flush()?;
        Ok(())
    }
}

/// Non-persistent store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<SessionToken>>,
}

impl MemoryTokenStore {
    /// A panic elsewhere never loses the slot; the last written value stands.
    fn slot(&self) -> MutexGuard<'_, Option<SessionToken>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenStore for MemoryTokenStore {
    fn read(&self) -> Result<Option<SessionToken>> {
        Ok(self.slot().clone())
    }

    fn write(&self, token: &SessionToken) -> Result<()> {
        *self.slot() = Some(token.clone());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}

/// The one bearer token of this session, mirrored to a [`TokenStore`].
pub struct SessionTokenHolder<S: TokenStore> {
    store: S,
    current: Option<SessionToken>,
}

impl<S: TokenStore> SessionTokenHolder<S> {
    /// Starts empty; call [`load`](Self::load) to pick up a persisted token.
    pub fn new(store: S) -> Self {
        Self {
            store,
            current: None,
        }
    }

    pub fn load(&mut self) -> Result<Option<SessionToken>> {
        self.current = self.store.read()?;
        debug!("Session token loaded: {}", self.current.is_some());
        Ok(self.current.clone())
    }

    pub fn save(&mut self, token: SessionToken) -> Result<()> {
        self.store.write(&token)?;
        info!("Session token saved: {}", token);
        self.current = Some(token);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.store.remove()?;
        self.current = None;
        info!("Session token cleared");
        Ok(())
    }

    pub fn current(&self) -> Option<&SessionToken> {
        self.current.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (SledTokenStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = sled::open(temp_dir.path()).unwrap();
        (SledTokenStore::new(db), temp_dir)
    }

    #[test]
    fn test_clear_then_load_yields_nothing() {
        let (store, _temp) = create_test_store();
        let mut holder = SessionTokenHolder::new(store);

        holder.save(SessionToken::new("gho_first")).unwrap();
        holder.clear().unwrap();

        assert_eq!(holder.load().unwrap(), None);
        assert!(!holder.is_authenticated());
    }

    #[test]
    fn test_save_then_load_yields_token() {
        let (store, _temp) = create_test_store();
        let mut holder = SessionTokenHolder::new(store);

        holder.save(SessionToken::new("gho_saved")).unwrap();

        assert_eq!(holder.load().unwrap(), Some(SessionToken::new("gho_saved")));
        assert!(holder.is_authenticated());
    }

    #[test]
    fn test_token_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let db = sled::open(temp_dir.path()).unwrap();
            let mut holder = SessionTokenHolder::new(SledTokenStore::new(db));
            holder.save(SessionToken::new("gho_persisted")).unwrap();
        }

        let db = sled::open(temp_dir.path()).unwrap();
        let mut holder = SessionTokenHolder::new(SledTokenStore::new(db));
        assert!(holder.current().is_none());
        assert_eq!(
            holder.load().unwrap().map(|t| t.expose().to_string()),
            Some("gho_persisted".to_string())
        );
    }

    #[test]
    fn test_memory_store_round() {
        let mut holder = SessionTokenHolder::new(MemoryTokenStore::default());
        assert_eq!(holder.load().unwrap(), None);

        holder.save(SessionToken::new("tok")).unwrap();
        assert_eq!(holder.current(), Some(&SessionToken::new("tok")));

        holder.clear().unwrap();
        assert_eq!(holder.load().unwrap(), None);
    }

    #[test]
    fn test_memory_store_survives_poisoned_lock() {
        let store = std::sync::Arc::new(MemoryTokenStore::default());
        store.write(&SessionToken::new("before")).unwrap();

        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.slot.lock().unwrap();
            panic!("poison the slot");
        })
        .join();
        assert!(store.slot.is_poisoned());

        assert_eq!(store.read().unwrap(), Some(SessionToken::new("before")));
        store.write(&SessionToken::new("after")).unwrap();
        assert_eq!(store.read().unwrap(), Some(SessionToken::new("after")));
        store.remove().unwrap();
        assert_eq!(store.read().unwrap(), None);
    }
}
