//! JSON file backend for session persistence.
//!
//! Every operation loads the whole file, modifies it and writes it back.
//! Writes inside one process are serialized; across processes the last
//! writer wins.

use std::collections::BTreeMap;
use std::io::ErrorKind;
#[cfg(test)]
use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Session, SessionFilter};
use crate::error::WardenResult;
use crate::storage::SessionPersistence;

pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> WardenResult<BTreeMap<String, Session>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, sessions: &BTreeMap<String, Session>) -> WardenResult<()> {
        let bytes = serde_json::to_vec_pretty(sessions)?;
        // Write then rename so readers never see a half-written file.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn delete_file(&self) -> std::io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[async_trait]
impl SessionPersistence for FileSessionStore {
    async fn save(&self, session: &Session) -> WardenResult<()> {
        let _guard = self.lock.lock().await;
        let mut sessions = self.read().await?;
        sessions.insert(session.session_id.clone(), session.clone());
        self.write(&sessions).await
    }

    async fn search(&self, filter: &SessionFilter) -> WardenResult<Vec<Session>> {
        let _guard = self.lock.lock().await;
        Ok(self
            .read()
            .await?
            .into_values()
            .filter(|s| filter.matches(s))
            .collect())
    }

    async fn remove(&self, session_id: &str) -> WardenResult<bool> {
        let _guard = self.lock.lock().await;
        let mut sessions = self.read().await?;
        if sessions.remove(session_id).is_none() {
            return Ok(false);
        }
        self.write(&sessions).await?;
        Ok(true)
    }

    async fn load_snapshot(&self) -> WardenResult<Vec<Session>> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.into_values().collect())
    }

    async fn remove_many(&self, session_ids: &[String]) -> WardenResult<usize> {
        let _guard = self.lock.lock().await;
        let mut sessions = self.read().await?;
        let removed = session_ids
            .iter()
            .filter(|id| sessions.remove(id.as_str()).is_some())
            .count();
        if removed > 0 {
            self.write(&sessions).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio_test::assert_ok;

    fn temp_store() -> FileSessionStore {
        FileSessionStore::new(
            std::env::temp_dir().join(format!("warden-file-{}.json", uuid::Uuid::new_v4())),
        )
    }

    fn session(id: &str, user: &str) -> Session {
        Session::new(id.to_string(), user.to_string(), Utc::now())
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let store = temp_store();
        assert!(store.load_snapshot().await.unwrap().is_empty());
        assert!(!store.remove("nothing").await.unwrap());
    }

    #[tokio::test]
    async fn test_save_search_remove() {
        let store = temp_store();

        assert_ok!(store.save(&session("a", "user-1")).await);
        assert_ok!(store.save(&session("b", "user-1")).await);
        assert_ok!(store.save(&session("c", "user-2")).await);

        let by_id = store
            .search(&SessionFilter::SessionId("b".into()))
            .await
            .unwrap();
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].user_id, "user-1");

        assert!(store.remove("a").await.unwrap());
        assert_eq!(store.load_snapshot().await.unwrap().len(), 2);

        store.delete_file().await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_many_keeps_other_sessions() {
        let store = temp_store();

        for id in ["a", "b", "c"] {
            store.save(&session(id, "user-1")).await.unwrap();
        }
        let removed = store
            .remove_many(&["a".to_string(), "ghost".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.remove_many(&[]).await.unwrap(), 0);

        let mut ids: Vec<_> = store
            .load_snapshot()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.session_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["b", "c"]);

        store.delete_file().await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let store = temp_store();
        tokio::fs::write(store.path(), b"{not json").await.unwrap();

        assert!(store.load_snapshot().await.is_err());

        store.delete_file().await.unwrap();
    }
}
