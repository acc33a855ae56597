//! The single active index and the upload it was built from

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;

use crate::providers::VectorIndex;
use crate::types::Kind;

/// Index built from one successful upload
pub struct Session {
    pub index: Arc<dyn VectorIndex>,
    /// Temp path the upload was processed from (deleted afterwards)
    pub source_path: PathBuf,
    /// Client-supplied filename
    pub filename: String,
    /// Kind resolved at upload time
    pub kind: Kind,
    pub documents_count: usize,
    pub chunks_indexed: usize,
    pub loaded_at: DateTime<Utc>,
}

/// Holds at most one session; the last successful upload wins
#[derive(Default)]
pub struct SessionStore {
    current: RwLock<Option<Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new session, returning the one it replaced
    pub fn replace(&self, session: Session) -> Option<Arc<Session>> {
        let session = Arc::new(session);
        tracing::info!(
            "Active index replaced: {} ({} chunks from {} documents)",
            session.filename,
            session.chunks_indexed,
            session.documents_count
        );
        self.current.write().replace(session)
    }

    /// Current session, if any upload has succeeded
    pub fn current(&self) -> Option<Arc<Session>> {
        self.current.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::providers::ScoredChunk;
    use async_trait::async_trait;

    struct EmptyIndex;

    #[async_trait]
    impl VectorIndex for EmptyIndex {
        async fn retrieve(&self, _query: &str, _k: usize) -> Result<Vec<ScoredChunk>> {
            Ok(Vec::new())
        }

        fn len(&self) -> usize {
            0
        }

        fn backend(&self) -> &str {
            "empty"
        }
    }

    fn session(filename: &str) -> Session {
        Session {
            index: Arc::new(EmptyIndex),
            source_path: PathBuf::from(format!("temp/{}", filename)),
            filename: filename.to_string(),
            kind: Kind::PlainText,
            documents_count: 1,
            chunks_indexed: 0,
            loaded_at: Utc::now(),
        }
    }

    #[test]
    fn test_last_upload_wins() {
        let store = SessionStore::new();
        assert!(!store.is_loaded());
        assert!(store.replace(session("first.txt")).is_none());

        let previous = store.replace(session("second.txt")).unwrap();
        assert_eq!(previous.filename, "first.txt");

        let current = store.current().unwrap();
        assert_eq!(current.filename, "second.txt");
        assert_eq!(current.index.backend(), "empty");
    }
}
