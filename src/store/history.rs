//! Newest-first log of expired questions.

use std::path::PathBuf;

use tokio::sync::RwLock;

use crate::persist::{self, PersistError};
use crate::types::Question;

/// How far back `recent` reaches (24 hours).
const RECENT_WINDOW_SECONDS: i64 = 24 * 60 * 60;

/// Questions that have expired, newest first, in their own snapshot file.
pub struct HistoryLog {
    path: PathBuf,
    entries: RwLock<Vec<Question>>,
}

impl HistoryLog {
    pub fn load(path: PathBuf) -> Result<Self, PersistError> {
        let entries: Vec<Question> = persist::load_or_init(&path)?;
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Record a batch of expired questions at the head of the log.
    ///
    /// The batch keeps its relative order, so inserting each entry at index
    /// zero walks the batch in reverse.
    pub async fn record(&self, expired: &[Question]) -> Result<(), PersistError> {
        let mut entries = self.entries.write().await;
        for q in expired.iter().rev() {
            entries.insert(0, q.clone());
        }
        persist::write_snapshot(&self.path, &*entries)
    }

    /// Entries whose expiry falls within the trailing 24 hours, newest first.
    pub async fn recent(&self, now: i64) -> Vec<Question> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|q| q.expire_time >= now - RECENT_WINDOW_SECONDS)
            .cloned()
            .collect()
    }

    pub async fn all(&self) -> Vec<Question> {
        self.entries.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn question(id: &str, expire_time: i64) -> Question {
        Question {
            submitter: "U1".into(),
            id: id.into(),
            text: "t".into(),
            correct_answers: vec!["a".into()],
            category: String::new(),
            init_time: 0,
            publish_time: 0,
            expire_time,
            published: true,
            just_published: false,
            answered_by: Vec::new(),
            guesses: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn records_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::load(dir.path().join("history.json")).unwrap();
        log.record(&[question("q1", 100)]).await.unwrap();
        log.record(&[question("q2", 200), question("q3", 200)]).await.unwrap();

        let all = log.all().await;
        let ids: Vec<&str> = all.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q2", "q3", "q1"]);
    }

    #[tokio::test]
    async fn recent_filters_by_window() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::load(dir.path().join("history.json")).unwrap();
        let now = 1_000_000;
        log.record(&[question("old", now - RECENT_WINDOW_SECONDS - 1)])
            .await
            .unwrap();
        log.record(&[question("new", now - 60)]).await.unwrap();

        let recent = log.recent(now).await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "new");
    }

    #[tokio::test]
    async fn survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        {
            let log = HistoryLog::load(path.clone()).unwrap();
            log.record(&[question("q1", 100)]).await.unwrap();
        }
        let log = HistoryLog::load(path).unwrap();
        assert_eq!(log.all().await.len(), 1);
    }
}
