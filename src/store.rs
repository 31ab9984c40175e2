use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Result, TutorError};
use crate::session::TypingSession;

/// On-disk layout of the progress file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    sessions: Vec<TypingSession>,
    #[serde(default)]
    key_error_stats: BTreeMap<char, u64>,
}

impl StoreData {
    fn with_session(&self, session: &TypingSession) -> StoreData {
        let mut next = self.clone();
        merge_key_errors(&mut next.key_error_stats, &session.key_errors);
        next.sessions.push(session.clone());
        next
    }

    fn validate(&self) -> std::result::Result<(), String> {
        for (idx, s) in self.sessions.iter().enumerate() {
            if !s.is_finished() {
                return Err(format!("session {idx} has no start or finish time"));
            }
            if s.text.is_empty() {
                return Err(format!("session {idx} has an empty reference text"));
            }
            if s.finished_at < s.started_at {
                return Err(format!("session {idx} finishes before it starts"));
            }
        }
        Ok(())
    }
}

/// Add `from` into `into` key-wise
pub fn merge_key_errors(into: &mut BTreeMap<char, u64>, from: &BTreeMap<char, u64>) {
    for (key, count) in from {
        *into.entry(*key).or_insert(0) += count;
    }
}

/// Append-only history of finished sessions plus cumulative per-key errors,
/// mirrored to a JSON file after every change.
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    data: StoreData,
}

impl ProgressStore {
    /// Read the progress file. A missing file yields an empty store.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no progress file yet, starting empty");
                return Ok(Self::empty(path));
            }
            Err(e) => return Err(TutorError::persistence(path, e)),
        };

        let data: StoreData =
            serde_json::from_slice(&bytes).map_err(|e| TutorError::CorruptState {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        data.validate().map_err(|reason| TutorError::CorruptState {
            path: path.clone(),
            reason,
        })?;

        debug!(
            path = %path.display(),
            sessions = data.sessions.len(),
            "loaded progress"
        );
        Ok(Self { path, data })
    }

    /// Empty store that will write to `path` on the first append
    pub fn empty<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            data: StoreData::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a finished session and flush before returning.
    ///
    /// The in-memory state only changes once the file has been replaced, so a
    /// failed append can be retried without duplicating the session.
    pub fn append(&mut self, session: TypingSession) -> Result<()> {
        if !session.is_finished() {
            return Err(TutorError::invalid("only finished sessions can be stored"));
        }

        let next = self.data.with_session(&session);
        if let Err(e) = write_atomic(&self.path, &next) {
            warn!(path = %self.path.display(), error = %e, "failed to persist session");
            return Err(e);
        }
        self.data = next;

        info!(
            path = %self.path.display(),
            sessions = self.data.sessions.len(),
            "progress saved"
        );
        Ok(())
    }

    /// Finished sessions, oldest first
    pub fn history(&self) -> &[TypingSession] {
        &self.data.sessions
    }

    pub fn key_error_stats(&self) -> &BTreeMap<char, u64> {
        &self.data.key_error_stats
    }

    pub fn is_empty(&self) -> bool {
        self.data.sessions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.sessions.len()
    }
}

fn write_atomic(path: &Path, data: &StoreData) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| TutorError::persistence(parent, e))?;
        }
    }

    let json = serde_json::to_vec_pretty(data).map_err(|e| {
        TutorError::persistence(path, std::io::Error::new(ErrorKind::InvalidData, e))
    })?;

    // Write to temp file first, then rename atomically
    let temp_path = path.with_extension("json.tmp");
    if let Err(e) = write_synced(&temp_path, &json) {
        let _ = fs::remove_file(&temp_path);
        return Err(TutorError::persistence(&temp_path, e));
    }
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        TutorError::persistence(path, e)
    })
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{DateTime, Duration, Local, TimeZone};
    use tempfile::tempdir;

    fn t(secs: i64) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn finished(text: &str, errors: &[(char, u64)]) -> TypingSession {
        let mut s = TypingSession::new(text.into(), Some("home-row".into()), false);
        s.started_at = Some(t(0));
        s.finished_at = Some(t(10));
        s.typed_count = text.chars().count() as u64;
        let missed: u64 = errors.iter().map(|(_, n)| n).sum();
        s.error_count = missed;
        s.correct_count = s.typed_count.saturating_sub(missed);
        s.key_errors = errors.iter().copied().collect();
        s
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::load(dir.path().join("progress.json")).unwrap();
        assert!(store.is_empty());
        assert!(store.key_error_stats().is_empty());
    }

    #[test]
    fn test_load_invalid_json_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.json");
        fs::write(&path, b"{ not json").unwrap();
        assert_matches!(
            ProgressStore::load(&path),
            Err(TutorError::CorruptState { .. })
        );
        // The broken file is left in place for the user to inspect
        assert_eq!(fs::read(&path).unwrap(), b"{ not json");
    }

    #[test]
    fn test_load_unfinished_session_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.json");
        let data = StoreData {
            sessions: vec![TypingSession::new("abc".into(), None, false)],
            key_error_stats: BTreeMap::new(),
        };
        fs::write(&path, serde_json::to_vec(&data).unwrap()).unwrap();
        assert_matches!(
            ProgressStore::load(&path),
            Err(TutorError::CorruptState { reason, .. }) if reason.contains("session 0")
        );
    }

    #[test]
    fn test_append_then_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("progress.json");

        let mut store = ProgressStore::load(&path).unwrap();
        store.append(finished("cat", &[('a', 1)])).unwrap();
        store.append(finished("dog", &[])).unwrap();

        let loaded = ProgressStore::load(&path).unwrap();
        assert_eq!(loaded.history(), store.history());
        assert_eq!(loaded.key_error_stats(), store.key_error_stats());
        assert_eq!(loaded.history()[0].text, "cat");
        assert_eq!(loaded.history()[1].text, "dog");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_key_errors_accumulate() {
        let dir = tempdir().unwrap();
        let mut store = ProgressStore::empty(dir.path().join("p.json"));
        store.append(finished("abcd", &[('a', 2), ('e', 1)])).unwrap();
        store.append(finished("abcd", &[('a', 1), ('t', 3)])).unwrap();

        let expected: BTreeMap<char, u64> = [('a', 3), ('e', 1), ('t', 3)].into_iter().collect();
        assert_eq!(store.key_error_stats(), &expected);
    }

    #[test]
    fn test_merge_order_does_not_matter() {
        let dir = tempdir().unwrap();
        let s1 = finished("abcd", &[('a', 2), ('e', 1)]);
        let s2 = finished("abcd", &[('e', 4), ('z', 1)]);

        let mut forward = ProgressStore::empty(dir.path().join("f.json"));
        forward.append(s1.clone()).unwrap();
        forward.append(s2.clone()).unwrap();

        let mut backward = ProgressStore::empty(dir.path().join("b.json"));
        backward.append(s2).unwrap();
        backward.append(s1).unwrap();

        assert_eq!(forward.key_error_stats(), backward.key_error_stats());
    }

    #[test]
    fn test_append_rejects_unfinished_session() {
        let dir = tempdir().unwrap();
        let mut store = ProgressStore::empty(dir.path().join("p.json"));
        let unfinished = TypingSession::new("abc".into(), None, false);
        assert_matches!(store.append(unfinished), Err(TutorError::InvalidInput(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_failed_append_leaves_memory_untouched() {
        let dir = tempdir().unwrap();
        // A directory where the file should be makes the rename fail
        let path = dir.path().join("progress.json");
        fs::create_dir_all(path.join("occupied")).unwrap();

        let mut store = ProgressStore::empty(&path);
        let err = store.append(finished("cat", &[('a', 1)])).unwrap_err();
        assert!(err.is_retryable());
        assert!(store.is_empty());
        assert!(store.key_error_stats().is_empty());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_load_session_ending_before_start_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.json");
        let mut backwards = finished("cat", &[]);
        backwards.finished_at = Some(t(-5));
        let data = StoreData {
            sessions: vec![finished("dog", &[]), backwards],
            key_error_stats: BTreeMap::new(),
        };
        fs::write(&path, serde_json::to_vec(&data).unwrap()).unwrap();
        assert_matches!(
            ProgressStore::load(&path),
            Err(TutorError::CorruptState { reason, .. }) if reason.contains("session 1")
        );
    }

    #[test]
    fn test_file_layout_has_two_top_level_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p.json");
        let mut store = ProgressStore::empty(&path);
        store.append(finished("cat", &[('a', 1)])).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert!(value["sessions"].is_array());
        assert_eq!(value["key_error_stats"]["a"], 1);
    }
}
