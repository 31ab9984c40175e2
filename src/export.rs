use serde::Serialize;
use std::io::Write;

use crate::store::ProgressStore;

#[derive(Debug, Serialize)]
struct HistoryRow<'a> {
    date: String,
    lesson: &'a str,
    wpm: String,
    accuracy: String,
    errors: u64,
    backspaces: u64,
    duration_secs: String,
    characters: usize,
    strict: bool,
}

pub const FREE_PRACTICE_LABEL: &str = "free practice";

/// Write the session history as CSV, oldest first, with a header row.
pub fn write_history_csv<W: Write>(store: &ProgressStore, writer: W) -> csv::Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut rows = 0;

    for s in store.history() {
        wtr.serialize(HistoryRow {
            date: s.started_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            lesson: s.lesson.as_deref().unwrap_or(FREE_PRACTICE_LABEL),
            wpm: format!("{:.1}", s.wpm()),
            accuracy: format!("{:.1}", s.accuracy_percent()),
            errors: s.error_count,
            backspaces: s.backspaces,
            duration_secs: format!("{:.1}", s.elapsed_secs()),
            characters: s.text_len(),
            strict: s.strict,
        })?;
        rows += 1;
    }

    wtr.flush()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TypingSession;
    use chrono::{Duration, Local, TimeZone};
    use tempfile::tempdir;

    #[test]
    fn test_csv_has_header_and_rows() {
        let dir = tempdir().unwrap();
        let mut store = ProgressStore::empty(dir.path().join("p.json"));
        let start = Local.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let mut s = TypingSession::new("cat".into(), None, false);
        s.started_at = Some(start);
        s.finished_at = Some(start + Duration::seconds(3));
        s.typed_count = 3;
        s.correct_count = 2;
        s.error_count = 1;
        store.append(s).unwrap();

        let mut out = Vec::new();
        let rows = write_history_csv(&store, &mut out).unwrap();
        assert_eq!(rows, 1);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("date,lesson,wpm,accuracy,errors,backspaces,duration_secs,characters,strict")
        );
        let row = lines.next().unwrap();
        assert!(row.contains(",free practice,8.0,66.7,1,0,3.0,3,false"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_empty_history_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::empty(dir.path().join("p.json"));
        let mut out = Vec::new();
        assert_eq!(write_history_csv(&store, &mut out).unwrap(), 0);
        assert!(out.is_empty());
    }
}
