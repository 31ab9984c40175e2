//! Read-only statistics derived from a [`ProgressStore`] snapshot.
//!
//! Nothing here mutates the store or keeps state of its own; presentation
//! code calls these on demand.

use chrono::{DateTime, Local};
use itertools::Itertools;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::keyboard::{finger_for, Finger};
use crate::session::TypingSession;
use crate::store::ProgressStore;
use crate::util::{mean, std_dev};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub wpm: f64,
    pub accuracy: f64,
}

impl From<&TypingSession> for TrendPoint {
    fn from(s: &TypingSession) -> Self {
        Self {
            wpm: s.wpm(),
            accuracy: s.accuracy(),
        }
    }
}

impl From<TrendPoint> for (f64, f64) {
    fn from(p: TrendPoint) -> Self {
        (p.wpm, p.accuracy)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LessonAverage {
    /// `None` groups free-practice sessions
    pub lesson: Option<String>,
    pub average_wpm: f64,
    pub sessions: usize,
    pub last_practiced: Option<DateTime<Local>>,
}

/// Overall numbers for the statistics view
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_sessions: usize,
    pub total_secs: f64,
    pub total_chars: usize,
    pub average_wpm: f64,
    pub average_accuracy: f64,
    pub wpm_std_dev: f64,
    pub total_backspaces: u64,
    pub best_wpm: Option<TypingSession>,
    pub best_accuracy: Option<TypingSession>,
    pub practice_days: usize,
    pub most_practiced: Option<(Option<String>, usize)>,
    pub weakest_lesson: Option<LessonAverage>,
}

/// Lessons need this many sessions before they can be called weakest
pub const WEAKEST_MIN_SESSIONS: usize = 2;

/// Last `n` sessions as `(wpm, accuracy)`, oldest first
pub fn recent_trend(store: &ProgressStore, n: usize) -> Vec<TrendPoint> {
    let history = store.history();
    let skip = history.len().saturating_sub(n);
    history[skip..].iter().map(TrendPoint::from).collect()
}

/// Average WPM per lesson, best first. Equal averages put the most recently
/// practised lesson first, then order by lesson name.
pub fn per_lesson_averages(store: &ProgressStore) -> Vec<LessonAverage> {
    let mut groups: HashMap<Option<&str>, Vec<&TypingSession>> = HashMap::new();
    for s in store.history() {
        groups.entry(s.lesson.as_deref()).or_default().push(s);
    }

    groups
        .into_iter()
        .map(|(lesson, sessions)| {
            let wpms: Vec<f64> = sessions.iter().map(|s| s.wpm()).collect();
            LessonAverage {
                lesson: lesson.map(str::to_string),
                average_wpm: mean(&wpms).unwrap_or(0.0),
                sessions: sessions.len(),
                last_practiced: sessions.iter().filter_map(|s| s.finished_at).max(),
            }
        })
        .sorted_by(|a, b| {
            b.average_wpm
                .partial_cmp(&a.average_wpm)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.last_practiced.cmp(&a.last_practiced))
                .then_with(|| a.lesson.cmp(&b.lesson))
        })
        .collect()
}

/// Highest WPM reached in each lesson
pub fn best_wpm_by_lesson(store: &ProgressStore) -> BTreeMap<Option<String>, f64> {
    let mut best: BTreeMap<Option<String>, f64> = BTreeMap::new();
    for s in store.history() {
        let entry = best.entry(s.lesson.clone()).or_insert(0.0);
        *entry = entry.max(s.wpm());
    }
    best
}

/// Most-missed keys, highest count first; equal counts order by key.
pub fn top_problem_keys(store: &ProgressStore, n: usize) -> Vec<(char, u64)> {
    store
        .key_error_stats()
        .iter()
        .map(|(k, v)| (*k, *v))
        .sorted_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)))
        .take(n)
        .collect()
}

/// Key errors summed per finger, highest first. Keys off the touch-typing map are skipped.
pub fn finger_errors(store: &ProgressStore) -> Vec<(Finger, u64)> {
    let mut totals: BTreeMap<Finger, u64> = BTreeMap::new();
    for (key, count) in store.key_error_stats() {
        if let Some(finger) = finger_for(*key) {
            *totals.entry(finger).or_insert(0) += count;
        }
    }
    totals
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .sorted_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)))
        .collect()
}

pub fn summary(store: &ProgressStore) -> Summary {
    let history = store.history();
    let wpms: Vec<f64> = history.iter().map(|s| s.wpm()).collect();
    let accuracies: Vec<f64> = history.iter().map(|s| s.accuracy()).collect();

    let best_by = |metric: fn(&TypingSession) -> f64| {
        history
            .iter()
            .max_by(|a, b| metric(*a).partial_cmp(&metric(*b)).unwrap_or(Ordering::Equal))
            .cloned()
    };

    let practice_days = history
        .iter()
        .filter_map(|s| s.started_at.map(|t| t.date_naive()))
        .unique()
        .count();

    let most_practiced = history
        .iter()
        .map(|s| s.lesson.clone())
        .counts()
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)));

    let weakest_lesson = per_lesson_averages(store)
        .into_iter()
        .filter(|l| l.sessions >= WEAKEST_MIN_SESSIONS)
        .last();

    Summary {
        total_sessions: history.len(),
        total_secs: history.iter().map(|s| s.elapsed_secs()).sum(),
        total_chars: history.iter().map(|s| s.text_len()).sum(),
        average_wpm: mean(&wpms).unwrap_or(0.0),
        average_accuracy: mean(&accuracies).unwrap_or(0.0),
        wpm_std_dev: std_dev(&wpms).unwrap_or(0.0),
        total_backspaces: history.iter().map(|s| s.backspaces).sum(),
        best_wpm: best_by(TypingSession::wpm),
        best_accuracy: best_by(TypingSession::accuracy),
        practice_days,
        most_practiced,
        weakest_lesson,
    }
}
