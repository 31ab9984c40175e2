use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::TICK_RATE_MS;

/// Characters per "word" in the standard WPM formula
pub const CHARS_PER_WORD: f64 = 5.0;

/// Shortest elapsed time used for rate calculations; one UI tick.
pub const MIN_ELAPSED_SECS: f64 = TICK_RATE_MS as f64 / 1000.0;

/// One practice run against a single reference text.
///
/// Counters only grow. Once `finished_at` is set the recorder stops mutating
/// the session and it is handed to the progress store as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingSession {
    pub text: String,
    #[serde(default)]
    pub lesson: Option<String>,
    #[serde(default)]
    pub strict: bool,
    pub started_at: Option<DateTime<Local>>,
    pub finished_at: Option<DateTime<Local>>,
    pub typed_count: u64,
    pub correct_count: u64,
    pub error_count: u64,
    #[serde(default)]
    pub backspaces: u64,
    #[serde(default)]
    pub key_errors: BTreeMap<char, u64>,
}

impl TypingSession {
    pub fn new(text: String, lesson: Option<String>, strict: bool) -> Self {
        Self {
            text,
            lesson,
            strict,
            started_at: None,
            finished_at: None,
            typed_count: 0,
            correct_count: 0,
            error_count: 0,
            backspaces: 0,
            key_errors: BTreeMap::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.started_at.is_some() && self.finished_at.is_some()
    }

    /// Reference text length in characters
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Keystrokes that were classified, whatever the counting policy.
    /// Equals `typed_count` outside strict mode.
    pub fn attempts(&self) -> u64 {
        self.correct_count + self.error_count
    }

    /// Seconds between start and `now`, never below one tick.
    /// Zero when the session has not started.
    pub fn elapsed_secs_at(&self, now: DateTime<Local>) -> f64 {
        match self.started_at {
            Some(start) => {
                let secs = (now - start).num_milliseconds() as f64 / 1000.0;
                secs.max(MIN_ELAPSED_SECS)
            }
            None => 0.0,
        }
    }

    /// Authoritative elapsed time of a finished session
    pub fn elapsed_secs(&self) -> f64 {
        match self.finished_at {
            Some(end) => self.elapsed_secs_at(end),
            None => 0.0,
        }
    }

    pub fn wpm_at(&self, now: DateTime<Local>) -> f64 {
        wpm(self.correct_count, self.elapsed_secs_at(now))
    }

    /// Final words-per-minute; zero until the session is finished.
    pub fn wpm(&self) -> f64 {
        match self.finished_at {
            Some(end) => self.wpm_at(end),
            None => 0.0,
        }
    }

    /// Ratio of correct keystrokes in `[0, 1]`
    pub fn accuracy(&self) -> f64 {
        match self.attempts() {
            0 => 0.0,
            attempts => self.correct_count as f64 / attempts as f64,
        }
    }

    pub fn accuracy_percent(&self) -> f64 {
        self.accuracy() * 100.0
    }

    /// `wpm()` less `penalty` words per minute for every backspace, floored at zero.
    pub fn adjusted_wpm(&self, penalty: f64) -> f64 {
        (self.wpm() - self.backspaces as f64 * penalty).max(0.0)
    }

    /// `accuracy()` with each backspace counted as `weight` of an error.
    pub fn adjusted_accuracy(&self, weight: f64) -> f64 {
        match self.attempts() {
            0 => 0.0,
            attempts => {
                let penalty = self.backspaces as f64 * weight;
                (self.correct_count as f64 - penalty).max(0.0) / attempts as f64
            }
        }
    }
}

/// `(correct / 5) / (elapsed / 60)`; elapsed is clamped so the result stays finite.
pub fn wpm(correct_chars: u64, elapsed_secs: f64) -> f64 {
    if correct_chars == 0 {
        return 0.0;
    }
    let secs = elapsed_secs.max(MIN_ELAPSED_SECS);
    // Multiply first so whole-second cases come out exact.
    (correct_chars as f64 * 60.0) / (CHARS_PER_WORD * secs)
}
