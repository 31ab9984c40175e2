use crate::session::TypingSession;

/// Result of classifying a single keystroke
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Evaluation {
    pub is_correct: bool,
    /// Whether the cursor moves past the expected character
    pub advanced: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
}

impl From<bool> for Outcome {
    fn from(is_correct: bool) -> Self {
        if is_correct {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        }
    }
}

/// Counting policy for a session, fixed when the session starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TypingPolicy {
    /// Every keystroke is counted and advances the cursor.
    #[default]
    Normal,
    /// Mistakes are tallied but not accepted; the same position must be
    /// typed correctly before moving on. `typed_count` counts accepted keys.
    Strict,
}

impl TypingPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            TypingPolicy::Strict
        } else {
            TypingPolicy::Normal
        }
    }

    pub fn is_strict(self) -> bool {
        self == TypingPolicy::Strict
    }

    pub fn allows_backspace(self) -> bool {
        !self.is_strict()
    }

    /// Classify `typed` against `expected` and update the session counters.
    pub fn apply(self, session: &mut TypingSession, expected: char, typed: char) -> Evaluation {
        let is_correct = evaluate(expected, typed);
        match self {
            TypingPolicy::Normal => write_normal(session, expected, is_correct),
            TypingPolicy::Strict => write_strict(session, expected, is_correct),
        }
    }
}

/// Exact, case-sensitive comparison. Whitespace and punctuation are keys like any other.
pub fn evaluate(expected: char, typed: char) -> bool {
    expected == typed
}

/// Key a miss is charged to: the expected key, folded to lower case so that
/// shifted and unshifted presses of one physical key share a tally.
pub fn key_id(expected: char) -> char {
    expected.to_lowercase().next().unwrap_or(expected)
}

fn record_miss(session: &mut TypingSession, expected: char) {
    session.error_count += 1;
    *session.key_errors.entry(key_id(expected)).or_insert(0) += 1;
}

fn write_normal(session: &mut TypingSession, expected: char, is_correct: bool) -> Evaluation {
    session.typed_count += 1;
    if is_correct {
        session.correct_count += 1;
    } else {
        record_miss(session, expected);
    }
    Evaluation {
        is_correct,
        advanced: true,
    }
}

fn write_strict(session: &mut TypingSession, expected: char, is_correct: bool) -> Evaluation {
    if is_correct {
        session.typed_count += 1;
        session.correct_count += 1;
    } else {
        // Not accepted: cursor stays for retry
        record_miss(session, expected);
    }
    Evaluation {
        is_correct,
        advanced: is_correct,
    }
}
