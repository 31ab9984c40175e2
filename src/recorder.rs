use chrono::{DateTime, Duration as ChronoDuration, Local};
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{Result, TutorError};
use crate::evaluator::{evaluate, Evaluation, Outcome, TypingPolicy};
use crate::exercise::Exercise;
use crate::session::TypingSession;

/// A key press delivered by the front-end
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keystroke {
    pub typed: char,
    pub at: DateTime<Local>,
}

impl Keystroke {
    pub fn new(typed: char, at: DateTime<Local>) -> Self {
        Self { typed, at }
    }

}

/// Stamps key presses with wall-clock times that never run backwards.
///
/// The wall clock is read once; later stamps add the monotonic time elapsed
/// since then, so a system clock adjustment mid-session cannot reorder keys.
#[derive(Clone, Copy, Debug)]
pub struct KeyClock {
    origin: DateTime<Local>,
    base: Instant,
}

impl KeyClock {
    pub fn new() -> Self {
        Self::starting_at(Local::now())
    }

    pub fn starting_at(origin: DateTime<Local>) -> Self {
        Self {
            origin,
            base: Instant::now(),
        }
    }

    pub fn now(&self) -> DateTime<Local> {
        let elapsed =
            ChronoDuration::from_std(self.base.elapsed()).unwrap_or(ChronoDuration::zero());
        self.origin + elapsed
    }

    pub fn stamp(&self, typed: char) -> Keystroke {
        Keystroke::new(typed, self.now())
    }
}

impl Default for KeyClock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecorderState {
    NotStarted,
    Running,
    Finished,
}

/// Drives one session from the first keystroke to completion.
///
/// Dropping a recorder before it finishes abandons the session; nothing of it
/// is persisted.
#[derive(Debug)]
pub struct SessionRecorder {
    session: TypingSession,
    policy: TypingPolicy,
    state: RecorderState,
    prompt: Vec<char>,
    cursor: usize,
    // Outcome of each position before the cursor
    marks: Vec<Outcome>,
    // Strict mode: the key at the cursor was missed and not yet corrected
    pending_miss: Option<char>,
    // Positions already counted as correct; retyping them after a backspace
    // earns no second credit
    credited: Vec<bool>,
}

impl SessionRecorder {
    pub fn new(exercise: Exercise, policy: TypingPolicy) -> Self {
        let (text, lesson) = exercise.into_parts();
        let prompt: Vec<char> = text.chars().collect();
        Self {
            credited: vec![false; prompt.len()],
            session: TypingSession::new(text, lesson, policy.is_strict()),
            policy,
            state: RecorderState::NotStarted,
            prompt,
            cursor: 0,
            marks: Vec::new(),
            pending_miss: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn policy(&self) -> TypingPolicy {
        self.policy
    }

    pub fn has_started(&self) -> bool {
        self.state != RecorderState::NotStarted
    }

    pub fn has_finished(&self) -> bool {
        self.state == RecorderState::Finished
    }

    /// Live, read-only view for display
    pub fn session(&self) -> &TypingSession {
        &self.session
    }

    pub fn prompt(&self) -> &[char] {
        &self.prompt
    }

    pub fn cursor_pos(&self) -> usize {
        self.cursor
    }

    pub fn marks(&self) -> &[Outcome] {
        &self.marks
    }

    pub fn pending_miss(&self) -> Option<char> {
        self.pending_miss
    }

    pub fn expected_char(&self) -> Option<char> {
        self.prompt.get(self.cursor).copied()
    }

    pub fn live_wpm(&self, now: DateTime<Local>) -> f64 {
        match self.state {
            RecorderState::Finished => self.session.wpm(),
            _ => self.session.wpm_at(now),
        }
    }

    pub fn live_accuracy(&self) -> f64 {
        self.session.accuracy()
    }

    /// Single entry point for key presses.
    pub fn handle_keystroke(&mut self, keystroke: Keystroke) -> Result<Evaluation> {
        match self.state {
            RecorderState::Finished => {
                return Err(TutorError::invalid("session already finished"));
            }
            RecorderState::Running => {
                if let Some(start) = self.session.started_at {
                    if keystroke.at < start {
                        return Err(TutorError::invalid(format!(
                            "keystroke at {} predates session start {}",
                            keystroke.at.to_rfc3339(),
                            start.to_rfc3339()
                        )));
                    }
                }
            }
            RecorderState::NotStarted => {}
        }

        let expected = self
            .expected_char()
            .ok_or_else(|| TutorError::invalid("cursor is past the end of the text"))?;

        if self.state == RecorderState::NotStarted {
            self.session.started_at = Some(keystroke.at);
            self.state = RecorderState::Running;
            debug!(len = self.prompt.len(), strict = self.policy.is_strict(), "session started");
        }

        let evaluation = if self.credited[self.cursor] && evaluate(expected, keystroke.typed) {
            Evaluation {
                is_correct: true,
                advanced: true,
            }
        } else {
            self.policy.apply(&mut self.session, expected, keystroke.typed)
        };
        if evaluation.is_correct {
            self.credited[self.cursor] = true;
        }
        if evaluation.advanced {
            self.marks.push(Outcome::from(evaluation.is_correct));
            self.cursor += 1;
            self.pending_miss = None;
        } else {
            self.pending_miss = Some(keystroke.typed);
        }

        if self.cursor == self.prompt.len() {
            self.session.finished_at = Some(keystroke.at);
            self.state = RecorderState::Finished;
            info!(
                wpm = self.session.wpm(),
                accuracy = self.session.accuracy(),
                errors = self.session.error_count,
                "session finished"
            );
        }

        Ok(evaluation)
    }

    /// Step back one position. Counters are untouched; the backspace itself is
    /// tallied. Ignored in strict mode and outside a running session.
    ///
    /// A position that was already typed correctly is not counted again when
    /// retyped correctly, so `correct_count` never exceeds the text length.
    pub fn backspace(&mut self) -> bool {
        if self.state != RecorderState::Running || !self.policy.allows_backspace() {
            return false;
        }
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.marks.pop();
        self.session.backspaces += 1;
        true
    }

    /// Hand over the frozen session once finished.
    pub fn finalize(self) -> Result<TypingSession> {
        match self.state {
            RecorderState::Finished => Ok(self.session),
            _ => Err(TutorError::invalid("cannot finalize an unfinished session")),
        }
    }
}
