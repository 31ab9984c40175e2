use rand::seq::SliceRandom;

use crate::error::{Result, TutorError};

/// Reference text handed to a session, plus an opaque lesson tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exercise {
    text: String,
    lesson: Option<String>,
}

impl Exercise {
    pub fn new(text: impl Into<String>, lesson: Option<String>) -> Result<Self> {
        let text = text.into();
        if text.is_empty() {
            return Err(TutorError::invalid("reference text must not be empty"));
        }
        Ok(Self { text, lesson })
    }

    /// Free practice on arbitrary text, not attached to a lesson
    pub fn free(text: impl Into<String>) -> Result<Self> {
        Self::new(text, None)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lesson(&self) -> Option<&str> {
        self.lesson.as_deref()
    }

    pub fn into_parts(self) -> (String, Option<String>) {
        (self.text, self.lesson)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Lesson {
    pub id: &'static str,
    pub title: &'static str,
    pub texts: &'static [&'static str],
}

pub const LESSONS: &[Lesson] = &[
    Lesson {
        id: "home-row",
        title: "Home Row",
        texts: &[
            "asdf jkl; asdf jkl; asdf jkl;",
            "sad lad fad jak ask fall",
            "a sad lass asks a lad",
        ],
    },
    Lesson {
        id: "top-row",
        title: "Top Row",
        texts: &["qwer uiop qwer uiop", "ripe wire pier quip", "a wise old owl sees all"],
    },
    Lesson {
        id: "bottom-row",
        title: "Bottom Row",
        texts: &["zxcv bnm zxcv bnm", "cave maze calm", "a brave man came back"],
    },
    Lesson {
        id: "sentences",
        title: "Sentences",
        texts: &[
            "The quick brown fox jumps over the lazy dog.",
            "Pack my box with five dozen liquor jugs.",
            "How vexingly quick daft zebras jump!",
        ],
    },
];

pub fn find_lesson(id: &str) -> Option<&'static Lesson> {
    LESSONS.iter().find(|l| l.id.eq_ignore_ascii_case(id))
}

impl Lesson {
    /// Pick one of the lesson's texts at random
    pub fn exercise(&self) -> Result<Exercise> {
        let mut rng = rand::thread_rng();
        let text = self
            .texts
            .choose(&mut rng)
            .ok_or_else(|| TutorError::invalid(format!("lesson {} has no texts", self.id)))?;
        Exercise::new(*text, Some(self.id.to_string()))
    }
}
