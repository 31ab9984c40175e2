// Library surface for the binary, headless tests and reuse.
// Presentation code (ui) stays in the binary.
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod exercise;
pub mod export;
pub mod keyboard;
pub mod logging;
pub mod metrics;
pub mod recorder;
pub mod runtime;
pub mod session;
pub mod store;
pub mod util;

pub use error::{Result, TutorError};
pub use evaluator::{Evaluation, TypingPolicy};
pub use exercise::Exercise;
pub use recorder::{KeyClock, Keystroke, RecorderState, SessionRecorder};
pub use session::TypingSession;
pub use store::ProgressStore;

/// UI tick interval; also the shortest elapsed time used in rate calculations
pub const TICK_RATE_MS: u64 = 100;
