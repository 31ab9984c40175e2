use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

use crate::TICK_RATE_MS;

/// Input delivered to the practice loop
#[derive(Clone, Debug)]
pub enum TutorEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Anything that can hand the loop its next event
pub trait EventSource: Send + 'static {
    /// Wait up to `timeout`; `Err(Timeout)` when nothing arrived.
    fn recv_timeout(&self, timeout: Duration) -> Result<TutorEvent, RecvTimeoutError>;
}

/// Reads the terminal on a helper thread and forwards events over a channel.
/// All session state stays on the thread that owns the [`Runner`].
pub struct TerminalEvents {
    rx: Receiver<TutorEvent>,
}

impl TerminalEvents {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // Windows reports releases too; only presses count as keystrokes
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    tx.send(TutorEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => tx.send(TutorEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for TerminalEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for TerminalEvents {
    fn recv_timeout(&self, timeout: Duration) -> Result<TutorEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Channel-fed source for tests and scripted input
pub struct ChannelEvents {
    rx: Receiver<TutorEvent>,
}

impl ChannelEvents {
    pub fn new(rx: Receiver<TutorEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for ChannelEvents {
    fn recv_timeout(&self, timeout: Duration) -> Result<TutorEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Advances the application one event at a time, substituting a tick when
/// the source stays quiet for a full interval.
pub struct Runner<E: EventSource> {
    events: E,
    tick: Duration,
}

impl<E: EventSource> Runner<E> {
    pub fn new(events: E, tick: Duration) -> Self {
        Self { events, tick }
    }

    pub fn with_default_tick(events: E) -> Self {
        Self::new(events, Duration::from_millis(TICK_RATE_MS))
    }

    pub fn step(&self) -> TutorEvent {
        match self.events.recv_timeout(self.tick) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => TutorEvent::Tick,
        }
    }
}
