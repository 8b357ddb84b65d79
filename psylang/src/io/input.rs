//! Input notifications delivered to the host loop.
//!
//! The interpreter only ever sees key names. Where they come from (a window
//! system, a script of timed presses) is decided here.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Error, Result, anyhow};

/// A discrete notification from the host environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    KeyPressed(String),
    QuitRequested,
}

/// Source of input events, polled once per tick.
pub trait InputSource {
    /// Events that arrived up to `now`, in arrival order.
    fn poll(&mut self, now: Duration) -> Vec<InputEvent>;
    /// True when no further events can ever arrive.
    fn is_exhausted(&self) -> bool;
}

/// A timed key press written as `SECS:KEY`, e.g. `1.5:a`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub at: Duration,
    pub key: String,
}

impl FromStr for KeyPress {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let (at, key) = text
            .split_once(':')
            .ok_or_else(|| anyhow!("expected SECS:KEY, got {text:?}"))?;
        if key.is_empty() {
            return Err(anyhow!("missing key name in {text:?}"));
        }
        Ok(Self {
            at: parse_secs(at)?,
            key: key.to_string(),
        })
    }
}

/// Parse a non-negative number of seconds.
pub fn parse_secs(text: &str) -> Result<Duration> {
    let secs: f64 = text
        .trim()
        .parse()
        .with_context(|| format!("invalid seconds {text:?}"))?;
    Duration::try_from_secs_f64(secs).with_context(|| format!("invalid seconds {text:?}"))
}

/// Replays a fixed, time-ordered list of events.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    /// Sorted by time; ties keep insertion order.
    events: Vec<(Duration, InputEvent)>,
    next: usize,
}

impl ScriptedInput {
    pub fn new(presses: Vec<KeyPress>, quit_at: Option<Duration>) -> Self {
        let mut events: Vec<(Duration, InputEvent)> = presses
            .into_iter()
            .map(|press| (press.at, InputEvent::KeyPressed(press.key)))
            .collect();
        if let Some(at) = quit_at {
            events.push((at, InputEvent::QuitRequested));
        }
        events.sort_by_key(|(at, _)| *at);
        Self { events, next: 0 }
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self, now: Duration) -> Vec<InputEvent> {
        let due = self.events[self.next..]
            .iter()
            .take_while(|(at, _)| *at <= now)
            .count();
        let polled = self.events[self.next..self.next + due]
            .iter()
            .map(|(_, event)| event.clone())
            .collect();
        self.next += due;
        polled
    }

    fn is_exhausted(&self) -> bool {
        self.next >= self.events.len()
    }
}
