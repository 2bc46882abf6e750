use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Local};
use shared::domain::DateCursor;

/// Injected time source so "today" is controllable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Date-bounded navigation cursor over `[start, today]`.
///
/// The upper bound is never stored: it is recomputed from the clock on
/// every `next()` call, so a step blocked at the bound yesterday can
/// succeed once real midnight has passed. `previous`/`next` are the
/// only mutation paths, and both clamp into the valid range.
pub struct Timeline {
    start: DateCursor,
    current: DateCursor,
    clock: Arc<dyn Clock>,
}

impl Timeline {
    /// `start_key` is the earliest day the remote archive has content.
    /// Failing to parse it is a fatal configuration error: the viewer
    /// cannot run without a valid lower bound.
    pub fn new(start_key: &str, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let start = DateCursor::parse_key(start_key)
            .with_context(|| format!("invalid archive start date '{start_key}'"))?;
        let today = DateCursor::new(clock.now());
        anyhow::ensure!(
            start <= today,
            "archive start {start} lies in the future"
        );
        let timeline = Self {
            start,
            current: today,
            clock,
        };
        timeline.assert_bounds();
        Ok(timeline)
    }

    /// Replaces the default "today" starting position, clamped into
    /// the navigable range.
    pub fn with_current(mut self, key: &str) -> anyhow::Result<Self> {
        let cursor = DateCursor::parse_key(key)
            .with_context(|| format!("invalid start position '{key}'"))?;
        self.current = cursor.max(self.start).min(self.end());
        self.assert_bounds();
        Ok(self)
    }

    pub fn start(&self) -> DateCursor {
        self.start
    }

    pub fn current(&self) -> DateCursor {
        self.current
    }

    /// The upper navigation bound, computed fresh from the clock.
    pub fn end(&self) -> DateCursor {
        DateCursor::new(self.clock.now())
    }

    /// The current cursor formatted as the strip's date key.
    pub fn position(&self) -> String {
        self.current.key()
    }

    /// Step one day back, clamping at the archive start. Repeated
    /// calls at the bound are no-ops.
    pub fn previous(&mut self) -> DateCursor {
        self.current = self.current.pred().max(self.start);
        self.assert_bounds();
        self.current
    }

    /// Step one day forward, clamping at today.
    pub fn next(&mut self) -> DateCursor {
        self.current = self.current.succ().min(self.end());
        self.assert_bounds();
        self.current
    }

    fn assert_bounds(&self) {
        debug_assert!(
            self.start <= self.current && self.current <= self.end(),
            "timeline bounds violated: start={} current={} end={}",
            self.start,
            self.current,
            self.end()
        );
    }
}
