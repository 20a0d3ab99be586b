//! Backward window iteration
//!
//! Windows tile time backwards from a series' latest timestamp: each window
//! ends where the previous one started.

use crate::TimeWindow;
use chrono::{DateTime, Utc};

/// Iterator over the windows of one series, newest first.
///
/// With an hours limit, the walk stops before the first window that would
/// push the consumed hours past the limit.
#[derive(Debug, Clone)]
pub struct WindowWalker {
    next_end: DateTime<Utc>,
    window_hours: u32,
    hours_consumed: u32,
    hours_limit: Option<u32>,
    exhausted: bool,
}

impl WindowWalker {
    /// Start a walk whose first window ends at `latest`
    pub fn new(latest: DateTime<Utc>, window_hours: u32, hours_limit: Option<u32>) -> Self {
        Self {
            next_end: latest,
            window_hours,
            hours_consumed: 0,
            hours_limit,
            exhausted: window_hours == 0,
        }
    }

    /// Hours covered by the windows yielded so far
    pub fn hours_consumed(&self) -> u32 {
        self.hours_consumed
    }

    /// Whether the walk stopped because of the hours limit
    pub fn limit_reached(&self) -> bool {
        self.hours_limit
            .is_some_and(|limit| self.hours_consumed.saturating_add(self.window_hours) > limit)
    }
}

impl Iterator for WindowWalker {
    type Item = TimeWindow;

    fn next(&mut self) -> Option<TimeWindow> {
        if self.exhausted || self.limit_reached() {
            self.exhausted = true;
            return None;
        }

        let Some(window) = TimeWindow::ending_at(self.next_end, self.window_hours) else {
            self.exhausted = true;
            return None;
        };

        self.hours_consumed += self.window_hours;
        self.next_end = window.start;
        Some(window)
    }
}
