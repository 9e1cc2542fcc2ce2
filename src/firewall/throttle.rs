// Zonekeeper - Call Throttle
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Minimum spacing between mutating bus calls.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Blocks a caller until at least `min_gap` has passed since the previous call.
#[derive(Debug)]
pub struct CallThrottle {
    min_gap: Duration,
    last: Mutex<Option<Instant>>,
}

impl CallThrottle {
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last: Mutex::new(None),
        }
    }

    /// What is left of the gap after a call made at `last`.
    fn remaining(&self, last: Option<Instant>) -> Duration {
        match last {
            Some(at) => self.min_gap.saturating_sub(at.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Sleep for the rest of the gap, if any, then record this call.
    pub fn wait(&self) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let remaining = self.remaining(*last);
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_call_does_not_wait() {
        let throttle = CallThrottle::new(Duration::from_secs(60));
        assert_eq!(throttle.remaining(None), Duration::ZERO);
        let start = Instant::now();
        throttle.wait();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_second_call_is_spaced() {
        let throttle = CallThrottle::new(Duration::from_millis(40));
        throttle.wait();
        let start = Instant::now();
        throttle.wait();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_no_wait_after_gap_elapsed() {
        let throttle = CallThrottle::new(Duration::from_millis(5));
        throttle.wait();
        thread::sleep(Duration::from_millis(20));
        let last = *throttle.last.lock().unwrap();
        assert_eq!(throttle.remaining(last), Duration::ZERO);
    }
}
