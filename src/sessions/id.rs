// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::sync::atomic::{AtomicU64, Ordering};

pub const SESSION_ID_PREFIX: &str = "tryon-";

/// Hands out `tryon-<millis>` ids that strictly increase within the process,
/// even when two sessions are created in the same millisecond.
#[derive(Debug, Default)]
pub struct SessionIdClock {
    last: AtomicU64,
}

impl SessionIdClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        format!("{}{}", SESSION_ID_PREFIX, self.next_tick(now))
    }

    fn next_tick(&self, now: u64) -> u64 {
        let mut last = self.last.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last
                .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}
