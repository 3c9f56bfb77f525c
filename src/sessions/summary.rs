// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use super::types::Session;

/// Window used to count recently created sessions
pub const RECENT_WINDOW_SECS: u64 = 60 * 60 * 24 * 7;

/// Dashboard statistics over the loaded session list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total: usize,
    pub verified: usize,
    pub average_public_field: f64,
    /// Sessions created within [`RECENT_WINDOW_SECS`] of `now`
    pub recent: usize,
}

impl SessionSummary {
    pub fn from_sessions(sessions: &[Session], now: u64) -> Self {
        let total = sessions.len();
        let verified = sessions
            .iter()
            .filter(|s| s.verification.is_verified())
            .count();
        let average_public_field = if total == 0 {
            0.0
        } else {
            sessions.iter().map(|s| s.public_field as f64).sum::<f64>() / total as f64
        };
        let recent = sessions
            .iter()
            .filter(|s| now.saturating_sub(s.created_at) < RECENT_WINDOW_SECS)
            .count();

        Self {
            total,
            verified,
            average_public_field,
            recent,
        }
    }
}

/// Case-insensitive label filter; an empty term matches everything
pub fn filter_by_label(sessions: &[Session], term: &str) -> Vec<Session> {
    let needle = term.trim().to_lowercase();
    sessions
        .iter()
        .filter(|s| needle.is_empty() || s.label.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
