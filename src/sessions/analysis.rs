// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fit scoring derived from a session's resolved height and public weight.
//!
//! The scoring formula is cosmetic. What matters to the lifecycle is which
//! height gets fed in: the on-chain verified value, else the locally revealed
//! one, else [`FALLBACK_HEIGHT`].

use serde::{Deserialize, Serialize};

use super::types::Session;

pub const FALLBACK_HEIGHT: u32 = 170;
pub const FALLBACK_WEIGHT: u32 = 60;

/// Scores in `[0, 100]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitAnalysis {
    pub comfort: u8,
    pub style_match: u8,
    pub size_accuracy: u8,
    pub recommendation: u8,
    pub trend_score: u8,
}

impl FitAnalysis {
    /// Pure and deterministic
    pub fn analyze(resolved_height: u32, public_weight: u32) -> Self {
        let height = resolved_height as f64;
        let weight = public_weight as f64;

        let base_comfort = ((height * 0.2 + weight * 0.3) * 2.0).round().min(100.0);
        let comfort = base_comfort.clamp(60.0, 95.0);

        let style_match = clamp_score(((resolved_height % 10 + public_weight % 10) * 8) as f64);
        let size_accuracy = clamp_score((100.0 - (height - 170.0).abs() * 0.5).round());
        let recommendation = clamp_score(((comfort + style_match + size_accuracy) / 3.0).round());
        let trend_score = clamp_score(((style_match * 0.6 + comfort * 0.4) * 0.9).round());

        Self {
            comfort: comfort as u8,
            style_match: style_match as u8,
            size_accuracy: size_accuracy as u8,
            recommendation: recommendation as u8,
            trend_score: trend_score as u8,
        }
    }

    pub fn for_session(session: &Session) -> Self {
        Self::analyze(resolve_height(session), resolve_weight(session))
    }
}

fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Dominant height for a session
pub fn resolve_height(session: &Session) -> u32 {
    session.verification.clear_value().unwrap_or(FALLBACK_HEIGHT)
}

pub fn resolve_weight(session: &Session) -> u32 {
    if session.public_field == 0 {
        FALLBACK_WEIGHT
    } else {
        session.public_field
    }
}
