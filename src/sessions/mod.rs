// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod analysis;
pub mod controller;
pub mod error;
pub mod id;
pub mod status;
pub mod summary;
pub mod types;

pub use analysis::FitAnalysis;
pub use controller::{ControllerConfig, SessionLifecycleController};
pub use error::SessionError;
pub use status::{StatusReporter, TransactionState};
pub use summary::SessionSummary;
pub use types::{CiphertextHandle, ConfidentialValueState, NewSession, Session, SessionRecord};
