// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Single-slot transaction status
//!
//! The controller reports the progress of its most recent asynchronous
//! operation through a [`TransactionState`]. Subscribers receive it via a
//! `tokio::sync::watch` channel. A new report overwrites the previous one and
//! terminal states fall back to `Idle` after a display delay. This is a
//! presentation contract only; nothing in the controller reads it back.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

pub const DEFAULT_SUCCESS_DISPLAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_FAILURE_DISPLAY: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum TransactionState {
    Idle,
    Pending(String),
    Succeeded(String),
    Failed(String),
}

impl Default for TransactionState {
    fn default() -> Self {
        TransactionState::Idle
    }
}

impl TransactionState {
    pub fn message(&self) -> Option<&str> {
        match self {
            TransactionState::Idle => None,
            TransactionState::Pending(m)
            | TransactionState::Succeeded(m)
            | TransactionState::Failed(m) => Some(m),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::Succeeded(_) | TransactionState::Failed(_)
        )
    }
}

/// Publisher side of the status slot
pub struct StatusReporter {
    sender: Arc<watch::Sender<TransactionState>>,
    generation: Arc<AtomicU64>,
    success_display: Duration,
    failure_display: Duration,
}

impl StatusReporter {
    pub fn new(success_display: Duration, failure_display: Duration) -> Self {
        let (sender, _) = watch::channel(TransactionState::Idle);
        Self {
            sender: Arc::new(sender),
            generation: Arc::new(AtomicU64::new(0)),
            success_display,
            failure_display,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TransactionState> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> TransactionState {
        self.sender.borrow().clone()
    }

    pub fn pending(&self, message: impl Into<String>) {
        self.publish(TransactionState::Pending(message.into()));
    }

    pub fn succeed(&self, message: impl Into<String>) {
        let generation = self.publish(TransactionState::Succeeded(message.into()));
        self.schedule_reset(generation, self.success_display);
    }

    pub fn fail(&self, message: impl Into<String>) {
        let generation = self.publish(TransactionState::Failed(message.into()));
        self.schedule_reset(generation, self.failure_display);
    }

    fn publish(&self, state: TransactionState) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Transaction status -> {:?}", state);
        self.sender.send_replace(state);
        generation
    }

    // Clears the slot unless a newer report replaced it in the meantime.
    fn schedule_reset(&self, generation: u64, delay: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let sender = self.sender.clone();
        let current = self.generation.clone();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if current.load(Ordering::SeqCst) == generation {
                sender.send_replace(TransactionState::Idle);
            }
        });
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new(DEFAULT_SUCCESS_DISPLAY, DEFAULT_FAILURE_DISPLAY)
    }
}
