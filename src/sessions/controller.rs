// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session lifecycle controller
//!
//! Sequences the create path (encrypt, then write, then confirm) and the
//! reveal path (decrypt off-chain, then submit the decryption proof on-chain)
//! against the ledger, and keeps one reconciled [`Session`] list.
//!
//! Every change to a session's [`ConfidentialValueState`] goes through
//! [`ConfidentialValueState::reconcile`], so an on-chain verified value can
//! never be replaced by a stale local one and never regresses to `Sealed`.
//!
//! Callers are expected to keep at most one create or reveal in flight per
//! session. Refreshes may overlap with anything; the most recently started
//! refresh wins.

use ethers::types::{Address, Bytes};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

use super::analysis::FitAnalysis;
use super::error::SessionError;
use super::id::SessionIdClock;
use super::status::{
    StatusReporter, TransactionState, DEFAULT_FAILURE_DISPLAY, DEFAULT_SUCCESS_DISPLAY,
};
use super::summary::{filter_by_label, SessionSummary};
use super::types::{CiphertextHandle, ConfidentialValueState, NewSession, Session};
use crate::contracts::ledger::{CreateSessionCall, LedgerError, LedgerStore};
use crate::fhe::{DecryptionVerifier, EncryptionGateway, ProofSubmission};

const ACCESSOR_HINT: u32 = 0;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Registry the ciphertexts and proofs are bound to
    pub contract_address: Address,
    pub success_display: Duration,
    pub failure_display: Duration,
}

impl ControllerConfig {
    pub fn new(contract_address: Address) -> Self {
        Self {
            contract_address,
            success_display: DEFAULT_SUCCESS_DISPLAY,
            failure_display: DEFAULT_FAILURE_DISPLAY,
        }
    }
}

enum Listed {
    Fetched(Session),
    Unreadable(String),
}

#[derive(Default)]
struct SessionBook {
    sessions: Vec<Session>,
    applied_refresh: u64,
}

impl SessionBook {
    fn find(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    /// Fold an observed state into a known session
    fn observe(
        &mut self,
        id: &str,
        observed: ConfidentialValueState,
    ) -> Option<ConfidentialValueState> {
        let session = self.find_mut(id)?;
        let next = session.verification.reconcile(observed);
        if next != session.verification {
            debug!(
                "Session {} verification {:?} -> {:?}",
                id, session.verification, next
            );
        }
        session.verification = next;
        Some(next)
    }

    fn insert(&mut self, session: Session) {
        if self.find(&session.id).is_none() {
            self.sessions.push(session);
        }
    }

    /// Replace the list with a ledger listing, keeping local knowledge the
    /// listing cannot contradict: verified or revealed values, learned
    /// handles, sessions whose read failed, and sessions the listing does
    /// not include yet.
    fn merge_listing(&mut self, listing: Vec<Listed>) {
        let previous_order: Vec<String> = self.sessions.iter().map(|s| s.id.clone()).collect();
        let mut previous: HashMap<String, Session> = self
            .sessions
            .drain(..)
            .map(|s| (s.id.clone(), s))
            .collect();

        let mut seen = HashSet::new();
        let mut merged = Vec::with_capacity(listing.len());

        for entry in listing {
            match entry {
                Listed::Fetched(mut session) => {
                    if !seen.insert(session.id.clone()) {
                        continue;
                    }
                    if let Some(prev) = previous.remove(&session.id) {
                        session.verification = prev.verification.reconcile(session.verification);
                        session.confidential_handle =
                            session.confidential_handle.or(prev.confidential_handle);
                    }
                    merged.push(session);
                }
                Listed::Unreadable(id) => {
                    if !seen.insert(id.clone()) {
                        continue;
                    }
                    if let Some(prev) = previous.remove(&id) {
                        merged.push(prev);
                    }
                }
            }
        }

        for id in previous_order {
            if let Some(prev) = previous.remove(&id) {
                merged.push(prev);
            }
        }

        self.sessions = merged;
    }
}

pub struct SessionLifecycleController {
    config: ControllerConfig,
    ledger: Arc<dyn LedgerStore>,
    gateway: Arc<dyn EncryptionGateway>,
    verifier: Arc<dyn DecryptionVerifier>,
    account: RwLock<Option<Address>>,
    book: RwLock<SessionBook>,
    refresh_tickets: AtomicU64,
    ids: SessionIdClock,
    status: StatusReporter,
}

impl SessionLifecycleController {
    pub fn new(
        config: ControllerConfig,
        ledger: Arc<dyn LedgerStore>,
        gateway: Arc<dyn EncryptionGateway>,
        verifier: Arc<dyn DecryptionVerifier>,
    ) -> Self {
        let status = StatusReporter::new(config.success_display, config.failure_display);
        Self {
            config,
            ledger,
            gateway,
            verifier,
            account: RwLock::new(None),
            book: RwLock::new(SessionBook::default()),
            refresh_tickets: AtomicU64::new(0),
            ids: SessionIdClock::new(),
            status,
        }
    }

    pub fn with_account(mut self, account: Address) -> Self {
        self.account = RwLock::new(Some(account));
        self
    }

    pub async fn connect(&self, account: Address) {
        info!("Account connected: {:?}", account);
        *self.account.write().await = Some(account);
    }

    pub async fn disconnect(&self) {
        info!("Account disconnected");
        *self.account.write().await = None;
    }

    pub async fn account(&self) -> Option<Address> {
        *self.account.read().await
    }

    pub fn contract_address(&self) -> Address {
        self.config.contract_address
    }

    pub fn subscribe_status(&self) -> watch::Receiver<TransactionState> {
        self.status.subscribe()
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.status.current()
    }

    /// Snapshot of the current session list
    pub async fn sessions(&self) -> Vec<Session> {
        self.book.read().await.sessions.clone()
    }

    pub async fn session(&self, id: &str) -> Option<Session> {
        self.book.read().await.find(id).cloned()
    }

    /// Re-read every session from the ledger.
    ///
    /// Never fails: unreadable sessions are skipped (or keep their previous
    /// local copy) and a failed listing leaves the current list in place.
    pub async fn refresh_sessions(&self) -> Vec<Session> {
        let ticket = self.refresh_tickets.fetch_add(1, Ordering::SeqCst) + 1;

        let ids = match self.ledger.list_session_ids().await {
            Ok(ids) => ids,
            Err(err) => {
                error!("Failed to list sessions: {}", err);
                self.status.fail("Failed to load data");
                return self.sessions().await;
            }
        };

        let mut listing = Vec::with_capacity(ids.len());
        let mut failures = 0;
        for id in &ids {
            match self.ledger.get_session(id).await {
                Ok(record) => {
                    listing.push(Listed::Fetched(Session::from_record(id.clone(), record)))
                }
                Err(err) => {
                    warn!("Skipping session {}: {}", id, err);
                    failures += 1;
                    listing.push(Listed::Unreadable(id.clone()));
                }
            }
        }

        if failures > 0 && failures == ids.len() {
            error!("All {} session reads failed", failures);
            self.status.fail("Failed to load data");
        }

        let mut book = self.book.write().await;
        if ticket < book.applied_refresh {
            debug!(
                "Discarding refresh #{}, #{} already applied",
                ticket, book.applied_refresh
            );
            return book.sessions.clone();
        }
        book.applied_refresh = ticket;
        book.merge_listing(listing);

        info!(
            "Loaded {} session(s) ({} unreadable)",
            book.sessions.len(),
            failures
        );
        book.sessions.clone()
    }

    /// Encrypt the secret height, write the session and wait for confirmation.
    ///
    /// Nothing is added to the local list unless the write is confirmed.
    pub async fn create_session(&self, request: NewSession) -> Result<Session, SessionError> {
        let account = self.authenticated().await?;
        self.status.pending("Creating virtual try-on with FHE...");

        match self.submit_new_session(account, &request).await {
            Ok(session) => {
                info!("Created session {} ({})", session.id, session.label);
                self.book.write().await.insert(session.clone());
                self.status.succeed("Virtual try-on created successfully!");

                self.refresh_sessions().await;
                Ok(self.session(&session.id).await.unwrap_or(session))
            }
            Err(err) => {
                error!("Failed to create session {}: {}", request.label, err);
                self.status.fail(err.status_message());
                Err(err)
            }
        }
    }

    async fn submit_new_session(
        &self,
        account: Address,
        request: &NewSession,
    ) -> Result<Session, SessionError> {
        let encrypted = self
            .gateway
            .encrypt(self.config.contract_address, account, request.secret_height)
            .await
            .map_err(SessionError::from_encryption)?;

        let id = self.ids.next_id();
        let tag = request.tag();
        debug!("Encrypted height for session {} -> {:?}", id, encrypted.handle);

        self.status.pending("Waiting for transaction confirmation...");
        let receipt = self
            .ledger
            .create_session(CreateSessionCall {
                id: id.clone(),
                label: request.label.clone(),
                ciphertext: encrypted.handle,
                proof: encrypted.proof,
                public_field: request.public_field,
                accessor_hint: ACCESSOR_HINT,
                tag: tag.clone(),
            })
            .await
            .map_err(SessionError::from_submission)?;
        debug!(
            "Session {} confirmed in tx {:?}",
            id, receipt.transaction_hash
        );

        Ok(Session {
            id,
            label: request.label.clone(),
            created_at: chrono::Utc::now().timestamp().max(0) as u64,
            owner: account,
            public_field: request.public_field,
            accessor_hint: ACCESSOR_HINT,
            tag,
            confidential_handle: None,
            verification: ConfidentialValueState::Sealed,
        })
    }

    /// Reveal the confidential height of `session`.
    ///
    /// - `Ok(Some(v))` with no network call if the session is already
    ///   verified on-chain.
    /// - `Ok(Some(v))` after a confirmed proof submission.
    /// - `Ok(None)` when another party verified it first; the verified value
    ///   is then in the refreshed list, not in the return value.
    pub async fn reveal_session(&self, session: &Session) -> Result<Option<u32>, SessionError> {
        self.authenticated().await?;

        if let ConfidentialValueState::OnChainVerified(value) = self.known_state(session).await {
            debug!("Session {} already verified, reading locally", session.id);
            self.status.succeed("Body data already verified on-chain");
            return Ok(Some(value));
        }

        match self.run_reveal(&session.id).await {
            Ok(value) => Ok(Some(value)),
            Err(SessionError::AlreadyVerified) => {
                info!("Session {} was verified by another party", session.id);
                self.status.succeed("Data is already verified on-chain");
                self.refresh_sessions().await;
                Ok(None)
            }
            Err(err) => {
                error!("Reveal of session {} failed: {}", session.id, err);
                self.status.fail(err.status_message());
                Err(err)
            }
        }
    }

    async fn run_reveal(&self, id: &str) -> Result<u32, SessionError> {
        let record = self.ledger.get_session(id).await.map_err(|e| {
            SessionError::VerificationFailed(format!("could not read session: {}", e))
        })?;
        if record.is_verified {
            let value = record.verified_value;
            self.book
                .write()
                .await
                .observe(id, ConfidentialValueState::OnChainVerified(value));
            self.status.succeed("Body data already verified on-chain");
            return Ok(value);
        }

        let handle = self.ledger.get_confidential_handle(id).await.map_err(|e| {
            SessionError::VerificationFailed(format!("could not read ciphertext handle: {}", e))
        })?;
        self.remember_handle(id, handle).await;

        self.status.pending("Verifying decryption on-chain...");
        let confirmed = Arc::new(AtomicBool::new(false));
        let outcome = self
            .verifier
            .verify(
                &[handle],
                self.config.contract_address,
                self.proof_submission(id, confirmed.clone()),
            )
            .await
            .map_err(SessionError::from_verification)?;

        if !confirmed.load(Ordering::SeqCst) {
            return Err(SessionError::VerificationFailed(
                "verifier returned without submitting the decryption proof".to_string(),
            ));
        }

        let raw = outcome.clear_values.get(&handle).copied().ok_or_else(|| {
            SessionError::VerificationFailed(format!("no clear value for handle {:?}", handle))
        })?;
        let value = u32::try_from(raw).map_err(|_| {
            SessionError::VerificationFailed(format!("clear value {} out of range", raw))
        })?;

        self.book
            .write()
            .await
            .observe(id, ConfidentialValueState::LocallyRevealed(value));
        self.refresh_sessions().await;

        info!("Revealed session {}", id);
        self.status.succeed("Body data decrypted and verified successfully!");
        Ok(value)
    }

    fn proof_submission(&self, id: &str, confirmed: Arc<AtomicBool>) -> ProofSubmission {
        let ledger = self.ledger.clone();
        let id = id.to_string();

        ProofSubmission::new(move |clear_values: Bytes, proof: Bytes| async move {
            let receipt = ledger
                .submit_decryption_proof(&id, clear_values, proof)
                .await?;
            confirmed.store(true, Ordering::SeqCst);
            debug!(
                "Decryption proof for session {} confirmed in tx {:?}",
                id, receipt.transaction_hash
            );
            Ok::<_, LedgerError>(receipt)
        })
    }

    async fn remember_handle(&self, id: &str, handle: CiphertextHandle) {
        if let Some(session) = self.book.write().await.find_mut(id) {
            session.confidential_handle.get_or_insert(handle);
        }
    }

    /// Hide a locally revealed value again. No ledger call is made.
    pub async fn conceal_session(&self, id: &str) -> bool {
        let mut book = self.book.write().await;
        match book.find_mut(id) {
            Some(session) if session.verification.is_revealed_locally() => {
                session.verification = session.verification.conceal();
                debug!("Session {} concealed", id);
                true
            }
            _ => false,
        }
    }

    pub async fn check_availability(&self) -> bool {
        match self.ledger.is_system_available().await {
            Ok(true) => {
                self.status.succeed("FHE virtual try-on system is available");
                true
            }
            Ok(false) => {
                warn!("Registry reports the system as unavailable");
                self.status.fail("FHE virtual try-on system is unavailable");
                false
            }
            Err(err) => {
                error!("Availability check failed: {}", err);
                self.status.fail("Availability check failed");
                false
            }
        }
    }

    pub async fn summary(&self, now: u64) -> SessionSummary {
        SessionSummary::from_sessions(&self.book.read().await.sessions, now)
    }

    pub async fn search(&self, term: &str) -> Vec<Session> {
        filter_by_label(&self.book.read().await.sessions, term)
    }

    pub async fn analyze(&self, id: &str) -> Option<FitAnalysis> {
        self.session(id).await.map(|s| FitAnalysis::for_session(&s))
    }

    async fn known_state(&self, session: &Session) -> ConfidentialValueState {
        match self.book.read().await.find(&session.id) {
            Some(known) => known.verification.reconcile(session.verification),
            None => session.verification,
        }
    }

    async fn authenticated(&self) -> Result<Address, SessionError> {
        match *self.account.read().await {
            Some(account) => Ok(account),
            None => {
                warn!("Operation requires a connected account");
                self.status.fail(SessionError::NotAuthenticated.status_message());
                Err(SessionError::NotAuthenticated)
            }
        }
    }
}
