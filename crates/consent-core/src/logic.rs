//! Consent logic - preconditions and validity verdicts over the store.
//!
//! Every consent-specific operation checks, in order, that the user exists
//! and that the consent is registered before touching the store. A failed
//! check aborts the operation with nothing written.

use crate::{
    is_valid_consent_name, Clock, ConsentDefinition, ConsentError, GrantState, Grants, Result,
    SharedConsentStore, SystemClock, Verdict, VerdictReason,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Business rules for consent registration, grants and validity checks.
#[derive(Debug, Clone)]
pub struct ConsentLogic {
    store: SharedConsentStore,
    clock: Arc<dyn Clock>,
}

impl ConsentLogic {
    /// Wrap a store, reading time from the system clock.
    pub fn new(store: SharedConsentStore) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Wrap a store with an explicit time source.
    pub fn with_clock(store: SharedConsentStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The store this logic operates on.
    pub fn store(&self) -> &SharedConsentStore {
        &self.store
    }

    pub fn list_users(&self) -> Vec<String> {
        self.store.list_usernames()
    }

    pub fn list_consents(&self) -> BTreeMap<String, ConsentDefinition> {
        self.store.list_consent_definitions()
    }

    /// All consents the user has been granted, with their grant timestamps.
    pub fn user_consents(&self, username: &str) -> Result<Grants> {
        self.ensure_user(username)?;
        Ok(self.store.user_grants(username)?)
    }

    /// Decide whether `username` currently holds a valid grant of `consent_name`.
    ///
    /// "Not given" wins over "expired", which wins over "given".
    pub fn check_consent_validity(&self, username: &str, consent_name: &str) -> Result<Verdict> {
        self.ensure_user(username)?;
        self.ensure_consent(consent_name)?;
        let now = self.clock.now();

        let reason = match self.store.grant_state(username, consent_name, now)? {
            GrantState::NotGranted => VerdictReason::NotGiven,
            GrantState::Valid => VerdictReason::Given,
            GrantState::Expired => VerdictReason::Expired,
        };

        debug!(
            username,
            consent_name,
            reason = reason.as_str(),
            "{}",
            reason.description()
        );
        Ok(Verdict::new(username, consent_name, reason))
    }

    /// Register (or re-register) a consent definition and hand it back.
    pub fn register_consent(&self, definition: ConsentDefinition) -> Result<ConsentDefinition> {
        if !is_valid_consent_name(&definition.name) {
            warn!(name = %definition.name, "rejected consent registration: invalid name");
            return Err(ConsentError::InvalidName(definition.name));
        }

        info!(
            name = %definition.name,
            validity_secs = definition.validity.as_secs(),
            "consent registered"
        );
        self.store.add_consent_definition(definition.clone());
        Ok(definition)
    }

    /// Grant a consent to a user, refreshing the timestamp if already held.
    pub fn grant_consent(&self, username: &str, consent_name: &str) -> Result<()> {
        self.ensure_user(username)?;
        self.ensure_consent(consent_name)?;
        let now = self.clock.now();

        self.store.add_user_grant(username, consent_name, now)?;
        info!(username, consent_name, granted_at = %now, "consent granted");
        Ok(())
    }

    /// Revoke a consent from a user. Revoking something not held is a no-op.
    pub fn revoke_consent(&self, username: &str, consent_name: &str) -> Result<()> {
        self.ensure_user(username)?;
        self.ensure_consent(consent_name)?;

        if self.store.revoke_user_grant_if_present(username, consent_name)? {
            info!(username, consent_name, "consent revoked");
        } else {
            debug!(username, consent_name, "revoke skipped: consent not held");
        }
        Ok(())
    }

    fn ensure_user(&self, username: &str) -> Result<()> {
        if self.store.user_exists(username) {
            Ok(())
        } else {
            Err(ConsentError::UserNotFound(username.to_string()))
        }
    }

    fn ensure_consent(&self, consent_name: &str) -> Result<()> {
        if self.store.consent_exists(consent_name) {
            Ok(())
        } else {
            Err(ConsentError::ConsentNotFound(consent_name.to_string()))
        }
    }
}
