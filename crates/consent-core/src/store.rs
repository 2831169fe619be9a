//! In-memory consent store.
//!
//! Holds consent definitions and per-user grant timestamps for the lifetime
//! of the process. The store answers "does this key exist" and performs raw
//! reads and writes; every business rule lives in [`crate::ConsentLogic`].
//!
//! Both collections sit behind one lock, so each call is atomic on its own.

use crate::{ConsentDefinition, Grants, StoreError, UserRecord};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Where a user stands with one consent at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantState {
    NotGranted,
    Valid,
    Expired,
}

#[derive(Debug, Default)]
struct Collections {
    consents: BTreeMap<String, ConsentDefinition>,
    users: BTreeMap<String, UserRecord>,
}

/// Owner of every consent definition and user record.
#[derive(Debug, Default)]
pub struct ConsentStore {
    inner: RwLock<Collections>,
}

/// Store handle shared between the logic layer and its host.
pub type SharedConsentStore = Arc<ConsentStore>;

impl ConsentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a user record with no grants. Existing users are left untouched.
    ///
    /// Users are seeded by the host process; there is no user-creation
    /// operation in the logic layer.
    pub fn add_user(&self, username: &str) -> bool {
        let mut inner = self.inner.write();
        if inner.users.contains_key(username) {
            return false;
        }
        inner
            .users
            .insert(username.to_string(), UserRecord::new(username));
        true
    }

    /// All known usernames, sorted.
    pub fn list_usernames(&self) -> Vec<String> {
        self.inner.read().users.keys().cloned().collect()
    }

    /// Every registered definition keyed by name.
    pub fn list_consent_definitions(&self) -> BTreeMap<String, ConsentDefinition> {
        self.inner.read().consents.clone()
    }

    pub fn user_exists(&self, username: &str) -> bool {
        self.inner.read().users.contains_key(username)
    }

    pub fn consent_exists(&self, consent_name: &str) -> bool {
        self.inner.read().consents.contains_key(consent_name)
    }

    /// A single definition, if registered.
    pub fn consent_definition(&self, consent_name: &str) -> Option<ConsentDefinition> {
        self.inner.read().consents.get(consent_name).cloned()
    }

    /// A user's grants. Fails if the user is unknown.
    pub fn user_grants(&self, username: &str) -> StoreResult<Grants> {
        self.inner
            .read()
            .users
            .get(username)
            .map(|user| user.grants.clone())
            .ok_or_else(|| StoreError::user(username))
    }

    /// Whether the user holds a grant for `consent_name`, expired or not.
    pub fn user_has_grant(&self, username: &str, consent_name: &str) -> StoreResult<bool> {
        let inner = self.inner.read();
        let user = inner
            .users
            .get(username)
            .ok_or_else(|| StoreError::user(username))?;
        Ok(user.grants.contains_key(consent_name))
    }

    /// `now <= granted_at + validity` for the user's grant of `consent_name`.
    ///
    /// Fails if the user is unknown, holds no such grant, or the grant points
    /// at a definition that was never registered. The last case can only be
    /// produced by writing through [`ConsentStore::add_user_grant`] directly.
    pub fn user_has_valid_grant(
        &self,
        username: &str,
        consent_name: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let inner = self.inner.read();
        let user = inner
            .users
            .get(username)
            .ok_or_else(|| StoreError::user(username))?;
        let granted_at = user
            .granted_at(consent_name)
            .ok_or_else(|| StoreError::grant(consent_name))?;
        let definition = inner
            .consents
            .get(consent_name)
            .ok_or_else(|| StoreError::definition(consent_name))?;
        Ok(definition.is_valid_at(granted_at, now))
    }

    /// Grant presence and validity at `now`, read under a single lock.
    ///
    /// Fails if the user is unknown, or if the user holds a grant whose
    /// definition was never registered.
    pub fn grant_state(
        &self,
        username: &str,
        consent_name: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<GrantState> {
        let inner = self.inner.read();
        let user = inner
            .users
            .get(username)
            .ok_or_else(|| StoreError::user(username))?;
        let Some(granted_at) = user.granted_at(consent_name) else {
            return Ok(GrantState::NotGranted);
        };
        let definition = inner
            .consents
            .get(consent_name)
            .ok_or_else(|| StoreError::definition(consent_name))?;
        if definition.is_valid_at(granted_at, now) {
            Ok(GrantState::Valid)
        } else {
            Ok(GrantState::Expired)
        }
    }

    /// Insert a definition, replacing any earlier one with the same name.
    pub fn add_consent_definition(&self, definition: ConsentDefinition) {
        self.inner
            .write()
            .consents
            .insert(definition.name.clone(), definition);
    }

    /// Record `grants[consent_name] = now` for the user.
    ///
    /// The consent name is not checked against registered definitions.
    pub fn add_user_grant(
        &self,
        username: &str,
        consent_name: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let user = inner
            .users
            .get_mut(username)
            .ok_or_else(|| StoreError::user(username))?;
        user.grant(consent_name, now);
        Ok(())
    }

    /// Remove the user's grant of `consent_name`. Fails if the user is unknown
    /// or does not currently hold the grant.
    pub fn revoke_user_grant(&self, username: &str, consent_name: &str) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let user = inner
            .users
            .get_mut(username)
            .ok_or_else(|| StoreError::user(username))?;
        user.revoke(consent_name)
            .map(|_| ())
            .ok_or_else(|| StoreError::grant(consent_name))
    }

    /// Remove the user's grant of `consent_name` if held, under a single
    /// lock. Returns whether anything was removed; fails only if the user is
    /// unknown.
    pub fn revoke_user_grant_if_present(
        &self,
        username: &str,
        consent_name: &str,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.write();
        let user = inner
            .users
            .get_mut(username)
            .ok_or_else(|| StoreError::user(username))?;
        Ok(user.revoke(consent_name).is_some())
    }
}
