//! Record types held by the store and returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Seconds in one day, used when folding a `days` component into a validity.
pub const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Consent name → instant the consent was granted.
pub type Grants = BTreeMap<String, DateTime<Utc>>;

/// A registered consent category and how long a grant of it stays valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentDefinition {
    pub name: String,
    /// Zero means a grant expires the instant after it is made.
    #[serde(rename = "validity_secs", with = "validity_secs")]
    pub validity: Duration,
}

impl ConsentDefinition {
    pub fn new(name: impl Into<String>, validity: Duration) -> Self {
        Self {
            name: name.into(),
            validity,
        }
    }

    /// Build a definition from separate `seconds` and `days` components,
    /// which are summed.
    pub fn from_parts(name: impl Into<String>, seconds: u64, days: u64) -> Self {
        let total = seconds.saturating_add(days.saturating_mul(SECS_PER_DAY));
        Self::new(name, Duration::from_secs(total))
    }

    /// Like [`ConsentDefinition::from_parts`], but either component may be
    /// negative as long as their sum is not.
    ///
    /// `None` when the total is negative or does not fit.
    pub fn from_signed_parts(name: impl Into<String>, seconds: i64, days: i64) -> Option<Self> {
        let total = days
            .checked_mul(SECS_PER_DAY as i64)?
            .checked_add(seconds)?;
        let total = u64::try_from(total).ok()?;
        Some(Self::new(name, Duration::from_secs(total)))
    }

    /// Instant after which a grant made at `granted_at` is expired.
    ///
    /// `None` when the sum does not fit in a timestamp; such a grant never
    /// expires.
    pub fn expires_at(&self, granted_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let validity = chrono::Duration::from_std(self.validity).ok()?;
        granted_at.checked_add_signed(validity)
    }

    /// `now <= granted_at + validity`
    pub fn is_valid_at(&self, granted_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.expires_at(granted_at) {
            Some(expires_at) => now <= expires_at,
            None => true,
        }
    }
}

/// Returns true when `name` is one or more characters, each alphanumeric or `_`.
pub fn is_valid_consent_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// A known user and the consents they currently hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    #[serde(default)]
    pub grants: Grants,
}

impl UserRecord {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            grants: Grants::new(),
        }
    }

    pub fn granted_at(&self, consent_name: &str) -> Option<DateTime<Utc>> {
        self.grants.get(consent_name).copied()
    }

    /// Record a grant, replacing any earlier timestamp for the same consent.
    pub fn grant(&mut self, consent_name: &str, at: DateTime<Utc>) {
        self.grants.insert(consent_name.to_string(), at);
    }

    /// Drop a grant, returning when it had been made.
    pub fn revoke(&mut self, consent_name: &str) -> Option<DateTime<Utc>> {
        self.grants.remove(consent_name)
    }
}

/// Why a validity check came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerdictReason {
    #[serde(rename = "not given")]
    NotGiven,
    #[serde(rename = "expired")]
    Expired,
    #[serde(rename = "given")]
    Given,
}

impl VerdictReason {
    /// Short machine-facing label, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictReason::NotGiven => "not given",
            VerdictReason::Expired => "expired",
            VerdictReason::Given => "given",
        }
    }

    /// Human-readable sentence for display.
    pub fn description(&self) -> &'static str {
        match self {
            VerdictReason::NotGiven => "User has not given consent",
            VerdictReason::Expired => "User consent has expired",
            VerdictReason::Given => "User has given consent",
        }
    }
}

/// Outcome of checking one consent for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub username: String,
    pub consent_name: String,
    pub valid: bool,
    pub reason: VerdictReason,
}

impl Verdict {
    pub fn new(username: &str, consent_name: &str, reason: VerdictReason) -> Self {
        Self {
            username: username.to_string(),
            consent_name: consent_name.to_string(),
            valid: reason == VerdictReason::Given,
            reason,
        }
    }
}

mod validity_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(validity: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(validity.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
