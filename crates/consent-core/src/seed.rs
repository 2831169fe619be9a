//! Seed data used to populate a fresh store at process start.
//!
//! The store does not outlive the process, so every run begins by applying a
//! [`SeedData`] set: either one read from configuration or [`SeedData::sample`].

use crate::{
    is_valid_consent_name, ConsentDefinition, ConsentError, ConsentStore, Result,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A consent definition as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedConsent {
    pub name: String,
    #[serde(default)]
    pub seconds: u64,
    #[serde(default)]
    pub days: u64,
}

impl SeedConsent {
    pub fn new(name: &str, seconds: u64, days: u64) -> Self {
        Self {
            name: name.to_string(),
            seconds,
            days,
        }
    }

    pub fn to_definition(&self) -> ConsentDefinition {
        ConsentDefinition::from_parts(self.name.clone(), self.seconds, self.days)
    }
}

/// A user and the consents they start out holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedUser {
    pub username: String,
    #[serde(default)]
    pub grants: Vec<String>,
}

impl SeedUser {
    pub fn new(username: &str, grants: &[&str]) -> Self {
        Self {
            username: username.to_string(),
            grants: grants.iter().map(|g| g.to_string()).collect(),
        }
    }
}

/// Initial definitions and users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub consents: Vec<SeedConsent>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

impl SeedData {
    /// The demo data set: three consents and five users.
    pub fn sample() -> Self {
        Self {
            consents: vec![
                SeedConsent::new("telemarketing", 2 * 60, 0),
                SeedConsent::new("promotions", 0, 7),
                SeedConsent::new("catalogues", 10, 0),
            ],
            users: vec![
                SeedUser::new("John", &["telemarketing", "catalogues"]),
                SeedUser::new("Linda", &[]),
                SeedUser::new("Maria", &[]),
                SeedUser::new("Mike", &[]),
                SeedUser::new("Wayne", &["telemarketing", "catalogues", "promotions"]),
            ],
        }
    }

    /// Check the whole set without writing anything.
    ///
    /// Consent names follow the registration rule, and every seeded grant must
    /// name a consent defined in the same set.
    pub fn validate(&self) -> Result<()> {
        for consent in &self.consents {
            if !is_valid_consent_name(&consent.name) {
                return Err(ConsentError::InvalidName(consent.name.clone()));
            }
        }
        for user in &self.users {
            for grant in &user.grants {
                if !self.consents.iter().any(|c| &c.name == grant) {
                    return Err(ConsentError::ConsentNotFound(grant.clone()));
                }
            }
        }
        Ok(())
    }

    /// Validate, then load definitions, users and grants (stamped `now`).
    pub fn apply(&self, store: &ConsentStore, now: DateTime<Utc>) -> Result<()> {
        self.validate()?;

        for consent in &self.consents {
            store.add_consent_definition(consent.to_definition());
        }
        for user in &self.users {
            store.add_user(&user.username);
            for grant in &user.grants {
                store.add_user_grant(&user.username, grant, now)?;
            }
        }

        info!(
            consents = self.consents.len(),
            users = self.users.len(),
            "seed data applied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_sample_seed_applies() {
        let store = ConsentStore::new();
        let now = Utc::now();
        SeedData::sample().apply(&store, now).unwrap();

        assert_eq!(store.list_usernames(), vec!["John", "Linda", "Maria", "Mike", "Wayne"]);
        assert_eq!(
            store.consent_definition("telemarketing").unwrap().validity,
            Duration::from_secs(120)
        );
        assert_eq!(store.user_grants("Wayne").unwrap().len(), 3);
        assert!(store.user_grants("Linda").unwrap().is_empty());
        assert_eq!(store.user_grants("John").unwrap().get("catalogues"), Some(&now));
    }

    #[test]
    fn test_seed_rejects_unknown_grant() {
        let seed = SeedData {
            consents: vec![SeedConsent::new("promotions", 0, 1)],
            users: vec![SeedUser::new("John", &["telemarketing"])],
        };
        let store = ConsentStore::new();

        assert_eq!(
            seed.apply(&store, Utc::now()),
            Err(ConsentError::ConsentNotFound("telemarketing".into()))
        );
        assert!(store.list_usernames().is_empty());
        assert!(store.list_consent_definitions().is_empty());
    }

    #[test]
    fn test_seed_rejects_invalid_name() {
        let seed = SeedData {
            consents: vec![SeedConsent::new("bad name", 0, 1)],
            users: vec![],
        };
        assert_eq!(
            seed.validate(),
            Err(ConsentError::InvalidName("bad name".into()))
        );
    }

    #[test]
    fn test_seed_from_toml() {
        let seed: SeedData = toml::from_str(
            r#"
            [[consents]]
            name = "newsletter"
            days = 30

            [[users]]
            username = "Ada"
            grants = ["newsletter"]

            [[users]]
            username = "Grace"
            "#,
        )
        .unwrap();

        assert_eq!(seed.consents[0].seconds, 0);
        assert_eq!(seed.consents[0].days, 30);
        assert!(seed.users[1].grants.is_empty());
        assert!(seed.validate().is_ok());
    }
}
