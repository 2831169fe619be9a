//! Consent registry core
//!
//! Tracks which time-bounded consents each user has granted and answers
//! whether a given consent is valid right now.
//!
//! # Architecture
//!
//! ```text
//!   caller (HTTP adapter, CLI)
//!          │
//!          ▼
//!  ┌──────────────────┐   user/consent exist?   ┌──────────────────┐
//!  │  ConsentLogic    │ ──────────────────────▶ │  ConsentStore    │
//!  │  (rules, clock)  │ ◀────────────────────── │  definitions +   │
//!  └──────────────────┘     raw read/write      │  user grants     │
//!                                               └──────────────────┘
//! ```
//!
//! A grant is valid while `now <= granted_at + validity`. Past that it is
//! expired without any explicit transition; revoking returns it to
//! "not given".

pub mod clock;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConsentError, Entity, Result, StoreError};
pub use logic::ConsentLogic;
pub use model::{
    is_valid_consent_name, ConsentDefinition, Grants, UserRecord, Verdict, VerdictReason,
    SECS_PER_DAY,
};
pub use seed::{SeedConsent, SeedData, SeedUser};
pub use store::{ConsentStore, GrantState, SharedConsentStore, StoreResult};
