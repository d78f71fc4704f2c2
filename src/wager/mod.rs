//! Wager module: lifecycle state machine, consensus protocol, and
//! settlement engine.
//!
//! A wager is created in `PendingConsent`, collects explicit consent from
//! every user participant, re-validates funds at the instant quorum is met,
//! debits both sides symmetrically, and goes `Active`. Settlement computes
//! the winner from the wager's kind (declared winner, engine-rolled coin
//! flip, or prediction against an observed outcome) and credits stake × 2
//! exactly once. Terminal wagers leave the registry immediately — no
//! history is retained here.

pub mod errors;
pub mod lookup;
pub mod models;
pub mod registry;

pub use errors::{WagerError, WagerResult};
pub use lookup::{OutcomeLookup, StaticLookup};
pub use models::{
    Outcome, Participant, Settlement, Wager, WagerId, WagerKind, WagerOutcome, WagerStatus,
};
pub use registry::WagerRegistry;
