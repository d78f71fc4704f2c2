//! # Stakehouse
//!
//! A points wagering and blackjack engine for shared spaces.
//!
//! Members of a scope (a server, a community) hold a fungible point balance
//! and stake it against each other in timed, multi-step wagers — direct
//! stakes, coin flips, outcome predictions — or against the dealer in a
//! blackjack game with splitting and doubling.
//!
//! ## Architecture
//!
//! - [`ledger`]: balance store keyed by (user, scope), with atomic adjusts
//!   and pluggable in-memory and Postgres backends
//! - [`cards`]: card shoe and blackjack hand arithmetic
//! - [`wager`]: registry of in-flight wagers, consent quorum protocol, and
//!   the settlement engine that pays out exactly once
//! - [`blackjack`]: per-player session actors driving a dealer card game
//! - [`rewards`]: point-priced effects applied to other members
//! - [`slots`]: single-spin multiplier slot machine
//! - [`engine`]: facade owning the components and dispatching commands
//!
//! Each wager and session is its own unit of mutual exclusion: transitions
//! on one id are serialized while unrelated ids proceed in parallel. The
//! ledger is shared across all of them and guarantees per-(user, scope)
//! atomicity on its own.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stakehouse::{Config, ledger::MemoryLedger, wager::WagerRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let ledger = Arc::new(MemoryLedger::new(config.default_balance));
//!     let registry = Arc::new(WagerRegistry::new(&config, ledger));
//!     registry
//!         .create(
//!             1,
//!             stakehouse::wager::WagerKind::CoinFlip,
//!             stakehouse::wager::Participant::User(10),
//!             stakehouse::wager::Participant::User(20),
//!             1,
//!             100,
//!             "movie night".into(),
//!         )
//!         .await?;
//!     registry.record_consent(1, 10).await?;
//!     registry.record_consent(1, 20).await?;
//!     Ok(())
//! }
//! ```

/// Balance store and its backends.
pub mod ledger;
pub use ledger::{LedgerError, LedgerStore, MemoryLedger, ScopeId, UserId};

/// Card, shoe, and blackjack hand arithmetic.
pub mod cards;
pub use cards::{Card, Shoe, Suit};

/// Wager lifecycle, consensus, and settlement.
pub mod wager;
pub use wager::{Participant, WagerError, WagerId, WagerKind, WagerRegistry, WagerStatus};

/// Dealer blackjack sessions.
pub mod blackjack;
pub use blackjack::{GameManager, SessionError};

/// Point-priced effects.
pub mod rewards;
pub use rewards::{EffectExecutor, Reward, RewardBook, RewardError};

/// Multiplier slot machine.
pub mod slots;
pub use slots::{SlotError, SlotMachine, SpinResult, Symbol};

/// Engine configuration.
pub mod config;
pub use config::Config;

/// Presentation-facing events and commands.
pub mod events;
pub use events::{Command, RewardEvent, SessionEvent, SlotEvent, WagerEvent};

/// Component facade and command dispatch.
pub mod engine;
pub use engine::{Engine, EngineError, NoopExecutor, Reply};
