//! Blackjack session engine.
//!
//! A [`GameManager`] owns at most one live round per player. Each round
//! runs in its own [`actor`] task that serializes decisions and enforces
//! the idle deadline; the [`round`] module holds the pure rules with no
//! I/O. Money moves through the shared ledger: the stake leaves the
//! balance when placed and the payout lands when the round settles.

pub mod actor;
pub mod errors;
pub mod manager;
pub mod messages;
pub mod round;

pub use actor::SessionHandle;
pub use errors::{SessionError, SessionResult};
pub use manager::{GameManager, StartOutcome};
pub use messages::DecisionReply;
pub use round::{HandOutcome, HandResult, HandView, Round, RoundStatus, RoundView};
