//! Message types for blackjack session actors.

use tokio::sync::oneshot;

use super::errors::SessionResult;
use super::round::{HandOutcome, RoundView};

/// Reply to a player decision. `outcomes` is present once the round has
/// played out, at which point the session is gone.
#[derive(Clone, Debug)]
pub struct DecisionReply {
    pub view: RoundView,
    pub outcomes: Option<Vec<HandOutcome>>,
}

/// Messages a session actor accepts
#[derive(Debug)]
pub enum SessionMessage {
    Hit {
        respond: oneshot::Sender<SessionResult<DecisionReply>>,
    },
    Stand {
        respond: oneshot::Sender<SessionResult<DecisionReply>>,
    },
    Double {
        respond: oneshot::Sender<SessionResult<DecisionReply>>,
    },
    Split {
        respond: oneshot::Sender<SessionResult<DecisionReply>>,
    },
    View {
        respond: oneshot::Sender<RoundView>,
    },
}
