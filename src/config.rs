//! Engine configuration.
//!
//! Consolidates the tunable knobs of the engine with environment variable
//! overrides. Every field has a sensible default so an embedded deployment
//! can run on `Config::default()` alone.

use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Balance granted to a (user, scope) pair on first reference
    pub default_balance: i64,

    /// How long a wager may sit in PendingConsent before it expires
    pub consent_ttl: Duration,

    /// Suspense delay between coin-flip activation and the roll
    pub flip_suspense: Duration,

    /// Idle window after which a blackjack session stands automatically
    pub decision_timeout: Duration,

    /// Dealer draws while its hand value is below this
    pub dealer_stand: u32,

    /// Natural blackjack payout as a ratio applied to the stake (5/2 = 2.5x)
    pub natural_payout_num: i64,
    pub natural_payout_den: i64,

    /// Cost of the disconnect reward
    pub disconnect_cost: i64,

    /// Cost of the mute reward
    pub mute_cost: i64,

    /// How long a redeemed mute lasts before the scheduled unmute
    pub mute_window: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_balance: 1000,
            consent_ttl: Duration::from_secs(300),
            flip_suspense: Duration::from_secs(3),
            decision_timeout: Duration::from_secs(60),
            dealer_stand: 17,
            natural_payout_num: 5,
            natural_payout_den: 2,
            disconnect_cost: 1200,
            mute_cost: 3000,
            mute_window: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    ///
    /// Recognized variables:
    /// `STAKEHOUSE_DEFAULT_BALANCE`, `STAKEHOUSE_CONSENT_TTL_SECS`,
    /// `STAKEHOUSE_FLIP_SUSPENSE_SECS`, `STAKEHOUSE_DECISION_TIMEOUT_SECS`,
    /// `STAKEHOUSE_DISCONNECT_COST`, `STAKEHOUSE_MUTE_COST`,
    /// `STAKEHOUSE_MUTE_WINDOW_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_balance: env_parse("STAKEHOUSE_DEFAULT_BALANCE", defaults.default_balance),
            consent_ttl: env_secs("STAKEHOUSE_CONSENT_TTL_SECS", defaults.consent_ttl),
            flip_suspense: env_secs("STAKEHOUSE_FLIP_SUSPENSE_SECS", defaults.flip_suspense),
            decision_timeout: env_secs(
                "STAKEHOUSE_DECISION_TIMEOUT_SECS",
                defaults.decision_timeout,
            ),
            disconnect_cost: env_parse("STAKEHOUSE_DISCONNECT_COST", defaults.disconnect_cost),
            mute_cost: env_parse("STAKEHOUSE_MUTE_COST", defaults.mute_cost),
            mute_window: env_secs("STAKEHOUSE_MUTE_WINDOW_SECS", defaults.mute_window),
            ..defaults
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_secs(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
