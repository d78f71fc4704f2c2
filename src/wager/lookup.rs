//! External match-result lookup.
//!
//! Outcome predictions can settle against an external source (a match
//! history service) instead of a manual claim. The source is an excluded
//! collaborator: the engine only depends on this trait, and an `Unknown`
//! answer degrades to requiring a manually supplied outcome.

use super::models::Outcome;
use async_trait::async_trait;
use std::collections::HashMap;

/// Source of win/lose results for named subjects.
#[async_trait]
pub trait OutcomeLookup: Send + Sync {
    /// The most recent result for `subject`; `Outcome::Unknown` when the
    /// source cannot answer.
    async fn lookup(&self, subject: &str) -> Outcome;
}

/// Table-backed lookup for tests and embedded deployments.
#[derive(Debug, Default)]
pub struct StaticLookup {
    results: HashMap<String, Outcome>,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, subject: impl Into<String>, outcome: Outcome) {
        self.results.insert(subject.into(), outcome);
    }
}

#[async_trait]
impl OutcomeLookup for StaticLookup {
    async fn lookup(&self, subject: &str) -> Outcome {
        self.results
            .get(subject)
            .copied()
            .unwrap_or(Outcome::Unknown)
    }
}
