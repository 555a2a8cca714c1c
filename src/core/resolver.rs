//! Retry eligibility policy.

use std::collections::{HashMap, HashSet};

use super::{ErrorKind, WorkError, WorkId};

/// Decides whether a failed work gets another attempt.
///
/// The resolver owns a per-work attempt ledger. Hubs clear a work's entry when
/// they finalize it and wipe the whole ledger on a bulk abort, so entries never
/// outlive the work's presence in the hub.
pub trait RetryResolver: Send {
    /// Whether `work`, which just failed with `error`, may run again.
    ///
    /// A `true` answer spends one attempt.
    fn retryable(&mut self, work: WorkId, error: &WorkError) -> bool;
    /// Forget the history of one work.
    fn clear(&mut self, work: WorkId);
    /// Forget the history of every work.
    fn clear_all(&mut self);
    /// Attempts spent by `work` so far.
    fn attempts(&self, work: WorkId) -> u32;
    /// Number of works with a ledger entry.
    fn len(&self) -> usize;
    /// True when the ledger is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Retries up to `max_retries` times, optionally only for tolerable error kinds.
#[derive(Debug, Clone)]
pub struct TolerableErrorResolver {
    max_retries: u32,
    tolerables: Option<HashSet<ErrorKind>>,
    ledger: HashMap<WorkId, u32>,
}

impl TolerableErrorResolver {
    /// Create a resolver.
    ///
    /// With `tolerables = None` every error kind is retryable.
    #[must_use]
    pub fn new(max_retries: u32, tolerables: Option<impl IntoIterator<Item = ErrorKind>>) -> Self {
        Self {
            max_retries,
            tolerables: tolerables.map(|kinds| kinds.into_iter().collect()),
            ledger: HashMap::new(),
        }
    }

    /// Resolver retrying any error kind.
    #[must_use]
    pub fn any_error(max_retries: u32) -> Self {
        Self::new(max_retries, None::<Vec<ErrorKind>>)
    }

    /// Configured retry ceiling.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether `kind` passes the allowlist.
    #[must_use]
    pub fn tolerates(&self, kind: ErrorKind) -> bool {
        self.tolerables
            .as_ref()
            .is_none_or(|kinds| kinds.contains(&kind))
    }
}

impl RetryResolver for TolerableErrorResolver {
    fn retryable(&mut self, work: WorkId, error: &WorkError) -> bool {
        let tolerated = self.tolerates(error.kind());
        let attempts = self.ledger.entry(work).or_insert(0);
        if *attempts >= self.max_retries || !tolerated {
            return false;
        }
        *attempts += 1;
        true
    }

    fn clear(&mut self, work: WorkId) {
        self.ledger.remove(&work);
    }

    fn clear_all(&mut self) {
        self.ledger.clear();
    }

    fn attempts(&self, work: WorkId) -> u32 {
        self.ledger.get(&work).copied().unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.ledger.len()
    }
}
