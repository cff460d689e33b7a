//! Per-member invocation ledgers.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ProxyError, ProxyResult};
use crate::value::Arguments;

/// Append-only log of the argument lists one member received.
///
/// Cloning a ledger shares the log, so a `Verification` observes calls made
/// after it was created.
#[derive(Debug, Clone)]
pub struct InvocationLedger {
    member: Arc<str>,
    calls: Arc<Mutex<Vec<Arguments>>>,
}

impl InvocationLedger {
    pub fn new(member: &str) -> Self {
        Self {
            member: Arc::from(member),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Display name of the member, e.g. `Player::play`.
    pub fn member(&self) -> &str {
        &self.member
    }

    /// Record a call and return its 1-indexed ordinal.
    pub fn record_call(&self, args: Arguments) -> usize {
        let mut calls = self.calls.lock();
        calls.push(args);
        calls.len()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Arguments of call number `ordinal` (1-indexed).
    pub fn arguments_of(&self, ordinal: usize) -> ProxyResult<Arguments> {
        if ordinal == 0 {
            return Err(ProxyError::invalid(
                self.member(),
                "call ordinals start at 1",
            ));
        }
        let calls = self.calls.lock();
        calls
            .get(ordinal - 1)
            .cloned()
            .ok_or_else(|| ProxyError::MissingInvocation {
                member: self.member.to_string(),
                ordinal,
                recorded: calls.len(),
            })
    }

    /// Snapshot of every recorded call.
    pub fn calls(&self) -> Vec<Arguments> {
        self.calls.lock().clone()
    }
}

/// The ledgers of one proxy instance, created lazily per member.
#[derive(Debug)]
pub(crate) struct LedgerSet {
    owner: String,
    ledgers: Mutex<HashMap<String, InvocationLedger>>,
}

impl LedgerSet {
    /// `owner` prefixes member names in messages.
    pub(crate) fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            ledgers: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn ledger(&self, member: &str) -> InvocationLedger {
        self.ledgers
            .lock()
            .entry(member.to_string())
            .or_insert_with(|| InvocationLedger::new(&format!("{}::{}", self.owner, member)))
            .clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.ledgers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::value::Value;

    #[test]
    fn test_record_and_lookup() {
        let ledger = InvocationLedger::new("Player::action");
        assert_eq!(ledger.record_call(args![808]), 1);
        assert_eq!(ledger.record_call(args!["foo", 1]), 2);
        assert_eq!(ledger.count(), 2);

        assert_eq!(ledger.arguments_of(1).unwrap()[0], Value::from(808));
        ledger.record_call(args![]);
        // Earlier calls are unaffected by later ones.
        assert_eq!(ledger.arguments_of(2).unwrap().len(), 2);
        assert_eq!(ledger.calls().len(), 3);
    }

    #[test]
    fn test_missing_invocation() {
        let ledger = InvocationLedger::new("Player::action");
        ledger.record_call(args![808]);

        let err = ledger.arguments_of(2).unwrap_err();
        assert!(matches!(
            err,
            ProxyError::MissingInvocation {
                ordinal: 2,
                recorded: 1,
                ..
            }
        ));
        assert!(err.to_string().contains("was only called once"));
        assert!(matches!(
            ledger.arguments_of(0),
            Err(ProxyError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_ledger_set_is_lazy_and_shared() {
        let set = LedgerSet::new("Player");
        assert_eq!(set.len(), 0);

        let first = set.ledger("play");
        first.record_call(args![]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.ledger("play").count(), 1);
        assert_eq!(first.member(), "Player::play");
    }
}
