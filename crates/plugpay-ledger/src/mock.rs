//! Scripted ledger for tests. **Never use in production.**
//!
//! Outcomes are consumed FIFO; unscripted calls succeed with sequential
//! block indexes. A gated mock parks every transfer on a semaphore until the
//! test releases it, which is how interleaving-while-in-flight scenarios are
//! driven deterministically.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use plugpay_types::{BlockIndex, LedgerError, TransferArgs, TransferFailure};
use tokio::sync::Semaphore;

use crate::LedgerClient;

/// One scripted transfer outcome.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// The transfer lands in the given block.
    Success(BlockIndex),
    /// The ledger replies with a typed failure.
    Ledger(LedgerError),
    /// The call layer rejects before any reply.
    Reject(String),
}

/// Scripted [`LedgerClient`] that records every call it receives.
#[derive(Debug, Default)]
pub struct MockLedger {
    outcomes: Mutex<VecDeque<MockOutcome>>,
    calls: Mutex<Vec<TransferArgs>>,
    next_block: Mutex<BlockIndex>,
    gate: Option<Arc<Semaphore>>,
}

impl MockLedger {
    /// A mock whose every call succeeds with sequential block indexes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that parks each transfer on `gate` until a permit is added.
    #[must_use]
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    /// Script the next outcome (FIFO).
    pub fn push_outcome(&self, outcome: MockOutcome) {
        self.outcomes.lock().push_back(outcome);
    }

    /// Script a success with the given block index.
    pub fn succeed_with(&self, block_index: BlockIndex) {
        self.push_outcome(MockOutcome::Success(block_index));
    }

    /// Script a ledger-reported failure.
    pub fn fail_with(&self, error: LedgerError) {
        self.push_outcome(MockOutcome::Ledger(error));
    }

    /// Script a call-layer rejection.
    pub fn reject_with(&self, reason: impl Into<String>) {
        self.push_outcome(MockOutcome::Reject(reason.into()));
    }

    /// How many transfers were attempted.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// The most recent transfer's arguments, if any call was made.
    #[must_use]
    pub fn last_call(&self) -> Option<TransferArgs> {
        self.calls.lock().last().cloned()
    }

    fn next_outcome(&self) -> MockOutcome {
        if let Some(outcome) = self.outcomes.lock().pop_front() {
            return outcome;
        }
        let mut next = self.next_block.lock();
        let block = *next;
        *next += 1;
        MockOutcome::Success(block)
    }
}

impl LedgerClient for MockLedger {
    async fn transfer(&self, args: TransferArgs) -> Result<BlockIndex, TransferFailure> {
        self.calls.lock().push(args);

        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.expect("mock gate closed");
            permit.forget();
        }

        match self.next_outcome() {
            MockOutcome::Success(block) => Ok(block),
            MockOutcome::Ledger(err) => Err(TransferFailure::Ledger(err)),
            MockOutcome::Reject(reason) => Err(TransferFailure::CallRejected(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use plugpay_types::AccountId;

    use super::*;

    fn args(amount: u64) -> TransferArgs {
        TransferArgs {
            from: AccountId([1u8; 32]),
            to: AccountId([2u8; 32]),
            amount,
            memo: "test".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn unscripted_calls_succeed_sequentially() {
        let ledger = MockLedger::new();
        assert_eq!(ledger.transfer(args(10)).await.unwrap(), 0);
        assert_eq!(ledger.transfer(args(20)).await.unwrap(), 1);
        assert_eq!(ledger.call_count(), 2);
        assert_eq!(ledger.last_call().unwrap().amount, 20);
    }

    #[tokio::test]
    async fn scripted_outcomes_consumed_fifo() {
        let ledger = MockLedger::new();
        ledger.succeed_with(42);
        ledger.fail_with(LedgerError::TooOld);
        ledger.reject_with("connection reset");

        assert_eq!(ledger.transfer(args(1)).await.unwrap(), 42);
        assert!(matches!(
            ledger.transfer(args(2)).await.unwrap_err(),
            TransferFailure::Ledger(LedgerError::TooOld)
        ));
        assert!(matches!(
            ledger.transfer(args(3)).await.unwrap_err(),
            TransferFailure::CallRejected(_)
        ));
    }

    #[tokio::test]
    async fn gated_transfer_parks_until_released() {
        let gate = Arc::new(Semaphore::new(0));
        let ledger = MockLedger::gated(Arc::clone(&gate));
        ledger.succeed_with(7);

        let mut in_flight = Box::pin(ledger.transfer(args(5)));

        // Not resolved while the gate is closed.
        tokio::select! {
            _ = &mut in_flight => panic!("transfer resolved before gate opened"),
            () = tokio::task::yield_now() => {}
        }
        assert_eq!(ledger.call_count(), 1, "call was recorded before parking");

        gate.add_permits(1);
        assert_eq!(in_flight.await.unwrap(), 7);
    }
}
