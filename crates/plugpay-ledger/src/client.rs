//! The ledger client seam.
//!
//! Everything the payment core knows about the external ledger service is
//! this one asynchronous operation. Awaiting it is the **suspension point**
//! of the whole system: while a transfer is in flight, other handlers run,
//! and they must observe the pending journal entry written beforehand.

use plugpay_types::{BlockIndex, TransferArgs, TransferFailure};

/// Asynchronous client for the external fungible-token ledger.
///
/// `transfer` takes `&self` because the service is callable concurrently;
/// implementations manage their own interior state.
pub trait LedgerClient {
    /// Move `args.amount` from `args.from` to `args.to`.
    ///
    /// Three outcomes are distinguishable:
    /// - `Ok(block_index)` — the transfer landed in a block;
    /// - `Err(TransferFailure::Ledger(_))` — the ledger replied with a
    ///   typed failure; the transfer definitively did not happen;
    /// - `Err(TransferFailure::CallRejected(_))` — the call never produced
    ///   a reply; the transfer's fate is unknown to the caller.
    fn transfer(
        &self,
        args: TransferArgs,
    ) -> impl Future<Output = Result<BlockIndex, TransferFailure>> + Send;
}
