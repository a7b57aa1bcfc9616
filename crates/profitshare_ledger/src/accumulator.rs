//! # Profit Accumulator Engine
//!
//! Lazy, pull-based profit accounting. Nothing is pushed to holders when a
//! deposit arrives. Instead:
//!
//! 1. **Sync** compares what the pool has ever received with what was last
//!    observed and folds the difference into a scaled profit-per-share
//!    accumulator: `acc += delta * SCALE / effective_supply`.
//! 2. **Settle** credits one account with
//!    `(acc - snapshot) * participating_balance / SCALE` and moves its
//!    snapshot up to `acc`.
//!
//! Both steps are O(1), independent of the number of holders.
//!
//! The functions here are pure. They take a source by reference and return
//! the successor value, so callers can stage a whole operation and commit
//! only when every step has succeeded.

use alloy_primitives::U256;

use crate::arithmetic::{SafeMath, Scale};
use crate::error::LedgerResult;
use crate::registry::ProfitSource;

/// The result of syncing one source, not yet committed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Synced {
    /// The source after folding in new deposits.
    pub source: ProfitSource,
    /// Newly observed deposits.
    pub deposited: U256,
    /// False when a deposit arrived while nobody participated; that value is
    /// absorbed and never credited.
    pub attributed: bool,
}

/// Folds deposits that arrived since the last sync into the accumulator.
///
/// `pool_now` is the ledger's current balance in the source token. Paid-out
/// profit is added back so withdrawals are not mistaken for a shrinking pool.
///
/// # Errors
///
/// Returns `LedgerError::ArithmeticError` on overflow, or if the pool holds
/// less than it has ever been observed to hold (out-of-band outflow).
pub fn sync(
    source: &ProfitSource,
    pool_now: U256,
    effective_supply: U256,
    scale: Scale,
) -> LedgerResult<Synced> {
    let observed_now = pool_now.safe_add(source.paid_out)?;
    let deposited = observed_now.safe_sub(source.last_observed)?;

    let mut next = *source;
    next.last_observed = observed_now;

    let attributed = deposited.is_zero() || !effective_supply.is_zero();
    if !deposited.is_zero() && !effective_supply.is_zero() {
        let per_share = deposited.safe_mul(scale.factor())?.safe_div(effective_supply)?;
        next.accumulator = next.accumulator.safe_add(per_share)?;
    }

    Ok(Synced {
        source: next,
        deposited,
        attributed,
    })
}

/// Profit earned by `balance` while the accumulator moved from `snapshot`
/// to `accumulator`. Floors.
///
/// # Errors
///
/// Returns `LedgerError::ArithmeticError` on overflow or if the snapshot is
/// ahead of the accumulator.
#[inline]
pub fn owed(accumulator: U256, snapshot: U256, balance: U256, scale: Scale) -> LedgerResult<U256> {
    if balance.is_zero() {
        return Ok(U256::ZERO);
    }
    accumulator
        .safe_sub(snapshot)?
        .safe_mul(balance)?
        .safe_div(scale.factor())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use alloy_primitives::Address;

    fn source() -> ProfitSource {
        ProfitSource::new(Address::repeat_byte(0xAA))
    }

    #[test]
    fn test_sync_folds_deposit() {
        let scale = Scale::default();
        let synced = sync(&source(), U256::from(10), U256::from(1000), scale).unwrap();

        assert_eq!(synced.deposited, U256::from(10));
        assert!(synced.attributed);
        assert_eq!(synced.source.last_observed, U256::from(10));
        // 10 * 10^18 / 1000
        assert_eq!(synced.source.accumulator, U256::from(10_000_000_000_000_000u64));
    }

    #[test]
    fn test_sync_without_deposit_is_identity() {
        let scale = Scale::default();
        let first = sync(&source(), U256::from(10), U256::from(1000), scale).unwrap();
        let second = sync(&first.source, U256::from(10), U256::from(1000), scale).unwrap();

        assert_eq!(second.deposited, U256::ZERO);
        assert_eq!(second.source, first.source);
    }

    #[test]
    fn test_sync_absorbs_deposit_without_participants() {
        let scale = Scale::default();
        let synced = sync(&source(), U256::from(10), U256::ZERO, scale).unwrap();

        assert!(!synced.attributed);
        assert_eq!(synced.source.accumulator, U256::ZERO);
        assert_eq!(synced.source.last_observed, U256::from(10));

        // once supply appears the old deposit is not re-processed
        let later = sync(&synced.source, U256::from(10), U256::from(5), scale).unwrap();
        assert_eq!(later.source.accumulator, U256::ZERO);
    }

    #[test]
    fn test_sync_counts_paid_out_as_observed() {
        let scale = Scale::default();
        let mut paid = sync(&source(), U256::from(10), U256::from(10), scale).unwrap().source;
        paid.paid_out = U256::from(4);

        // the pool dropped to 6 because 4 were withdrawn: no new deposit
        let synced = sync(&paid, U256::from(6), U256::from(10), scale).unwrap();
        assert_eq!(synced.deposited, U256::ZERO);
        assert_eq!(synced.source.accumulator, paid.accumulator);
    }

    #[test]
    fn test_sync_rejects_shrinking_pool() {
        let scale = Scale::default();
        let synced = sync(&source(), U256::from(10), U256::from(10), scale).unwrap();
        assert_eq!(
            sync(&synced.source, U256::from(9), U256::from(10), scale),
            Err(LedgerError::ArithmeticError)
        );
    }

    #[test]
    fn test_owed_proportional() {
        let scale = Scale::default();
        let acc = sync(&source(), U256::from(10), U256::from(1000), scale)
            .unwrap()
            .source
            .accumulator;

        assert_eq!(owed(acc, U256::ZERO, U256::from(700), scale), Ok(U256::from(7)));
        assert_eq!(owed(acc, U256::ZERO, U256::from(100), scale), Ok(U256::from(1)));
        assert_eq!(owed(acc, U256::ZERO, U256::from(200), scale), Ok(U256::from(2)));
        assert_eq!(owed(acc, acc, U256::from(700), scale), Ok(U256::ZERO));
    }

    #[test]
    fn test_owed_floors() {
        let scale = Scale::default();
        let acc = sync(&source(), U256::from(10), U256::from(3), scale)
            .unwrap()
            .source
            .accumulator;
        // three holders of one share each get 3, one unit of dust stays
        assert_eq!(owed(acc, U256::ZERO, U256::from(1), scale), Ok(U256::from(3)));
    }
}
