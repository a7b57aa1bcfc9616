//! # Fixed-Width Arithmetic Guard
//!
//! **CRITICAL: NO WRAPPING ARITHMETIC ON AMOUNTS**
//!
//! Every amount, balance and accumulator in the ledger is an unsigned 256-bit
//! integer. Every addition, subtraction, multiplication and division goes
//! through [`SafeMath`], which turns overflow, underflow and division by zero
//! into [`LedgerError::ArithmeticError`]. Because operations stage their
//! writes, an arithmetic failure anywhere aborts the whole operation.
//!
//! ## The Accumulator Scale
//!
//! Profit-per-share is stored as a fixed-point number scaled by
//! `SCALE = 10^scale_decimals`. A decimal scale keeps round deposits over
//! round supplies exact (10 units over 1000 shares is exactly `10^16` per
//! share at 18 decimals). The scale also fixes two limits:
//!
//! - **Supply ceiling**: `balance * SCALE` must fit in 256 bits, so the total
//!   supply may never exceed `U256::MAX / SCALE`.
//! - **Quantum**: the smallest balance movement the accumulator can tell apart
//!   from zero, `ceil(effective_supply / SCALE)`.

use std::fmt;

use alloy_primitives::U256;

use crate::error::{LedgerError, LedgerResult};

/// Default number of decimal places in the accumulator scale.
pub const DEFAULT_SCALE_DECIMALS: u32 = 18;

/// Largest accepted scale exponent. `10^38` still leaves a supply ceiling
/// above `2^128`.
pub const MAX_SCALE_DECIMALS: u32 = 38;

// =============================================================================
// SafeMath - checked U256 operations with ledger errors
// =============================================================================

/// Checked arithmetic that reports failures as [`LedgerError::ArithmeticError`].
pub trait SafeMath: Sized {
    /// Safe addition with error on overflow.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ArithmeticError` if the sum does not fit.
    fn safe_add(self, rhs: Self) -> LedgerResult<Self>;

    /// Safe subtraction with error on underflow.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ArithmeticError` if `rhs > self`.
    fn safe_sub(self, rhs: Self) -> LedgerResult<Self>;

    /// Safe multiplication with error on overflow.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ArithmeticError` if the product does not fit.
    fn safe_mul(self, rhs: Self) -> LedgerResult<Self>;

    /// Floor division.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ArithmeticError` if `rhs` is zero.
    fn safe_div(self, rhs: Self) -> LedgerResult<Self>;

    /// Ceiling division.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ArithmeticError` if `rhs` is zero.
    fn safe_div_ceil(self, rhs: Self) -> LedgerResult<Self>;
}

impl SafeMath for U256 {
    #[inline]
    fn safe_add(self, rhs: Self) -> LedgerResult<Self> {
        self.checked_add(rhs).ok_or(LedgerError::ArithmeticError)
    }

    #[inline]
    fn safe_sub(self, rhs: Self) -> LedgerResult<Self> {
        self.checked_sub(rhs).ok_or(LedgerError::ArithmeticError)
    }

    #[inline]
    fn safe_mul(self, rhs: Self) -> LedgerResult<Self> {
        self.checked_mul(rhs).ok_or(LedgerError::ArithmeticError)
    }

    #[inline]
    fn safe_div(self, rhs: Self) -> LedgerResult<Self> {
        self.checked_div(rhs).ok_or(LedgerError::ArithmeticError)
    }

    #[inline]
    fn safe_div_ceil(self, rhs: Self) -> LedgerResult<Self> {
        let quotient = self.safe_div(rhs)?;
        if (self % rhs).is_zero() {
            Ok(quotient)
        } else {
            quotient.safe_add(U256::from(1u8))
        }
    }
}

// =============================================================================
// Scale - the accumulator's fixed-point multiplier
// =============================================================================

/// The fixed-point multiplier applied to profit-per-share accumulators.
///
/// Internally stores `10^decimals` as a `U256`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scale {
    decimals: u32,
    factor: U256,
}

impl Scale {
    /// Creates a scale of `10^decimals`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidConfig` if `decimals` is zero or above
    /// [`MAX_SCALE_DECIMALS`].
    pub fn from_decimals(decimals: u32) -> LedgerResult<Self> {
        if decimals == 0 || decimals > MAX_SCALE_DECIMALS {
            return Err(LedgerError::InvalidConfig(format!(
                "scale_decimals must be in 1..={MAX_SCALE_DECIMALS}, got {decimals}"
            )));
        }
        let factor = U256::from(10u8)
            .checked_pow(U256::from(decimals))
            .ok_or(LedgerError::ArithmeticError)?;
        Ok(Self { decimals, factor })
    }

    /// Returns the number of decimal places.
    #[inline]
    #[must_use]
    pub const fn decimals(self) -> u32 {
        self.decimals
    }

    /// Returns `10^decimals`.
    #[inline]
    #[must_use]
    pub const fn factor(self) -> U256 {
        self.factor
    }

    /// Largest total supply for which `supply * SCALE` still fits.
    #[inline]
    #[must_use]
    pub fn supply_ceiling(self) -> U256 {
        U256::MAX / self.factor
    }

    /// Checks that `amount * SCALE` fits in 256 bits.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ArithmeticError` above the supply ceiling.
    #[inline]
    pub fn ensure_representable(self, amount: U256) -> LedgerResult<()> {
        amount.safe_mul(self.factor).map(|_| ())
    }

    /// Smallest balance movement distinguishable from zero under
    /// `effective_supply`: `ceil(effective_supply / SCALE)`.
    #[inline]
    #[must_use]
    pub fn quantum(self, effective_supply: U256) -> U256 {
        let quotient = effective_supply / self.factor;
        if (effective_supply % self.factor).is_zero() {
            quotient
        } else {
            // quotient <= U256::MAX / 10, so this cannot overflow
            quotient + U256::from(1u8)
        }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self {
            decimals: DEFAULT_SCALE_DECIMALS,
            factor: U256::from(1_000_000_000_000_000_000u64),
        }
    }
}

impl fmt::Debug for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scale(10^{})", self.decimals)
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "10^{}", self.decimals)
    }
}
