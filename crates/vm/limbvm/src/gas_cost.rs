//! Gas schedule.
//!
//! The interpreter only consumes computed costs. [`GasSchedule`] exposes the primitive prices as
//! required methods and builds the per-opcode composite costs on top of them, so a host can swap
//! prices without touching the handlers. [`CancunGasSchedule`] is the default.

use std::fmt::Debug;

use crate::{
    constants::WORD_SIZE_IN_BYTES_U64,
    errors::{ExceptionalHalt, VMError},
    memory,
    word::{self, Limbs},
};

// Tiers
pub const ZERO_TIER: u64 = 0;
pub const BASE_TIER: u64 = 2;
pub const VERY_LOW_TIER: u64 = 3;
pub const LOW_TIER: u64 = 5;
pub const MID_TIER: u64 = 8;
pub const HIGH_TIER: u64 = 10;
pub const EXT_TIER: u64 = 20;

pub const JUMPDEST: u64 = 1;
pub const COPY_WORD: u64 = 3;
pub const EXP_STATIC: u64 = 10;
pub const EXP_DYNAMIC_BASE: u64 = 50;
pub const KECCAK25_STATIC: u64 = 30;
pub const KECCAK25_DYNAMIC_BASE: u64 = 6;

pub const LOG_STATIC: u64 = 375;
pub const LOG_TOPIC: u64 = 375;
pub const LOG_DATA_BYTE: u64 = 8;

// EIP-2929
pub const WARM_ADDRESS_ACCESS_COST: u64 = 100;
pub const COLD_ADDRESS_ACCESS_COST: u64 = 2600;
pub const COLD_STORAGE_ACCESS_COST: u64 = 2100;

// EIP-2200 / EIP-3529
pub const SSTORE_SENTRY: u64 = 2300;
pub const SSTORE_SET: u64 = 20000;
pub const SSTORE_RESET: u64 = 5000;
pub const SSTORE_CLEARS_SCHEDULE: u64 = 4800;

// EIP-1153
pub const TRANSIENT_STORAGE: u64 = 100;

pub const CREATE_BASE_COST: u64 = 32000;
pub const INIT_CODE_WORD_COST: u64 = 2;
pub const CODE_DEPOSIT_COST: u64 = 200;

pub const CALL_POSITIVE_VALUE: u64 = 9000;
pub const CALL_TO_EMPTY_ACCOUNT: u64 = 25000;
pub const CALL_POSITIVE_VALUE_STIPEND: u64 = 2300;

pub const SELFDESTRUCT_STATIC: u64 = 5000;
pub const SELFDESTRUCT_NEW_ACCOUNT: u64 = 25000;

pub const BLOCKHASH: u64 = 20;
pub const BLOBHASH: u64 = 3;

/// Fixed-cost tiers of the yellow paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Zero,
    Base,
    VeryLow,
    Low,
    Mid,
    High,
    Ext,
}

#[inline]
fn words(size: usize) -> Result<u64, VMError> {
    let size = u64::try_from(size).map_err(|_| ExceptionalHalt::OutOfGas)?;
    Ok(size.div_ceil(WORD_SIZE_IN_BYTES_U64))
}

#[inline]
fn sum(values: &[u64]) -> Result<u64, VMError> {
    values
        .iter()
        .try_fold(0u64, |acc, value| acc.checked_add(*value))
        .ok_or(ExceptionalHalt::OutOfGas.into())
}

#[inline]
fn times(count: u64, price: u64) -> Result<u64, VMError> {
    count
        .checked_mul(price)
        .ok_or(ExceptionalHalt::OutOfGas.into())
}

/// Prices consumed by the interpreter.
pub trait GasSchedule: Debug {
    fn tier(&self, tier: Tier) -> u64;
    fn jumpdest(&self) -> u64;
    fn copy_word(&self) -> u64;
    fn exp_static(&self) -> u64;
    fn exp_byte(&self) -> u64;
    fn keccak_static(&self) -> u64;
    fn keccak_word(&self) -> u64;
    fn log_static(&self) -> u64;
    fn log_topic(&self) -> u64;
    fn log_data_byte(&self) -> u64;
    fn warm_access(&self) -> u64;
    fn cold_account_access(&self) -> u64;
    fn cold_sload(&self) -> u64;
    /// Gas an SSTORE requires to be left before it may run at all (EIP-2200).
    fn sstore_sentry(&self) -> u64;
    fn sstore_set(&self) -> u64;
    fn sstore_reset(&self) -> u64;
    fn sstore_clears_schedule(&self) -> u64;
    fn transient_storage(&self) -> u64;
    fn create_base(&self) -> u64;
    fn initcode_word(&self) -> u64;
    fn code_deposit_byte(&self) -> u64;
    fn call_base(&self) -> u64;
    fn call_value(&self) -> u64;
    fn new_account(&self) -> u64;
    fn call_stipend(&self) -> u64;
    fn selfdestruct(&self) -> u64;
    fn blockhash(&self) -> u64;
    fn blobhash(&self) -> u64;

    /// Cost of expanding memory from `current_memory_size` to `new_memory_size` bytes.
    fn memory_expansion(
        &self,
        new_memory_size: usize,
        current_memory_size: usize,
    ) -> Result<u64, VMError> {
        memory::expansion_cost(new_memory_size, current_memory_size)
    }

    /// Warm or cold account access.
    fn account_access(&self, address_was_cold: bool) -> u64 {
        if address_was_cold {
            self.cold_account_access()
        } else {
            self.warm_access()
        }
    }

    fn sload(&self, storage_slot_was_cold: bool) -> u64 {
        if storage_slot_was_cold {
            self.cold_sload()
        } else {
            self.warm_access()
        }
    }

    /// SSTORE price from the `(original, current, new)` triple, excluding the cold surcharge.
    fn sstore_cost(&self, original: Limbs, current: Limbs, new: Limbs) -> u64 {
        if new == current || current != original {
            self.warm_access()
        } else if word::is_zero(original) {
            self.sstore_set()
        } else {
            self.sstore_reset().saturating_sub(self.cold_sload())
        }
    }

    /// Signed refund delta of an SSTORE.
    fn sstore_refund(&self, original: Limbs, current: Limbs, new: Limbs) -> i64 {
        let clears = i64::try_from(self.sstore_clears_schedule()).unwrap_or_default();
        let mut refund = 0i64;
        if current == new {
            return refund;
        }
        if current == original {
            if !word::is_zero(original) && word::is_zero(new) {
                refund = refund.saturating_add(clears);
            }
            return refund;
        }
        if !word::is_zero(original) {
            if word::is_zero(current) {
                refund = refund.saturating_sub(clears);
            } else if word::is_zero(new) {
                refund = refund.saturating_add(clears);
            }
        }
        if new == original {
            let restored = if word::is_zero(original) {
                self.sstore_set().saturating_sub(self.warm_access())
            } else {
                self.sstore_reset()
                    .saturating_sub(self.cold_sload())
                    .saturating_sub(self.warm_access())
            };
            refund = refund.saturating_add(i64::try_from(restored).unwrap_or_default());
        }
        refund
    }

    /// CALLDATACOPY, CODECOPY, RETURNDATACOPY and MCOPY.
    fn copy(
        &self,
        new_memory_size: usize,
        current_memory_size: usize,
        size: usize,
    ) -> Result<u64, VMError> {
        sum(&[
            self.tier(Tier::VeryLow),
            times(words(size)?, self.copy_word())?,
            self.memory_expansion(new_memory_size, current_memory_size)?,
        ])
    }

    fn extcodecopy(
        &self,
        size: usize,
        new_memory_size: usize,
        current_memory_size: usize,
        address_was_cold: bool,
    ) -> Result<u64, VMError> {
        sum(&[
            self.account_access(address_was_cold),
            times(words(size)?, self.copy_word())?,
            self.memory_expansion(new_memory_size, current_memory_size)?,
        ])
    }

    /// MLOAD, MSTORE and MSTORE8.
    fn memory_access(
        &self,
        new_memory_size: usize,
        current_memory_size: usize,
    ) -> Result<u64, VMError> {
        sum(&[
            self.tier(Tier::VeryLow),
            self.memory_expansion(new_memory_size, current_memory_size)?,
        ])
    }

    fn exp(&self, exponent: Limbs) -> Result<u64, VMError> {
        sum(&[
            self.exp_static(),
            times(word::byte_len(exponent), self.exp_byte())?,
        ])
    }

    fn keccak256(
        &self,
        new_memory_size: usize,
        current_memory_size: usize,
        size: usize,
    ) -> Result<u64, VMError> {
        sum(&[
            self.keccak_static(),
            times(words(size)?, self.keccak_word())?,
            self.memory_expansion(new_memory_size, current_memory_size)?,
        ])
    }

    fn log(
        &self,
        new_memory_size: usize,
        current_memory_size: usize,
        size: usize,
        topics: usize,
    ) -> Result<u64, VMError> {
        let size = u64::try_from(size).map_err(|_| ExceptionalHalt::OutOfGas)?;
        let topics = u64::try_from(topics).map_err(|_| ExceptionalHalt::OutOfGas)?;
        sum(&[
            self.log_static(),
            times(topics, self.log_topic())?,
            times(size, self.log_data_byte())?,
            self.memory_expansion(new_memory_size, current_memory_size)?,
        ])
    }

    /// RETURN and REVERT.
    fn exit_opcode(
        &self,
        new_memory_size: usize,
        current_memory_size: usize,
    ) -> Result<u64, VMError> {
        self.memory_expansion(new_memory_size, current_memory_size)
    }

    /// CREATE and CREATE2, without the child's stipend. CREATE2 also hashes the initcode.
    fn create(
        &self,
        new_memory_size: usize,
        current_memory_size: usize,
        initcode_size: usize,
        hashes_initcode: bool,
    ) -> Result<u64, VMError> {
        let initcode_words = words(initcode_size)?;
        let hashing = if hashes_initcode {
            times(initcode_words, self.keccak_word())?
        } else {
            0
        };
        sum(&[
            self.create_base(),
            times(initcode_words, self.initcode_word())?,
            hashing,
            self.memory_expansion(new_memory_size, current_memory_size)?,
        ])
    }

    /// Base CALL-family cost before the warm/cold surcharge: base price, the larger of the two
    /// memory regions, the value surcharge and the new-account surcharge.
    fn call(
        &self,
        new_memory_size: usize,
        current_memory_size: usize,
        transfers_value: bool,
        creates_account: bool,
    ) -> Result<u64, VMError> {
        sum(&[
            self.call_base(),
            self.memory_expansion(new_memory_size, current_memory_size)?,
            if transfers_value { self.call_value() } else { 0 },
            if transfers_value && creates_account {
                self.new_account()
            } else {
                0
            },
        ])
    }

    fn code_deposit(&self, code_size: usize) -> Result<u64, VMError> {
        let code_size = u64::try_from(code_size).map_err(|_| ExceptionalHalt::OutOfGas)?;
        times(code_size, self.code_deposit_byte())
    }

    fn selfdestruct_cost(&self, address_was_cold: bool, creates_account: bool) -> u64 {
        let mut cost = self.selfdestruct();
        if address_was_cold {
            cost = cost.saturating_add(self.cold_account_access());
        }
        if creates_account {
            cost = cost.saturating_add(SELFDESTRUCT_NEW_ACCOUNT);
        }
        cost
    }
}

/// Prices in force since Cancun.
#[derive(Debug, Clone, Copy, Default)]
pub struct CancunGasSchedule;

impl GasSchedule for CancunGasSchedule {
    fn tier(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Zero => ZERO_TIER,
            Tier::Base => BASE_TIER,
            Tier::VeryLow => VERY_LOW_TIER,
            Tier::Low => LOW_TIER,
            Tier::Mid => MID_TIER,
            Tier::High => HIGH_TIER,
            Tier::Ext => EXT_TIER,
        }
    }

    fn jumpdest(&self) -> u64 {
        JUMPDEST
    }

    fn copy_word(&self) -> u64 {
        COPY_WORD
    }

    fn exp_static(&self) -> u64 {
        EXP_STATIC
    }

    fn exp_byte(&self) -> u64 {
        EXP_DYNAMIC_BASE
    }

    fn keccak_static(&self) -> u64 {
        KECCAK25_STATIC
    }

    fn keccak_word(&self) -> u64 {
        KECCAK25_DYNAMIC_BASE
    }

    fn log_static(&self) -> u64 {
        LOG_STATIC
    }

    fn log_topic(&self) -> u64 {
        LOG_TOPIC
    }

    fn log_data_byte(&self) -> u64 {
        LOG_DATA_BYTE
    }

    fn warm_access(&self) -> u64 {
        WARM_ADDRESS_ACCESS_COST
    }

    fn cold_account_access(&self) -> u64 {
        COLD_ADDRESS_ACCESS_COST
    }

    fn cold_sload(&self) -> u64 {
        COLD_STORAGE_ACCESS_COST
    }

    fn sstore_sentry(&self) -> u64 {
        SSTORE_SENTRY
    }

    fn sstore_set(&self) -> u64 {
        SSTORE_SET
    }

    fn sstore_reset(&self) -> u64 {
        SSTORE_RESET
    }

    fn sstore_clears_schedule(&self) -> u64 {
        SSTORE_CLEARS_SCHEDULE
    }

    fn transient_storage(&self) -> u64 {
        TRANSIENT_STORAGE
    }

    fn create_base(&self) -> u64 {
        CREATE_BASE_COST
    }

    fn initcode_word(&self) -> u64 {
        INIT_CODE_WORD_COST
    }

    fn code_deposit_byte(&self) -> u64 {
        CODE_DEPOSIT_COST
    }

    fn call_base(&self) -> u64 {
        0
    }

    fn call_value(&self) -> u64 {
        CALL_POSITIVE_VALUE
    }

    fn new_account(&self) -> u64 {
        CALL_TO_EMPTY_ACCOUNT
    }

    fn call_stipend(&self) -> u64 {
        CALL_POSITIVE_VALUE_STIPEND
    }

    fn selfdestruct(&self) -> u64 {
        SELFDESTRUCT_STATIC
    }

    fn blockhash(&self) -> u64 {
        BLOCKHASH
    }

    fn blobhash(&self) -> u64 {
        BLOBHASH
    }
}

/// Gas handed to a child frame: all but one 64th of what is left, capped at the request.
#[inline]
pub fn max_message_call_gas(gas_remaining: u64, requested: u64) -> u64 {
    gas_remaining.saturating_sub(gas_remaining / 64).min(requested)
}

#[cfg(test)]
mod tests {
    use super::*;

    const S: CancunGasSchedule = CancunGasSchedule;

    fn w(value: u64) -> Limbs {
        word::from_u64(value)
    }

    #[test]
    fn sstore_costs() {
        // no-op
        assert_eq!(S.sstore_cost(w(1), w(1), w(1)), 100);
        // fresh slot
        assert_eq!(S.sstore_cost(w(0), w(0), w(1)), 20000);
        // clean update
        assert_eq!(S.sstore_cost(w(1), w(1), w(2)), 2900);
        // dirty slot
        assert_eq!(S.sstore_cost(w(1), w(2), w(3)), 100);
    }

    #[test]
    fn sstore_refunds() {
        assert_eq!(S.sstore_refund(w(1), w(1), w(0)), 4800);
        assert_eq!(S.sstore_refund(w(1), w(1), w(2)), 0);
        // dirty, restoring a zero original
        assert_eq!(S.sstore_refund(w(0), w(1), w(0)), 19900);
        // dirty, cleared earlier and written again
        assert_eq!(S.sstore_refund(w(1), w(0), w(2)), -4800);
        // dirty, cleared earlier and restored
        assert_eq!(S.sstore_refund(w(1), w(0), w(1)), -4800 + 2800);
        // dirty, cleared now
        assert_eq!(S.sstore_refund(w(1), w(2), w(0)), 4800);
    }

    #[test]
    fn composite_costs() {
        assert_eq!(S.exp(w(0)).unwrap(), 10);
        assert_eq!(S.exp(w(0x100)).unwrap(), 110);
        assert_eq!(S.copy(32, 0, 32).unwrap(), 3 + 3 + 3);
        assert_eq!(S.keccak256(64, 0, 33).unwrap(), 30 + 12 + 6);
        assert_eq!(S.log(32, 32, 10, 2).unwrap(), 375 + 750 + 80);
        assert_eq!(S.create(0, 0, 33, false).unwrap(), 32000 + 4);
        assert_eq!(S.create(0, 0, 33, true).unwrap(), 32000 + 4 + 12);
        assert_eq!(S.call(0, 0, true, true).unwrap(), 34000);
        assert_eq!(S.call(0, 0, false, true).unwrap(), 0);
        assert_eq!(S.account_access(true), 2600);
        assert_eq!(S.sload(false), 100);
    }

    #[test]
    fn call_stipend_is_all_but_one_64th() {
        assert_eq!(max_message_call_gas(6400, u64::MAX), 6300);
        assert_eq!(max_message_call_gas(6400, 1000), 1000);
        assert_eq!(max_message_call_gas(63, 100), 63);
        assert_eq!(max_message_call_gas(0, 100), 0);
    }
}
