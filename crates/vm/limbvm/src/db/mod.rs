use bytes::Bytes;
use ethereum_types::{Address, H256, U256};

use crate::{constants::EMPTY_CODE_HASH, errors::DatabaseError};

pub mod in_memory;

pub use in_memory::InMemoryWorldState;

/// Balance, nonce and code hash of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    pub balance: U256,
    pub nonce: u64,
    pub code_hash: H256,
}

impl Default for AccountInfo {
    fn default() -> Self {
        Self {
            balance: U256::zero(),
            nonce: 0,
            code_hash: H256(EMPTY_CODE_HASH),
        }
    }
}

impl AccountInfo {
    pub fn has_code(&self) -> bool {
        self.code_hash != H256(EMPTY_CODE_HASH)
    }

    /// EIP-161 emptiness: no code, zero nonce and zero balance.
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce == 0 && !self.has_code()
    }
}

/// Account and storage access the interpreter needs from its host.
///
/// Every mutation happens between `checkpoint` and `commit`/`revert`; the interpreter opens one
/// checkpoint per child frame and closes it with the frame's outcome.
pub trait WorldState {
    fn get_account_info(&self, address: Address) -> Result<Option<AccountInfo>, DatabaseError>;
    fn get_code(&self, address: Address) -> Result<Bytes, DatabaseError>;
    fn get_storage(&self, address: Address, key: H256) -> Result<U256, DatabaseError>;
    /// Value of the slot at the start of the current transaction.
    fn get_original_storage(&self, address: Address, key: H256) -> Result<U256, DatabaseError>;
    fn get_block_hash(&self, block_number: u64) -> Result<Option<H256>, DatabaseError>;

    fn set_storage(&mut self, address: Address, key: H256, value: U256)
    -> Result<(), DatabaseError>;
    fn set_balance(&mut self, address: Address, balance: U256) -> Result<(), DatabaseError>;
    fn set_nonce(&mut self, address: Address, nonce: u64) -> Result<(), DatabaseError>;
    fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), DatabaseError>;
    /// Removes the account with its code and storage.
    fn destroy_account(&mut self, address: Address) -> Result<(), DatabaseError>;

    fn checkpoint(&mut self);
    fn commit(&mut self) -> Result<(), DatabaseError>;
    fn revert(&mut self) -> Result<(), DatabaseError>;

    /// Called once the top-level message finished.
    fn finalize_transaction(&mut self) -> Result<(), DatabaseError> {
        Ok(())
    }

    fn account_exists(&self, address: Address) -> Result<bool, DatabaseError> {
        Ok(self.get_account_info(address)?.is_some())
    }

    /// Missing accounts count as empty.
    fn is_empty(&self, address: Address) -> Result<bool, DatabaseError> {
        Ok(self
            .get_account_info(address)?
            .is_none_or(|info| info.is_empty()))
    }

    fn get_balance(&self, address: Address) -> Result<U256, DatabaseError> {
        Ok(self
            .get_account_info(address)?
            .map(|info| info.balance)
            .unwrap_or_default())
    }

    fn get_nonce(&self, address: Address) -> Result<u64, DatabaseError> {
        Ok(self
            .get_account_info(address)?
            .map(|info| info.nonce)
            .unwrap_or_default())
    }

    /// Bumps the nonce and returns the previous one.
    fn increment_nonce(&mut self, address: Address) -> Result<u64, DatabaseError> {
        let nonce = self.get_nonce(address)?;
        let next = nonce
            .checked_add(1)
            .ok_or(DatabaseError::Custom("nonce overflow".to_owned()))?;
        self.set_nonce(address, next)?;
        Ok(nonce)
    }

    /// Moves `value` from `from` to `to`. The caller has checked the balance.
    fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), DatabaseError> {
        if value.is_zero() {
            return Ok(());
        }
        let from_balance = self
            .get_balance(from)?
            .checked_sub(value)
            .ok_or(DatabaseError::Custom("insufficient balance".to_owned()))?;
        self.set_balance(from, from_balance)?;
        let to_balance = self
            .get_balance(to)?
            .checked_add(value)
            .ok_or(DatabaseError::Custom("balance overflow".to_owned()))?;
        self.set_balance(to, to_balance)
    }
}
