use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use rustc_hash::FxHashMap;

use super::{AccountInfo, WorldState};
use crate::{errors::DatabaseError, utils::keccak};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub info: AccountInfo,
    pub code: Bytes,
    pub storage: FxHashMap<H256, U256>,
}

impl Account {
    pub fn new(balance: U256, code: Bytes, nonce: u64) -> Self {
        Self {
            info: AccountInfo {
                balance,
                nonce,
                code_hash: keccak(&code),
            },
            code,
            storage: FxHashMap::default(),
        }
    }

    pub fn with_storage(mut self, storage: impl IntoIterator<Item = (H256, U256)>) -> Self {
        self.storage.extend(storage);
        self
    }
}

#[derive(Debug, Clone)]
enum JournalEntry {
    /// Account header before a balance, nonce or code change; `None` if it did not exist.
    Header {
        address: Address,
        previous: Option<(AccountInfo, Bytes)>,
    },
    Storage {
        address: Address,
        key: H256,
        previous: U256,
    },
    Destroyed {
        address: Address,
        previous: Box<Account>,
    },
}

/// Journaled world state kept entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorldState {
    accounts: FxHashMap<Address, Account>,
    block_hashes: FxHashMap<u64, H256>,
    /// Slot values as they were before the first write of the current transaction.
    original_storage: FxHashMap<(Address, H256), U256>,
    journal: Vec<JournalEntry>,
    checkpoints: Vec<usize>,
}

impl InMemoryWorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, address: Address, account: Account) -> Self {
        self.insert_account(address, account);
        self
    }

    pub fn insert_account(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, account);
    }

    pub fn insert_block_hash(&mut self, number: u64, hash: H256) {
        self.block_hashes.insert(number, hash);
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn storage_value(&self, address: &Address, key: &H256) -> U256 {
        self.accounts
            .get(address)
            .and_then(|account| account.storage.get(key).copied())
            .unwrap_or_default()
    }

    /// Depth of open checkpoints.
    pub fn checkpoint_depth(&self) -> usize {
        self.checkpoints.len()
    }

    fn record_header(&mut self, address: Address) {
        if self.checkpoints.is_empty() {
            return;
        }
        let previous = self
            .accounts
            .get(&address)
            .map(|account| (account.info, account.code.clone()));
        self.journal.push(JournalEntry::Header { address, previous });
    }

    fn account_mut(&mut self, address: Address) -> &mut Account {
        self.record_header(address);
        self.accounts.entry(address).or_default()
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Header { address, previous } => match previous {
                Some((info, code)) => {
                    let account = self.accounts.entry(address).or_default();
                    account.info = info;
                    account.code = code;
                }
                None => {
                    self.accounts.remove(&address);
                }
            },
            JournalEntry::Storage {
                address,
                key,
                previous,
            } => {
                if let Some(account) = self.accounts.get_mut(&address) {
                    account.storage.insert(key, previous);
                }
            }
            JournalEntry::Destroyed { address, previous } => {
                self.accounts.insert(address, *previous);
            }
        }
    }
}

impl WorldState for InMemoryWorldState {
    fn get_account_info(&self, address: Address) -> Result<Option<AccountInfo>, DatabaseError> {
        Ok(self.accounts.get(&address).map(|account| account.info))
    }

    fn get_code(&self, address: Address) -> Result<Bytes, DatabaseError> {
        Ok(self
            .accounts
            .get(&address)
            .map(|account| account.code.clone())
            .unwrap_or_default())
    }

    fn get_storage(&self, address: Address, key: H256) -> Result<U256, DatabaseError> {
        Ok(self.storage_value(&address, &key))
    }

    fn get_original_storage(&self, address: Address, key: H256) -> Result<U256, DatabaseError> {
        match self.original_storage.get(&(address, key)) {
            Some(value) => Ok(*value),
            None => self.get_storage(address, key),
        }
    }

    fn get_block_hash(&self, block_number: u64) -> Result<Option<H256>, DatabaseError> {
        Ok(self.block_hashes.get(&block_number).copied())
    }

    fn set_storage(
        &mut self,
        address: Address,
        key: H256,
        value: U256,
    ) -> Result<(), DatabaseError> {
        let previous = self.storage_value(&address, &key);
        self.original_storage
            .entry((address, key))
            .or_insert(previous);
        if !self.accounts.contains_key(&address) {
            self.account_mut(address);
        }
        if !self.checkpoints.is_empty() {
            self.journal.push(JournalEntry::Storage {
                address,
                key,
                previous,
            });
        }
        if let Some(account) = self.accounts.get_mut(&address) {
            account.storage.insert(key, value);
        }
        Ok(())
    }

    fn set_balance(&mut self, address: Address, balance: U256) -> Result<(), DatabaseError> {
        self.account_mut(address).info.balance = balance;
        Ok(())
    }

    fn set_nonce(&mut self, address: Address, nonce: u64) -> Result<(), DatabaseError> {
        self.account_mut(address).info.nonce = nonce;
        Ok(())
    }

    fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), DatabaseError> {
        let account = self.account_mut(address);
        account.info.code_hash = keccak(&code);
        account.code = code;
        Ok(())
    }

    fn destroy_account(&mut self, address: Address) -> Result<(), DatabaseError> {
        if let Some(previous) = self.accounts.remove(&address)
            && !self.checkpoints.is_empty()
        {
            self.journal.push(JournalEntry::Destroyed {
                address,
                previous: Box::new(previous),
            });
        }
        Ok(())
    }

    fn checkpoint(&mut self) {
        self.checkpoints.push(self.journal.len());
    }

    fn commit(&mut self) -> Result<(), DatabaseError> {
        self.checkpoints
            .pop()
            .ok_or(DatabaseError::NoCheckpoint("commit"))?;
        if self.checkpoints.is_empty() {
            self.journal.clear();
        }
        Ok(())
    }

    fn revert(&mut self) -> Result<(), DatabaseError> {
        let mark = self
            .checkpoints
            .pop()
            .ok_or(DatabaseError::NoCheckpoint("revert"))?;
        while self.journal.len() > mark {
            if let Some(entry) = self.journal.pop() {
                self.undo(entry);
            }
        }
        Ok(())
    }

    fn finalize_transaction(&mut self) -> Result<(), DatabaseError> {
        self.original_storage.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    #[test]
    fn revert_restores_every_change_since_checkpoint() {
        let mut db = InMemoryWorldState::new()
            .with_account(addr(1), Account::new(U256::from(100), Bytes::new(), 0));
        db.checkpoint();
        db.transfer(addr(1), addr(2), U256::from(40)).unwrap();
        db.set_storage(addr(1), H256::zero(), U256::one()).unwrap();
        db.increment_nonce(addr(1)).unwrap();
        db.revert().unwrap();
        assert_eq!(db.get_balance(addr(1)).unwrap(), U256::from(100));
        assert!(!db.account_exists(addr(2)).unwrap());
        assert_eq!(db.get_storage(addr(1), H256::zero()).unwrap(), U256::zero());
        assert_eq!(db.get_nonce(addr(1)).unwrap(), 0);
    }

    #[test]
    fn nested_commit_is_undone_by_outer_revert() {
        let mut db = InMemoryWorldState::new();
        db.checkpoint();
        db.checkpoint();
        db.set_code(addr(3), Bytes::from_static(&[0x00])).unwrap();
        db.commit().unwrap();
        assert!(db.get_account_info(addr(3)).unwrap().unwrap().has_code());
        db.revert().unwrap();
        assert!(db.is_empty(addr(3)).unwrap());
        assert_eq!(db.checkpoint_depth(), 0);
    }

    #[test]
    fn destroyed_accounts_come_back_on_revert() {
        let mut db = InMemoryWorldState::new().with_account(
            addr(5),
            Account::new(U256::one(), Bytes::new(), 1)
                .with_storage([(H256::zero(), U256::from(9))]),
        );
        db.checkpoint();
        db.destroy_account(addr(5)).unwrap();
        assert!(!db.account_exists(addr(5)).unwrap());
        db.revert().unwrap();
        assert_eq!(db.get_storage(addr(5), H256::zero()).unwrap(), U256::from(9));
    }

    #[test]
    fn original_storage_survives_writes_until_finalized() {
        let mut db = InMemoryWorldState::new().with_account(
            addr(1),
            Account::new(U256::zero(), Bytes::new(), 0)
                .with_storage([(H256::zero(), U256::from(7))]),
        );
        db.set_storage(addr(1), H256::zero(), U256::from(8)).unwrap();
        db.set_storage(addr(1), H256::zero(), U256::from(9)).unwrap();
        assert_eq!(
            db.get_original_storage(addr(1), H256::zero()).unwrap(),
            U256::from(7)
        );
        db.finalize_transaction().unwrap();
        assert_eq!(
            db.get_original_storage(addr(1), H256::zero()).unwrap(),
            U256::from(9)
        );
    }

    #[test]
    fn unbalanced_checkpoints_are_errors() {
        let mut db = InMemoryWorldState::new();
        assert_eq!(db.commit(), Err(DatabaseError::NoCheckpoint("commit")));
        assert_eq!(db.revert(), Err(DatabaseError::NoCheckpoint("revert")));
    }
}
