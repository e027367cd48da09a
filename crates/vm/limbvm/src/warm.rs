//! Per-transaction warm/cold access tracking (EIP-2929).
//!
//! Keys are interned into dense ids the first time they are seen, warmth lives in a bit vector
//! and every cold-to-warm transition is pushed onto a single undo stack. Frames only remember the
//! stack length at their entry and unwind to it when they fail, so the whole call tree shares one
//! warmth universe.

use bitvec::vec::BitVec;
use ethereum_types::{Address, U256};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    errors::InternalError,
    word::{self, Limbs},
};

/// An address (`slot == None`) or one of its storage slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WarmKey {
    pub address: Address,
    pub slot: Option<U256>,
}

impl WarmKey {
    pub fn address(address: Address) -> Self {
        Self {
            address,
            slot: None,
        }
    }

    pub fn slot(address: Address, slot: Limbs) -> Self {
        Self {
            address,
            slot: Some(word::intern(slot)),
        }
    }
}

/// Stack length to unwind to when the frame that recorded it fails.
pub type WarmMark = usize;

#[derive(Debug, Default, Clone)]
pub struct WarmTracker {
    index: FxHashMap<WarmKey, usize>,
    keys: Vec<WarmKey>,
    warm: BitVec,
    undo: Vec<usize>,
    always_warm: FxHashSet<Address>,
}

impl WarmTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers addresses that are warm without ever being tracked (precompiles, system
    /// contracts).
    pub fn set_always_warm(&mut self, addresses: impl IntoIterator<Item = Address>) {
        self.always_warm = addresses.into_iter().collect();
    }

    #[inline]
    pub fn is_always_warm(&self, address: &Address) -> bool {
        self.always_warm.contains(address)
    }

    fn intern(&mut self, key: WarmKey) -> usize {
        if let Some(id) = self.index.get(&key) {
            return *id;
        }
        let id = self.keys.len();
        self.keys.push(key);
        self.warm.push(false);
        self.index.insert(key, id);
        id
    }

    /// Marks `key` warm and reports whether it already was.
    fn touch(&mut self, key: WarmKey) -> bool {
        let id = self.intern(key);
        let was_warm = self.warm.get(id).is_some_and(|bit| *bit);
        if !was_warm {
            self.warm.set(id, true);
            self.undo.push(id);
        }
        was_warm
    }

    /// Returns the previous warmth of `address` and warms it.
    pub fn is_warm_address(&mut self, address: Address) -> bool {
        if self.is_always_warm(&address) {
            return true;
        }
        self.touch(WarmKey::address(address))
    }

    /// Returns the previous warmth of `slot` in `address` and warms it.
    pub fn is_warm_slot(&mut self, address: Address, slot: Limbs) -> bool {
        self.touch(WarmKey::slot(address, slot))
    }

    /// Warmth of `address` without recording an access.
    pub fn peek_address(&self, address: &Address) -> bool {
        self.is_always_warm(address) || self.peek(&WarmKey::address(*address))
    }

    pub fn peek(&self, key: &WarmKey) -> bool {
        self.index
            .get(key)
            .and_then(|id| self.warm.get(*id))
            .is_some_and(|bit| *bit)
    }

    /// Current undo-stack length, to be handed back to [`Self::unwind_to`].
    #[inline]
    pub fn mark(&self) -> WarmMark {
        self.undo.len()
    }

    /// Cools every key warmed after `mark` was taken.
    pub fn unwind_to(&mut self, mark: WarmMark) {
        while self.undo.len() > mark {
            if let Some(id) = self.undo.pop() {
                self.warm.set(id, false);
            }
        }
    }

    /// Keys warmed in the current transaction.
    pub fn warm_len(&self) -> usize {
        self.undo.len()
    }

    /// Checks that no warmth leaked from a previous transaction.
    pub fn begin_transaction(&self) -> Result<(), InternalError> {
        if !self.undo.is_empty() || self.warm.any() {
            return Err(InternalError::WarmStateLeak);
        }
        Ok(())
    }

    /// Flips every key touched by the transaction back to cold. Interned ids are kept.
    pub fn end_transaction(&mut self) {
        self.unwind_to(0);
    }
}
