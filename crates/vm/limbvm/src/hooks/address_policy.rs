use std::fmt::Debug;

use ethereum_types::Address;
use rustc_hash::FxHashSet;

use crate::{constants::SIZE_PRECOMPILES_CANCUN, word};

/// Classification of addresses the interpreter special-cases.
pub trait AddressPolicy: Debug {
    fn is_precompile(&self, address: &Address) -> bool;

    /// Accounts owned by the host rather than by users.
    fn is_system_account(&self, address: &Address) -> bool;

    /// Accounts whose code and hash are not visible to EXTCODE* opcodes.
    fn is_non_user_account(&self, address: &Address) -> bool {
        self.is_precompile(address) || self.is_system_account(address)
    }

    /// Whether a message to `address` requires the account to exist already.
    fn must_be_present(&self, _address: &Address) -> bool {
        false
    }

    /// Sender seen by a child frame when `caller` messages `recipient`.
    fn sender_for(&self, caller: Address, _recipient: Address) -> Address {
        caller
    }

    /// Whether code at `address` refuses to run in someone else's context
    /// (CALLCODE, DELEGATECALL).
    fn forbids_code_delegation(&self, _address: &Address) -> bool {
        false
    }

    /// Addresses that are always warm.
    fn always_warm(&self) -> Vec<Address>;
}

/// Precompiles at `0x01..=count`, an explicit set of system accounts and an optional
/// requirement that message targets exist.
#[derive(Debug, Clone)]
pub struct StandardAddressPolicy {
    precompile_count: u64,
    system_accounts: FxHashSet<Address>,
    require_existing_targets: bool,
    delegation_forbidden: FxHashSet<Address>,
}

impl Default for StandardAddressPolicy {
    fn default() -> Self {
        Self {
            precompile_count: SIZE_PRECOMPILES_CANCUN,
            system_accounts: FxHashSet::default(),
            require_existing_targets: false,
            delegation_forbidden: FxHashSet::default(),
        }
    }
}

impl StandardAddressPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_accounts(mut self, accounts: impl IntoIterator<Item = Address>) -> Self {
        self.system_accounts.extend(accounts);
        self
    }

    pub fn with_required_targets(mut self, required: bool) -> Self {
        self.require_existing_targets = required;
        self
    }

    pub fn with_delegation_forbidden(mut self, accounts: impl IntoIterator<Item = Address>) -> Self {
        self.delegation_forbidden.extend(accounts);
        self
    }
}

impl AddressPolicy for StandardAddressPolicy {
    fn is_precompile(&self, address: &Address) -> bool {
        let value = word::from_address(address);
        word::fits_u64(value) && (1..=self.precompile_count).contains(&value[0])
    }

    fn is_system_account(&self, address: &Address) -> bool {
        self.system_accounts.contains(address)
    }

    fn must_be_present(&self, address: &Address) -> bool {
        self.require_existing_targets && !self.is_precompile(address)
    }

    fn forbids_code_delegation(&self, address: &Address) -> bool {
        self.delegation_forbidden.contains(address)
    }

    fn always_warm(&self) -> Vec<Address> {
        (1..=self.precompile_count)
            .map(Address::from_low_u64_be)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precompile_range() {
        let policy = StandardAddressPolicy::new();
        assert!(!policy.is_precompile(&Address::zero()));
        assert!(policy.is_precompile(&Address::from_low_u64_be(1)));
        assert!(policy.is_precompile(&Address::from_low_u64_be(10)));
        assert!(!policy.is_precompile(&Address::from_low_u64_be(11)));
        let mut high = Address::from_low_u64_be(4);
        high.0[0] = 1;
        assert!(!policy.is_precompile(&high));
        assert_eq!(policy.always_warm().len(), 10);
    }

    #[test]
    fn system_accounts_are_not_user_accounts() {
        let system = Address::from_low_u64_be(0x167);
        let policy = StandardAddressPolicy::new().with_system_accounts([system]);
        assert!(policy.is_non_user_account(&system));
        assert!(policy.is_non_user_account(&Address::from_low_u64_be(2)));
        assert!(!policy.is_non_user_account(&Address::from_low_u64_be(0x1000)));
    }

    #[test]
    fn required_targets_exclude_precompiles() {
        let policy = StandardAddressPolicy::new().with_required_targets(true);
        assert!(policy.must_be_present(&Address::from_low_u64_be(0x1000)));
        assert!(!policy.must_be_present(&Address::from_low_u64_be(4)));
        assert!(!StandardAddressPolicy::new().must_be_present(&Address::from_low_u64_be(0x1000)));
    }
}
