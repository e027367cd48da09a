use crate::{
    errors::{ContextResult, TxValidationError, VMError},
    hooks::hook::Hook,
    vm::VM,
    word,
};

/// Maximum refund quotient (EIP-3529).
pub const MAX_REFUND_QUOTIENT: u64 = 5;

/// Validates the message, bumps the sender nonce, prewarms accessed addresses and settles the
/// refund once the message is done.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHook;

impl Hook for DefaultHook {
    fn prepare_execution(&mut self, vm: &mut VM<'_>) -> Result<(), VMError> {
        vm.warm.begin_transaction()?;
        let always_warm = vm.address_policy.always_warm();
        vm.warm.set_always_warm(always_warm);

        let caller = vm.message.caller;
        if vm.db.get_balance(caller)? < vm.message.value {
            return Err(TxValidationError::InsufficientBalance(caller).into());
        }
        if vm.message.is_create() && vm.message.data.len() > vm.config.max_initcode_size {
            return Err(TxValidationError::InitcodeSizeExceeded(vm.message.data.len()).into());
        }
        if vm.db.get_nonce(caller)? == u64::MAX {
            return Err(TxValidationError::NonceOverflow(caller).into());
        }
        vm.db.increment_nonce(caller)?;

        // EIP-2929 and EIP-3651
        vm.warm.is_warm_address(vm.env.origin);
        vm.warm.is_warm_address(caller);
        vm.warm.is_warm_address(vm.current_call_frame.to);
        vm.warm.is_warm_address(vm.env.coinbase);
        for (address, keys) in &vm.message.access_list {
            vm.warm.is_warm_address(*address);
            for key in keys {
                vm.warm.is_warm_slot(*address, word::from_h256(key));
            }
        }

        Ok(())
    }

    fn finalize_execution(
        &mut self,
        vm: &mut VM<'_>,
        report: &mut ContextResult,
    ) -> Result<(), VMError> {
        if report.is_success() {
            for address in vm.substate.selfdestructed() {
                vm.db.destroy_account(address)?;
            }
        }

        let refund_cap = report.gas_used / MAX_REFUND_QUOTIENT;
        let refunded = u64::try_from(vm.substate.refunded_gas)
            .unwrap_or_default()
            .min(refund_cap);
        vm.substate.refunded_gas = i64::try_from(refunded).unwrap_or_default();
        report.gas_used = report.gas_used.saturating_sub(refunded);

        vm.warm.end_transaction();
        vm.db.finalize_transaction()?;
        Ok(())
    }
}
