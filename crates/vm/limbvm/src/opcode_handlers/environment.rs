use ethereum_types::Address;

use crate::{
    constants::WORD_SIZE_IN_BYTES_USIZE,
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost::Tier,
    memory::calculate_memory_size,
    utils::{limbs_to_usize_saturating, size_offset_to_usize, word_to_address},
    vm::VM,
    word,
};

// Environmental Information (16)
// Opcodes: ADDRESS, BALANCE, ORIGIN, CALLER, CALLVALUE, CALLDATALOAD, CALLDATASIZE, CALLDATACOPY, CODESIZE, CODECOPY, GASPRICE, EXTCODESIZE, EXTCODECOPY, RETURNDATASIZE, RETURNDATACOPY, EXTCODEHASH

impl<'a> VM<'a> {
    // ADDRESS operation
    pub fn op_address(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        let addr = current_call_frame.to; // The recipient of the current call.
        current_call_frame.stack.push_address(addr)?;

        Ok(OpcodeResult::Continue)
    }

    // BALANCE operation
    pub fn op_balance(&mut self) -> Result<OpcodeResult, VMError> {
        let [address] = self.current_call_frame.stack.peek()?;
        let address = word_to_address(address);

        // System accounts expose no balance and are never warmed.
        if self.address_policy.is_system_account(&address) {
            self.current_call_frame
                .increase_consumed_gas(self.schedule.cold_account_access())?;
            self.current_call_frame.stack.pop1()?;
            self.current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }

        let address_was_cold = !self.warm.peek_address(&address);
        self.current_call_frame
            .increase_consumed_gas(self.schedule.account_access(address_was_cold))?;
        self.warm.is_warm_address(address);

        let balance = self.db.get_balance(address)?;
        self.current_call_frame.stack.pop1()?;
        self.current_call_frame.stack.push_word(balance)?;

        Ok(OpcodeResult::Continue)
    }

    // ORIGIN operation
    pub fn op_origin(&mut self) -> Result<OpcodeResult, VMError> {
        let origin = self.env.origin;
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        current_call_frame.stack.push_address(origin)?;

        Ok(OpcodeResult::Continue)
    }

    // CALLER operation
    pub fn op_caller(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        let caller = current_call_frame.msg_sender;
        current_call_frame.stack.push_address(caller)?;

        Ok(OpcodeResult::Continue)
    }

    // CALLVALUE operation
    pub fn op_callvalue(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        let callvalue = current_call_frame.msg_value;
        current_call_frame.stack.push(callvalue)?;

        Ok(OpcodeResult::Continue)
    }

    // CALLDATALOAD operation
    #[inline]
    pub fn op_calldataload(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;

        let offset = limbs_to_usize_saturating(current_call_frame.stack.pop1()?);

        // All bytes after the end of the calldata are set to 0.
        let mut data = [0u8; WORD_SIZE_IN_BYTES_USIZE];
        if let Some(available) = current_call_frame.calldata.get(offset..) {
            let size = available.len().min(WORD_SIZE_IN_BYTES_USIZE);
            if let (Some(target), Some(source)) = (data.get_mut(..size), available.get(..size)) {
                target.copy_from_slice(source);
            }
        }

        current_call_frame.stack.push(word::from_be_bytes(&data))?;

        Ok(OpcodeResult::Continue)
    }

    // CALLDATASIZE operation
    pub fn op_calldatasize(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        let size = current_call_frame.calldata.len();
        current_call_frame.stack.push_usize(size)?;

        Ok(OpcodeResult::Continue)
    }

    // CALLDATACOPY operation
    pub fn op_calldatacopy(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [dest_offset, calldata_offset, size] = current_call_frame.stack.peek()?;
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let calldata_offset = limbs_to_usize_saturating(calldata_offset);

        let new_memory_size = calculate_memory_size(dest_offset, size)?;

        current_call_frame.increase_consumed_gas(self.schedule.copy(
            new_memory_size,
            current_call_frame.memory.len(),
            size,
        )?)?;
        current_call_frame.stack.drop_n(3)?;

        if size == 0 {
            return Ok(OpcodeResult::Continue);
        }

        current_call_frame.memory.write_bytes(
            dest_offset,
            &current_call_frame.calldata,
            calldata_offset,
            size,
        )?;

        Ok(OpcodeResult::Continue)
    }

    // CODESIZE operation
    pub fn op_codesize(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        let size = current_call_frame.program.len();
        current_call_frame.stack.push_usize(size)?;

        Ok(OpcodeResult::Continue)
    }

    // CODECOPY operation
    pub fn op_codecopy(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [dest_offset, code_offset, size] = current_call_frame.stack.peek()?;
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let code_offset = limbs_to_usize_saturating(code_offset);

        let new_memory_size = calculate_memory_size(dest_offset, size)?;

        current_call_frame.increase_consumed_gas(self.schedule.copy(
            new_memory_size,
            current_call_frame.memory.len(),
            size,
        )?)?;
        current_call_frame.stack.drop_n(3)?;

        if size == 0 {
            return Ok(OpcodeResult::Continue);
        }

        current_call_frame.memory.write_bytes(
            dest_offset,
            current_call_frame.program.code(),
            code_offset,
            size,
        )?;

        Ok(OpcodeResult::Continue)
    }

    // GASPRICE operation
    pub fn op_gasprice(&mut self) -> Result<OpcodeResult, VMError> {
        let gas_price = self.env.gas_price;
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        current_call_frame.stack.push_word(gas_price)?;

        Ok(OpcodeResult::Continue)
    }

    /// Charges the account access of an EXTCODE* target and warms it. Non-user accounts must
    /// afford a cold access even when already warm.
    fn charge_code_access(&mut self, address: Address, extra: u64) -> Result<(), VMError> {
        if self.address_policy.is_non_user_account(&address) {
            let preliminary = self
                .schedule
                .cold_account_access()
                .checked_add(extra)
                .ok_or(ExceptionalHalt::OutOfGas)?;
            if self.current_call_frame.gas_remaining < preliminary {
                return Err(ExceptionalHalt::OutOfGas.into());
            }
        }

        let address_was_cold = !self.warm.peek_address(&address);
        let cost = self
            .schedule
            .account_access(address_was_cold)
            .checked_add(extra)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        self.current_call_frame.increase_consumed_gas(cost)?;
        self.warm.is_warm_address(address);
        Ok(())
    }

    // EXTCODESIZE operation
    pub fn op_extcodesize(&mut self) -> Result<OpcodeResult, VMError> {
        let [address] = self.current_call_frame.stack.peek()?;
        let address = word_to_address(address);

        self.charge_code_access(address, 0)?;
        self.current_call_frame.stack.pop1()?;

        if self.address_policy.is_non_user_account(&address) {
            self.current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }

        let code_length = self.db.get_code(address)?.len();
        self.current_call_frame.stack.push_usize(code_length)?;

        Ok(OpcodeResult::Continue)
    }

    // EXTCODECOPY operation
    pub fn op_extcodecopy(&mut self) -> Result<OpcodeResult, VMError> {
        let call_frame = &mut self.current_call_frame;
        let [address, dest_offset, offset, size] = call_frame.stack.peek()?;

        let address = word_to_address(address);
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let offset = limbs_to_usize_saturating(offset);

        let current_memory_size = call_frame.memory.len();
        let new_memory_size = calculate_memory_size(dest_offset, size)?;

        // Everything except the account access itself.
        let copy_cost = self
            .schedule
            .extcodecopy(size, new_memory_size, current_memory_size, false)?
            .saturating_sub(self.schedule.account_access(false));
        self.charge_code_access(address, copy_cost)?;
        self.current_call_frame.stack.drop_n(4)?;

        if size == 0 || self.address_policy.is_non_user_account(&address) {
            return Ok(OpcodeResult::Continue);
        }

        let bytecode = self.db.get_code(address)?;
        self.current_call_frame
            .memory
            .write_bytes(dest_offset, &bytecode, offset, size)?;

        Ok(OpcodeResult::Continue)
    }

    // RETURNDATASIZE operation
    pub fn op_returndatasize(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        let size = current_call_frame.sub_return_data.len();
        current_call_frame.stack.push_usize(size)?;

        Ok(OpcodeResult::Continue)
    }

    // RETURNDATACOPY operation
    pub fn op_returndatacopy(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [dest_offset, returndata_offset, size] = current_call_frame.stack.peek()?;

        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        if !word::fits_u64(returndata_offset) {
            return Err(ExceptionalHalt::OutOfBounds.into());
        }
        let returndata_offset = usize::try_from(word::to_u64_saturating(returndata_offset))
            .map_err(|_| ExceptionalHalt::OutOfBounds)?;

        let new_memory_size = calculate_memory_size(dest_offset, size)?;

        current_call_frame.increase_consumed_gas(self.schedule.copy(
            new_memory_size,
            current_call_frame.memory.len(),
            size,
        )?)?;
        current_call_frame.stack.drop_n(3)?;

        let copy_limit = returndata_offset
            .checked_add(size)
            .ok_or(ExceptionalHalt::OutOfBounds)?;
        let Some(slice) = current_call_frame
            .sub_return_data
            .get(returndata_offset..copy_limit)
        else {
            return Err(ExceptionalHalt::OutOfBounds.into());
        };
        let slice = slice.to_vec();
        current_call_frame.memory.store_data(dest_offset, &slice)?;

        Ok(OpcodeResult::Continue)
    }

    // EXTCODEHASH operation
    pub fn op_extcodehash(&mut self) -> Result<OpcodeResult, VMError> {
        let [address] = self.current_call_frame.stack.peek()?;
        let address = word_to_address(address);

        self.charge_code_access(address, 0)?;
        self.current_call_frame.stack.pop1()?;

        if self.address_policy.is_non_user_account(&address) {
            self.current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }

        // An account is considered empty when it has no code and zero nonce and zero balance. [EIP-161]
        match self.db.get_account_info(address)? {
            Some(info) if !info.is_empty() => {
                self.current_call_frame
                    .stack
                    .push(word::from_h256(&info.code_hash))?;
            }
            _ => self.current_call_frame.stack.push_zero()?,
        }

        Ok(OpcodeResult::Continue)
    }
}
