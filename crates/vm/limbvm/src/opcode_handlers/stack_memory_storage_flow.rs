use crate::{
    constants::WORD_SIZE_IN_BYTES_USIZE,
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost::Tier,
    memory::calculate_memory_size,
    utils::{limbs_to_usize, size_offset_to_usize},
    vm::VM,
    warm::WarmKey,
    word,
};

// Stack, Memory, Storage and Flow Operations (15)
// Opcodes: POP, MLOAD, MSTORE, MSTORE8, SLOAD, SSTORE, JUMP, JUMPI, PC, MSIZE, GAS, JUMPDEST, TLOAD, TSTORE, MCOPY

impl<'a> VM<'a> {
    // POP operation
    #[inline]
    pub fn op_pop(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;
        current_call_frame.stack.pop1()?;

        Ok(OpcodeResult::Continue)
    }

    // TLOAD operation
    pub fn op_tload(&mut self) -> Result<OpcodeResult, VMError> {
        self.current_call_frame
            .increase_consumed_gas(self.schedule.transient_storage())?;

        let key = self.current_call_frame.stack.pop1()?;
        let to = self.current_call_frame.to;
        let value = self.substate.get_transient(&to, &word::intern(key));

        self.current_call_frame.stack.push_word(value)?;

        Ok(OpcodeResult::Continue)
    }

    // TSTORE operation
    pub fn op_tstore(&mut self) -> Result<OpcodeResult, VMError> {
        if self.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }
        self.current_call_frame
            .increase_consumed_gas(self.schedule.transient_storage())?;

        let [key, value] = self.current_call_frame.stack.pop()?;
        let to = self.current_call_frame.to;
        self.substate
            .set_transient(&to, &word::intern(key), word::to_u256(value));

        Ok(OpcodeResult::Continue)
    }

    // MLOAD operation
    #[inline]
    pub fn op_mload(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [offset] = current_call_frame.stack.peek()?;
        let offset = limbs_to_usize(offset)?;

        let new_memory_size = calculate_memory_size(offset, WORD_SIZE_IN_BYTES_USIZE)?;

        current_call_frame.increase_consumed_gas(
            self.schedule
                .memory_access(new_memory_size, current_call_frame.memory.len())?,
        )?;
        current_call_frame.stack.pop1()?;

        let value = current_call_frame.memory.load_word(offset)?;
        current_call_frame.stack.push(value)?;

        Ok(OpcodeResult::Continue)
    }

    // MSTORE operation
    #[inline]
    pub fn op_mstore(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [offset, value] = current_call_frame.stack.peek()?;
        let offset = limbs_to_usize(offset)?;

        let new_memory_size = calculate_memory_size(offset, WORD_SIZE_IN_BYTES_USIZE)?;

        current_call_frame.increase_consumed_gas(
            self.schedule
                .memory_access(new_memory_size, current_call_frame.memory.len())?,
        )?;
        current_call_frame.stack.drop_n(2)?;

        current_call_frame.memory.store_word(offset, value)?;

        Ok(OpcodeResult::Continue)
    }

    // MSTORE8 operation
    pub fn op_mstore8(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [offset, value] = current_call_frame.stack.peek()?;
        let offset = limbs_to_usize(offset)?;

        let new_memory_size = calculate_memory_size(offset, 1)?;

        current_call_frame.increase_consumed_gas(
            self.schedule
                .memory_access(new_memory_size, current_call_frame.memory.len())?,
        )?;
        current_call_frame.stack.drop_n(2)?;

        let [low_byte, ..] = value[0].to_le_bytes();
        current_call_frame.memory.store_byte(offset, low_byte)?;

        Ok(OpcodeResult::Continue)
    }

    // SLOAD operation
    pub fn op_sload(&mut self) -> Result<OpcodeResult, VMError> {
        let [key] = self.current_call_frame.stack.peek()?;
        let address = self.current_call_frame.to;

        let storage_slot_was_cold = !self.warm.peek(&WarmKey::slot(address, key));
        self.current_call_frame
            .increase_consumed_gas(self.schedule.sload(storage_slot_was_cold))?;
        self.warm.is_warm_slot(address, key);
        self.current_call_frame.stack.pop1()?;

        let value = word::from_u256(self.db.get_storage(address, word::to_h256(key))?);
        self.current_call_frame.stack.push(value)?;

        if self.current_call_frame.track_state_changes {
            self.tracer.borrow_mut().storage_read(address, key, value);
        }

        Ok(OpcodeResult::Continue)
    }

    // SSTORE operation
    pub fn op_sstore(&mut self) -> Result<OpcodeResult, VMError> {
        if self.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        // EIP-2200: SSTORE fails when no more than the stipend is left.
        if self.current_call_frame.gas_remaining <= self.schedule.sstore_sentry() {
            return Err(ExceptionalHalt::OutOfGas.into());
        }

        let [key, new_value] = self.current_call_frame.stack.peek()?;
        let address = self.current_call_frame.to;
        let slot = word::to_h256(key);

        let current_value = word::from_u256(self.db.get_storage(address, slot)?);
        let original_value = word::from_u256(self.db.get_original_storage(address, slot)?);

        let storage_slot_was_cold = !self.warm.peek(&WarmKey::slot(address, key));
        let mut cost = self
            .schedule
            .sstore_cost(original_value, current_value, new_value);
        if storage_slot_was_cold {
            cost = cost
                .checked_add(self.schedule.cold_sload())
                .ok_or(ExceptionalHalt::OutOfGas)?;
        }
        self.current_call_frame.increase_consumed_gas(cost)?;
        self.warm.is_warm_slot(address, key);
        self.current_call_frame.stack.drop_n(2)?;

        self.substate.add_refund(self.schedule.sstore_refund(
            original_value,
            current_value,
            new_value,
        ));

        self.db
            .set_storage(address, slot, word::to_u256(new_value))?;
        self.current_call_frame.last_storage_write = Some((key, new_value));

        if self.current_call_frame.track_state_changes {
            self.tracer
                .borrow_mut()
                .storage_written(address, key, new_value);
        }

        Ok(OpcodeResult::Continue)
    }

    // MSIZE operation
    pub fn op_msize(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        let size = current_call_frame.memory.len();
        current_call_frame.stack.push_usize(size)?;

        Ok(OpcodeResult::Continue)
    }

    // GAS operation
    pub fn op_gas(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        // Gas left after paying for this instruction.
        let remaining_gas = current_call_frame.gas_remaining;
        current_call_frame.stack.push_u64(remaining_gas)?;

        Ok(OpcodeResult::Continue)
    }

    // MCOPY operation
    pub fn op_mcopy(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [dest_offset, src_offset, size] = current_call_frame.stack.peek()?;
        let (size, dest_offset) = size_offset_to_usize(size, dest_offset)?;
        let src_offset = if size == 0 {
            0
        } else {
            limbs_to_usize(src_offset)?
        };

        let new_memory_size = calculate_memory_size(src_offset, size)?
            .max(calculate_memory_size(dest_offset, size)?);

        current_call_frame.increase_consumed_gas(self.schedule.copy(
            new_memory_size,
            current_call_frame.memory.len(),
            size,
        )?)?;
        current_call_frame.stack.drop_n(3)?;

        current_call_frame
            .memory
            .copy_within(src_offset, dest_offset, size)?;

        Ok(OpcodeResult::Continue)
    }

    // JUMP operation
    #[inline]
    pub fn op_jump(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Mid))?;

        let jump_address = current_call_frame.stack.pop1()?;
        current_call_frame.jump(jump_address)?;

        Ok(OpcodeResult::Continue)
    }

    // JUMPI operation
    #[inline]
    pub fn op_jumpi(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::High))?;

        let [jump_address, condition] = current_call_frame.stack.pop()?;
        if !word::is_zero(condition) {
            current_call_frame.jump(jump_address)?;
        }

        Ok(OpcodeResult::Continue)
    }

    // JUMPDEST operation
    #[inline]
    pub fn op_jumpdest(&mut self) -> Result<OpcodeResult, VMError> {
        self.current_call_frame
            .increase_consumed_gas(self.schedule.jumpdest())?;

        Ok(OpcodeResult::Continue)
    }

    // PC operation
    pub fn op_pc(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        // The program counter already moved past this opcode.
        let pc = current_call_frame.pc.saturating_sub(1);
        current_call_frame.stack.push_usize(pc)?;

        Ok(OpcodeResult::Continue)
    }
}
