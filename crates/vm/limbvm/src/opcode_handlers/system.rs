use bytes::Bytes;
use ethereum_types::Address;
use tracing::{debug, warn};

use crate::{
    call_frame::{CallFrame, CallKind},
    errors::{ContextResult, ExceptionalHalt, InternalError, OpcodeResult, VMError},
    gas_cost::max_message_call_gas,
    memory::calculate_memory_size,
    utils::{calculate_create_address, calculate_create2_address, size_offset_to_usize, word_to_address},
    vm::{VM, ValueTransfer},
    word::{self, Limbs},
};

// System Operations (10)
// Opcodes: CREATE, CALL, CALLCODE, RETURN, DELEGATECALL, CREATE2, STATICCALL, REVERT, INVALID, SELFDESTRUCT

/// Requested gas and memory regions shared by every CALL-family opcode.
#[derive(Debug, Clone, Copy)]
struct CallOperands {
    gas: Limbs,
    args_offset: usize,
    args_size: usize,
    ret_offset: usize,
    ret_size: usize,
}

impl CallOperands {
    fn new(
        gas: Limbs,
        args_offset: Limbs,
        args_size: Limbs,
        ret_offset: Limbs,
        ret_size: Limbs,
    ) -> Result<Self, VMError> {
        let (args_size, args_offset) = size_offset_to_usize(args_size, args_offset)?;
        let (ret_size, ret_offset) = size_offset_to_usize(ret_size, ret_offset)?;
        Ok(Self {
            gas,
            args_offset,
            args_size,
            ret_offset,
            ret_size,
        })
    }

    /// Memory needed to cover both the outgoing and the incoming region.
    fn memory_size(&self) -> Result<usize, VMError> {
        Ok(calculate_memory_size(self.args_offset, self.args_size)?
            .max(calculate_memory_size(self.ret_offset, self.ret_size)?))
    }
}

/// Who a message is from, whose context it runs in and whose code it runs.
#[derive(Debug, Clone, Copy)]
struct CallTarget {
    kind: CallKind,
    sender: Address,
    recipient: Address,
    code_address: Address,
    value: Limbs,
    /// Whether `value` moves from the current frame to the recipient.
    transfers_value: bool,
    is_static: bool,
}

impl<'a> VM<'a> {
    // CALL operation
    pub fn op_call(&mut self) -> Result<OpcodeResult, VMError> {
        let [gas, callee, value, args_offset, args_size, ret_offset, ret_size] =
            self.current_call_frame.stack.peek()?;
        let operands = CallOperands::new(gas, args_offset, args_size, ret_offset, ret_size)?;
        let callee = word_to_address(callee);

        if self.current_call_frame.is_static && !word::is_zero(value) {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let current_address = self.current_call_frame.to;
        let target = CallTarget {
            kind: CallKind::Call,
            sender: self.address_policy.sender_for(current_address, callee),
            recipient: callee,
            code_address: callee,
            value,
            transfers_value: true,
            is_static: self.current_call_frame.is_static,
        };

        self.generic_call(target, operands, 7)
    }

    // CALLCODE operation
    pub fn op_callcode(&mut self) -> Result<OpcodeResult, VMError> {
        let [gas, code_address, value, args_offset, args_size, ret_offset, ret_size] =
            self.current_call_frame.stack.peek()?;
        let operands = CallOperands::new(gas, args_offset, args_size, ret_offset, ret_size)?;
        let code_address = word_to_address(code_address);

        // Sender and recipient are the same in this case. But the code executed is from another account.
        let current_address = self.current_call_frame.to;
        let target = CallTarget {
            kind: CallKind::CallCode,
            sender: self
                .address_policy
                .sender_for(current_address, current_address),
            recipient: current_address,
            code_address,
            value,
            transfers_value: true,
            is_static: self.current_call_frame.is_static,
        };

        self.generic_call(target, operands, 7)
    }

    // DELEGATECALL operation
    pub fn op_delegatecall(&mut self) -> Result<OpcodeResult, VMError> {
        let [gas, code_address, args_offset, args_size, ret_offset, ret_size] =
            self.current_call_frame.stack.peek()?;
        let operands = CallOperands::new(gas, args_offset, args_size, ret_offset, ret_size)?;
        let code_address = word_to_address(code_address);

        let frame = &self.current_call_frame;
        let target = CallTarget {
            kind: CallKind::DelegateCall,
            sender: frame.msg_sender,
            recipient: frame.to,
            code_address,
            value: frame.msg_value,
            transfers_value: false,
            is_static: frame.is_static,
        };

        self.generic_call(target, operands, 6)
    }

    // STATICCALL operation
    pub fn op_staticcall(&mut self) -> Result<OpcodeResult, VMError> {
        let [gas, callee, args_offset, args_size, ret_offset, ret_size] =
            self.current_call_frame.stack.peek()?;
        let operands = CallOperands::new(gas, args_offset, args_size, ret_offset, ret_size)?;
        let callee = word_to_address(callee);

        let current_address = self.current_call_frame.to;
        let target = CallTarget {
            kind: CallKind::StaticCall,
            sender: self.address_policy.sender_for(current_address, callee),
            recipient: callee,
            code_address: callee,
            value: word::ZERO,
            transfers_value: false,
            is_static: true,
        };

        self.generic_call(target, operands, 6)
    }

    // CREATE operation
    pub fn op_create(&mut self) -> Result<OpcodeResult, VMError> {
        let [value, code_offset, code_size] = self.current_call_frame.stack.peek()?;
        self.generic_create(value, code_offset, code_size, None)
    }

    // CREATE2 operation
    pub fn op_create2(&mut self) -> Result<OpcodeResult, VMError> {
        let [value, code_offset, code_size, salt] = self.current_call_frame.stack.peek()?;
        self.generic_create(value, code_offset, code_size, Some(salt))
    }

    // RETURN operation
    #[inline]
    pub fn op_return(&mut self) -> Result<OpcodeResult, VMError> {
        self.set_output_from_memory()?;
        Ok(OpcodeResult::Halt)
    }

    // REVERT operation
    pub fn op_revert(&mut self) -> Result<OpcodeResult, VMError> {
        // The reversion of changes happens when the frame exits.
        self.set_output_from_memory()?;
        Err(VMError::RevertOpcode)
    }

    /// ### INVALID operation
    /// Reverts consuming all gas, no return data.
    pub fn op_invalid(&mut self) -> Result<OpcodeResult, VMError> {
        Err(ExceptionalHalt::InvalidOpcode.into())
    }

    // SELFDESTRUCT operation
    pub fn op_selfdestruct(&mut self) -> Result<OpcodeResult, VMError> {
        if self.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let [beneficiary] = self.current_call_frame.stack.peek()?;
        let beneficiary = word_to_address(beneficiary);

        if let Some(hook) = self.overrides.self_destruct() {
            self.current_call_frame.stack.pop1()?;
            return hook.self_destruct(self, beneficiary);
        }

        let to = self.current_call_frame.to;
        let balance = self.db.get_balance(to)?;
        let beneficiary_was_cold = !self.warm.peek_address(&beneficiary);
        let creates_account = !balance.is_zero() && self.db.is_empty(beneficiary)?;

        self.current_call_frame.increase_consumed_gas(
            self.schedule
                .selfdestruct_cost(beneficiary_was_cold, creates_account),
        )?;
        self.warm.is_warm_address(beneficiary);
        self.current_call_frame.stack.pop1()?;

        // [EIP-6780] - the account only disappears when created in the same transaction
        self.db.transfer(to, beneficiary, balance)?;
        if self.substate.is_account_created(&to) {
            // If the beneficiary is the destroyed account itself, the Ether is burnt.
            self.db.set_balance(to, Default::default())?;
            self.substate.add_selfdestruct(to);
        }

        Ok(OpcodeResult::Halt)
    }

    /// Charges the memory expansion of RETURN/REVERT and copies the output region.
    fn set_output_from_memory(&mut self) -> Result<(), VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [offset, size] = current_call_frame.stack.peek()?;
        let (size, offset) = size_offset_to_usize(size, offset)?;

        let new_memory_size = calculate_memory_size(offset, size)?;
        current_call_frame.increase_consumed_gas(
            self.schedule
                .exit_opcode(new_memory_size, current_call_frame.memory.len())?,
        )?;
        current_call_frame.stack.drop_n(2)?;

        current_call_frame.output = current_call_frame.memory.load_range(offset, size)?;
        Ok(())
    }

    /// Shared flow of CALL, CALLCODE, DELEGATECALL and STATICCALL. The operands are still on
    /// the stack and are only consumed once the call has been paid for.
    fn generic_call(
        &mut self,
        target: CallTarget,
        operands: CallOperands,
        operand_count: usize,
    ) -> Result<OpcodeResult, VMError> {
        let CallTarget {
            kind,
            sender,
            recipient,
            code_address,
            value,
            transfers_value,
            is_static,
        } = target;

        if matches!(kind, CallKind::CallCode | CallKind::DelegateCall)
            && self.address_policy.forbids_code_delegation(&code_address)
        {
            return Err(ExceptionalHalt::InvalidOpcode.into());
        }
        if self.address_policy.must_be_present(&code_address)
            && !self.db.account_exists(code_address)?
        {
            return Err(ExceptionalHalt::InvalidAddress.into());
        }

        let moves_value = transfers_value && !word::is_zero(value);
        let creates_account =
            moves_value && kind == CallKind::Call && self.db.is_empty(recipient)?;

        let new_memory_size = operands.memory_size()?;
        let base_cost = self.schedule.call(
            new_memory_size,
            self.current_call_frame.memory.len(),
            moves_value,
            creates_account,
        )?;

        // Preliminary check before anything is warmed. Static calls are checked at the warm price.
        let access_estimate = if is_static {
            self.schedule.warm_access()
        } else {
            self.schedule.cold_account_access()
        };
        let preliminary_cost = base_cost
            .checked_add(access_estimate)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        if self.current_call_frame.gas_remaining < preliminary_cost {
            return Err(ExceptionalHalt::OutOfGas.into());
        }

        self.current_call_frame.sub_return_data = Bytes::new();

        let current_address = self.current_call_frame.to;
        let value_word = word::to_u256(value);
        let insufficient_balance = moves_value && self.db.get_balance(current_address)? < value_word;
        let depth = self.current_call_frame.depth;
        if insufficient_balance || depth >= self.config.max_call_depth {
            debug!(
                ?kind,
                depth,
                insufficient_balance,
                "message call failed before entering the callee"
            );
            let frame = &mut self.current_call_frame;
            frame.stack.drop_n(operand_count)?;
            frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }

        let address_was_cold = !self.warm.peek_address(&code_address);
        let cost = base_cost
            .checked_add(self.schedule.account_access(address_was_cold))
            .ok_or(ExceptionalHalt::OutOfGas)?;
        self.current_call_frame.increase_consumed_gas(cost)?;
        self.warm.is_warm_address(code_address);

        let frame = &mut self.current_call_frame;
        frame.stack.drop_n(operand_count)?;
        frame.memory.resize(new_memory_size)?;

        let requested = word::to_u64_saturating(operands.gas);
        let stipend = max_message_call_gas(frame.gas_remaining, requested);
        frame.increase_consumed_gas(stipend)?;
        let child_gas = if moves_value {
            stipend
                .checked_add(self.schedule.call_stipend())
                .ok_or(InternalError::Overflow)?
        } else {
            stipend
        };

        let calldata = frame
            .memory
            .load_range(operands.args_offset, operands.args_size)?;
        let new_depth = depth.checked_add(1).ok_or(InternalError::Overflow)?;

        let program = self.load_program(code_address)?;
        let (stack, memory) = self.take_buffers();
        let mut child = CallFrame::new(
            sender,
            recipient,
            code_address,
            program,
            value,
            calldata,
            is_static,
            kind,
            child_gas,
            new_depth,
            stack,
            memory,
        );
        child.ret_offset = operands.ret_offset;
        child.ret_size = operands.ret_size;

        let transfer = if transfers_value {
            ValueTransfer {
                from: current_address,
                to: recipient,
                value: value_word,
            }
        } else {
            ValueTransfer::none(recipient)
        };

        let result = self.run_child(child, transfer)?;
        self.handle_return_call(&result, operands)
    }

    /// Hands the child's outcome back to the resumed parent frame.
    fn handle_return_call(
        &mut self,
        result: &ContextResult,
        operands: CallOperands,
    ) -> Result<OpcodeResult, VMError> {
        self.propagate_child_halt(result)?;

        let frame = &mut self.current_call_frame;
        frame.gas_remaining = frame
            .gas_remaining
            .checked_add(result.gas_remaining)
            .ok_or(InternalError::Overflow)?;

        frame.sub_return_data = result.output.clone();
        frame
            .memory
            .store_data_zero_padded(operands.ret_offset, &result.output, operands.ret_size)?;

        if !result.is_success() {
            debug!(result = ?result.result, "message call failed");
        }
        frame.stack.push_bool(result.is_success())?;

        Ok(OpcodeResult::Continue)
    }

    /// Common behavior for CREATE and CREATE2 opcodes
    fn generic_create(
        &mut self,
        value: Limbs,
        code_offset: Limbs,
        code_size: Limbs,
        salt: Option<Limbs>,
    ) -> Result<OpcodeResult, VMError> {
        if self.current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }

        let (code_size, code_offset) = size_offset_to_usize(code_size, code_offset)?;
        // [EIP-3860] - Cant exceed init code max size
        if code_size > self.config.max_initcode_size {
            return Err(ExceptionalHalt::OutOfGas.into());
        }

        let operand_count = if salt.is_some() { 4 } else { 3 };
        let current_call_frame = &mut self.current_call_frame;
        let new_memory_size = calculate_memory_size(code_offset, code_size)?;
        current_call_frame.increase_consumed_gas(self.schedule.create(
            new_memory_size,
            current_call_frame.memory.len(),
            code_size,
            salt.is_some(),
        )?)?;
        current_call_frame.stack.drop_n(operand_count)?;
        current_call_frame.memory.resize(new_memory_size)?;

        // Clear callframe subreturn data
        current_call_frame.sub_return_data = Bytes::new();

        let deployer = current_call_frame.to;
        let depth = current_call_frame.depth;
        let value_word = word::to_u256(value);

        // Failures that push 0 and keep the reserved gas.
        let insufficient_balance = self.db.get_balance(deployer)? < value_word;
        let nonce_exhausted = self.db.get_nonce(deployer)? == u64::MAX;
        if insufficient_balance || nonce_exhausted || depth >= self.config.max_call_depth {
            debug!(
                depth,
                insufficient_balance, nonce_exhausted, "contract creation failed before entering initcode"
            );
            self.current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }

        let code = self
            .current_call_frame
            .memory
            .load_range(code_offset, code_size)?;

        // The nonce is bumped before the address is derived and survives a failed creation.
        let deployer_nonce = self.db.increment_nonce(deployer)?;
        let new_address = match salt {
            Some(salt) => calculate_create2_address(deployer, &code, salt),
            None => calculate_create_address(deployer, deployer_nonce),
        };
        self.warm.is_warm_address(new_address);

        // All but one 64th of the remaining gas goes to the initcode.
        let frame = &mut self.current_call_frame;
        let gas_limit = max_message_call_gas(frame.gas_remaining, frame.gas_remaining);
        frame.increase_consumed_gas(gas_limit)?;

        let kind = if salt.is_some() {
            CallKind::Create2
        } else {
            CallKind::Create
        };
        let program = self.code_cache.make(&code);
        let (stack, memory) = self.take_buffers();
        let child = CallFrame::new(
            self.address_policy.sender_for(deployer, new_address),
            new_address,
            new_address,
            program,
            value,
            Bytes::new(),
            false,
            kind,
            gas_limit,
            depth.checked_add(1).ok_or(InternalError::Overflow)?,
            stack,
            memory,
        );

        let result = self.run_child(
            child,
            ValueTransfer {
                from: deployer,
                to: new_address,
                value: value_word,
            },
        )?;
        self.handle_return_create(&result, new_address)
    }

    fn handle_return_create(
        &mut self,
        result: &ContextResult,
        new_address: Address,
    ) -> Result<OpcodeResult, VMError> {
        self.propagate_child_halt(result)?;

        let frame = &mut self.current_call_frame;
        frame.gas_remaining = frame
            .gas_remaining
            .checked_add(result.gas_remaining)
            .ok_or(InternalError::Overflow)?;

        if result.is_success() {
            frame.stack.push_address(new_address)?;
        } else {
            // Only a REVERT leaves output behind.
            frame.sub_return_data = result.output.clone();
            debug!(?new_address, result = ?result.result, "contract creation failed");
            frame.stack.push_zero()?;
        }

        Ok(OpcodeResult::Continue)
    }

    /// Re-raises a child's exceptional halt in the resumed parent when it must not be swallowed.
    ///
    /// A halt queued in the parent's `propagated_failure` slot is raised once and cleared. Sticky
    /// reasons are raised every time, so they climb all the way to the top frame.
    fn propagate_child_halt(&mut self, result: &ContextResult) -> Result<(), VMError> {
        let queued = self.current_call_frame.propagated_failure.take();
        let Some(halt) = result.halt_reason() else {
            return Ok(());
        };

        if let Some(queued) = queued {
            warn!(
                depth = self.current_call_frame.depth,
                %queued,
                child = %halt,
                "child failure propagating to the parent frame"
            );
            return Err(queued.into());
        }
        if halt.is_sticky() {
            warn!(
                depth = self.current_call_frame.depth,
                %halt,
                "sticky halt propagating to the parent frame"
            );
            return Err(halt.into());
        }
        Ok(())
    }
}
