use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost::Tier,
    vm::VM,
    word,
};

// Comparison and Bitwise Logic Operations (14)
// Opcodes: LT, GT, SLT, SGT, EQ, ISZERO, AND, OR, XOR, NOT, BYTE, SHL, SHR, SAR

impl<'a> VM<'a> {
    // LT operation
    #[inline]
    pub fn op_lt(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;
        let [lho, rho] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push_bool(word::lt(lho, rho))?;

        Ok(OpcodeResult::Continue)
    }

    // GT operation
    #[inline]
    pub fn op_gt(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;
        let [lho, rho] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push_bool(word::gt(lho, rho))?;

        Ok(OpcodeResult::Continue)
    }

    // SLT operation (signed less than)
    pub fn op_slt(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;
        let [lho, rho] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push_bool(word::slt(lho, rho))?;

        Ok(OpcodeResult::Continue)
    }

    // SGT operation (signed greater than)
    pub fn op_sgt(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;
        let [lho, rho] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push_bool(word::sgt(lho, rho))?;

        Ok(OpcodeResult::Continue)
    }

    // EQ operation (equality check)
    #[inline]
    pub fn op_eq(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;
        let [lho, rho] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push_bool(lho == rho)?;

        Ok(OpcodeResult::Continue)
    }

    // ISZERO operation (check if zero)
    #[inline]
    pub fn op_iszero(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;
        let operand = current_call_frame.stack.pop1()?;
        current_call_frame.stack.push_bool(word::is_zero(operand))?;

        Ok(OpcodeResult::Continue)
    }

    // AND operation
    #[inline]
    pub fn op_and(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;
        let [a, b] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(word::and(a, b))?;

        Ok(OpcodeResult::Continue)
    }

    // OR operation
    #[inline]
    pub fn op_or(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;
        let [a, b] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(word::or(a, b))?;

        Ok(OpcodeResult::Continue)
    }

    // XOR operation
    #[inline]
    pub fn op_xor(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;
        let [a, b] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(word::xor(a, b))?;

        Ok(OpcodeResult::Continue)
    }

    // NOT operation
    #[inline]
    pub fn op_not(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;
        let a = current_call_frame.stack.pop1()?;
        current_call_frame.stack.push(word::not(a))?;

        Ok(OpcodeResult::Continue)
    }

    // BYTE operation
    pub fn op_byte(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;
        let [op1, op2] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(word::byte(op1, op2))?;

        Ok(OpcodeResult::Continue)
    }

    // SHL operation (shift left)
    #[inline]
    pub fn op_shl(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;
        let [shift, value] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(word::shl(shift, value))?;

        Ok(OpcodeResult::Continue)
    }

    // SHR operation (shift right)
    #[inline]
    pub fn op_shr(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;
        let [shift, value] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(word::shr(shift, value))?;

        Ok(OpcodeResult::Continue)
    }

    // SAR operation (arithmetic shift right)
    pub fn op_sar(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;
        let [shift, value] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(word::sar(shift, value))?;

        Ok(OpcodeResult::Continue)
    }
}
