use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost::Tier,
    vm::VM,
    word,
};

// Arithmetic Operations (11)
// Opcodes: ADD, SUB, MUL, DIV, SDIV, MOD, SMOD, ADDMOD, MULMOD, EXP, SIGNEXTEND

impl<'a> VM<'a> {
    // ADD operation
    #[inline]
    pub fn op_add(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;

        let [augend, addend] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(word::add(augend, addend))?;

        Ok(OpcodeResult::Continue)
    }

    // SUB operation
    #[inline]
    pub fn op_sub(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;

        let [minuend, subtrahend] = current_call_frame.stack.pop()?;
        current_call_frame
            .stack
            .push(word::sub(minuend, subtrahend))?;

        Ok(OpcodeResult::Continue)
    }

    // MUL operation
    #[inline]
    pub fn op_mul(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Low))?;

        let [multiplicand, multiplier] = current_call_frame.stack.pop()?;
        current_call_frame
            .stack
            .push(word::mul(multiplicand, multiplier))?;

        Ok(OpcodeResult::Continue)
    }

    // DIV operation
    pub fn op_div(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Low))?;

        let [dividend, divisor] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(word::div(dividend, divisor))?;

        Ok(OpcodeResult::Continue)
    }

    // SDIV operation
    pub fn op_sdiv(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Low))?;

        let [dividend, divisor] = current_call_frame.stack.pop()?;
        current_call_frame
            .stack
            .push(word::sdiv(dividend, divisor))?;

        Ok(OpcodeResult::Continue)
    }

    // MOD operation
    pub fn op_mod(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Low))?;

        let [dividend, divisor] = current_call_frame.stack.pop()?;
        current_call_frame.stack.push(word::rem(dividend, divisor))?;

        Ok(OpcodeResult::Continue)
    }

    // SMOD operation
    pub fn op_smod(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Low))?;

        let [dividend, divisor] = current_call_frame.stack.pop()?;
        current_call_frame
            .stack
            .push(word::smod(dividend, divisor))?;

        Ok(OpcodeResult::Continue)
    }

    // ADDMOD operation
    pub fn op_addmod(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Mid))?;

        let [augend, addend, modulus] = current_call_frame.stack.pop()?;
        current_call_frame
            .stack
            .push(word::addmod(augend, addend, modulus))?;

        Ok(OpcodeResult::Continue)
    }

    // MULMOD operation
    pub fn op_mulmod(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Mid))?;

        let [multiplicand, multiplier, modulus] = current_call_frame.stack.pop()?;
        current_call_frame
            .stack
            .push(word::mulmod(multiplicand, multiplier, modulus))?;

        Ok(OpcodeResult::Continue)
    }

    // EXP operation
    pub fn op_exp(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [base, exponent] = current_call_frame.stack.peek()?;

        current_call_frame.increase_consumed_gas(self.schedule.exp(exponent)?)?;

        current_call_frame.stack.drop_n(2)?;
        current_call_frame.stack.push(word::exp(base, exponent))?;

        Ok(OpcodeResult::Continue)
    }

    // SIGNEXTEND operation
    pub fn op_signextend(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Low))?;

        let [byte_size_minus_one, value_to_extend] = current_call_frame.stack.pop()?;
        current_call_frame
            .stack
            .push(word::signextend(byte_size_minus_one, value_to_extend))?;

        Ok(OpcodeResult::Continue)
    }
}
