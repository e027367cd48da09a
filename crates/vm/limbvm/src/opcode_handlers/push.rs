use crate::{
    constants::WORD_SIZE_IN_BYTES_USIZE,
    errors::{OpcodeResult, VMError},
    gas_cost::Tier,
    vm::VM,
    word,
};

// Push Operations
// Opcodes: PUSH0, PUSH1 ... PUSH32

impl<'a> VM<'a> {
    // Generic PUSH operation, optimized at compile time for the given N.
    #[inline]
    pub fn op_push<const N: usize>(&mut self) -> Result<OpcodeResult, VMError> {
        let call_frame = &mut self.current_call_frame;
        call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;

        let pc = call_frame.pc;
        let code = call_frame.program.code();

        // Immediates running past the end of the code read as zero.
        let value = match code.get(pc..pc.saturating_add(N)) {
            Some(immediate) => word::from_be_slice(immediate),
            None => {
                let mut padded = [0u8; WORD_SIZE_IN_BYTES_USIZE];
                let available = code.get(pc..).unwrap_or_default();
                if let Some(target) = padded.get_mut(..available.len()) {
                    target.copy_from_slice(available);
                }
                // Left-align the partial immediate inside an N-byte value.
                word::from_be_slice(padded.get(..N).unwrap_or_default())
            }
        };

        call_frame.stack.push(value)?;

        // Advance the PC by the number of bytes in this instruction's payload.
        call_frame.increment_pc_by(N);

        Ok(OpcodeResult::Continue)
    }

    // PUSH0
    #[inline]
    pub fn op_push0(&mut self) -> Result<OpcodeResult, VMError> {
        self.current_call_frame
            .increase_consumed_gas(self.schedule.tier(Tier::Base))?;
        self.current_call_frame.stack.push_zero()?;
        Ok(OpcodeResult::Continue)
    }
}
