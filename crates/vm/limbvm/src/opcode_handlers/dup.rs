use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost::Tier,
    vm::VM,
};

// Duplication Operation (16)
// Opcodes: DUP1 ... DUP16

impl<'a> VM<'a> {
    // DUP operation, `N` counts from the top starting at 0 (DUP1).
    #[inline]
    pub fn op_dup<const N: usize>(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;

        current_call_frame.stack.dup::<N>()?;

        Ok(OpcodeResult::Continue)
    }
}
