use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost::Tier,
    vm::VM,
};

// Exchange Operations (16)
// Opcodes: SWAP1 ... SWAP16

impl<'a> VM<'a> {
    // SWAP operation
    #[inline]
    pub fn op_swap<const N: usize>(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::VeryLow))?;

        current_call_frame.stack.swap::<N>()?;

        Ok(OpcodeResult::Continue)
    }
}
