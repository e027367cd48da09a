use crate::{
    errors::{OpcodeResult, VMError},
    memory::calculate_memory_size,
    utils::{keccak, size_offset_to_usize},
    vm::VM,
    word,
};

// KECCAK256 (1)
// Opcodes: KECCAK256

impl<'a> VM<'a> {
    pub fn op_keccak256(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        let [offset, size] = current_call_frame.stack.peek()?;
        let (size, offset) = size_offset_to_usize(size, offset)?;

        let new_memory_size = calculate_memory_size(offset, size)?;

        current_call_frame.increase_consumed_gas(self.schedule.keccak256(
            new_memory_size,
            current_call_frame.memory.len(),
            size,
        )?)?;
        current_call_frame.stack.drop_n(2)?;

        let data = current_call_frame.memory.load_range(offset, size)?;
        let hash = keccak(&data);
        current_call_frame.stack.push(word::from_h256(&hash))?;

        Ok(OpcodeResult::Continue)
    }
}
