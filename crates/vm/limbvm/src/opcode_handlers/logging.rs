use crate::{
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    memory::calculate_memory_size,
    utils::{Log, size_offset_to_usize},
    vm::VM,
};

// Logging Operations (5)
// Opcodes: LOG0 ... LOG4

impl<'a> VM<'a> {
    // LOG operation
    pub fn op_log<const N_TOPICS: usize>(&mut self) -> Result<OpcodeResult, VMError> {
        let current_call_frame = &mut self.current_call_frame;
        if current_call_frame.is_static {
            return Err(ExceptionalHalt::OpcodeNotAllowedInStaticContext.into());
        }
        if current_call_frame.stack.len() < N_TOPICS.saturating_add(2) {
            return Err(ExceptionalHalt::StackUnderflow.into());
        }

        let [offset, size] = current_call_frame.stack.peek()?;
        let (size, offset) = size_offset_to_usize(size, offset)?;
        let new_memory_size = calculate_memory_size(offset, size)?;

        current_call_frame.increase_consumed_gas(self.schedule.log(
            new_memory_size,
            current_call_frame.memory.len(),
            size,
            N_TOPICS,
        )?)?;
        current_call_frame.stack.drop_n(2)?;

        let mut topics = Vec::with_capacity(N_TOPICS);
        for _ in 0..N_TOPICS {
            topics.push(current_call_frame.stack.pop_bytes32()?);
        }

        let log = Log {
            address: current_call_frame.to,
            topics,
            data: current_call_frame.memory.load_range(offset, size)?,
        };
        self.substate.add_log(log);

        Ok(OpcodeResult::Continue)
    }
}
