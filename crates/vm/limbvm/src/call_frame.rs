use std::sync::Arc;

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};

use crate::{
    bytecode::Program,
    constants::STACK_LIMIT,
    errors::ExceptionalHalt,
    memory::Memory,
    warm::WarmMark,
    word::{self, Limbs},
};

/// Operand stack of 256-bit words stored as four limb columns.
///
/// Column `k` holds limb `k` of every slot, so a push or pop touches four independent arrays and
/// never builds a big-integer object. `sp` is the number of items on the stack.
#[derive(Debug, Clone)]
pub struct Stack {
    l0: Box<[u64; STACK_LIMIT]>,
    l1: Box<[u64; STACK_LIMIT]>,
    l2: Box<[u64; STACK_LIMIT]>,
    l3: Box<[u64; STACK_LIMIT]>,
    sp: usize,
}

impl Default for Stack {
    fn default() -> Self {
        Self {
            l0: Box::new([0; STACK_LIMIT]),
            l1: Box::new([0; STACK_LIMIT]),
            l2: Box::new([0; STACK_LIMIT]),
            l3: Box::new([0; STACK_LIMIT]),
            sp: 0,
        }
    }
}

#[allow(
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    reason = "every slot index is checked against sp, which never exceeds STACK_LIMIT"
)]
impl Stack {
    #[inline(always)]
    fn read(&self, slot: usize) -> Limbs {
        [self.l0[slot], self.l1[slot], self.l2[slot], self.l3[slot]]
    }

    #[inline(always)]
    fn write(&mut self, slot: usize, value: Limbs) {
        self.l0[slot] = value[0];
        self.l1[slot] = value[1];
        self.l2[slot] = value[2];
        self.l3[slot] = value[3];
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.sp
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.sp == 0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.sp = 0;
    }

    /// Pushes a word. At full depth the stack is left unchanged.
    #[inline(always)]
    pub fn push(&mut self, value: Limbs) -> Result<(), ExceptionalHalt> {
        if self.sp >= STACK_LIMIT {
            return Err(ExceptionalHalt::StackOverflow);
        }
        self.write(self.sp, value);
        self.sp += 1;
        Ok(())
    }

    #[inline(always)]
    pub fn push_limbs(&mut self, l0: u64, l1: u64, l2: u64, l3: u64) -> Result<(), ExceptionalHalt> {
        self.push([l0, l1, l2, l3])
    }

    #[inline(always)]
    pub fn push_zero(&mut self) -> Result<(), ExceptionalHalt> {
        self.push(word::ZERO)
    }

    #[inline(always)]
    pub fn push_u64(&mut self, value: u64) -> Result<(), ExceptionalHalt> {
        self.push(word::from_u64(value))
    }

    #[inline(always)]
    pub fn push_usize(&mut self, value: usize) -> Result<(), ExceptionalHalt> {
        self.push_u64(u64::try_from(value).unwrap_or(u64::MAX))
    }

    #[inline(always)]
    pub fn push_bool(&mut self, value: bool) -> Result<(), ExceptionalHalt> {
        self.push(word::from_bool(value))
    }

    #[inline]
    pub fn push_address(&mut self, address: Address) -> Result<(), ExceptionalHalt> {
        self.push(word::from_address(&address))
    }

    /// Pushes up to 32 big-endian bytes, right aligned.
    #[inline]
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), ExceptionalHalt> {
        self.push(word::from_be_slice(bytes))
    }

    #[inline]
    pub fn push_word(&mut self, value: U256) -> Result<(), ExceptionalHalt> {
        self.push(word::from_u256(value))
    }

    /// Pops `N` words, top of the stack first. Depth is checked before anything moves.
    #[inline(always)]
    pub fn pop<const N: usize>(&mut self) -> Result<[Limbs; N], ExceptionalHalt> {
        let values = self.peek::<N>()?;
        self.sp -= N;
        Ok(values)
    }

    #[inline(always)]
    pub fn pop1(&mut self) -> Result<Limbs, ExceptionalHalt> {
        let [value] = self.pop::<1>()?;
        Ok(value)
    }

    /// Reads the top `N` words without consuming them, top first.
    #[inline(always)]
    pub fn peek<const N: usize>(&self) -> Result<[Limbs; N], ExceptionalHalt> {
        if self.sp < N {
            return Err(ExceptionalHalt::StackUnderflow);
        }
        let mut values = [word::ZERO; N];
        for (depth, value) in values.iter_mut().enumerate() {
            *value = self.read(self.sp - 1 - depth);
        }
        Ok(values)
    }

    /// Discards the top `n` words.
    #[inline]
    pub fn drop_n(&mut self, n: usize) -> Result<(), ExceptionalHalt> {
        if self.sp < n {
            return Err(ExceptionalHalt::StackUnderflow);
        }
        self.sp -= n;
        Ok(())
    }

    pub fn pop_word(&mut self) -> Result<U256, ExceptionalHalt> {
        Ok(word::intern(self.pop1()?))
    }

    /// Pops a word as `u64`, saturating at `i64::MAX`.
    pub fn pop_u64_clamped(&mut self) -> Result<u64, ExceptionalHalt> {
        const LIMIT: u64 = i64::MAX.unsigned_abs();
        let value = self.pop1()?;
        Ok(if word::fits_u64(value) {
            value[0].min(LIMIT)
        } else {
            LIMIT
        })
    }

    /// Pops a word as `i32`, saturating at `i32::MAX`.
    pub fn pop_i32_clamped(&mut self) -> Result<i32, ExceptionalHalt> {
        let value = self.pop1()?;
        if !word::fits_u64(value) {
            return Ok(i32::MAX);
        }
        Ok(i32::try_from(value[0]).unwrap_or(i32::MAX))
    }

    pub fn pop_address(&mut self) -> Result<Address, ExceptionalHalt> {
        Ok(word::to_address(self.pop1()?))
    }

    pub fn pop_bytes32(&mut self) -> Result<H256, ExceptionalHalt> {
        Ok(word::to_h256(self.pop1()?))
    }

    /// Duplicates the word `N` slots below the top (`DUP{N+1}`).
    #[inline(always)]
    pub fn dup<const N: usize>(&mut self) -> Result<(), ExceptionalHalt> {
        if self.sp <= N {
            return Err(ExceptionalHalt::StackUnderflow);
        }
        self.push(self.read(self.sp - 1 - N))
    }

    /// Swaps the top word with the one `N` slots below it (`SWAP{N}`).
    #[inline(always)]
    pub fn swap<const N: usize>(&mut self) -> Result<(), ExceptionalHalt> {
        if self.sp <= N {
            return Err(ExceptionalHalt::StackUnderflow);
        }
        let top = self.sp - 1;
        let other = top - N;
        let top_value = self.read(top);
        let other_value = self.read(other);
        self.write(top, other_value);
        self.write(other, top_value);
        Ok(())
    }
}

/// How a frame was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Transaction,
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
    Create,
    Create2,
}

impl CallKind {
    pub fn is_create(&self) -> bool {
        matches!(self, CallKind::Create | CallKind::Create2)
    }
}

/// Mutable state of one invocation.
#[derive(Debug)]
pub struct CallFrame {
    /// Address that sent the message.
    pub msg_sender: Address,
    /// Address whose storage and balance the frame acts on.
    pub to: Address,
    /// Address whose code is being executed.
    pub code_address: Address,
    pub program: Arc<Program>,
    pub msg_value: Limbs,
    pub stack: Stack,
    pub memory: Memory,
    pub calldata: Bytes,
    /// Data returned by RETURN or REVERT.
    pub output: Bytes,
    /// Return data of the last sub-context.
    pub sub_return_data: Bytes,
    pub is_static: bool,
    pub kind: CallKind,
    pub pc: usize,
    pub gas_limit: u64,
    pub gas_remaining: u64,
    pub depth: usize,
    /// Where the parent wants the output written.
    pub ret_offset: usize,
    pub ret_size: usize,
    /// Warm-tracker length at frame entry.
    pub warm_mark: WarmMark,
    pub track_state_changes: bool,
    /// Last `(key, value)` written by SSTORE, published once when the frame exits.
    pub last_storage_write: Option<(Limbs, Limbs)>,
    /// Halt set on this frame while one of its children exits. The next CALL or CREATE that
    /// returns an exceptional halt re-raises it here once, then the slot is empty again.
    pub propagated_failure: Option<ExceptionalHalt>,
}

impl CallFrame {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        msg_sender: Address,
        to: Address,
        code_address: Address,
        program: Arc<Program>,
        msg_value: Limbs,
        calldata: Bytes,
        is_static: bool,
        kind: CallKind,
        gas_limit: u64,
        depth: usize,
        stack: Stack,
        memory: Memory,
    ) -> Self {
        Self {
            msg_sender,
            to,
            code_address,
            program,
            msg_value,
            stack,
            memory,
            calldata,
            output: Bytes::new(),
            sub_return_data: Bytes::new(),
            is_static,
            kind,
            pc: 0,
            gas_limit,
            gas_remaining: gas_limit,
            depth,
            ret_offset: 0,
            ret_size: 0,
            warm_mark: 0,
            track_state_changes: false,
            last_storage_write: None,
            propagated_failure: None,
        }
    }

    /// Charges `gas`. On failure the counter is left untouched; the frame halts anyway.
    #[inline(always)]
    pub fn increase_consumed_gas(&mut self, gas: u64) -> Result<(), ExceptionalHalt> {
        self.gas_remaining = self
            .gas_remaining
            .checked_sub(gas)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        Ok(())
    }

    #[inline]
    pub fn gas_used(&self) -> u64 {
        self.gas_limit.saturating_sub(self.gas_remaining)
    }

    #[inline(always)]
    pub fn next_opcode(&self) -> u8 {
        self.program.opcode_at(self.pc)
    }

    #[inline(always)]
    pub fn increment_pc_by(&mut self, count: usize) {
        self.pc = self.pc.saturating_add(count);
    }

    pub fn is_create(&self) -> bool {
        self.kind.is_create()
    }

    /// Checks the destination and moves the program counter there.
    pub fn jump(&mut self, destination: Limbs) -> Result<(), ExceptionalHalt> {
        let target = usize::try_from(word::to_u64_saturating(destination))
            .map_err(|_| ExceptionalHalt::InvalidJump)?;
        if !self.program.jump_valid(target) {
            return Err(ExceptionalHalt::InvalidJump);
        }
        self.pc = target;
        Ok(())
    }

    /// Takes the stack and memory back for pooling.
    pub fn into_buffers(self) -> (Stack, Memory) {
        (self.stack, self.memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_return_top_first() {
        let mut stack = Stack::default();
        stack.push_u64(1).unwrap();
        stack.push_u64(2).unwrap();
        stack.push_u64(3).unwrap();
        let [a, b] = stack.pop::<2>().unwrap();
        assert_eq!(a, word::from_u64(3));
        assert_eq!(b, word::from_u64(2));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn overflow_leaves_stack_unchanged() {
        let mut stack = Stack::default();
        for i in 0..STACK_LIMIT {
            stack.push_usize(i).unwrap();
        }
        assert_eq!(stack.push_zero(), Err(ExceptionalHalt::StackOverflow));
        assert_eq!(stack.len(), STACK_LIMIT);
        assert_eq!(stack.pop1().unwrap(), word::from_u64(1023));
    }

    #[test]
    fn underflow_is_checked_before_moving() {
        let mut stack = Stack::default();
        stack.push_u64(5).unwrap();
        assert_eq!(stack.pop::<2>(), Err(ExceptionalHalt::StackUnderflow));
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.dup::<1>(), Err(ExceptionalHalt::StackUnderflow));
        assert_eq!(stack.swap::<1>(), Err(ExceptionalHalt::StackUnderflow));
    }

    #[test]
    fn clamped_pops() {
        let mut stack = Stack::default();
        stack.push(word::MAX).unwrap();
        stack.push_u64(u64::MAX).unwrap();
        stack.push_u64(1 << 40).unwrap();
        stack.push_u64(7).unwrap();
        assert_eq!(stack.pop_i32_clamped().unwrap(), 7);
        assert_eq!(stack.pop_i32_clamped().unwrap(), i32::MAX);
        assert_eq!(stack.pop_u64_clamped().unwrap(), i64::MAX.unsigned_abs());
        assert_eq!(stack.pop_u64_clamped().unwrap(), i64::MAX.unsigned_abs());
    }

    #[test]
    fn typed_round_trips() {
        let mut stack = Stack::default();
        let address = Address::from_low_u64_be(0xabcdef);
        stack.push_address(address).unwrap();
        assert_eq!(stack.pop_address().unwrap(), address);
        stack.push_bytes(&[0x12, 0x34]).unwrap();
        assert_eq!(stack.pop_word().unwrap(), U256::from(0x1234));
        stack.push_bool(true).unwrap();
        assert_eq!(stack.pop_bytes32().unwrap(), H256::from_low_u64_be(1));
    }

    #[test]
    fn dup_and_swap() {
        let mut stack = Stack::default();
        stack.push_u64(1).unwrap();
        stack.push_u64(2).unwrap();
        stack.dup::<1>().unwrap();
        assert_eq!(stack.peek::<1>().unwrap(), [word::from_u64(1)]);
        stack.swap::<2>().unwrap();
        assert_eq!(
            stack.peek::<3>().unwrap(),
            [word::from_u64(1), word::from_u64(2), word::from_u64(1)]
        );
        stack.push_u64(9).unwrap();
        stack.swap::<1>().unwrap();
        assert_eq!(stack.pop1().unwrap(), word::from_u64(1));
    }

    #[test]
    fn gas_never_goes_negative() {
        let program = Arc::new(Program::new(&[]));
        let mut frame = CallFrame::new(
            Address::zero(),
            Address::zero(),
            Address::zero(),
            program,
            word::ZERO,
            Bytes::new(),
            false,
            CallKind::Transaction,
            10,
            0,
            Stack::default(),
            Memory::new(),
        );
        frame.increase_consumed_gas(4).unwrap();
        assert_eq!(frame.increase_consumed_gas(7), Err(ExceptionalHalt::OutOfGas));
        assert_eq!(frame.gas_remaining, 6);
        assert_eq!(frame.gas_used(), 4);
        assert_eq!(frame.next_opcode(), 0x00);
    }
}
