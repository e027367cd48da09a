use crate::{
    constants::{MEMORY_EXPANSION_QUOTIENT, WORD_SIZE_IN_BYTES_U64, WORD_SIZE_IN_BYTES_USIZE},
    errors::{ExceptionalHalt, InternalError, VMError},
    word::{self, Limbs},
};
use ExceptionalHalt::OutOfBounds;
use bytes::Bytes;

/// Byte-addressable scratch memory owned by a single frame.
///
/// `len` is the logical size and is always a multiple of 32. The backing buffer only grows, by
/// doubling, so a pooled `Memory` keeps its allocation across frames. Bytes past `len` are kept
/// zeroed, which makes growth a pure length bump.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    data: Vec<u8>,
    len: usize,
}

impl Memory {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes currently allocated for this memory.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The logical contents.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.data.get(..self.len).unwrap_or_default()
    }

    /// Clears the memory for reuse by another frame, keeping the allocation.
    pub fn reset(&mut self) {
        if let Some(used) = self.data.get_mut(..self.len) {
            used.fill(0);
        }
        self.len = 0;
    }

    /// Grows the logical size to fit `new_memory_size`, rounded up to the next word.
    ///
    /// Gas for the expansion must have been charged already.
    #[inline(always)]
    pub fn resize(&mut self, new_memory_size: usize) -> Result<(), VMError> {
        if new_memory_size <= self.len {
            return Ok(());
        }

        let new_memory_size = new_memory_size
            .checked_next_multiple_of(WORD_SIZE_IN_BYTES_USIZE)
            .ok_or(OutOfBounds)?;

        if new_memory_size > self.data.len() {
            let mut capacity = self.data.len().max(WORD_SIZE_IN_BYTES_USIZE);
            while capacity < new_memory_size {
                capacity = capacity.checked_mul(2).ok_or(OutOfBounds)?;
            }
            self.data.resize(capacity, 0);
        }

        self.len = new_memory_size;
        Ok(())
    }

    #[inline(always)]
    fn slice_mut(&mut self, offset: usize, size: usize) -> Result<&mut [u8], VMError> {
        let end = offset.checked_add(size).ok_or(OutOfBounds)?;
        self.resize(end)?;
        self.data
            .get_mut(offset..end)
            .ok_or(InternalError::Custom("memory slice out of range".to_owned()).into())
    }

    /// Loads `size` bytes starting at `offset`, growing the memory if needed.
    pub fn load_range(&mut self, offset: usize, size: usize) -> Result<Bytes, VMError> {
        if size == 0 {
            return Ok(Bytes::new());
        }
        Ok(Bytes::copy_from_slice(self.slice_mut(offset, size)?))
    }

    /// Loads the big-endian word at `offset`.
    #[inline(always)]
    pub fn load_word(&mut self, offset: usize) -> Result<Limbs, VMError> {
        let slice = self.slice_mut(offset, WORD_SIZE_IN_BYTES_USIZE)?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Ok(word::from_be_bytes(&bytes))
    }

    #[inline(always)]
    pub fn store_word(&mut self, offset: usize, value: Limbs) -> Result<(), VMError> {
        self.slice_mut(offset, WORD_SIZE_IN_BYTES_USIZE)?
            .copy_from_slice(&word::to_be_bytes(value));
        Ok(())
    }

    #[inline(always)]
    pub fn store_byte(&mut self, offset: usize, value: u8) -> Result<(), VMError> {
        if let Some(byte) = self.slice_mut(offset, 1)?.first_mut() {
            *byte = value;
        }
        Ok(())
    }

    /// Stores `data` at `offset`.
    pub fn store_data(&mut self, offset: usize, data: &[u8]) -> Result<(), VMError> {
        if data.is_empty() {
            return Ok(());
        }
        self.slice_mut(offset, data.len())?.copy_from_slice(data);
        Ok(())
    }

    /// Stores `data` truncated or zero-padded to exactly `total_size` bytes.
    pub fn store_data_zero_padded(
        &mut self,
        offset: usize,
        data: &[u8],
        total_size: usize,
    ) -> Result<(), VMError> {
        if total_size == 0 {
            return Ok(());
        }
        let target = self.slice_mut(offset, total_size)?;
        let copy_size = data.len().min(total_size);
        let (copied, padding) = target.split_at_mut(copy_size);
        copied.copy_from_slice(data.get(..copy_size).unwrap_or_default());
        padding.fill(0);
        Ok(())
    }

    /// Copies `len` bytes of `src` starting at `src_offset` into memory at `dst_offset`.
    /// Source bytes past the end of `src` read as zero.
    pub fn write_bytes(
        &mut self,
        dst_offset: usize,
        src: &[u8],
        src_offset: usize,
        len: usize,
    ) -> Result<(), VMError> {
        let available = src.get(src_offset..).unwrap_or_default();
        self.store_data_zero_padded(dst_offset, available, len)
    }

    /// Moves `size` bytes within memory, like `memmove`. Both ranges are grown into.
    pub fn copy_within(
        &mut self,
        from_offset: usize,
        to_offset: usize,
        size: usize,
    ) -> Result<(), VMError> {
        if size == 0 {
            return Ok(());
        }
        let end = from_offset
            .max(to_offset)
            .checked_add(size)
            .ok_or(InternalError::Overflow)?;
        self.resize(end)?;
        let from_end = from_offset.checked_add(size).ok_or(InternalError::Overflow)?;
        self.data.copy_within(from_offset..from_end, to_offset);
        Ok(())
    }
}

/// When a memory expansion is triggered, only the additional bytes of memory
/// must be paid for.
#[inline]
pub fn expansion_cost(new_memory_size: usize, current_memory_size: usize) -> Result<u64, VMError> {
    let cost = if new_memory_size <= current_memory_size {
        0
    } else {
        // cost is monotonic, so this cannot underflow.
        cost(new_memory_size)?.wrapping_sub(cost(current_memory_size)?)
    };
    Ok(cost)
}

/// Total cost of a memory of `memory_size` bytes: `words² / 512 + 3·words`.
#[inline]
fn cost(memory_size: usize) -> Result<u64, VMError> {
    let memory_size = u64::try_from(memory_size).map_err(|_| InternalError::TypeConversion)?;

    let words = memory_size.div_ceil(WORD_SIZE_IN_BYTES_U64);

    words
        .checked_mul(words)
        .map(|square| square / MEMORY_EXPANSION_QUOTIENT)
        .and_then(|quadratic| words.checked_mul(3)?.checked_add(quadratic))
        .ok_or(ExceptionalHalt::OutOfGas.into())
}

/// Memory size required to touch `size` bytes at `offset`; zero-sized accesses need none.
#[inline]
pub fn calculate_memory_size(offset: usize, size: usize) -> Result<usize, VMError> {
    if size == 0 {
        return Ok(0);
    }

    offset
        .checked_add(size)
        .and_then(|sum| sum.checked_next_multiple_of(WORD_SIZE_IN_BYTES_USIZE))
        .ok_or(OutOfBounds.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_rounds_to_words_and_doubles_capacity() {
        let mut memory = Memory::new();
        memory.resize(1).unwrap();
        assert_eq!(memory.len(), 32);
        memory.resize(33).unwrap();
        assert_eq!(memory.len(), 64);
        assert_eq!(memory.capacity(), 64);
        memory.resize(100).unwrap();
        assert_eq!(memory.len(), 128);
        assert_eq!(memory.capacity(), 128);
        memory.resize(10).unwrap();
        assert_eq!(memory.len(), 128);
    }

    #[test]
    fn word_round_trip_is_big_endian() {
        let mut memory = Memory::new();
        memory.store_word(0, word::from_u64(0x0102)).unwrap();
        assert_eq!(memory.as_slice()[30..32], [0x01, 0x02]);
        assert_eq!(memory.load_word(0).unwrap(), word::from_u64(0x0102));
        // unaligned read spills into fresh zeroed memory
        assert_eq!(memory.load_word(1).unwrap(), word::from_u64(0x010200));
        assert_eq!(memory.len(), 64);
    }

    #[test]
    fn write_bytes_zero_fills_past_source() {
        let mut memory = Memory::new();
        memory.store_data(0, &[0xff; 8]).unwrap();
        memory.write_bytes(0, &[1, 2, 3], 1, 6).unwrap();
        assert_eq!(memory.as_slice()[..8], [2, 3, 0, 0, 0, 0, 0xff, 0xff]);
        memory.write_bytes(0, &[1, 2, 3], 10, 2).unwrap();
        assert_eq!(memory.as_slice()[..2], [0, 0]);
    }

    #[test]
    fn copy_within_handles_overlap() {
        let mut memory = Memory::new();
        memory.store_data(0, &[1, 2, 3, 4]).unwrap();
        memory.copy_within(0, 2, 4).unwrap();
        assert_eq!(memory.as_slice()[..6], [1, 2, 1, 2, 3, 4]);
    }

    #[test]
    fn reset_zeroes_reused_memory() {
        let mut memory = Memory::new();
        memory.store_data(0, &[9; 40]).unwrap();
        memory.reset();
        assert!(memory.is_empty());
        assert_eq!(memory.load_word(0).unwrap(), word::ZERO);
    }

    #[test]
    fn expansion_cost_is_quadratic_plus_linear() {
        assert_eq!(expansion_cost(32, 0).unwrap(), 3);
        assert_eq!(expansion_cost(64, 32).unwrap(), 3);
        assert_eq!(expansion_cost(32, 64).unwrap(), 0);
        // 1024 words: 1024² / 512 + 3 * 1024
        assert_eq!(expansion_cost(32 * 1024, 0).unwrap(), 2048 + 3072);
    }

    #[test]
    fn memory_size_rounding() {
        assert_eq!(calculate_memory_size(100, 0).unwrap(), 0);
        assert_eq!(calculate_memory_size(0, 1).unwrap(), 32);
        assert_eq!(calculate_memory_size(31, 2).unwrap(), 64);
        assert!(calculate_memory_size(usize::MAX, 1).is_err());
    }
}
