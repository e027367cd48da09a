use bytes::Bytes;
use ethereum_types::{Address, H256};
use sha3::{Digest, Keccak256};

use crate::{
    errors::{ExceptionalHalt, VMError},
    word::{self, Limbs},
};

/// An event emitted by LOG0..LOG4.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
}

pub fn keccak(data: impl AsRef<[u8]>) -> H256 {
    H256::from_slice(&Keccak256::digest(data.as_ref()))
}

/// Converts an offset-like word to `usize`; values that do not fit can never be paid for.
#[inline]
pub fn limbs_to_usize(value: Limbs) -> Result<usize, VMError> {
    if !word::fits_u64(value) {
        return Err(ExceptionalHalt::OutOfGas.into());
    }
    usize::try_from(value[0]).map_err(|_| ExceptionalHalt::OutOfGas.into())
}

/// Converts a `(size, offset)` pair. A zero size makes the offset irrelevant.
#[inline]
pub fn size_offset_to_usize(size: Limbs, offset: Limbs) -> Result<(usize, usize), VMError> {
    if word::is_zero(size) {
        return Ok((0, 0));
    }
    Ok((limbs_to_usize(size)?, limbs_to_usize(offset)?))
}

/// Clamps a word to `usize`, saturating at `usize::MAX`.
#[inline]
pub fn limbs_to_usize_saturating(value: Limbs) -> usize {
    usize::try_from(word::to_u64_saturating(value)).unwrap_or(usize::MAX)
}

#[inline]
pub fn word_to_address(value: Limbs) -> Address {
    word::to_address(value)
}

#[inline]
pub fn address_to_word(address: Address) -> Limbs {
    word::from_address(&address)
}

/// Address of a contract created with CREATE: `keccak(rlp([sender, nonce]))[12..]`.
pub fn calculate_create_address(sender: Address, nonce: u64) -> Address {
    let nonce_bytes = nonce.to_be_bytes();
    let significant = nonce_bytes
        .iter()
        .position(|byte| *byte != 0)
        .map_or(&[][..], |start| nonce_bytes.get(start..).unwrap_or_default());

    let mut encoded_nonce = Vec::with_capacity(9);
    match significant {
        [] => encoded_nonce.push(0x80),
        [single] if *single < 0x80 => encoded_nonce.push(*single),
        bytes => {
            // at most 8 bytes, so the length prefix stays in the short form
            encoded_nonce.push(0x80u8.saturating_add(u8::try_from(bytes.len()).unwrap_or(8)));
            encoded_nonce.extend_from_slice(bytes);
        }
    }

    // 0x94 prefixes a 20-byte string.
    let payload_len = 21usize.saturating_add(encoded_nonce.len());
    let mut stream = Vec::with_capacity(payload_len.saturating_add(1));
    stream.push(0xc0u8.saturating_add(u8::try_from(payload_len).unwrap_or(0x37)));
    stream.push(0x94);
    stream.extend_from_slice(sender.as_bytes());
    stream.extend_from_slice(&encoded_nonce);

    Address::from_slice(keccak(&stream).as_bytes().get(12..).unwrap_or_default())
}

/// Address of a contract created with CREATE2:
/// `keccak(0xff ++ sender ++ salt ++ keccak(initcode))[12..]`.
pub fn calculate_create2_address(sender: Address, initcode: &[u8], salt: Limbs) -> Address {
    let initcode_hash = keccak(initcode);
    let mut preimage = Vec::with_capacity(85);
    preimage.push(0xff);
    preimage.extend_from_slice(sender.as_bytes());
    preimage.extend_from_slice(&word::to_be_bytes(salt));
    preimage.extend_from_slice(initcode_hash.as_bytes());
    Address::from_slice(keccak(&preimage).as_bytes().get(12..).unwrap_or_default())
}
