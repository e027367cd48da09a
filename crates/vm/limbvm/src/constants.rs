pub const WORD_SIZE_IN_BYTES_USIZE: usize = 32;
pub const WORD_SIZE_IN_BYTES_U64: u64 = 32;

pub const STACK_LIMIT: usize = 1024;

/// Memory expansion quotient in `words² / q + 3·words`.
pub const MEMORY_EXPANSION_QUOTIENT: u64 = 512;

pub const MAX_CALL_DEPTH: usize = 1024;

// EIP-170
pub const MAX_CODE_SIZE: usize = 0x6000;
// EIP-3860
pub const INIT_CODE_MAX_SIZE: usize = 49152;

// EIP-3541
pub const INVALID_CONTRACT_PREFIX: u8 = 0xef;

/// Number of precompile addresses (0x01..=0x0a) available since Cancun.
pub const SIZE_PRECOMPILES_CANCUN: u64 = 10;

/// Address of the identity precompile, the only one served without an override.
pub const IDENTITY_PRECOMPILE: u64 = 0x04;

pub const BLOCKHASH_HISTORY: u64 = 256;

// Keccak-256 of the empty byte string.
pub const EMPTY_CODE_HASH: [u8; 32] = [
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
];
