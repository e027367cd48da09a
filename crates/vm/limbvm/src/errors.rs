use bytes::Bytes;
use thiserror::Error;

use crate::utils::Log;
use ethereum_types::Address;

/// Errors that can occur while executing a frame.
///
/// Only [`VMError::RevertOpcode`] and [`VMError::ExceptionalHalt`] are recoverable: the call
/// orchestrator turns them into a failed call in the parent frame. Anything else aborts the
/// whole transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VMError {
    #[error("Revert opcode")]
    RevertOpcode,
    #[error("Exceptional halt: {0}")]
    ExceptionalHalt(#[from] ExceptionalHalt),
    #[error("Internal error: {0}")]
    Internal(#[from] InternalError),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Invalid message: {0}")]
    TxValidation(#[from] TxValidationError),
}

impl VMError {
    /// Whether this error aborts the transaction instead of failing a single frame.
    pub fn should_propagate(&self) -> bool {
        matches!(
            self,
            VMError::Internal(_) | VMError::Database(_) | VMError::TxValidation(_)
        )
    }

    pub fn is_revert_opcode(&self) -> bool {
        matches!(self, VMError::RevertOpcode)
    }

    /// The halt reason, when the error is an exceptional halt.
    pub fn halt_reason(&self) -> Option<ExceptionalHalt> {
        match self {
            VMError::ExceptionalHalt(halt) => Some(*halt),
            _ => None,
        }
    }
}

/// Closed set of reasons a frame can halt exceptionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ExceptionalHalt {
    #[error("Out of gas")]
    OutOfGas,
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Stack overflow")]
    StackOverflow,
    #[error("Invalid jump destination")]
    InvalidJump,
    #[error("Invalid opcode")]
    InvalidOpcode,
    #[error("Opcode not allowed in static context")]
    OpcodeNotAllowedInStaticContext,
    #[error("Out of bounds")]
    OutOfBounds,
    #[error("Invalid contract prefix")]
    InvalidContractPrefix,
    #[error("Contract output too big")]
    ContractOutputTooBig,
    #[error("Address already occupied")]
    AddressCollision,
    #[error("Invalid address")]
    InvalidAddress,
    #[error("Invalid contract id")]
    InvalidContractId,
    #[error("Insufficient child records")]
    InsufficientChildRecords,
}

impl ExceptionalHalt {
    /// Sticky reasons keep halting every ancestor frame up to the top level instead of
    /// surfacing as an ordinary failed call.
    pub fn is_sticky(&self) -> bool {
        matches!(
            self,
            ExceptionalHalt::InvalidContractId | ExceptionalHalt::InsufficientChildRecords
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("Arithmetic overflow")]
    Overflow,
    #[error("Arithmetic underflow")]
    Underflow,
    #[error("Type conversion error")]
    TypeConversion,
    #[error("Call frame stack is empty")]
    CallFrame,
    #[error("Warm access set was not cleared by the previous transaction")]
    WarmStateLeak,
    #[error("Account not found: {0:#x}")]
    AccountNotFound(Address),
    #[error("{0}")]
    Custom(String),
}

/// A top-level message the interpreter refuses to start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxValidationError {
    #[error("Sender {0:#x} cannot cover the message value")]
    InsufficientBalance(Address),
    #[error("Sender {0:#x} nonce is at its maximum")]
    NonceOverflow(Address),
    #[error("Initcode of {0} bytes exceeds the limit")]
    InitcodeSizeExceeded(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatabaseError {
    #[error("No checkpoint to {0}")]
    NoCheckpoint(&'static str),
    #[error("{0}")]
    Custom(String),
}

/// Result of a single opcode handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeResult {
    Continue,
    Halt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxResult {
    Success,
    Revert(VMError),
}

impl TxResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TxResult::Success)
    }
}

/// Outcome of one frame, published to the invoking context when the dispatch loop exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextResult {
    pub result: TxResult,
    /// Gas consumed out of the frame's limit.
    pub gas_used: u64,
    /// Gas handed back to the caller. Zero after an exceptional halt.
    pub gas_remaining: u64,
    /// Program counter at exit.
    pub pc: usize,
    pub output: Bytes,
}

impl ContextResult {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }

    pub fn halt_reason(&self) -> Option<ExceptionalHalt> {
        match &self.result {
            TxResult::Revert(err) => err.halt_reason(),
            TxResult::Success => None,
        }
    }
}

/// Report of a whole top-level execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub result: TxResult,
    pub gas_used: u64,
    pub gas_refunded: u64,
    pub output: Bytes,
    pub logs: Vec<Log>,
    /// Address of the deployed contract for successful top-level creations.
    pub created_address: Option<Address>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}
