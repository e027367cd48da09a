use std::{fmt::Debug, rc::Rc};

use bytes::Bytes;
use ethereum_types::{Address, U256};

use crate::{
    constants::{IDENTITY_PRECOMPILE, WORD_SIZE_IN_BYTES_U64},
    errors::{ContextResult, ExceptionalHalt, OpcodeResult, VMError},
    vm::VM,
};

/// Gas charged by the identity precompile.
pub const IDENTITY_STATIC_COST: u64 = 15;
pub const IDENTITY_DYNAMIC_BASE: u64 = 3;

/// Replacement for the default SELFDESTRUCT semantics. Receives the popped beneficiary.
pub trait SelfDestructHook: Debug {
    fn self_destruct(&self, vm: &mut VM<'_>, beneficiary: Address)
    -> Result<OpcodeResult, VMError>;
}

/// Steps in when a frame finishes, before its checkpoint is committed or reverted.
///
/// Both methods default to leaving the outcome alone.
pub trait FrameOutcomeHook: Debug {
    /// Runs for a successful frame. A returned error fails the frame as if its last opcode
    /// had raised it, so its changes are reverted.
    fn on_success(&self, _vm: &mut VM<'_>, _result: &mut ContextResult) -> Result<(), VMError> {
        Ok(())
    }

    /// Runs for a reverted or halted frame. This is where a collaborator may queue the halt on
    /// the parent through [`VM::propagate_failure_to_parent`].
    fn on_revert(&self, _vm: &mut VM<'_>, _result: &mut ContextResult) -> Result<(), VMError> {
        Ok(())
    }
}

/// Output of a precompile that ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecompileOutput {
    pub output: Bytes,
    pub gas_used: u64,
}

/// Native implementations of precompiled contracts.
pub trait PrecompileSet: Debug {
    /// Runs the precompile at `address`. `None` means the address has no native
    /// implementation and is executed as a code-less account.
    fn run(
        &self,
        address: Address,
        input: &Bytes,
        gas_limit: u64,
    ) -> Option<Result<PrecompileOutput, VMError>>;
}

/// Serves the identity precompile and leaves every other address to the interpreter.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardPrecompiles;

impl PrecompileSet for StandardPrecompiles {
    fn run(
        &self,
        address: Address,
        input: &Bytes,
        gas_limit: u64,
    ) -> Option<Result<PrecompileOutput, VMError>> {
        if address != Address::from_low_u64_be(IDENTITY_PRECOMPILE) {
            return None;
        }
        Some(identity(input, gas_limit))
    }
}

fn identity(input: &Bytes, gas_limit: u64) -> Result<PrecompileOutput, VMError> {
    let len = u64::try_from(input.len()).map_err(|_| ExceptionalHalt::OutOfGas)?;
    let gas_used = len
        .div_ceil(WORD_SIZE_IN_BYTES_U64)
        .checked_mul(IDENTITY_DYNAMIC_BASE)
        .and_then(|cost| cost.checked_add(IDENTITY_STATIC_COST))
        .ok_or(ExceptionalHalt::OutOfGas)?;
    if gas_used > gas_limit {
        return Err(ExceptionalHalt::OutOfGas.into());
    }
    Ok(PrecompileOutput {
        output: input.clone(),
        gas_used,
    })
}

/// One optional replacement for a default behaviour.
#[derive(Debug, Clone)]
pub enum OpcodeOverride {
    SelfDestruct(Rc<dyn SelfDestructHook>),
    ChainId(U256),
    Precompiles(Rc<dyn PrecompileSet>),
    FrameOutcome(Rc<dyn FrameOutcomeHook>),
}

/// Overrides checked before the default path of the opcodes they replace.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    self_destruct: Option<Rc<dyn SelfDestructHook>>,
    chain_id: Option<U256>,
    precompiles: Option<Rc<dyn PrecompileSet>>,
    frame_outcome: Option<Rc<dyn FrameOutcomeHook>>,
}

impl OverrideTable {
    /// Later entries of the same kind replace earlier ones.
    pub fn new(overrides: impl IntoIterator<Item = OpcodeOverride>) -> Self {
        let mut table = Self::default();
        for entry in overrides {
            table.insert(entry);
        }
        table
    }

    pub fn insert(&mut self, entry: OpcodeOverride) {
        match entry {
            OpcodeOverride::SelfDestruct(hook) => self.self_destruct = Some(hook),
            OpcodeOverride::ChainId(chain_id) => self.chain_id = Some(chain_id),
            OpcodeOverride::Precompiles(set) => self.precompiles = Some(set),
            OpcodeOverride::FrameOutcome(hook) => self.frame_outcome = Some(hook),
        }
    }

    pub fn self_destruct(&self) -> Option<Rc<dyn SelfDestructHook>> {
        self.self_destruct.clone()
    }

    pub fn chain_id(&self) -> Option<U256> {
        self.chain_id
    }

    pub fn frame_outcome(&self) -> Option<Rc<dyn FrameOutcomeHook>> {
        self.frame_outcome.clone()
    }

    pub fn precompiles(&self) -> Rc<dyn PrecompileSet> {
        match &self.precompiles {
            Some(set) => Rc::clone(set),
            None => Rc::new(StandardPrecompiles),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_echoes_input_and_charges_per_word() {
        let input = Bytes::from_static(&[1u8; 33]);
        let out = StandardPrecompiles
            .run(Address::from_low_u64_be(4), &input, 100)
            .unwrap()
            .unwrap();
        assert_eq!(out.output, input);
        assert_eq!(out.gas_used, 15 + 2 * 3);
    }

    #[test]
    fn identity_out_of_gas() {
        let result = StandardPrecompiles
            .run(Address::from_low_u64_be(4), &Bytes::new(), 14)
            .unwrap();
        assert_eq!(result, Err(ExceptionalHalt::OutOfGas.into()));
    }

    #[test]
    fn other_precompiles_are_not_native() {
        assert!(
            StandardPrecompiles
                .run(Address::from_low_u64_be(1), &Bytes::new(), 1_000)
                .is_none()
        );
    }

    #[test]
    fn later_overrides_win() {
        let table = OverrideTable::new([
            OpcodeOverride::ChainId(U256::from(5)),
            OpcodeOverride::ChainId(U256::from(7)),
        ]);
        assert_eq!(table.chain_id(), Some(U256::from(7)));
        assert!(table.self_destruct().is_none());
        assert!(table.frame_outcome().is_none());
        assert!(OverrideTable::default().chain_id().is_none());
    }
}
