use std::fmt::Debug;

use ethereum_types::Address;
use tracing::debug;

use crate::{call_frame::CallFrame, errors::ContextResult, word::Limbs};

/// Observer of frame lifecycle and storage traffic. Nothing it returns is consumed by the
/// interpreter.
pub trait Tracer: Debug {
    fn context_enter(&mut self, _frame: &CallFrame) {}

    fn context_exit(&mut self, _frame: &CallFrame, _result: &ContextResult) {}

    /// Last storage write of a frame, reported once when the frame exits.
    fn storage_updated(&mut self, _address: Address, _key: Limbs, _value: Limbs) {}

    /// Every SLOAD, when state-change tracking is on.
    fn storage_read(&mut self, _address: Address, _key: Limbs, _value: Limbs) {}

    /// Every SSTORE, when state-change tracking is on.
    fn storage_written(&mut self, _address: Address, _key: Limbs, _value: Limbs) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Emits frame transitions as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingTracer;

impl Tracer for LoggingTracer {
    fn context_enter(&mut self, frame: &CallFrame) {
        debug!(
            depth = frame.depth,
            kind = ?frame.kind,
            to = ?frame.to,
            code_address = ?frame.code_address,
            gas = frame.gas_limit,
            "entering frame"
        );
    }

    fn context_exit(&mut self, frame: &CallFrame, result: &ContextResult) {
        debug!(
            depth = frame.depth,
            success = result.is_success(),
            gas_used = result.gas_used,
            pc = result.pc,
            "leaving frame"
        );
    }

    fn storage_updated(&mut self, address: Address, key: Limbs, value: Limbs) {
        debug!(?address, ?key, ?value, "storage updated");
    }
}
