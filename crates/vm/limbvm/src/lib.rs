//! # LimbVM
//!
//! An EVM bytecode interpreter that keeps every 256-bit word as four native 64-bit limbs.
//!
//! ## Overview
//!
//! LimbVM executes one top-level message against a host-provided world state:
//! - **Limb arithmetic**: cheap operand shapes resolve with shifts and masks, every other case
//!   falls back to wide-integer arithmetic so all operations are total
//! - **Gas before effect**: an opcode that cannot pay leaves the stack, memory and storage as
//!   they were
//! - **Shared bytecode**: programs are interned by content in a process-wide cache
//! - **Recursive calls**: nested messages run as ordinary recursive calls over a shared
//!   warm/cold tracker that unwinds when a frame fails
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                           VM                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐ │
//! │  │  CallFrame  │  │   Memory    │  │   Stack (limbs)     │ │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘ │
//! │                                                             │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐ │
//! │  │  Substate   │  │ WarmTracker │  │   GasSchedule       │ │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘ │
//! │                                                             │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐ │
//! │  │   Tracer    │  │  Overrides  │  │   AddressPolicy     │ │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//!          │                                    │
//!          ▼                                    ▼
//! ┌───────────────────────────┐  ┌──────────────────────────────┐
//! │        WorldState         │  │        BytecodeCache         │
//! │ (accounts, storage, code) │  │  (content-addressed, shared) │
//! └───────────────────────────┘  └──────────────────────────────┘
//! ```
//!
//! ## Key Components
//!
//! - [`vm::VM`]: dispatch loop and call orchestration
//! - [`word`]: 256-bit operations over [`word::Limbs`]
//! - [`call_frame::CallFrame`]: program counter, stack, memory and gas of one invocation
//! - [`bytecode::BytecodeCache`]: interned programs with precomputed jump destinations
//! - [`warm::WarmTracker`]: EIP-2929 access tracking with per-frame unwind marks
//! - [`gas_cost::GasSchedule`]: opcode prices
//! - [`hooks`]: tracer, overrides, address classification and transaction hooks
//!
//! ## Usage
//!
//! ```ignore
//! use ethrex_limbvm::{db::InMemoryWorldState, Environment, Message, VM, VmConfig};
//!
//! let mut db = InMemoryWorldState::default();
//! let message = Message::call(sender, contract, calldata, 100_000);
//! let mut vm = VM::new(Environment::default(), &mut db, message, VmConfig::default())?;
//!
//! let report = vm.execute()?;
//! if report.is_success() {
//!     println!("Gas used: {}", report.gas_used);
//! }
//! ```

pub mod bytecode;
pub mod call_frame;
pub mod config;
pub mod constants;
pub mod db;
pub mod environment;
pub mod errors;
pub mod gas_cost;
pub mod hooks;
pub mod memory;
pub mod opcode_handlers;
pub mod opcodes;
pub mod utils;
pub mod vm;
pub mod warm;
pub mod word;

pub use config::VmConfig;
pub use environment::*;
pub use vm::VM;

#[cfg(test)]
mod tests;
