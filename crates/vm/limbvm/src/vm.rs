use std::{cell::RefCell, mem, rc::Rc, sync::Arc};

use bytes::Bytes;
use ethereum_types::{Address, U256};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::{
    bytecode::{BytecodeCache, CODE_CACHE, Program},
    call_frame::{CallFrame, CallKind, Stack},
    config::VmConfig,
    constants::INVALID_CONTRACT_PREFIX,
    db::WorldState,
    environment::{Environment, Message, TxKind},
    errors::{
        ContextResult, ExceptionalHalt, ExecutionReport, InternalError, OpcodeResult, TxResult,
        VMError,
    },
    gas_cost::{CancunGasSchedule, GasSchedule},
    hooks::{
        AddressPolicy, Hook, NoopTracer, OverrideTable, StandardAddressPolicy, Tracer,
        get_hooks,
    },
    memory::Memory,
    opcodes::OpCodeFn,
    utils::{Log, calculate_create_address},
    warm::WarmTracker,
    word,
};

pub type TransientStorage = FxHashMap<(Address, U256), U256>;

/// Execution substate that tracks changes during transaction execution.
///
/// The substate holds everything a failed frame must throw away: self-destructed accounts,
/// created accounts, the refund counter, transient storage (EIP-1153) and logs. Warmth is not
/// part of it; the [`WarmTracker`] unwinds on its own.
///
/// # Backup Mechanism
///
/// [`push_backup`](Self::push_backup) opens a checkpoint when a frame starts;
/// [`commit_backup`](Self::commit_backup) merges the frame's delta into its parent and
/// [`revert_backup`](Self::revert_backup) drops it. This only works because every field is
/// append-only while a checkpoint is open.
#[derive(Debug, Default)]
pub struct Substate {
    /// Parent checkpoint for reverting on failure.
    parent: Option<Box<Self>>,
    /// Accounts marked for self-destruction (deleted at end of transaction).
    selfdestruct_set: FxHashSet<Address>,
    /// Accounts created during this transaction.
    created_accounts: FxHashSet<Address>,
    /// Signed running total of storage refunds. Only ever non-negative at the top level.
    pub refunded_gas: i64,
    transient_storage: TransientStorage,
    logs: Vec<Log>,
}

impl Substate {
    /// Push a checkpoint that can be either reverted or committed. All data up to this point is
    /// still accessible.
    pub fn push_backup(&mut self) {
        let parent = mem::take(self);
        self.refunded_gas = parent.refunded_gas;
        self.parent = Some(Box::new(parent));
    }

    /// Pop and merge with the last backup.
    ///
    /// Does nothing if the substate has no backup.
    pub fn commit_backup(&mut self) {
        if let Some(parent) = self.parent.as_mut() {
            let mut delta = mem::take(parent);
            mem::swap(self, &mut delta);

            self.selfdestruct_set.extend(delta.selfdestruct_set);
            self.created_accounts.extend(delta.created_accounts);
            self.refunded_gas = delta.refunded_gas;
            self.transient_storage.extend(delta.transient_storage);
            self.logs.extend(delta.logs);
        }
    }

    /// Discard current changes and revert to last backup.
    ///
    /// Does nothing if the substate has no backup.
    pub fn revert_backup(&mut self) {
        if let Some(parent) = self.parent.as_mut() {
            *self = mem::take(parent);
        }
    }

    /// Mark an address as selfdestructed and return whether is was already marked.
    pub fn add_selfdestruct(&mut self, address: Address) -> bool {
        if self.is_selfdestruct(&address) {
            return true;
        }
        !self.selfdestruct_set.insert(address)
    }

    pub fn is_selfdestruct(&self, address: &Address) -> bool {
        self.selfdestruct_set.contains(address)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.is_selfdestruct(address))
    }

    /// Every address marked for destruction, across all open checkpoints.
    pub fn selfdestructed(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.selfdestruct_set.iter().copied().collect();
        if let Some(parent) = self.parent.as_deref() {
            addresses.extend(parent.selfdestructed());
        }
        addresses.sort_unstable();
        addresses.dedup();
        addresses
    }

    /// Mark an address as a new account and return whether is was already marked.
    pub fn add_created_account(&mut self, address: Address) -> bool {
        if self.is_account_created(&address) {
            return true;
        }
        !self.created_accounts.insert(address)
    }

    pub fn is_account_created(&self, address: &Address) -> bool {
        self.created_accounts.contains(address)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.is_account_created(address))
    }

    pub fn add_refund(&mut self, delta: i64) {
        self.refunded_gas = self.refunded_gas.saturating_add(delta);
    }

    /// Return the data associated with a transient storage entry, or zero if not present.
    pub fn get_transient(&self, to: &Address, key: &U256) -> U256 {
        self.transient_storage
            .get(&(*to, *key))
            .copied()
            .unwrap_or_else(|| {
                self.parent
                    .as_ref()
                    .map(|parent| parent.get_transient(to, key))
                    .unwrap_or_default()
            })
    }

    pub fn set_transient(&mut self, to: &Address, key: &U256, value: U256) {
        self.transient_storage.insert((*to, *key), value);
    }

    /// Extract all logs in order.
    pub fn extract_logs(&self) -> Vec<Log> {
        fn inner(substate: &Substate, target: &mut Vec<Log>) {
            if let Some(parent) = substate.parent.as_deref() {
                inner(parent, target);
            }

            target.extend_from_slice(&substate.logs);
        }

        let mut logs = Vec::new();
        inner(self, &mut logs);

        logs
    }

    pub fn add_log(&mut self, log: Log) {
        self.logs.push(log);
    }
}

/// Value moved from the sender to the recipient when a frame starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueTransfer {
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

impl ValueTransfer {
    pub fn none(address: Address) -> Self {
        Self {
            from: address,
            to: address,
            value: U256::zero(),
        }
    }
}

/// The interpreter for one top-level message.
///
/// Nested messages are recursive calls: a CALL-family or CREATE handler moves the running frame
/// onto `call_frames`, runs the child through [`VM::run_child`] and restores the parent when the
/// child exits.
pub struct VM<'a> {
    /// Frames suspended by a nested message, outermost first.
    pub call_frames: Vec<CallFrame>,
    /// The frame currently executing.
    pub current_call_frame: CallFrame,
    pub env: Environment,
    pub message: Message,
    pub substate: Substate,
    pub db: &'a mut dyn WorldState,
    pub config: VmConfig,
    pub schedule: Box<dyn GasSchedule>,
    pub warm: WarmTracker,
    pub tracer: Rc<RefCell<dyn Tracer>>,
    pub overrides: OverrideTable,
    pub address_policy: Box<dyn AddressPolicy>,
    pub hooks: Vec<Rc<RefCell<dyn Hook>>>,
    pub code_cache: Arc<BytecodeCache>,
    /// Stacks and memories of finished frames, reused by the next child.
    stack_pool: Vec<Stack>,
    memory_pool: Vec<Memory>,
    pub(crate) opcode_table: [OpCodeFn<'a>; 256],
}

impl<'a> VM<'a> {
    pub fn new(
        env: Environment,
        db: &'a mut dyn WorldState,
        message: Message,
        config: VmConfig,
    ) -> Result<Self, VMError> {
        let code_cache = Arc::clone(&CODE_CACHE);
        let current_call_frame = Self::initial_call_frame(&*db, &message, &code_cache)?;

        Ok(Self {
            call_frames: Vec::new(),
            current_call_frame,
            env,
            message,
            substate: Substate::default(),
            db,
            config,
            schedule: Box::new(CancunGasSchedule),
            warm: WarmTracker::new(),
            tracer: Rc::new(RefCell::new(NoopTracer)),
            overrides: OverrideTable::default(),
            address_policy: Box::new(StandardAddressPolicy::default()),
            hooks: get_hooks(),
            code_cache,
            stack_pool: Vec::new(),
            memory_pool: Vec::new(),
            opcode_table: Self::build_opcode_table(),
        })
    }

    pub fn with_tracer(mut self, tracer: Rc<RefCell<dyn Tracer>>) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn with_overrides(mut self, overrides: OverrideTable) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_address_policy(mut self, policy: impl AddressPolicy + 'static) -> Self {
        self.address_policy = Box::new(policy);
        self
    }

    pub fn with_schedule(mut self, schedule: impl GasSchedule + 'static) -> Self {
        self.schedule = Box::new(schedule);
        self
    }

    /// Uses `cache` instead of the process-wide one for every program this VM loads.
    pub fn with_code_cache(mut self, cache: Arc<BytecodeCache>) -> Self {
        self.current_call_frame.program = cache.make(self.current_call_frame.program.code());
        self.code_cache = cache;
        self
    }

    /// Uses a cache of `config.code_cache_capacity` programs owned by this VM.
    pub fn with_private_code_cache(self) -> Self {
        let cache = Arc::new(BytecodeCache::with_capacity(self.config.code_cache_capacity));
        self.with_code_cache(cache)
    }

    pub fn add_hook(&mut self, hook: impl Hook + 'static) {
        self.hooks.push(Rc::new(RefCell::new(hook)));
    }

    fn initial_call_frame(
        db: &dyn WorldState,
        message: &Message,
        code_cache: &BytecodeCache,
    ) -> Result<CallFrame, VMError> {
        let caller = message.caller;
        let (to, kind, program, calldata) = match message.kind {
            TxKind::Call(to) => (
                to,
                CallKind::Transaction,
                code_cache.make(&db.get_code(to)?),
                message.data.clone(),
            ),
            TxKind::Create => (
                calculate_create_address(caller, db.get_nonce(caller)?),
                CallKind::Create,
                code_cache.make(&message.data),
                Bytes::new(),
            ),
        };

        Ok(CallFrame::new(
            caller,
            to,
            to,
            program,
            word::from_u256(message.value),
            calldata,
            false,
            kind,
            message.gas_limit,
            0,
            Stack::default(),
            Memory::default(),
        ))
    }

    /// Executes the message and reports its outcome.
    ///
    /// Failed frames are part of the report; only internal, database and validation errors are
    /// returned as `Err`.
    pub fn execute(&mut self) -> Result<ExecutionReport, VMError> {
        self.prepare_execution()?;

        let transfer = ValueTransfer {
            from: self.message.caller,
            to: self.current_call_frame.to,
            value: self.message.value,
        };
        let context = self.run_frame(transfer)?;

        self.finalize_execution(context)
    }

    fn prepare_execution(&mut self) -> Result<(), VMError> {
        for hook in self.hooks.clone() {
            hook.borrow_mut().prepare_execution(self)?;
        }

        Ok(())
    }

    fn finalize_execution(
        &mut self,
        mut ctx_result: ContextResult,
    ) -> Result<ExecutionReport, VMError> {
        for hook in self.hooks.clone() {
            hook.borrow_mut()
                .finalize_execution(self, &mut ctx_result)?;
        }

        let logs = if ctx_result.is_success() {
            self.substate.extract_logs()
        } else {
            Vec::new()
        };
        let created_address = (ctx_result.is_success() && self.message.is_create())
            .then_some(self.current_call_frame.to);

        Ok(ExecutionReport {
            result: ctx_result.result,
            gas_used: ctx_result.gas_used,
            gas_refunded: u64::try_from(self.substate.refunded_gas).unwrap_or_default(),
            output: ctx_result.output,
            logs,
            created_address,
        })
    }

    /// Suspends the current frame, runs `child` to completion and resumes the parent.
    pub(crate) fn run_child(
        &mut self,
        child: CallFrame,
        transfer: ValueTransfer,
    ) -> Result<ContextResult, VMError> {
        let parent = mem::replace(&mut self.current_call_frame, child);
        self.call_frames.push(parent);

        let result = self.run_frame(transfer);

        let parent = self.call_frames.pop().ok_or(InternalError::CallFrame)?;
        let child = mem::replace(&mut self.current_call_frame, parent);
        self.recycle_buffers(child);

        result
    }

    /// Runs the current frame inside its own checkpoint, from entry to exit.
    fn run_frame(&mut self, transfer: ValueTransfer) -> Result<ContextResult, VMError> {
        self.current_call_frame.warm_mark = self.warm.mark();
        self.current_call_frame.track_state_changes = self.config.track_state_changes;
        self.db.checkpoint();
        self.substate.push_backup();
        self.tracer
            .borrow_mut()
            .context_enter(&self.current_call_frame);

        let result = match self.start_frame(transfer) {
            Ok(Some(result)) => result,
            Ok(None) => self.run_execution()?,
            Err(error) => self.handle_opcode_error(error)?,
        };

        let result = self.settle_outcome(result)?;
        self.exit_frame(&result)?;
        Ok(result)
    }

    /// Applies the effects a message has before its first opcode. Returns the outcome directly
    /// when no bytecode needs to run.
    fn start_frame(&mut self, transfer: ValueTransfer) -> Result<Option<ContextResult>, VMError> {
        let to = self.current_call_frame.to;

        if self.current_call_frame.is_create() {
            if let Some(info) = self.db.get_account_info(to)?
                && (info.has_code() || info.nonce != 0)
            {
                return Err(ExceptionalHalt::AddressCollision.into());
            }
            // EIP-161
            self.db.set_nonce(to, 1)?;
            self.substate.add_created_account(to);
        }

        self.db.transfer(transfer.from, transfer.to, transfer.value)?;

        let code_address = self.current_call_frame.code_address;
        if self.current_call_frame.is_create() || !self.address_policy.is_precompile(&code_address)
        {
            return Ok(None);
        }

        let precompiles = self.overrides.precompiles();
        let frame = &mut self.current_call_frame;
        match precompiles.run(code_address, &frame.calldata, frame.gas_remaining) {
            None => Ok(None),
            Some(Ok(output)) => {
                frame.increase_consumed_gas(output.gas_used)?;
                frame.output = output.output;
                Ok(Some(ContextResult {
                    result: TxResult::Success,
                    gas_used: frame.gas_used(),
                    gas_remaining: frame.gas_remaining,
                    pc: frame.pc,
                    output: frame.output.clone(),
                }))
            }
            Some(Err(error)) => Err(error),
        }
    }

    /// Main execution loop.
    pub fn run_execution(&mut self) -> Result<ContextResult, VMError> {
        loop {
            let opcode = self.current_call_frame.next_opcode();
            self.current_call_frame.increment_pc_by(1);

            // Fast path for common opcodes
            #[allow(clippy::indexing_slicing)]
            let op_result = match opcode {
                0x60 => self.op_push::<1>(),
                0x61 => self.op_push::<2>(),
                0x80 => self.op_dup::<0>(),
                0x81 => self.op_dup::<1>(),
                0x90 => self.op_swap::<1>(),
                0x00 => self.op_stop(),
                0x01 => self.op_add(),
                0x50 => self.op_pop(),
                0x51 => self.op_mload(),
                0x52 => self.op_mstore(),
                0x56 => self.op_jump(),
                0x57 => self.op_jumpi(),
                0x5b => self.op_jumpdest(),
                _ => {
                    // Every byte has a slot; unassigned ones point at `on_invalid_opcode`.
                    self.opcode_table[usize::from(opcode)].call(self)
                }
            };

            match op_result {
                Ok(OpcodeResult::Continue) => continue,
                Ok(OpcodeResult::Halt) => return self.handle_opcode_result(),
                Err(error) => return self.handle_opcode_error(error),
            }
        }
    }

    /// Builds the outcome of a frame that halted normally (STOP, RETURN, SELFDESTRUCT).
    fn handle_opcode_result(&mut self) -> Result<ContextResult, VMError> {
        if self.current_call_frame.is_create()
            && let Err(error) = self.deposit_code()
        {
            return self.handle_opcode_error(error);
        }

        let frame = &self.current_call_frame;
        Ok(ContextResult {
            result: TxResult::Success,
            gas_used: frame.gas_used(),
            gas_remaining: frame.gas_remaining,
            pc: frame.pc,
            output: frame.output.clone(),
        })
    }

    /// Builds the outcome of a failed frame. Errors that are not recoverable at a frame boundary
    /// are returned as-is.
    fn handle_opcode_error(&mut self, error: VMError) -> Result<ContextResult, VMError> {
        if error.should_propagate() {
            return Err(error);
        }

        let frame = &mut self.current_call_frame;
        if !error.is_revert_opcode() {
            frame.gas_remaining = 0;
            frame.output = Bytes::new();
        }

        Ok(ContextResult {
            result: TxResult::Revert(error),
            gas_used: frame.gas_used(),
            gas_remaining: frame.gas_remaining,
            pc: frame.pc,
            output: frame.output.clone(),
        })
    }

    /// Stores the code returned by a successful initcode run.
    fn deposit_code(&mut self) -> Result<(), VMError> {
        let code = self.current_call_frame.output.clone();

        // EIP-170
        if code.len() > self.config.max_code_size {
            return Err(ExceptionalHalt::ContractOutputTooBig.into());
        }
        // EIP-3541
        if code.first() == Some(&INVALID_CONTRACT_PREFIX) {
            return Err(ExceptionalHalt::InvalidContractPrefix.into());
        }

        let cost = self.schedule.code_deposit(code.len())?;
        self.current_call_frame.increase_consumed_gas(cost)?;
        self.db.set_code(self.current_call_frame.to, code)?;
        Ok(())
    }

    /// Gives the frame-outcome override its say before the checkpoint closes.
    fn settle_outcome(&mut self, mut result: ContextResult) -> Result<ContextResult, VMError> {
        let Some(hook) = self.overrides.frame_outcome() else {
            return Ok(result);
        };

        if result.is_success()
            && let Err(error) = hook.on_success(self, &mut result)
        {
            debug!(%error, "frame outcome hook failed a successful frame");
            result = self.handle_opcode_error(error)?;
        }
        if !result.is_success() {
            hook.on_revert(self, &mut result)?;
        }
        Ok(result)
    }

    /// Queues `halt` on the frame that resumes once the current one exits. Its pending CALL or
    /// CREATE then halts with `halt` instead of pushing zero. Returns false for the top frame.
    pub fn propagate_failure_to_parent(&mut self, halt: ExceptionalHalt) -> bool {
        match self.call_frames.last_mut() {
            Some(parent) => {
                parent.propagated_failure = Some(halt);
                true
            }
            None => false,
        }
    }

    /// Closes the frame's checkpoint and notifies the tracer.
    fn exit_frame(&mut self, result: &ContextResult) -> Result<(), VMError> {
        if result.is_success() {
            self.db.commit()?;
            self.substate.commit_backup();
        } else {
            self.db.revert()?;
            self.substate.revert_backup();
            self.warm.unwind_to(self.current_call_frame.warm_mark);
        }

        let frame = &mut self.current_call_frame;
        if let Some((key, value)) = frame.last_storage_write.take() {
            self.tracer
                .borrow_mut()
                .storage_updated(frame.to, key, value);
        }
        self.tracer
            .borrow_mut()
            .context_exit(&self.current_call_frame, result);

        Ok(())
    }

    /// Loads the program at `address` through the code cache.
    pub(crate) fn load_program(&mut self, address: Address) -> Result<Arc<Program>, VMError> {
        let code = self.db.get_code(address)?;
        Ok(self.code_cache.make(&code))
    }

    /// A cleared stack and memory for a new child frame.
    pub(crate) fn take_buffers(&mut self) -> (Stack, Memory) {
        let stack = self.stack_pool.pop().unwrap_or_default();
        let memory = self.memory_pool.pop().unwrap_or_default();
        (stack, memory)
    }

    fn recycle_buffers(&mut self, frame: CallFrame) {
        let (mut stack, mut memory) = frame.into_buffers();
        stack.clear();
        memory.reset();
        self.stack_pool.push(stack);
        self.memory_pool.push(memory);
    }
}
