use bytes::Bytes;
use ethereum_types::{Address, U256};

use crate::{
    VM, VmConfig,
    db::{InMemoryWorldState, in_memory::Account},
    environment::{Environment, Message},
    errors::ExecutionReport,
    opcodes::Opcode,
};

pub const GAS_LIMIT: u64 = 1_000_000;

pub fn sender() -> Address {
    Address::from_low_u64_be(0x1000)
}

pub fn contract() -> Address {
    Address::from_low_u64_be(0x2000)
}

pub fn callee() -> Address {
    Address::from_low_u64_be(0x3000)
}

pub fn other() -> Address {
    Address::from_low_u64_be(0x4000)
}

pub fn test_env() -> Environment {
    Environment {
        origin: sender(),
        coinbase: Address::from_low_u64_be(0xc0ffee),
        block_number: U256::from(1_000),
        timestamp: U256::from(1_700_000_000u64),
        block_gas_limit: 30_000_000,
        ..Default::default()
    }
}

/// A funded sender and `code` deployed at [`contract`].
pub fn world_with(code: Vec<u8>) -> InMemoryWorldState {
    InMemoryWorldState::new()
        .with_account(
            sender(),
            Account::new(U256::from(10).pow(U256::from(18)), Bytes::new(), 0),
        )
        .with_account(contract(), Account::new(U256::zero(), code.into(), 1))
}

pub fn deploy(db: &mut InMemoryWorldState, address: Address, code: Vec<u8>) {
    db.insert_account(address, Account::new(U256::zero(), code.into(), 1));
}

pub fn call_message(gas_limit: u64) -> Message {
    Message::call(sender(), contract(), Bytes::new(), gas_limit)
}

/// Calls [`contract`] with default settings.
pub fn run(db: &mut InMemoryWorldState) -> ExecutionReport {
    execute_with(db, call_message(GAS_LIMIT), VmConfig::default(), |vm| vm)
}

pub fn execute_with<'a>(
    db: &'a mut InMemoryWorldState,
    message: Message,
    config: VmConfig,
    customize: impl FnOnce(VM<'a>) -> VM<'a>,
) -> ExecutionReport {
    let vm = VM::new(test_env(), db, message, config).unwrap();
    let mut vm = customize(vm);
    vm.execute().unwrap()
}

/// Reads the returned output as one big-endian word.
pub fn output_word(report: &ExecutionReport) -> U256 {
    assert_eq!(report.output.len(), 32, "expected a single returned word");
    U256::from_big_endian(&report.output)
}

/// Minimal bytecode assembler.
#[derive(Debug, Default, Clone)]
pub struct Asm {
    code: Vec<u8>,
}

impl Asm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn op(mut self, opcode: Opcode) -> Self {
        self.code.push(u8::from(opcode));
        self
    }

    /// PUSHn with the shortest encoding of `value` (PUSH1 for zero).
    pub fn push(self, value: u64) -> Self {
        let bytes = value.to_be_bytes();
        let skip = bytes.iter().take_while(|byte| **byte == 0).count().min(7);
        self.push_bytes(&bytes[skip..])
    }

    pub fn push_bytes(mut self, bytes: &[u8]) -> Self {
        assert!((1..=32).contains(&bytes.len()));
        self.code.push(0x5f + u8::try_from(bytes.len()).unwrap());
        self.code.extend_from_slice(bytes);
        self
    }

    pub fn push_address(self, address: Address) -> Self {
        self.push_bytes(address.as_bytes())
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.code.extend_from_slice(bytes);
        self
    }

    /// Stores the top of the stack at memory 0 and returns it.
    pub fn return_top(self) -> Self {
        self.push(0)
            .op(Opcode::MSTORE)
            .push(32)
            .push(0)
            .op(Opcode::RETURN)
    }

    /// `CALL(gas, to, value, 0, 0, 0, 32)` leaving the success flag on the stack.
    pub fn call(self, gas: u64, to: Address, value: u64) -> Self {
        self.push(32)
            .push(0)
            .push(0)
            .push(0)
            .push(value)
            .push_address(to)
            .push(gas)
            .op(Opcode::CALL)
    }

    /// Same operand layout as [`Self::call`] without the value.
    pub fn call_without_value(self, opcode: Opcode, gas: u64, to: Address) -> Self {
        self.push(32)
            .push(0)
            .push(0)
            .push(0)
            .push_address(to)
            .push(gas)
            .op(opcode)
    }

    pub fn build(self) -> Vec<u8> {
        self.code
    }
}
