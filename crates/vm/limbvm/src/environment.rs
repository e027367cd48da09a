use bytes::Bytes;
use ethereum_types::{Address, H256, U256};

/// Block and transaction context visible to the executing code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// The sender address of the external transaction.
    pub origin: Address,
    pub gas_price: U256,
    pub coinbase: Address,
    pub block_number: U256,
    pub timestamp: U256,
    pub prev_randao: Option<H256>,
    pub block_gas_limit: u64,
    pub base_fee_per_gas: U256,
    pub blob_hashes: Vec<H256>,
    pub blob_base_fee: U256,
}

/// Destination of a top-level message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Call(Address),
    Create,
}

/// A top-level message: what the host asks the interpreter to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub caller: Address,
    pub kind: TxKind,
    pub value: U256,
    /// Calldata, or initcode for creations.
    pub data: Bytes,
    pub gas_limit: u64,
    /// EIP-2930 entries prewarmed before execution.
    pub access_list: Vec<(Address, Vec<H256>)>,
}

impl Message {
    pub fn call(caller: Address, to: Address, data: Bytes, gas_limit: u64) -> Self {
        Self {
            caller,
            kind: TxKind::Call(to),
            value: U256::zero(),
            data,
            gas_limit,
            access_list: Vec::new(),
        }
    }

    pub fn create(caller: Address, initcode: Bytes, gas_limit: u64) -> Self {
        Self {
            caller,
            kind: TxKind::Create,
            value: U256::zero(),
            data: initcode,
            gas_limit,
            access_list: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_access_list(mut self, access_list: Vec<(Address, Vec<H256>)>) -> Self {
        self.access_list = access_list;
        self
    }

    pub fn is_create(&self) -> bool {
        matches!(self.kind, TxKind::Create)
    }
}
