//! An opcode that cannot pay must leave the frame exactly as it found it.

use ethereum_types::{H256, U256};

use super::test_helpers::*;
use crate::{
    VM, VmConfig,
    db::{InMemoryWorldState, WorldState},
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    warm::WarmKey,
    word,
};

fn out_of_gas() -> VMError {
    ExceptionalHalt::OutOfGas.into()
}

fn vm_with_gas(db: &mut InMemoryWorldState, gas: u64) -> VM<'_> {
    let mut vm = VM::new(test_env(), db, call_message(GAS_LIMIT), VmConfig::default()).unwrap();
    vm.current_call_frame.gas_remaining = gas;
    vm
}

#[test]
fn mstore_without_gas_for_expansion() {
    let mut db = world_with(Vec::new());
    let mut vm = vm_with_gas(&mut db, 5);
    vm.current_call_frame.stack.push_u64(0x2a).unwrap();
    vm.current_call_frame.stack.push_u64(64).unwrap();

    assert_eq!(vm.op_mstore(), Err(out_of_gas()));
    assert_eq!(vm.current_call_frame.stack.len(), 2);
    assert_eq!(vm.current_call_frame.memory.len(), 0);
    assert_eq!(vm.current_call_frame.gas_remaining, 5);
}

#[test]
fn sstore_on_a_cold_slot_without_gas() {
    let mut db = world_with(Vec::new());
    let mut vm = vm_with_gas(&mut db, 2_301);
    vm.current_call_frame.stack.push_u64(1).unwrap();
    vm.current_call_frame.stack.push_u64(9).unwrap();

    assert_eq!(vm.op_sstore(), Err(out_of_gas()));
    assert_eq!(vm.current_call_frame.stack.len(), 2);
    assert!(!vm.warm.peek(&WarmKey::slot(contract(), word::from_u64(9))));
    assert_eq!(vm.substate.refunded_gas, 0);
    drop(vm);
    assert_eq!(db.storage_value(&contract(), &H256::from_low_u64_be(9)), U256::zero());
}

#[test]
fn sload_on_a_cold_slot_without_gas() {
    let mut db = world_with(Vec::new());
    let mut vm = vm_with_gas(&mut db, 2_099);
    vm.current_call_frame.stack.push_u64(9).unwrap();

    assert_eq!(vm.op_sload(), Err(out_of_gas()));
    assert_eq!(vm.current_call_frame.stack.peek::<1>().unwrap(), [word::from_u64(9)]);
    assert!(!vm.warm.peek(&WarmKey::slot(contract(), word::from_u64(9))));
}

#[test]
fn balance_of_a_cold_account_without_gas() {
    let mut db = world_with(Vec::new());
    let mut vm = vm_with_gas(&mut db, 2_599);
    vm.current_call_frame.stack.push_address(other()).unwrap();

    assert_eq!(vm.op_balance(), Err(out_of_gas()));
    assert_eq!(
        vm.current_call_frame.stack.peek::<1>().unwrap(),
        [word::from_address(&other())]
    );
    assert!(!vm.warm.peek_address(&other()));
}

#[test]
fn keccak_over_unpaid_memory() {
    let mut db = world_with(Vec::new());
    let mut vm = vm_with_gas(&mut db, 30);
    vm.current_call_frame.stack.push_u64(32).unwrap();
    vm.current_call_frame.stack.push_u64(0).unwrap();

    // 30 static + 6 per word + 3 for the expansion
    assert_eq!(vm.op_keccak256(), Err(out_of_gas()));
    assert_eq!(vm.current_call_frame.stack.len(), 2);
    assert_eq!(vm.current_call_frame.memory.len(), 0);
}

/// Pushes `words` so that the first one ends up on top of the stack.
fn push_operands(vm: &mut VM<'_>, words: &[u64]) {
    for value in words.iter().rev() {
        vm.current_call_frame.stack.push_u64(*value).unwrap();
    }
}

/// Asserts that a failed opcode left `operands` stack items, no memory and its gas in place.
fn assert_untouched(vm: &VM<'_>, operands: usize, gas: u64) {
    assert_eq!(vm.current_call_frame.stack.len(), operands);
    assert_eq!(vm.current_call_frame.memory.len(), 0);
    assert_eq!(vm.current_call_frame.gas_remaining, gas);
}

/// Operands of a CALL-family opcode with a 32-byte return region, `value` only when `Some`.
fn push_call(vm: &mut VM<'_>, value: Option<u64>) {
    let stack = &mut vm.current_call_frame.stack;
    stack.push_u64(32).unwrap();
    stack.push_u64(0).unwrap();
    stack.push_u64(0).unwrap();
    stack.push_u64(0).unwrap();
    if let Some(value) = value {
        stack.push_u64(value).unwrap();
    }
    stack.push_address(other()).unwrap();
    stack.push_u64(0xFFFF).unwrap();
}

#[test]
fn call_fails_the_preliminary_check_at_the_cold_price() {
    let mut db = world_with(Vec::new());
    // 3 for the return region + 2600 cold access
    let mut vm = vm_with_gas(&mut db, 2_602);
    push_call(&mut vm, Some(0));

    assert_eq!(vm.op_call(), Err(out_of_gas()));
    assert_untouched(&vm, 7, 2_602);
    assert!(!vm.warm.peek_address(&other()));
}

#[test]
fn delegatecall_fails_the_preliminary_check_at_the_cold_price() {
    let mut db = world_with(Vec::new());
    let mut vm = vm_with_gas(&mut db, 2_602);
    push_call(&mut vm, None);

    assert_eq!(vm.op_delegatecall(), Err(out_of_gas()));
    assert_untouched(&vm, 6, 2_602);
    assert!(!vm.warm.peek_address(&other()));
}

#[test]
fn staticcall_fails_the_preliminary_check_at_the_warm_price() {
    let mut db = world_with(Vec::new());
    let mut vm = vm_with_gas(&mut db, 102);
    push_call(&mut vm, None);

    assert_eq!(vm.op_staticcall(), Err(out_of_gas()));
    assert_untouched(&vm, 6, 102);
}

#[test]
fn staticcall_to_a_cold_account_fails_after_the_preliminary_check() {
    let mut db = world_with(Vec::new());
    let mut vm = vm_with_gas(&mut db, 1_000);
    push_call(&mut vm, None);

    assert_eq!(vm.op_staticcall(), Err(out_of_gas()));
    assert_untouched(&vm, 6, 1_000);
    assert!(!vm.warm.peek_address(&other()));
}

#[test]
fn create_without_gas_for_the_initcode() {
    let mut db = world_with(Vec::new());
    // 32000 base + 2 per initcode word + 3 for the expansion
    let mut vm = vm_with_gas(&mut db, 32_004);
    push_operands(&mut vm, &[0, 0, 32]);

    assert_eq!(vm.op_create(), Err(out_of_gas()));
    assert_untouched(&vm, 3, 32_004);
    drop(vm);
    assert_eq!(db.get_nonce(contract()).unwrap(), 1);
}

#[test]
fn create2_without_gas_for_hashing_the_initcode() {
    let mut db = world_with(Vec::new());
    // CREATE's 32005 + 6 per hashed word
    let mut vm = vm_with_gas(&mut db, 32_010);
    push_operands(&mut vm, &[0, 0, 32, 0x5a17]);

    assert_eq!(vm.op_create2(), Err(out_of_gas()));
    assert_untouched(&vm, 4, 32_010);
}

fn log_without_gas<const N: usize>() {
    let mut db = world_with(Vec::new());
    let topics = u64::try_from(N).unwrap();
    // static + topics + 8 per data byte + 3 for the expansion, minus one
    let gas = 375 + 375 * topics + 8 * 32 + 3 - 1;
    let mut vm = vm_with_gas(&mut db, gas);
    let mut operands = vec![0, 32];
    operands.extend((0..topics).map(|topic| topic + 1));
    push_operands(&mut vm, &operands);

    assert_eq!(vm.op_log::<N>(), Err(out_of_gas()));
    assert_untouched(&vm, N + 2, gas);
    assert!(vm.substate.extract_logs().is_empty());
}

#[test]
fn logs_without_gas_for_their_data() {
    log_without_gas::<0>();
    log_without_gas::<1>();
    log_without_gas::<2>();
    log_without_gas::<3>();
    log_without_gas::<4>();
}

#[test]
fn extcodecopy_of_a_cold_account_without_gas() {
    let mut db = world_with(Vec::new());
    deploy(&mut db, other(), vec![0x60, 0x01]);
    // 2600 cold access + 3 per word + 3 for the expansion
    let mut vm = vm_with_gas(&mut db, 2_605);
    vm.current_call_frame.stack.push_u64(32).unwrap();
    vm.current_call_frame.stack.push_u64(0).unwrap();
    vm.current_call_frame.stack.push_u64(0).unwrap();
    vm.current_call_frame.stack.push_address(other()).unwrap();

    assert_eq!(vm.op_extcodecopy(), Err(out_of_gas()));
    assert_untouched(&vm, 4, 2_605);
    assert!(!vm.warm.peek_address(&other()));
}

#[test]
fn mcopy_into_unpaid_memory() {
    let mut db = world_with(Vec::new());
    // 3 static + 3 per word + 6 to expand to two words
    let mut vm = vm_with_gas(&mut db, 11);
    push_operands(&mut vm, &[32, 0, 32]);

    assert_eq!(vm.op_mcopy(), Err(out_of_gas()));
    assert_untouched(&vm, 3, 11);
}

#[test]
fn calldatacopy_into_unpaid_memory() {
    let mut db = world_with(Vec::new());
    let mut vm = vm_with_gas(&mut db, 8);
    push_operands(&mut vm, &[0, 0, 32]);

    assert_eq!(vm.op_calldatacopy(), Err(out_of_gas()));
    assert_untouched(&vm, 3, 8);
}

#[test]
fn return_and_revert_without_gas_for_the_output_region() {
    let mut db = world_with(Vec::new());
    let mut vm = vm_with_gas(&mut db, 2);
    push_operands(&mut vm, &[0, 32]);

    assert_eq!(vm.op_return(), Err(out_of_gas()));
    assert_untouched(&vm, 2, 2);
    assert!(vm.current_call_frame.output.is_empty());

    assert_eq!(vm.op_revert(), Err(out_of_gas()));
    assert_untouched(&vm, 2, 2);
    assert!(vm.current_call_frame.output.is_empty());

    vm.current_call_frame.gas_remaining = 3;
    assert_eq!(vm.op_return(), Ok(OpcodeResult::Halt));
    assert_eq!(vm.current_call_frame.output.len(), 32);
}

#[test]
fn affordable_operations_charge_exactly_once() {
    let mut db = world_with(Vec::new());
    let mut vm = vm_with_gas(&mut db, 2_600);
    vm.current_call_frame.stack.push_address(other()).unwrap();

    vm.op_balance().unwrap();
    assert_eq!(vm.current_call_frame.gas_remaining, 0);
    assert!(vm.warm.peek_address(&other()));
    assert_eq!(vm.current_call_frame.stack.pop_word().unwrap(), U256::zero());
}
