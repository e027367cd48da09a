use bytes::Bytes;
use ethereum_types::{H256, U256};

use super::test_helpers::*;
use crate::{
    db::in_memory::Account,
    errors::{ExceptionalHalt, TxResult, VMError},
    gas_cost::{CancunGasSchedule, GasSchedule, Tier},
    opcodes::Opcode,
};

fn with_slot_zero(code: Vec<u8>, value: u64) -> crate::db::InMemoryWorldState {
    let mut db = world_with(Vec::new());
    db.insert_account(
        contract(),
        Account::new(U256::zero(), Bytes::from(code), 1)
            .with_storage([(H256::zero(), U256::from(value))]),
    );
    db
}

fn store(value: u64, key: u64) -> Asm {
    Asm::new().push(value).push(key).op(Opcode::SSTORE)
}

#[test]
fn fresh_slot_pays_the_set_cost() {
    let mut db = world_with(store(1, 0).op(Opcode::STOP).build());
    let report = run(&mut db);

    assert!(report.is_success());
    assert_eq!(report.gas_used, 3 + 3 + 20_000 + 2_100);
    assert_eq!(report.gas_refunded, 0);
    assert_eq!(db.storage_value(&contract(), &H256::zero()), U256::one());
}

#[test]
fn clearing_a_slot_is_refunded_up_to_a_fifth() {
    let mut db = with_slot_zero(store(0, 0).op(Opcode::STOP).build(), 1);
    let report = run(&mut db);

    // 5006 spent, the 4800 refund is capped at 5006 / 5.
    assert_eq!(report.gas_refunded, 1_001);
    assert_eq!(report.gas_used, 5_006 - 1_001);
    assert_eq!(db.storage_value(&contract(), &H256::zero()), U256::zero());
}

#[test]
fn sstore_needs_more_than_the_stipend() {
    let mut db = world_with(store(1, 0).op(Opcode::STOP).build());
    let report = execute_with(
        &mut db,
        call_message(3 + 3 + 2_300),
        Default::default(),
        |vm| vm,
    );

    assert_eq!(
        report.result,
        TxResult::Revert(VMError::ExceptionalHalt(ExceptionalHalt::OutOfGas))
    );
    assert_eq!(report.gas_used, 2_306);
    assert_eq!(db.storage_value(&contract(), &H256::zero()), U256::zero());
}

#[test]
fn written_slots_are_warm() {
    let code = store(7, 3)
        .op(Opcode::GAS)
        .push(3)
        .op(Opcode::SLOAD)
        .op(Opcode::POP)
        .op(Opcode::GAS)
        .op(Opcode::SWAP1)
        .op(Opcode::SUB)
        .return_top()
        .build();
    let report = run(&mut world_with(code));

    assert_eq!(output_word(&report), U256::from(3 + 100 + 2 + 2));
}

#[test]
fn reverted_frames_leave_storage_untouched() {
    let code = store(1, 0)
        .push(0)
        .push(0)
        .op(Opcode::REVERT)
        .build();
    let mut db = world_with(code);
    let report = run(&mut db);

    assert_eq!(report.result, TxResult::Revert(VMError::RevertOpcode));
    assert_eq!(report.gas_refunded, 0);
    assert_eq!(db.storage_value(&contract(), &H256::zero()), U256::zero());
}

#[test]
fn transient_storage_round_trips_within_a_message() {
    let code = Asm::new()
        .push(7)
        .push(1)
        .op(Opcode::TSTORE)
        .push(1)
        .op(Opcode::TLOAD)
        .return_top()
        .build();
    let report = run(&mut world_with(code));

    assert_eq!(output_word(&report), U256::from(7));
}

fn transient_after_delegatecall(callee_code: Vec<u8>) -> U256 {
    let code = Asm::new()
        .call_without_value(Opcode::DELEGATECALL, 0xFFFF, callee())
        .op(Opcode::POP)
        .push(1)
        .op(Opcode::TLOAD)
        .return_top()
        .build();
    let mut db = world_with(code);
    deploy(&mut db, callee(), callee_code);
    output_word(&run(&mut db))
}

#[test]
fn transient_writes_of_a_reverted_child_are_dropped() {
    let callee_code = Asm::new()
        .push(7)
        .push(1)
        .op(Opcode::TSTORE)
        .push(0)
        .push(0)
        .op(Opcode::REVERT)
        .build();

    assert_eq!(transient_after_delegatecall(callee_code), U256::zero());
}

#[test]
fn transient_writes_of_a_successful_child_are_kept() {
    let callee_code = Asm::new()
        .push(7)
        .push(1)
        .op(Opcode::TSTORE)
        .op(Opcode::STOP)
        .build();

    assert_eq!(transient_after_delegatecall(callee_code), U256::from(7));
}

/// Cancun prices with cheaper storage writes and a smaller clearing refund.
#[derive(Debug)]
struct DiscountedStorage;

impl GasSchedule for DiscountedStorage {
    fn tier(&self, tier: Tier) -> u64 {
        CancunGasSchedule.tier(tier)
    }
    fn jumpdest(&self) -> u64 {
        CancunGasSchedule.jumpdest()
    }
    fn copy_word(&self) -> u64 {
        CancunGasSchedule.copy_word()
    }
    fn exp_static(&self) -> u64 {
        CancunGasSchedule.exp_static()
    }
    fn exp_byte(&self) -> u64 {
        CancunGasSchedule.exp_byte()
    }
    fn keccak_static(&self) -> u64 {
        CancunGasSchedule.keccak_static()
    }
    fn keccak_word(&self) -> u64 {
        CancunGasSchedule.keccak_word()
    }
    fn log_static(&self) -> u64 {
        CancunGasSchedule.log_static()
    }
    fn log_topic(&self) -> u64 {
        CancunGasSchedule.log_topic()
    }
    fn log_data_byte(&self) -> u64 {
        CancunGasSchedule.log_data_byte()
    }
    fn warm_access(&self) -> u64 {
        CancunGasSchedule.warm_access()
    }
    fn cold_account_access(&self) -> u64 {
        CancunGasSchedule.cold_account_access()
    }
    fn cold_sload(&self) -> u64 {
        CancunGasSchedule.cold_sload()
    }
    fn sstore_sentry(&self) -> u64 {
        CancunGasSchedule.sstore_sentry()
    }
    fn sstore_set(&self) -> u64 {
        10_000
    }
    fn sstore_reset(&self) -> u64 {
        CancunGasSchedule.sstore_reset()
    }
    fn sstore_clears_schedule(&self) -> u64 {
        1_000
    }
    fn transient_storage(&self) -> u64 {
        CancunGasSchedule.transient_storage()
    }
    fn create_base(&self) -> u64 {
        CancunGasSchedule.create_base()
    }
    fn initcode_word(&self) -> u64 {
        CancunGasSchedule.initcode_word()
    }
    fn code_deposit_byte(&self) -> u64 {
        CancunGasSchedule.code_deposit_byte()
    }
    fn call_base(&self) -> u64 {
        CancunGasSchedule.call_base()
    }
    fn call_value(&self) -> u64 {
        CancunGasSchedule.call_value()
    }
    fn new_account(&self) -> u64 {
        CancunGasSchedule.new_account()
    }
    fn call_stipend(&self) -> u64 {
        CancunGasSchedule.call_stipend()
    }
    fn selfdestruct(&self) -> u64 {
        CancunGasSchedule.selfdestruct()
    }
    fn blockhash(&self) -> u64 {
        CancunGasSchedule.blockhash()
    }
    fn blobhash(&self) -> u64 {
        CancunGasSchedule.blobhash()
    }
}

#[test]
fn custom_schedule_reprices_a_fresh_slot() {
    let mut db = world_with(store(1, 0).op(Opcode::STOP).build());
    let report = execute_with(&mut db, call_message(GAS_LIMIT), Default::default(), |vm| {
        vm.with_schedule(DiscountedStorage)
    });

    assert!(report.is_success());
    assert_eq!(report.gas_used, 3 + 3 + 10_000 + 2_100);
}

#[test]
fn custom_schedule_reprices_the_clearing_refund() {
    let mut db = with_slot_zero(store(0, 0).op(Opcode::STOP).build(), 1);
    let report = execute_with(&mut db, call_message(GAS_LIMIT), Default::default(), |vm| {
        vm.with_schedule(DiscountedStorage)
    });

    // Below the 5006 / 5 cap, so the whole refund is paid.
    assert_eq!(report.gas_refunded, 1_000);
    assert_eq!(report.gas_used, 5_006 - 1_000);
}
