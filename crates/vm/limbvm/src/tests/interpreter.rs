use bytes::Bytes;
use ethereum_types::{H256, U256};

use super::test_helpers::*;
use crate::{
    VmConfig,
    environment::Message,
    errors::{ExceptionalHalt, TxResult, VMError},
    opcodes::Opcode,
    utils::keccak,
};

fn halted_with(result: &TxResult, halt: ExceptionalHalt) -> bool {
    *result == TxResult::Revert(VMError::ExceptionalHalt(halt))
}

#[test]
fn signextend_keeps_a_positive_byte() {
    let code = Asm::new()
        .push(0x7F)
        .push(0)
        .op(Opcode::SIGNEXTEND)
        .return_top()
        .build();
    let report = run(&mut world_with(code));
    assert!(report.is_success());
    assert_eq!(output_word(&report), U256::from(0x7F));
}

#[test]
fn signextend_propagates_the_sign_bit() {
    let code = Asm::new()
        .push(0xFF)
        .push(0)
        .op(Opcode::SIGNEXTEND)
        .return_top()
        .build();
    let report = run(&mut world_with(code));
    assert_eq!(output_word(&report), U256::MAX);
}

#[test]
fn div_by_a_power_of_two() {
    let code = Asm::new()
        .push(4)
        .push(256)
        .op(Opcode::DIV)
        .return_top()
        .build();
    let report = run(&mut world_with(code));
    assert_eq!(output_word(&report), U256::from(64));
}

#[test]
fn gas_used_is_the_sum_of_opcode_costs() {
    let code = Asm::new().push(1).push(2).op(Opcode::ADD).op(Opcode::STOP).build();
    let report = run(&mut world_with(code));
    assert!(report.is_success());
    assert_eq!(report.gas_used, 9);
}

#[test]
fn exp_charges_per_exponent_byte() {
    let code = Asm::new()
        .push(0x0100)
        .push(2)
        .op(Opcode::EXP)
        .op(Opcode::STOP)
        .build();
    let report = run(&mut world_with(code));
    assert_eq!(report.gas_used, 3 + 3 + 10 + 2 * 50);
}

#[test]
fn undefined_opcodes_consume_all_gas() {
    for code in [vec![0xFE], vec![0x0C], vec![0xEF]] {
        let report = run(&mut world_with(code));
        assert!(halted_with(&report.result, ExceptionalHalt::InvalidOpcode));
        assert_eq!(report.gas_used, GAS_LIMIT);
        assert!(report.output.is_empty());
    }
}

#[test]
fn jumps_into_push_data_are_rejected() {
    // PUSH1 4, JUMP, PUSH1 0x5b, STOP: offset 4 is an immediate byte.
    let report = run(&mut world_with(vec![0x60, 0x04, 0x56, 0x60, 0x5b, 0x00]));
    assert!(halted_with(&report.result, ExceptionalHalt::InvalidJump));
}

#[test]
fn jumps_land_on_jumpdest() {
    let code = Asm::new()
        .raw(&[0x60, 0x04, 0x56, 0x00, 0x5b])
        .push(0x2a)
        .return_top()
        .build();
    let report = run(&mut world_with(code));
    assert_eq!(output_word(&report), U256::from(0x2a));
}

#[test]
fn running_off_the_end_stops() {
    let report = run(&mut world_with(vec![0x60, 0x01]));
    assert!(report.is_success());
    assert_eq!(report.gas_used, 3);
}

#[test]
fn stack_limits_halt_the_frame() {
    let report = run(&mut world_with(vec![0x5f; 1025]));
    assert!(halted_with(&report.result, ExceptionalHalt::StackOverflow));

    let report = run(&mut world_with(vec![u8::from(Opcode::ADD)]));
    assert!(halted_with(&report.result, ExceptionalHalt::StackUnderflow));
}

#[test]
fn revert_returns_output_and_unused_gas() {
    let code = Asm::new()
        .push(0xbeef)
        .push(0)
        .op(Opcode::MSTORE)
        .push(32)
        .push(0)
        .op(Opcode::REVERT)
        .build();
    let report = run(&mut world_with(code));
    assert_eq!(report.result, TxResult::Revert(VMError::RevertOpcode));
    assert_eq!(output_word(&report), U256::from(0xbeef));
    // Pushes, MSTORE with one word of expansion, then REVERT within memory.
    assert_eq!(report.gas_used, 3 + 3 + 3 + 3 + 3 + 3);
}

#[test]
fn logs_are_reported_on_success() {
    let code = Asm::new()
        .push(0x2a)
        .push(0)
        .op(Opcode::MSTORE)
        .push(7)
        .push(32)
        .push(0)
        .op(Opcode::LOG1)
        .op(Opcode::STOP)
        .build();
    let report = run(&mut world_with(code));
    assert_eq!(report.logs.len(), 1);
    let log = &report.logs[0];
    assert_eq!(log.address, contract());
    assert_eq!(log.topics, vec![H256::from_low_u64_be(7)]);
    assert_eq!(U256::from_big_endian(&log.data), U256::from(0x2a));
}

#[test]
fn keccak_of_empty_memory_range() {
    let code = Asm::new()
        .push(0)
        .push(0)
        .op(Opcode::KECCAK256)
        .return_top()
        .build();
    let report = run(&mut world_with(code));
    assert_eq!(report.output, Bytes::copy_from_slice(keccak(b"").as_bytes()));
}

#[test]
fn calldataload_zero_pads_past_the_end() {
    let code = Asm::new()
        .push(0)
        .op(Opcode::CALLDATALOAD)
        .return_top()
        .build();
    let mut db = world_with(code);
    let message = Message::call(sender(), contract(), Bytes::from_static(&[0xAA]), GAS_LIMIT);
    let report = execute_with(&mut db, message, VmConfig::default(), |vm| vm);
    assert_eq!(output_word(&report), U256::from(0xAA) << 248);
}

#[test]
fn mcopy_moves_a_word() {
    let code = Asm::new()
        .push(0x2a)
        .push(0)
        .op(Opcode::MSTORE)
        .push(32)
        .push(0)
        .push(32)
        .op(Opcode::MCOPY)
        .push(32)
        .op(Opcode::MLOAD)
        .return_top()
        .build();
    let report = run(&mut world_with(code));
    assert_eq!(output_word(&report), U256::from(0x2a));
}

#[test]
fn blockhash_only_sees_recent_blocks() {
    let hash = H256::repeat_byte(0x11);
    let code = Asm::new()
        .push(999)
        .op(Opcode::BLOCKHASH)
        .push(1_000)
        .op(Opcode::BLOCKHASH)
        .op(Opcode::ADD)
        .return_top()
        .build();
    let mut db = world_with(code);
    db.insert_block_hash(999, hash);
    db.insert_block_hash(1_000, H256::repeat_byte(0x22));
    let report = run(&mut db);
    assert_eq!(output_word(&report), U256::from_big_endian(hash.as_bytes()));
}

#[test]
fn hand_assembled_program() {
    // PUSH1 2, PUSH1 3, MUL, PUSH1 1, SHL, then return the top word
    let code = hex::decode("600260030260011b60005260206000f3").unwrap();
    let report = run(&mut world_with(code));
    assert!(report.is_success());
    assert_eq!(output_word(&report), U256::from(12));
}
