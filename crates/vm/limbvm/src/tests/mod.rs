#![allow(clippy::arithmetic_side_effects)]

mod gas_ordering;
mod interpreter;
mod storage;
mod test_helpers;
