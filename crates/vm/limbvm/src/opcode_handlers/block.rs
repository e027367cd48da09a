use ethereum_types::U256;

use crate::{
    constants::BLOCKHASH_HISTORY,
    errors::{OpcodeResult, VMError},
    gas_cost::Tier,
    vm::VM,
    word,
};

// Block Information (11)
// Opcodes: BLOCKHASH, COINBASE, TIMESTAMP, NUMBER, PREVRANDAO, GASLIMIT, CHAINID, SELFBALANCE, BASEFEE, BLOBHASH, BLOBBASEFEE

impl<'a> VM<'a> {
    // BLOCKHASH operation
    pub fn op_blockhash(&mut self) -> Result<OpcodeResult, VMError> {
        let current_block = self.env.block_number;
        self.current_call_frame
            .increase_consumed_gas(self.schedule.blockhash())?;

        let block_number = self.current_call_frame.stack.pop_word()?;

        // Only the last 256 blocks are visible, excluding the current one.
        let lower_bound = current_block.saturating_sub(U256::from(BLOCKHASH_HISTORY));
        if block_number >= current_block || block_number < lower_bound {
            self.current_call_frame.stack.push_zero()?;
            return Ok(OpcodeResult::Continue);
        }

        let block_number = block_number.low_u64();
        match self.db.get_block_hash(block_number)? {
            Some(hash) => self
                .current_call_frame
                .stack
                .push(word::from_h256(&hash))?,
            None => self.current_call_frame.stack.push_zero()?,
        }

        Ok(OpcodeResult::Continue)
    }

    // COINBASE operation
    pub fn op_coinbase(&mut self) -> Result<OpcodeResult, VMError> {
        let coinbase = self.env.coinbase;
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        current_call_frame.stack.push_address(coinbase)?;

        Ok(OpcodeResult::Continue)
    }

    // TIMESTAMP operation
    pub fn op_timestamp(&mut self) -> Result<OpcodeResult, VMError> {
        let timestamp = self.env.timestamp;
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        current_call_frame.stack.push_word(timestamp)?;

        Ok(OpcodeResult::Continue)
    }

    // NUMBER operation
    pub fn op_number(&mut self) -> Result<OpcodeResult, VMError> {
        let block_number = self.env.block_number;
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        current_call_frame.stack.push_word(block_number)?;

        Ok(OpcodeResult::Continue)
    }

    // PREVRANDAO operation
    pub fn op_prevrandao(&mut self) -> Result<OpcodeResult, VMError> {
        let randao = self.env.prev_randao.unwrap_or_default();
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        current_call_frame.stack.push(word::from_h256(&randao))?;

        Ok(OpcodeResult::Continue)
    }

    // GASLIMIT operation
    pub fn op_gaslimit(&mut self) -> Result<OpcodeResult, VMError> {
        let block_gas_limit = self.env.block_gas_limit;
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        current_call_frame.stack.push_u64(block_gas_limit)?;

        Ok(OpcodeResult::Continue)
    }

    // CHAINID operation
    pub fn op_chainid(&mut self) -> Result<OpcodeResult, VMError> {
        let chain_id = self
            .overrides
            .chain_id()
            .unwrap_or_else(|| U256::from(self.config.chain_id));
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        current_call_frame.stack.push_word(chain_id)?;

        Ok(OpcodeResult::Continue)
    }

    // SELFBALANCE operation
    pub fn op_selfbalance(&mut self) -> Result<OpcodeResult, VMError> {
        self.current_call_frame
            .increase_consumed_gas(self.schedule.tier(Tier::Low))?;

        let balance = self.db.get_balance(self.current_call_frame.to)?;
        self.current_call_frame.stack.push_word(balance)?;

        Ok(OpcodeResult::Continue)
    }

    // BASEFEE operation
    pub fn op_basefee(&mut self) -> Result<OpcodeResult, VMError> {
        let base_fee = self.env.base_fee_per_gas;
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        current_call_frame.stack.push_word(base_fee)?;

        Ok(OpcodeResult::Continue)
    }

    // BLOBHASH operation
    pub fn op_blobhash(&mut self) -> Result<OpcodeResult, VMError> {
        self.current_call_frame
            .increase_consumed_gas(self.schedule.blobhash())?;

        let index = self.current_call_frame.stack.pop1()?;
        let blob_hash = usize::try_from(word::to_u64_saturating(index))
            .ok()
            .filter(|_| word::fits_u64(index))
            .and_then(|index| self.env.blob_hashes.get(index));

        match blob_hash {
            Some(hash) => {
                let hash = word::from_h256(hash);
                self.current_call_frame.stack.push(hash)?;
            }
            None => self.current_call_frame.stack.push_zero()?,
        }

        Ok(OpcodeResult::Continue)
    }

    // BLOBBASEFEE operation
    pub fn op_blobbasefee(&mut self) -> Result<OpcodeResult, VMError> {
        let blob_base_fee = self.env.blob_base_fee;
        let current_call_frame = &mut self.current_call_frame;
        current_call_frame.increase_consumed_gas(self.schedule.tier(Tier::Base))?;

        current_call_frame.stack.push_word(blob_base_fee)?;

        Ok(OpcodeResult::Continue)
    }
}
