//! Amount and balance rules shared by the three escrow transitions.
//!
//! Nothing here touches accounts. The instruction handlers read balances out
//! of the token accounts they were given, ask this module what may move, and
//! only then issue the token CPIs, so a rejected plan never leaves a partial
//! transfer behind.

use anchor_lang::prelude::*;

use crate::errors::EscrowError;

/// Amounts fixed when an escrow is opened
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EscrowTerms {
    pub initializer_amount: u64,
    pub taker_amount: u64,
    pub fee_amount_initializer: u64,
    pub fee_amount_taker: u64,
}

impl EscrowTerms {
    pub fn validate(&self) -> Result<()> {
        require_gt!(self.initializer_amount, 0, EscrowError::InvalidAmount);
        require_gt!(self.taker_amount, 0, EscrowError::InvalidAmount);
        Ok(())
    }

    pub fn charges_fees(&self) -> bool {
        self.fee_amount_initializer > 0 || self.fee_amount_taker > 0
    }
}

/// Balances of the two accounts a party pays from
#[derive(Clone, Copy, Debug)]
pub struct PayerFunds {
    pub deposit: u64,
    pub fee_paying: u64,
    /// Set when the fee-paying account is the deposit account itself
    pub shared: bool,
}

impl PayerFunds {
    pub fn separate(deposit: u64, fee_paying: u64) -> Self {
        Self {
            deposit,
            fee_paying,
            shared: false,
        }
    }

    pub fn shared(balance: u64) -> Self {
        Self {
            deposit: balance,
            fee_paying: balance,
            shared: true,
        }
    }

    /// Fails unless `amount` and `fee` can both be paid
    pub fn cover(&self, amount: u64, fee: u64) -> Result<()> {
        if self.shared {
            let total = amount
                .checked_add(fee)
                .ok_or(EscrowError::ArithmeticOverflow)?;
            require_gte!(self.deposit, total, EscrowError::InsufficientFunds);
        } else {
            require_gte!(self.deposit, amount, EscrowError::InsufficientFunds);
            require_gte!(self.fee_paying, fee, EscrowError::InsufficientFunds);
        }
        Ok(())
    }
}

/// Token movements of a successful exchange
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settlement {
    /// Receive token, taker to initializer
    pub to_initializer: u64,
    /// Deposit token, the whole vault to the taker
    pub to_taker: u64,
    /// Fee token, taker to the fee collector
    pub taker_fee: u64,
    /// Fee token, fee vault to the fee collector
    pub initializer_fee: u64,
}

impl Settlement {
    pub fn collected_fees(&self) -> Result<u64> {
        Ok(self
            .taker_fee
            .checked_add(self.initializer_fee)
            .ok_or(EscrowError::ArithmeticOverflow)?)
    }
}

/// Token movements of a cancel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Refund {
    /// Deposit token, the whole vault back to the initializer
    pub deposit: u64,
    /// Fee token, fee vault back to the initializer's fee-paying account
    pub fee: u64,
}
