use anchor_lang::prelude::*;

#[cfg(not(target_os = "solana"))]
pub mod client;
pub mod constants;
pub mod errors;
pub mod events;
mod helpers;
pub mod instructions;
pub mod pda;
pub mod settlement;
pub mod state;

#[cfg(test)]
mod tests;

use instructions::*;

declare_id!("6eQpfCvsaHE4ufp6oFSLB6bwb3U98nvHCbtzg9ubCM83");

#[program]
pub mod fee_escrow {
    use super::*;

    /// Create the fee registry and fee vault for a fee token
    #[instruction(discriminator = 0)]
    pub fn initialize_pda(ctx: Context<InitializePda>) -> Result<()> {
        instructions::initialize_pda::handler(ctx)
    }

    /// Open an escrow: initializer deposits the deposit token, pays its fee
    /// share into the fee vault and sets the exchange terms
    #[instruction(discriminator = 1)]
    pub fn initialize(
        ctx: Context<Initialize>,
        initializer_amount: u64,
        taker_amount: u64,
        fee_amount_initializer: u64,
        fee_amount_taker: u64,
    ) -> Result<()> {
        instructions::initialize::handler(
            ctx,
            initializer_amount,
            taker_amount,
            fee_amount_initializer,
            fee_amount_taker,
        )
    }

    /// Cancel the escrow: initializer reclaims the deposit and its fee
    #[instruction(discriminator = 2)]
    pub fn cancel(ctx: Context<Cancel>) -> Result<()> {
        instructions::cancel::handler(ctx)
    }

    /// Accept the escrow: taker sends the receive token and both fees are
    /// collected, taker receives the deposit
    #[instruction(discriminator = 3)]
    pub fn exchange(ctx: Context<Exchange>) -> Result<()> {
        instructions::exchange::handler(ctx)
    }
}
