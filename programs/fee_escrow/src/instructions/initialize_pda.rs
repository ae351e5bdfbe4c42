use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

use crate::{
    constants::{FEE_REGISTRY_SEED, FEE_VAULT_SEED, VAULT_AUTHORITY_SEED},
    state::FeeRegistry,
};

#[derive(Accounts)]
pub struct InitializePda<'info> {
    /// Pays rent for the registry and its fee vault
    #[account(mut)]
    pub payer: Signer<'info>,

    /// Token every fee quoted against this registry is paid in
    pub fee_token: Account<'info, Mint>,

    /// CHECK: wallet recorded as the owner of fee-collect token accounts, never read
    pub fee_collector: UncheckedAccount<'info>,

    /// Registry singleton for `fee_token`
    #[account(
        init_if_needed,
        payer = payer,
        space = FeeRegistry::DISCRIMINATOR.len() + FeeRegistry::INIT_SPACE,
        seeds = [crate::ID.as_ref(), fee_token.key().as_ref(), FEE_REGISTRY_SEED],
        bump,
    )]
    pub fee_registry: Account<'info, FeeRegistry>,

    /// CHECK: signer-less owner of the fee vault, only its address is used
    #[account(
        seeds = [fee_registry.key().as_ref(), VAULT_AUTHORITY_SEED],
        bump,
    )]
    pub fee_vault_authority: UncheckedAccount<'info>,

    /// Holds initializer fees until their escrow settles
    #[account(
        init_if_needed,
        payer = payer,
        seeds = [fee_registry.key().as_ref(), FEE_VAULT_SEED],
        bump,
        token::mint = fee_token,
        token::authority = fee_vault_authority,
    )]
    pub fee_vault: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

impl<'info> InitializePda<'info> {
    /// Record the fee wiring; an already initialized registry is left untouched
    pub fn init_registry(&mut self, bumps: &InitializePdaBumps) -> Result<()> {
        let admin = self.payer.key();
        let fee_token = self.fee_token.key();
        let fee_collector = self.fee_collector.key();
        let fee_vault = self.fee_vault.key();
        let fee_vault_authority = self.fee_vault_authority.key();

        self.fee_registry.init(
            admin,
            fee_token,
            fee_collector,
            fee_vault,
            fee_vault_authority,
            bumps.fee_registry,
            bumps.fee_vault,
            bumps.fee_vault_authority,
        )
    }
}

/// Handler for the initialize_pda instruction
pub fn handler(ctx: Context<InitializePda>) -> Result<()> {
    ctx.accounts.init_registry(&ctx.bumps)?;

    msg!(
        "Fee registry {} created for fee token {}",
        ctx.accounts.fee_registry.key(),
        ctx.accounts.fee_token.key()
    );
    Ok(())
}
