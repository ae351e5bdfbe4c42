use anchor_lang::prelude::*;
use anchor_spl::token::{transfer_checked, Mint, Token, TokenAccount, TransferChecked};

use crate::{
    constants::VAULT_AUTHORITY_SEED,
    errors::EscrowError,
    events::InitializeEvent,
    pda::fee_registry_address,
    settlement::{EscrowTerms, PayerFunds},
    state::{EscrowAccount, FeeRegistry, OpenEscrow},
};

#[derive(Accounts)]
pub struct Initialize<'info> {
    /// Offering party; deposits the deposit token and pays rent
    #[account(mut)]
    pub initializer: Signer<'info>,

    /// Token the initializer deposits
    pub deposit_token: Box<Account<'info, Mint>>,

    /// Token the initializer wants in return
    pub receive_token: Box<Account<'info, Mint>>,

    /// Token both fee shares are paid in
    pub fee_token: Box<Account<'info, Mint>>,

    /// Escrow record; created on first use, reused after it has been closed
    #[account(
        init_if_needed,
        payer = initializer,
        space = EscrowAccount::DISCRIMINATOR.len() + EscrowAccount::INIT_SPACE,
        seeds = [initializer.key().as_ref(), deposit_token.key().as_ref(), receive_token.key().as_ref()],
        bump,
    )]
    pub escrow: Box<Account<'info, EscrowAccount>>,

    /// CHECK: signer-less owner of the vault, only its address is used
    #[account(
        seeds = [VAULT_AUTHORITY_SEED, escrow.key().as_ref()],
        bump,
    )]
    pub vault_authority: UncheckedAccount<'info>,

    /// Holds the deposit until cancel or exchange
    #[account(
        init_if_needed,
        payer = initializer,
        seeds = [escrow.key().as_ref()],
        bump,
        token::mint = deposit_token,
        token::authority = vault_authority,
    )]
    pub vault: Box<Account<'info, TokenAccount>>,

    /// CHECK: read through `FeeRegistry::load`
    #[account(address = fee_registry_address(&fee_token.key()).0 @ EscrowError::AddressMismatch)]
    pub fee_registry: UncheckedAccount<'info>,

    /// Registry fee vault, receives the initializer's fee share
    #[account(mut, token::mint = fee_token)]
    pub fee_vault: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        token::mint = deposit_token,
        token::authority = initializer,
    )]
    pub initializer_deposit_token_account: Box<Account<'info, TokenAccount>>,

    #[account(
        token::mint = receive_token,
        token::authority = initializer,
    )]
    pub initializer_receive_token_account: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        token::mint = fee_token,
        token::authority = initializer,
    )]
    pub initializer_fee_paying_token_account: Box<Account<'info, TokenAccount>>,

    /// Fee token account owned by the registry's fee collector
    pub fee_collect_token_account: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

impl<'info> Initialize<'info> {
    /// Write the offer into the escrow record, refusing to overwrite an open one
    pub fn open_escrow(&mut self, terms: EscrowTerms, bumps: &InitializeBumps) -> Result<()> {
        let offer = OpenEscrow {
            initializer: self.initializer.key(),
            deposit_token: self.deposit_token.key(),
            receive_token: self.receive_token.key(),
            fee_token: self.fee_token.key(),
            initializer_deposit_token_account: self.initializer_deposit_token_account.key(),
            initializer_receive_token_account: self.initializer_receive_token_account.key(),
            initializer_fee_paying_token_account: self.initializer_fee_paying_token_account.key(),
            fee_collect_token_account: self.fee_collect_token_account.key(),
            vault_account: self.vault.key(),
            terms,
            bump: bumps.escrow,
            vault_bump: bumps.vault,
            vault_authority_bump: bumps.vault_authority,
        };
        self.escrow.open(offer)
    }

    /// The fee registry must exist and agree with the supplied fee accounts
    pub fn check_fee_wiring(&self) -> Result<FeeRegistry> {
        let registry = FeeRegistry::load(&self.fee_registry)?;

        require_keys_eq!(self.fee_vault.key(), registry.fee_vault, EscrowError::AddressMismatch);
        registry.check_fee_collect_account(
            &self.fee_collect_token_account.mint,
            &self.fee_collect_token_account.owner,
        )?;
        Ok(registry)
    }

    pub fn initializer_funds(&self) -> PayerFunds {
        let deposit = &self.initializer_deposit_token_account;
        let fee_paying = &self.initializer_fee_paying_token_account;

        if deposit.key() == fee_paying.key() {
            PayerFunds::shared(deposit.amount)
        } else {
            PayerFunds::separate(deposit.amount, fee_paying.amount)
        }
    }

    /// Transfer the deposit from the initializer to the vault
    pub fn deposit(&self, amount: u64) -> Result<()> {
        let cpi_accounts = TransferChecked {
            from: self.initializer_deposit_token_account.to_account_info(),
            mint: self.deposit_token.to_account_info(),
            to: self.vault.to_account_info(),
            authority: self.initializer.to_account_info(),
        };
        let cpi_program = self.token_program.to_account_info();
        let cpi_ctx = CpiContext::new(cpi_program, cpi_accounts);

        transfer_checked(cpi_ctx, amount, self.deposit_token.decimals)
    }

    /// Move the initializer's fee share into the registry fee vault
    pub fn hold_initializer_fee(&self, fee: u64) -> Result<()> {
        if fee == 0 {
            return Ok(());
        }

        let cpi_accounts = TransferChecked {
            from: self.initializer_fee_paying_token_account.to_account_info(),
            mint: self.fee_token.to_account_info(),
            to: self.fee_vault.to_account_info(),
            authority: self.initializer.to_account_info(),
        };
        let cpi_program = self.token_program.to_account_info();
        let cpi_ctx = CpiContext::new(cpi_program, cpi_accounts);

        transfer_checked(cpi_ctx, fee, self.fee_token.decimals)
    }
}

/// Handler for the initialize instruction
pub fn handler(
    ctx: Context<Initialize>,
    initializer_amount: u64,
    taker_amount: u64,
    fee_amount_initializer: u64,
    fee_amount_taker: u64,
) -> Result<()> {
    let terms = EscrowTerms {
        initializer_amount,
        taker_amount,
        fee_amount_initializer,
        fee_amount_taker,
    };

    ctx.accounts.open_escrow(terms, &ctx.bumps)?;
    ctx.accounts.check_fee_wiring()?;
    ctx.accounts
        .initializer_funds()
        .cover(initializer_amount, fee_amount_initializer)?;

    ctx.accounts.deposit(initializer_amount)?;
    ctx.accounts.hold_initializer_fee(fee_amount_initializer)?;

    emit!(InitializeEvent {
        initializer: ctx.accounts.initializer.key(),
        deposit_token: ctx.accounts.deposit_token.key(),
        receive_token: ctx.accounts.receive_token.key(),
        fee_token: ctx.accounts.fee_token.key(),
        fee_collector: ctx.accounts.fee_collect_token_account.key(),
        deposit_amount: initializer_amount,
        receive_amount: taker_amount,
        initializer_fee_amount: fee_amount_initializer,
        taker_fee_amount: fee_amount_taker,
    });

    msg!(
        "Escrow {} open: {} deposited for {}",
        ctx.accounts.escrow.key(),
        initializer_amount,
        taker_amount
    );
    Ok(())
}
