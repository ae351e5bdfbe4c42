use anchor_lang::prelude::*;
use anchor_spl::token::{
    close_account, transfer_checked, CloseAccount, Mint, Token, TokenAccount, TransferChecked,
};

use crate::{
    errors::EscrowError,
    events::CancelEvent,
    helpers::{close_program_account, load_token_account},
    pda::{fee_registry_address, fee_vault_address, PdaSigner},
    settlement::Refund,
    state::{EscrowAccount, FeeRegistry},
};

#[derive(Accounts)]
pub struct Cancel<'info> {
    /// The initializer who opened the escrow; receives everything back
    #[account(mut)]
    pub initializer: Signer<'info>,

    pub deposit_token: Box<Account<'info, Mint>>,

    pub receive_token: Box<Account<'info, Mint>>,

    pub fee_token: Box<Account<'info, Mint>>,

    /// CHECK: read through `EscrowAccount::load` and closed by hand, so an
    /// already settled escrow is reported as `NotFound`
    #[account(mut)]
    pub escrow: UncheckedAccount<'info>,

    /// CHECK: must be the vault recorded in the escrow, read through `load_token_account`
    #[account(mut)]
    pub vault: UncheckedAccount<'info>,

    /// CHECK: re-derived by `PdaSigner::vault_authority`
    pub vault_authority: UncheckedAccount<'info>,

    /// CHECK: read through `FeeRegistry::load`
    #[account(address = fee_registry_address(&fee_token.key()).0 @ EscrowError::AddressMismatch)]
    pub fee_registry: UncheckedAccount<'info>,

    #[account(
        mut,
        address = fee_vault_address(&fee_registry.key()).0 @ EscrowError::AddressMismatch,
    )]
    pub fee_vault: Box<Account<'info, TokenAccount>>,

    /// CHECK: re-derived by `PdaSigner::fee_vault_authority`
    pub fee_vault_authority: UncheckedAccount<'info>,

    #[account(mut)]
    pub initializer_deposit_token_account: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub initializer_fee_paying_token_account: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
}

impl<'info> Cancel<'info> {
    /// Load the open escrow and make sure every supplied account belongs to it
    pub fn load_escrow(&self) -> Result<(EscrowAccount, FeeRegistry)> {
        let escrow = EscrowAccount::load(&self.escrow)?;
        escrow.ensure_open()?;
        require_keys_eq!(self.initializer.key(), escrow.initializer, EscrowError::Unauthorized);

        escrow.check_address(&self.escrow.key())?;
        escrow.check_tokens(
            &self.deposit_token.key(),
            &self.receive_token.key(),
            &self.fee_token.key(),
        )?;
        require_keys_eq!(self.vault.key(), escrow.vault_account, EscrowError::AddressMismatch);
        require_keys_eq!(
            self.initializer_deposit_token_account.key(),
            escrow.initializer_deposit_token_account,
            EscrowError::AddressMismatch
        );
        if let Some(fee) = escrow.fee.terms() {
            require_keys_eq!(
                self.initializer_fee_paying_token_account.key(),
                fee.initializer_fee_paying_token_account,
                EscrowError::AddressMismatch
            );
        }

        let registry = FeeRegistry::load(&self.fee_registry)?;
        Ok((escrow, registry))
    }

    /// Return the whole vault to the initializer and close it
    pub fn refund_and_close_vault(&self, escrow: &EscrowAccount, amount: u64) -> Result<()> {
        let escrow_key = self.escrow.key();
        let signer = PdaSigner::vault_authority(
            &escrow_key,
            escrow.vault_authority_bump,
            &self.vault_authority.key(),
        )?;
        let seeds = signer.seeds();
        let signer_seeds: &[&[&[u8]]] = &[&seeds[..]];

        if amount > 0 {
            let cpi_accounts = TransferChecked {
                from: self.vault.to_account_info(),
                mint: self.deposit_token.to_account_info(),
                to: self.initializer_deposit_token_account.to_account_info(),
                authority: self.vault_authority.to_account_info(),
            };
            let cpi_program = self.token_program.to_account_info();
            let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer_seeds);

            transfer_checked(cpi_ctx, amount, self.deposit_token.decimals)?;
        }

        // Close the vault account and return rent to the initializer
        let cpi_accounts = CloseAccount {
            account: self.vault.to_account_info(),
            destination: self.initializer.to_account_info(),
            authority: self.vault_authority.to_account_info(),
        };
        let cpi_program = self.token_program.to_account_info();
        let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer_seeds);

        close_account(cpi_ctx)
    }

    /// Return the initializer's held fee from the registry fee vault
    pub fn refund_fee(&self, registry: &FeeRegistry, fee: u64) -> Result<()> {
        if fee == 0 {
            return Ok(());
        }

        let registry_key = self.fee_registry.key();
        let signer = PdaSigner::fee_vault_authority(
            &registry_key,
            registry.fee_vault_authority_bump,
            &self.fee_vault_authority.key(),
        )?;
        let seeds = signer.seeds();
        let signer_seeds: &[&[&[u8]]] = &[&seeds[..]];

        let cpi_accounts = TransferChecked {
            from: self.fee_vault.to_account_info(),
            mint: self.fee_token.to_account_info(),
            to: self.initializer_fee_paying_token_account.to_account_info(),
            authority: self.fee_vault_authority.to_account_info(),
        };
        let cpi_program = self.token_program.to_account_info();
        let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer_seeds);

        transfer_checked(cpi_ctx, fee, self.fee_token.decimals)
    }
}

/// Handler for the cancel instruction
pub fn handler(ctx: Context<Cancel>) -> Result<()> {
    let (escrow, registry) = ctx.accounts.load_escrow()?;
    let vault = load_token_account(&ctx.accounts.vault)?;

    let Refund { deposit, fee } = escrow.refund(vault.amount, ctx.accounts.fee_vault.amount)?;

    ctx.accounts.refund_and_close_vault(&escrow, deposit)?;
    ctx.accounts.refund_fee(&registry, fee)?;
    close_program_account(&ctx.accounts.escrow, &ctx.accounts.initializer)?;

    emit!(CancelEvent {
        initializer: escrow.initializer,
        deposit_token: escrow.deposit_token,
        receive_token: escrow.receive_token,
        deposit_amount: deposit,
        receive_amount: escrow.taker_amount,
        refunded_fee_amount: fee,
    });

    msg!("Escrow {} cancelled, {} returned", ctx.accounts.escrow.key(), deposit);
    Ok(())
}
