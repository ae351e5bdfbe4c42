use anchor_lang::prelude::*;
use anchor_spl::token::{
    close_account, transfer_checked, CloseAccount, Mint, Token, TokenAccount, TransferChecked,
};

use crate::{
    errors::EscrowError,
    events::ExchangeEvent,
    helpers::{close_program_account, load_token_account},
    pda::{fee_registry_address, fee_vault_address, PdaSigner},
    settlement::{PayerFunds, Settlement},
    state::{EscrowAccount, FeeRegistry},
};

#[derive(Accounts)]
pub struct Exchange<'info> {
    /// The taker who accepts the offer
    #[account(mut)]
    pub taker: Signer<'info>,

    /// The initializer who opened the escrow; receives the rent back
    #[account(mut)]
    pub initializer: SystemAccount<'info>,

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

    /// Taker's receive-token account (source of the taker amount)
    #[account(
        mut,
        token::mint = receive_token,
        token::authority = taker,
    )]
    pub taker_deposit_token_account: Box<Account<'info, TokenAccount>>,

    /// Taker's deposit-token account (receives the vault)
    #[account(
        mut,
        token::mint = deposit_token,
        token::authority = taker,
    )]
    pub taker_receive_token_account: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        token::mint = fee_token,
        token::authority = taker,
    )]
    pub taker_fee_paying_token_account: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub initializer_receive_token_account: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub fee_collect_token_account: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
}

impl<'info> Exchange<'info> {
    /// Load the open escrow and make sure every supplied account belongs to it
    pub fn load_escrow(&self) -> Result<(EscrowAccount, FeeRegistry)> {
        let escrow = EscrowAccount::load(&self.escrow)?;
        escrow.ensure_open()?;

        escrow.check_address(&self.escrow.key())?;
        require_keys_eq!(self.initializer.key(), escrow.initializer, EscrowError::AddressMismatch);
        escrow.check_tokens(
            &self.deposit_token.key(),
            &self.receive_token.key(),
            &self.fee_token.key(),
        )?;
        require_keys_eq!(self.vault.key(), escrow.vault_account, EscrowError::AddressMismatch);
        require_keys_eq!(
            self.initializer_receive_token_account.key(),
            escrow.initializer_receive_token_account,
            EscrowError::AddressMismatch
        );
        if let Some(fee) = escrow.fee.terms() {
            require_keys_eq!(
                self.fee_collect_token_account.key(),
                fee.fee_collect_token_account,
                EscrowError::AddressMismatch
            );
        }

        let registry = FeeRegistry::load(&self.fee_registry)?;
        Ok((escrow, registry))
    }

    pub fn taker_funds(&self) -> PayerFunds {
        let deposit = &self.taker_deposit_token_account;
        let fee_paying = &self.taker_fee_paying_token_account;

        if deposit.key() == fee_paying.key() {
            PayerFunds::shared(deposit.amount)
        } else {
            PayerFunds::separate(deposit.amount, fee_paying.amount)
        }
    }

    /// Forward the taker's fee and the initializer's held fee to the collector
    pub fn collect_fees(&self, registry: &FeeRegistry, settlement: &Settlement) -> Result<()> {
        if settlement.taker_fee > 0 {
            let cpi_accounts = TransferChecked {
                from: self.taker_fee_paying_token_account.to_account_info(),
                mint: self.fee_token.to_account_info(),
                to: self.fee_collect_token_account.to_account_info(),
                authority: self.taker.to_account_info(),
            };
            let cpi_program = self.token_program.to_account_info();
            let cpi_ctx = CpiContext::new(cpi_program, cpi_accounts);

            transfer_checked(cpi_ctx, settlement.taker_fee, self.fee_token.decimals)?;
        }

        if settlement.initializer_fee > 0 {
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
                to: self.fee_collect_token_account.to_account_info(),
                authority: self.fee_vault_authority.to_account_info(),
            };
            let cpi_program = self.token_program.to_account_info();
            let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer_seeds);

            transfer_checked(cpi_ctx, settlement.initializer_fee, self.fee_token.decimals)?;
        }

        Ok(())
    }

    /// Transfer the receive token from the taker to the initializer
    pub fn transfer_to_initializer(&self, amount: u64) -> Result<()> {
        let cpi_accounts = TransferChecked {
            from: self.taker_deposit_token_account.to_account_info(),
            mint: self.receive_token.to_account_info(),
            to: self.initializer_receive_token_account.to_account_info(),
            authority: self.taker.to_account_info(),
        };
        let cpi_program = self.token_program.to_account_info();
        let cpi_ctx = CpiContext::new(cpi_program, cpi_accounts);

        transfer_checked(cpi_ctx, amount, self.receive_token.decimals)
    }

    /// Withdraw the whole vault to the taker, then close the vault
    pub fn withdraw_and_close_vault(&self, escrow: &EscrowAccount, amount: u64) -> Result<()> {
        let escrow_key = self.escrow.key();
        let signer = PdaSigner::vault_authority(
            &escrow_key,
            escrow.vault_authority_bump,
            &self.vault_authority.key(),
        )?;
        let seeds = signer.seeds();
        let signer_seeds: &[&[&[u8]]] = &[&seeds[..]];

        let cpi_accounts = TransferChecked {
            from: self.vault.to_account_info(),
            mint: self.deposit_token.to_account_info(),
            to: self.taker_receive_token_account.to_account_info(),
            authority: self.vault_authority.to_account_info(),
        };
        let cpi_program = self.token_program.to_account_info();
        let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer_seeds);

        transfer_checked(cpi_ctx, amount, self.deposit_token.decimals)?;

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
}

/// Handler for the exchange instruction
pub fn handler(ctx: Context<Exchange>) -> Result<()> {
    let (escrow, registry) = ctx.accounts.load_escrow()?;
    let vault = load_token_account(&ctx.accounts.vault)?;

    let settlement = escrow.settlement(
        vault.amount,
        ctx.accounts.fee_vault.amount,
        &ctx.accounts.taker_funds(),
    )?;

    // Every check has passed; from here on only token movements and closes
    ctx.accounts.collect_fees(&registry, &settlement)?;
    ctx.accounts.transfer_to_initializer(settlement.to_initializer)?;
    ctx.accounts.withdraw_and_close_vault(&escrow, settlement.to_taker)?;
    close_program_account(&ctx.accounts.escrow, &ctx.accounts.initializer)?;

    emit!(ExchangeEvent {
        initializer: escrow.initializer,
        taker: ctx.accounts.taker.key(),
        deposit_token: escrow.deposit_token,
        receive_token: escrow.receive_token,
        deposit_amount: settlement.to_taker,
        receive_amount: settlement.to_initializer,
        initializer_fee_amount: settlement.initializer_fee,
        taker_fee_amount: settlement.taker_fee,
    });

    msg!(
        "Escrow {} exchanged, {} fee collected",
        ctx.accounts.escrow.key(),
        settlement.collected_fees()?
    );
    Ok(())
}
