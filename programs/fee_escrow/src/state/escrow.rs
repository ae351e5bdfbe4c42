use anchor_lang::prelude::*;

use crate::{
    constants::ESCROW_VERSION,
    errors::EscrowError,
    settlement::{EscrowTerms, PayerFunds, Refund, Settlement},
};

/// Fee wiring of an escrow that charges fees
#[derive(AnchorSerialize, AnchorDeserialize, InitSpace, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeTerms {
    /// Fee token account that receives both fee shares
    pub fee_collect_token_account: Pubkey,
    /// Where the initializer's share came from (and is refunded to on cancel)
    pub initializer_fee_paying_token_account: Pubkey,
    pub fee_amount_initializer: u64,
    pub fee_amount_taker: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, InitSpace, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeeSchedule {
    /// Both fee amounts are zero
    Waived,
    Collected(FeeTerms),
}

impl FeeSchedule {
    pub fn initializer_fee(&self) -> u64 {
        match self {
            FeeSchedule::Waived => 0,
            FeeSchedule::Collected(terms) => terms.fee_amount_initializer,
        }
    }

    pub fn taker_fee(&self) -> u64 {
        match self {
            FeeSchedule::Waived => 0,
            FeeSchedule::Collected(terms) => terms.fee_amount_taker,
        }
    }

    pub fn terms(&self) -> Option<&FeeTerms> {
        match self {
            FeeSchedule::Waived => None,
            FeeSchedule::Collected(terms) => Some(terms),
        }
    }
}

/// One pending swap offer, addressed by (initializer, deposit token, receive token)
#[account(discriminator = 1)]
#[derive(InitSpace, Debug)]
pub struct EscrowAccount {
    /// Layout version, see `ESCROW_VERSION`
    pub version: u8,
    /// Open flag; a closed escrow has no account at all
    pub initialized: bool,
    pub initializer: Pubkey,
    /// Token the initializer deposited
    pub deposit_token: Pubkey,
    /// Token the initializer wants in return
    pub receive_token: Pubkey,
    pub fee_token: Pubkey,
    pub initializer_deposit_token_account: Pubkey,
    pub initializer_receive_token_account: Pubkey,
    pub vault_account: Pubkey,
    pub initializer_amount: u64,
    pub taker_amount: u64,
    pub fee: FeeSchedule,
    pub bump: u8,
    pub vault_bump: u8,
    pub vault_authority_bump: u8,
}

/// Everything Initialize records about a new offer
#[derive(Clone, Copy, Debug)]
pub struct OpenEscrow {
    pub initializer: Pubkey,
    pub deposit_token: Pubkey,
    pub receive_token: Pubkey,
    pub fee_token: Pubkey,
    pub initializer_deposit_token_account: Pubkey,
    pub initializer_receive_token_account: Pubkey,
    pub initializer_fee_paying_token_account: Pubkey,
    pub fee_collect_token_account: Pubkey,
    pub vault_account: Pubkey,
    pub terms: EscrowTerms,
    pub bump: u8,
    pub vault_bump: u8,
    pub vault_authority_bump: u8,
}

impl EscrowAccount {
    /// Record a new offer. Fails if this record is still open.
    pub fn open(&mut self, offer: OpenEscrow) -> Result<()> {
        require!(!self.initialized, EscrowError::AlreadyOpen);
        offer.terms.validate()?;

        let fee = if offer.terms.charges_fees() {
            FeeSchedule::Collected(FeeTerms {
                fee_collect_token_account: offer.fee_collect_token_account,
                initializer_fee_paying_token_account: offer.initializer_fee_paying_token_account,
                fee_amount_initializer: offer.terms.fee_amount_initializer,
                fee_amount_taker: offer.terms.fee_amount_taker,
            })
        } else {
            FeeSchedule::Waived
        };

        *self = Self {
            version: ESCROW_VERSION,
            initialized: true,
            initializer: offer.initializer,
            deposit_token: offer.deposit_token,
            receive_token: offer.receive_token,
            fee_token: offer.fee_token,
            initializer_deposit_token_account: offer.initializer_deposit_token_account,
            initializer_receive_token_account: offer.initializer_receive_token_account,
            vault_account: offer.vault_account,
            initializer_amount: offer.terms.initializer_amount,
            taker_amount: offer.terms.taker_amount,
            fee,
            bump: offer.bump,
            vault_bump: offer.vault_bump,
            vault_authority_bump: offer.vault_authority_bump,
        };
        Ok(())
    }

    pub fn terms(&self) -> EscrowTerms {
        EscrowTerms {
            initializer_amount: self.initializer_amount,
            taker_amount: self.taker_amount,
            fee_amount_initializer: self.fee.initializer_fee(),
            fee_amount_taker: self.fee.taker_fee(),
        }
    }

    pub fn ensure_open(&self) -> Result<()> {
        require!(self.initialized, EscrowError::NotInitialized);
        Ok(())
    }

    /// The record must live at the address its own seeds and bump produce
    pub fn check_address(&self, key: &Pubkey) -> Result<()> {
        let expected = Pubkey::create_program_address(
            &[
                self.initializer.as_ref(),
                self.deposit_token.as_ref(),
                self.receive_token.as_ref(),
                &[self.bump],
            ],
            &crate::ID,
        )
        .map_err(|_| error!(EscrowError::AddressMismatch))?;

        require_keys_eq!(*key, expected, EscrowError::AddressMismatch);
        Ok(())
    }

    pub fn check_tokens(&self, deposit: &Pubkey, receive: &Pubkey, fee: &Pubkey) -> Result<()> {
        require_keys_eq!(*deposit, self.deposit_token, EscrowError::AddressMismatch);
        require_keys_eq!(*receive, self.receive_token, EscrowError::AddressMismatch);
        require_keys_eq!(*fee, self.fee_token, EscrowError::AddressMismatch);
        Ok(())
    }

    /// Plan an exchange against the current balances.
    ///
    /// The taker receives the whole vault, which must hold at least the
    /// deposited amount; the initializer's fee share must still be held in the
    /// fee vault.
    pub fn settlement(
        &self,
        vault_balance: u64,
        fee_vault_balance: u64,
        taker: &PayerFunds,
    ) -> Result<Settlement> {
        self.ensure_open()?;

        let initializer_fee = self.fee.initializer_fee();
        let taker_fee = self.fee.taker_fee();

        taker.cover(self.taker_amount, taker_fee)?;
        require_gte!(vault_balance, self.initializer_amount, EscrowError::InsufficientFunds);
        require_gte!(fee_vault_balance, initializer_fee, EscrowError::InsufficientFunds);

        Ok(Settlement {
            to_initializer: self.taker_amount,
            to_taker: vault_balance,
            taker_fee,
            initializer_fee,
        })
    }

    /// Plan a cancel: everything the initializer put in goes back.
    pub fn refund(&self, vault_balance: u64, fee_vault_balance: u64) -> Result<Refund> {
        self.ensure_open()?;

        let fee = self.fee.initializer_fee();
        require_gte!(fee_vault_balance, fee, EscrowError::InsufficientFunds);

        Ok(Refund {
            deposit: vault_balance,
            fee,
        })
    }

    /// Decode raw account data, rejecting layouts from other versions
    pub fn decode(mut data: &[u8]) -> Result<Self> {
        let escrow = Self::try_deserialize(&mut data)?;
        require_eq!(escrow.version, ESCROW_VERSION, EscrowError::UnsupportedVersion);
        Ok(escrow)
    }

    /// Read the record at `info`. A closed or never-created record is `NotFound`.
    pub fn load(info: &AccountInfo) -> Result<Self> {
        if info.owner != &crate::ID || info.data_is_empty() {
            return err!(EscrowError::NotFound);
        }
        let data = info.try_borrow_data()?;
        Self::decode(&data)
    }
}
