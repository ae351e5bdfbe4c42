use anchor_lang::prelude::*;

use crate::{constants::FEE_REGISTRY_VERSION, errors::EscrowError};

/// Fee wiring shared by every escrow quoting fees in `fee_token`
#[account(discriminator = 2)]
#[derive(InitSpace, Debug)]
pub struct FeeRegistry {
    pub version: u8,
    pub initialized: bool,
    /// Payer that created the registry
    pub admin: Pubkey,
    pub fee_token: Pubkey,
    /// Wallet that must own every fee-collect token account
    pub fee_collector: Pubkey,
    /// Holds initializer fees of open escrows
    pub fee_vault: Pubkey,
    pub fee_vault_authority: Pubkey,
    pub bump: u8,
    pub fee_vault_bump: u8,
    pub fee_vault_authority_bump: u8,
}

impl FeeRegistry {
    #[allow(clippy::too_many_arguments)]
    pub fn init(
        &mut self,
        admin: Pubkey,
        fee_token: Pubkey,
        fee_collector: Pubkey,
        fee_vault: Pubkey,
        fee_vault_authority: Pubkey,
        bump: u8,
        fee_vault_bump: u8,
        fee_vault_authority_bump: u8,
    ) -> Result<()> {
        require!(!self.initialized, EscrowError::AlreadyExists);

        *self = Self {
            version: FEE_REGISTRY_VERSION,
            initialized: true,
            admin,
            fee_token,
            fee_collector,
            fee_vault,
            fee_vault_authority,
            bump,
            fee_vault_bump,
            fee_vault_authority_bump,
        };
        Ok(())
    }

    /// Fee-collect accounts must hold the fee token and belong to the collector
    pub fn check_fee_collect_account(&self, mint: &Pubkey, owner: &Pubkey) -> Result<()> {
        require_keys_eq!(*mint, self.fee_token, EscrowError::AddressMismatch);
        require_keys_eq!(*owner, self.fee_collector, EscrowError::AddressMismatch);
        Ok(())
    }

    pub fn decode(mut data: &[u8]) -> Result<Self> {
        let registry = Self::try_deserialize(&mut data)?;
        require_eq!(registry.version, FEE_REGISTRY_VERSION, EscrowError::UnsupportedVersion);
        Ok(registry)
    }

    /// Read the registry at `info`; it must exist before any escrow uses it
    pub fn load(info: &AccountInfo) -> Result<Self> {
        if info.owner != &crate::ID || info.data_is_empty() {
            return err!(EscrowError::FeeRegistryMissing);
        }
        let data = info.try_borrow_data()?;
        let registry = Self::decode(&data)?;
        require!(registry.initialized, EscrowError::FeeRegistryMissing);
        Ok(registry)
    }
}
