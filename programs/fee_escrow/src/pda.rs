//! Program-derived addresses used by the escrow and the fee registry.
//!
//! Every address here is a pure function of its seeds and `crate::ID`. The
//! program never holds a private key for any of them; vault movements are
//! authorised by re-deriving the authority and signing with its seeds.

use anchor_lang::prelude::*;

use crate::{
    constants::{FEE_REGISTRY_SEED, FEE_VAULT_SEED, VAULT_AUTHORITY_SEED},
    errors::EscrowError,
};

/// Escrow record for one (initializer, deposit token, receive token) triple
pub fn escrow_address(
    initializer: &Pubkey,
    deposit_token: &Pubkey,
    receive_token: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[initializer.as_ref(), deposit_token.as_ref(), receive_token.as_ref()],
        &crate::ID,
    )
}

/// Token account holding the initializer's deposit
pub fn vault_address(escrow: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[escrow.as_ref()], &crate::ID)
}

/// Owner of the escrow vault
pub fn vault_authority_address(escrow: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_AUTHORITY_SEED, escrow.as_ref()], &crate::ID)
}

/// Singleton registry for a fee token
pub fn fee_registry_address(fee_token: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[crate::ID.as_ref(), fee_token.as_ref(), FEE_REGISTRY_SEED],
        &crate::ID,
    )
}

/// Token account holding initializer fees of open escrows
pub fn fee_vault_address(fee_registry: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[fee_registry.as_ref(), FEE_VAULT_SEED], &crate::ID)
}

/// Owner of the fee vault
pub fn fee_vault_authority_address(fee_registry: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[fee_registry.as_ref(), VAULT_AUTHORITY_SEED], &crate::ID)
}

/// Capability to sign as a program-derived authority.
///
/// The only way to obtain one is to re-derive the authority from its seeds and
/// bump and match it against the account the caller supplied, so holding a
/// `PdaSigner` is proof that `address()` is the authority the program expects.
pub struct PdaSigner<'a> {
    seeds: [&'a [u8]; 2],
    bump: [u8; 1],
    address: Pubkey,
}

impl<'a> PdaSigner<'a> {
    /// Authority of the vault belonging to `escrow`
    pub fn vault_authority(escrow: &'a Pubkey, bump: u8, supplied: &Pubkey) -> Result<Self> {
        Self::rederive([VAULT_AUTHORITY_SEED, escrow.as_ref()], bump, supplied)
    }

    /// Authority of the fee vault belonging to `fee_registry`
    pub fn fee_vault_authority(
        fee_registry: &'a Pubkey,
        bump: u8,
        supplied: &Pubkey,
    ) -> Result<Self> {
        Self::rederive([fee_registry.as_ref(), VAULT_AUTHORITY_SEED], bump, supplied)
    }

    fn rederive(seeds: [&'a [u8]; 2], bump: u8, supplied: &Pubkey) -> Result<Self> {
        let bump = [bump];
        let address = Pubkey::create_program_address(&[seeds[0], seeds[1], &bump], &crate::ID)
            .map_err(|_| error!(EscrowError::AddressMismatch))?;
        require_keys_eq!(address, *supplied, EscrowError::AddressMismatch);

        Ok(Self {
            seeds,
            bump,
            address,
        })
    }

    pub fn address(&self) -> Pubkey {
        self.address
    }

    /// Seeds (bump last) for `CpiContext::new_with_signer`
    pub fn seeds(&self) -> [&[u8]; 3] {
        [self.seeds[0], self.seeds[1], &self.bump]
    }
}
