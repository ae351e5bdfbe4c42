use anchor_lang::prelude::*;

/// Seed label for every signer-less authority (escrow vaults and fee vaults)
#[constant]
pub const VAULT_AUTHORITY_SEED: &[u8] = b"escrow";

/// Seed label of the per-fee-token registry PDA
#[constant]
pub const FEE_REGISTRY_SEED: &[u8] = b"ser-escrow";

/// Seed label of the token account holding fees owed by open escrows
#[constant]
pub const FEE_VAULT_SEED: &[u8] = b"fee-vault";

/// Current layout of `EscrowAccount`
#[constant]
pub const ESCROW_VERSION: u8 = 2;

/// Current layout of `FeeRegistry`
#[constant]
pub const FEE_REGISTRY_VERSION: u8 = 1;
