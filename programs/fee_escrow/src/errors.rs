use anchor_lang::prelude::*;

#[error_code]
pub enum EscrowError {
    #[msg("Escrow already open: an escrow for this initializer and token pair has not settled")]
    AlreadyOpen,
    #[msg("Not found: the escrow does not exist or has already been settled")]
    NotFound,
    #[msg("Unauthorized: signer does not match the escrow initializer")]
    Unauthorized,
    #[msg("Insufficient funds: token balance does not cover the amount and fee")]
    InsufficientFunds,
    #[msg("Not initialized: escrow record is not marked open")]
    NotInitialized,
    #[msg("Fee registry missing: initialize the fee registry for this fee token first")]
    FeeRegistryMissing,
    #[msg("Already exists: the fee registry for this fee token is already initialized")]
    AlreadyExists,
    #[msg("Address mismatch: supplied account does not match the derived or recorded address")]
    AddressMismatch,
    #[msg("Invalid amount: amount must be greater than zero")]
    InvalidAmount,
    #[msg("Unsupported version: account layout was written by another program version")]
    UnsupportedVersion,
    #[msg("Arithmetic overflow")]
    ArithmeticOverflow,
}
