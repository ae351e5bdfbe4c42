//! Off-chain helpers: instruction builders and typed account reads.
//!
//! Every account an instruction needs is derived here or copied from the
//! records already on the ledger, so callers only supply what the program
//! cannot know: the parties, the mints and their own token accounts.

use anchor_lang::{
    prelude::*,
    solana_program::instruction::Instruction,
    InstructionData,
};
use anchor_spl::token::Token;

use crate::{
    errors::EscrowError,
    pda::{
        escrow_address, fee_registry_address, fee_vault_address, fee_vault_authority_address,
        vault_address, vault_authority_address,
    },
    state::{EscrowAccount, FeeRegistry},
};

/// Read access to raw account data, however the caller reaches the ledger
pub trait AccountReader {
    /// Data of the account at `address`, `None` when it does not exist
    fn account_data(&self, address: &Pubkey) -> Option<Vec<u8>>;
}

/// Fetch the escrow opened by `initializer` for the given token pair
pub fn fetch_escrow<R: AccountReader + ?Sized>(
    reader: &R,
    initializer: &Pubkey,
    deposit_token: &Pubkey,
    receive_token: &Pubkey,
) -> Result<EscrowAccount> {
    let (address, _) = escrow_address(initializer, deposit_token, receive_token);
    match reader.account_data(&address) {
        Some(data) if !data.is_empty() => EscrowAccount::decode(&data),
        _ => err!(EscrowError::NotFound),
    }
}

pub fn fetch_fee_registry<R: AccountReader + ?Sized>(
    reader: &R,
    fee_token: &Pubkey,
) -> Result<FeeRegistry> {
    let (address, _) = fee_registry_address(fee_token);
    match reader.account_data(&address) {
        Some(data) if !data.is_empty() => FeeRegistry::decode(&data),
        _ => err!(EscrowError::NotFound),
    }
}

/// Create the registry for `fee_token`. Returns the instruction and the
/// registry address.
pub fn initialize_pda_ix(
    payer: Pubkey,
    fee_token: Pubkey,
    fee_collector: Pubkey,
) -> (Instruction, Pubkey) {
    let (fee_registry, _) = fee_registry_address(&fee_token);

    let ix = Instruction {
        program_id: crate::ID,
        accounts: crate::accounts::InitializePda {
            payer,
            fee_token,
            fee_collector,
            fee_registry,
            fee_vault_authority: fee_vault_authority_address(&fee_registry).0,
            fee_vault: fee_vault_address(&fee_registry).0,
            token_program: Token::id(),
            system_program: System::id(),
        }
        .to_account_metas(None),
        data: crate::instruction::InitializePda {}.data(),
    };
    (ix, fee_registry)
}

#[derive(Clone, Copy, Debug)]
pub struct InitializeParams {
    pub initializer: Pubkey,
    pub deposit_token: Pubkey,
    pub receive_token: Pubkey,
    pub fee_token: Pubkey,
    pub initializer_deposit_token_account: Pubkey,
    pub initializer_receive_token_account: Pubkey,
    pub initializer_fee_paying_token_account: Pubkey,
    pub fee_collect_token_account: Pubkey,
    pub initializer_amount: u64,
    pub taker_amount: u64,
    pub fee_amount_initializer: u64,
    pub fee_amount_taker: u64,
}

/// Open an escrow. Returns the instruction and the escrow address.
pub fn initialize_ix(params: InitializeParams) -> (Instruction, Pubkey) {
    let (escrow, _) =
        escrow_address(&params.initializer, &params.deposit_token, &params.receive_token);
    let (fee_registry, _) = fee_registry_address(&params.fee_token);

    let ix = Instruction {
        program_id: crate::ID,
        accounts: crate::accounts::Initialize {
            initializer: params.initializer,
            deposit_token: params.deposit_token,
            receive_token: params.receive_token,
            fee_token: params.fee_token,
            escrow,
            vault_authority: vault_authority_address(&escrow).0,
            vault: vault_address(&escrow).0,
            fee_registry,
            fee_vault: fee_vault_address(&fee_registry).0,
            initializer_deposit_token_account: params.initializer_deposit_token_account,
            initializer_receive_token_account: params.initializer_receive_token_account,
            initializer_fee_paying_token_account: params.initializer_fee_paying_token_account,
            fee_collect_token_account: params.fee_collect_token_account,
            token_program: Token::id(),
            system_program: System::id(),
        }
        .to_account_metas(None),
        data: crate::instruction::Initialize {
            initializer_amount: params.initializer_amount,
            taker_amount: params.taker_amount,
            fee_amount_initializer: params.fee_amount_initializer,
            fee_amount_taker: params.fee_amount_taker,
        }
        .data(),
    };
    (ix, escrow)
}

/// Cancel an open escrow, signed by its initializer
pub fn cancel_ix(escrow: &EscrowAccount, fee_registry: &FeeRegistry) -> Instruction {
    let escrow_key =
        escrow_address(&escrow.initializer, &escrow.deposit_token, &escrow.receive_token).0;
    let registry_key = fee_registry_address(&fee_registry.fee_token).0;
    // a waived escrow never touches the fee-paying account
    let initializer_fee_paying_token_account = escrow
        .fee
        .terms()
        .map_or(escrow.initializer_deposit_token_account, |fee| {
            fee.initializer_fee_paying_token_account
        });

    Instruction {
        program_id: crate::ID,
        accounts: crate::accounts::Cancel {
            initializer: escrow.initializer,
            deposit_token: escrow.deposit_token,
            receive_token: escrow.receive_token,
            fee_token: escrow.fee_token,
            escrow: escrow_key,
            vault: escrow.vault_account,
            vault_authority: vault_authority_address(&escrow_key).0,
            fee_registry: registry_key,
            fee_vault: fee_registry.fee_vault,
            fee_vault_authority: fee_registry.fee_vault_authority,
            initializer_deposit_token_account: escrow.initializer_deposit_token_account,
            initializer_fee_paying_token_account,
            token_program: Token::id(),
        }
        .to_account_metas(None),
        data: crate::instruction::Cancel {}.data(),
    }
}

/// The taker's own token accounts used by an exchange
#[derive(Clone, Copy, Debug)]
pub struct TakerAccounts {
    /// Holds the escrow's receive token, pays the taker amount
    pub deposit_token_account: Pubkey,
    /// Holds the escrow's deposit token, receives the vault
    pub receive_token_account: Pubkey,
    pub fee_paying_token_account: Pubkey,
}

pub fn exchange_ix(
    taker: Pubkey,
    escrow: &EscrowAccount,
    fee_registry: &FeeRegistry,
    accounts: TakerAccounts,
) -> Instruction {
    let escrow_key =
        escrow_address(&escrow.initializer, &escrow.deposit_token, &escrow.receive_token).0;
    let registry_key = fee_registry_address(&fee_registry.fee_token).0;
    // a waived escrow never pays the collector
    let fee_collect_token_account = escrow
        .fee
        .terms()
        .map_or(accounts.fee_paying_token_account, |fee| fee.fee_collect_token_account);

    Instruction {
        program_id: crate::ID,
        accounts: crate::accounts::Exchange {
            taker,
            initializer: escrow.initializer,
            deposit_token: escrow.deposit_token,
            receive_token: escrow.receive_token,
            fee_token: escrow.fee_token,
            escrow: escrow_key,
            vault: escrow.vault_account,
            vault_authority: vault_authority_address(&escrow_key).0,
            fee_registry: registry_key,
            fee_vault: fee_registry.fee_vault,
            fee_vault_authority: fee_registry.fee_vault_authority,
            taker_deposit_token_account: accounts.deposit_token_account,
            taker_receive_token_account: accounts.receive_token_account,
            taker_fee_paying_token_account: accounts.fee_paying_token_account,
            initializer_receive_token_account: escrow.initializer_receive_token_account,
            fee_collect_token_account,
            token_program: Token::id(),
        }
        .to_account_metas(None),
        data: crate::instruction::Exchange {}.data(),
    }
}
