use anchor_lang::prelude::*;
use anchor_spl::token::TokenAccount;

use crate::errors::EscrowError;

/// Read an SPL token account the instruction received unchecked.
pub fn load_token_account(info: &AccountInfo) -> Result<TokenAccount> {
    require_keys_eq!(*info.owner, anchor_spl::token::ID, EscrowError::AddressMismatch);

    let data = info.try_borrow_data()?;
    TokenAccount::try_deserialize(&mut &data[..])
}

/// Close a program-owned account: move its rent to `destination`, wipe the
/// data, hand it back to the system program and shrink it to zero bytes so
/// the address can be created again later, even if someone funds it again
/// within the same transaction.
pub fn close_program_account<'info>(
    account: &AccountInfo<'info>,
    destination: &AccountInfo<'info>,
) -> Result<()> {
    let lamports = account.lamports();
    let credited = destination
        .lamports()
        .checked_add(lamports)
        .ok_or(EscrowError::ArithmeticOverflow)?;

    **destination.try_borrow_mut_lamports()? = credited;
    **account.try_borrow_mut_lamports()? = 0;

    account.try_borrow_mut_data()?.fill(0);
    account.assign(&System::id());
    account.resize(0)?;

    Ok(())
}
