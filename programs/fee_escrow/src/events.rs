use anchor_lang::prelude::*;

/// Log prefix under which `emit!` writes base64 event payloads
pub const PROGRAM_DATA: &str = "Program data: ";

#[event]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitializeEvent {
    pub initializer: Pubkey,
    pub deposit_token: Pubkey,
    pub receive_token: Pubkey,
    pub fee_token: Pubkey,
    pub fee_collector: Pubkey,
    pub deposit_amount: u64,
    pub receive_amount: u64,
    pub initializer_fee_amount: u64,
    pub taker_fee_amount: u64,
}

#[event]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CancelEvent {
    pub initializer: Pubkey,
    pub deposit_token: Pubkey,
    pub receive_token: Pubkey,
    /// Deposit token returned from the vault
    pub deposit_amount: u64,
    pub receive_amount: u64,
    /// Held initializer fee returned from the fee vault
    pub refunded_fee_amount: u64,
}

#[event]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeEvent {
    pub initializer: Pubkey,
    pub taker: Pubkey,
    pub deposit_token: Pubkey,
    pub receive_token: Pubkey,
    pub deposit_amount: u64,
    pub receive_amount: u64,
    pub initializer_fee_amount: u64,
    pub taker_fee_amount: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EscrowEvent {
    Initialize(InitializeEvent),
    Cancel(CancelEvent),
    Exchange(ExchangeEvent),
}

fn body<'a, E: Discriminator>(data: &'a [u8]) -> Option<&'a [u8]> {
    data.strip_prefix(E::DISCRIMINATOR)
}

/// Decode one event payload (discriminator followed by Borsh fields).
/// Unknown discriminators and malformed payloads give `None`.
pub fn decode_event(data: &[u8]) -> Option<EscrowEvent> {
    if let Some(fields) = body::<InitializeEvent>(data) {
        return InitializeEvent::try_from_slice(fields).ok().map(EscrowEvent::Initialize);
    }
    if let Some(fields) = body::<CancelEvent>(data) {
        return CancelEvent::try_from_slice(fields).ok().map(EscrowEvent::Cancel);
    }
    if let Some(fields) = body::<ExchangeEvent>(data) {
        return ExchangeEvent::try_from_slice(fields).ok().map(EscrowEvent::Exchange);
    }
    None
}

/// Collect the escrow events from one transaction's log messages.
///
/// Tracks the invoke stack so that only `Program data:` lines written while
/// this program is the innermost running program are decoded; data logged by
/// other programs, including ones this program calls, is skipped.
#[cfg(not(target_os = "solana"))]
pub fn parse_logs<'a, I>(logs: I) -> Vec<EscrowEvent>
where
    I: IntoIterator<Item = &'a str>,
{
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    let program_id = crate::ID.to_string();
    let mut stack: Vec<&'a str> = Vec::new();
    let mut events = Vec::new();

    for line in logs {
        if let Some(payload) = line.strip_prefix(PROGRAM_DATA) {
            if stack.last() != Some(&program_id.as_str()) {
                continue;
            }
            if let Some(event) = STANDARD
                .decode(payload.trim())
                .ok()
                .and_then(|bytes| decode_event(&bytes))
            {
                events.push(event);
            }
            continue;
        }

        let Some(rest) = line.strip_prefix("Program ") else {
            continue;
        };
        let mut words = rest.split_whitespace();
        match (words.next(), words.next()) {
            // "Program log:", "Program return:" and friends carry no stack change
            (Some(id), _) if id.ends_with(':') => {}
            (Some(id), Some("invoke")) => stack.push(id),
            (Some(_), Some("success")) | (Some(_), Some("failed:")) => {
                stack.pop();
            }
            _ => {}
        }
    }

    events
}
