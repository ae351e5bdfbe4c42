//! Escrow lifecycle against the compiled program running in LiteSVM.
//!
//! Needs `target/deploy/fee_escrow.so` (`anchor build`); without it every
//! test here returns early.

#![allow(deprecated)]

use std::path::PathBuf;

use anchor_lang::{
    error::ERROR_CODE_OFFSET,
    prelude::{Id, Pubkey, System},
    solana_program::{
        instruction::Instruction,
        system_instruction,
    },
    AccountDeserialize,
};
use anchor_spl::token::TokenAccount;
use litesvm::{
    types::{FailedTransactionMetadata, TransactionMetadata},
    LiteSVM,
};
use litesvm_token::{CreateAssociatedTokenAccount, CreateMint, MintTo};
use solana_instruction::error::InstructionError;
use solana_keypair::Keypair;
use solana_signer::Signer;
use solana_transaction::Transaction;
use solana_transaction_error::TransactionError;

use crate::{
    client::{
        cancel_ix, exchange_ix, fetch_escrow, fetch_fee_registry, initialize_ix, initialize_pda_ix,
        AccountReader, InitializeParams, TakerAccounts,
    },
    errors::EscrowError,
    events::{parse_logs, CancelEvent, EscrowEvent, ExchangeEvent},
    pda::{escrow_address, vault_address},
    settlement::EscrowTerms,
    state::{EscrowAccount, FeeRegistry, FeeSchedule},
};

type TxResult = std::result::Result<TransactionMetadata, FailedTransactionMetadata>;

impl AccountReader for LiteSVM {
    fn account_data(&self, address: &Pubkey) -> Option<Vec<u8>> {
        self.get_account(address).map(|account| account.data)
    }
}

struct Env {
    svm: LiteSVM,
    payer: Keypair,
    initializer: Keypair,
    taker: Keypair,
    collector: Pubkey,
    mint_a: Pubkey,
    mint_b: Pubkey,
    fee_mint: Pubkey,
    initializer_a: Pubkey,
    initializer_b: Pubkey,
    initializer_fee: Pubkey,
    taker_a: Pubkey,
    taker_b: Pubkey,
    taker_fee: Pubkey,
    collect_account: Pubkey,
}

fn program_bytes() -> Option<Vec<u8>> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/deploy/fee_escrow.so");
    match std::fs::read(&path) {
        Ok(bytes) => Some(bytes),
        Err(_) => {
            eprintln!("skipping: {} not found, run `anchor build` first", path.display());
            None
        }
    }
}

fn send(svm: &mut LiteSVM, ixs: &[Instruction], signer: &Keypair) -> TxResult {
    // identical transactions in one test must not be deduplicated
    svm.expire_blockhash();
    let tx = Transaction::new_signed_with_payer(
        ixs,
        Some(&signer.pubkey()),
        &[signer],
        svm.latest_blockhash(),
    );
    svm.send_transaction(tx)
}

fn assert_escrow_error(result: TxResult, expected: EscrowError) {
    let failed = match result {
        Ok(_) => panic!("expected {expected:?}, transaction succeeded"),
        Err(failed) => failed,
    };
    assert_eq!(
        failed.err,
        TransactionError::InstructionError(
            0,
            InstructionError::Custom(expected as u32 + ERROR_CODE_OFFSET)
        ),
        "{:#?}",
        failed.meta.logs
    );
}

fn terms(fee_amount_initializer: u64, fee_amount_taker: u64) -> EscrowTerms {
    EscrowTerms {
        initializer_amount: 1000,
        taker_amount: 2000,
        fee_amount_initializer,
        fee_amount_taker,
    }
}

impl Env {
    fn new() -> Option<Self> {
        let program = program_bytes()?;

        let mut svm = LiteSVM::new();
        let _ = svm.add_program(crate::ID, &program);

        let payer = Keypair::new();
        let initializer = Keypair::new();
        let taker = Keypair::new();
        let collector = Keypair::new().pubkey();
        for wallet in [&payer, &initializer, &taker] {
            svm.airdrop(&wallet.pubkey(), 10_000_000_000).unwrap();
        }

        let mint = |svm: &mut LiteSVM| {
            CreateMint::new(svm, &payer)
                .decimals(6)
                .authority(&payer.pubkey())
                .send()
                .unwrap()
        };
        let mint_a = mint(&mut svm);
        let mint_b = mint(&mut svm);
        let fee_mint = mint(&mut svm);

        let mut env = Self {
            svm,
            collector,
            mint_a,
            mint_b,
            fee_mint,
            initializer_a: Pubkey::default(),
            initializer_b: Pubkey::default(),
            initializer_fee: Pubkey::default(),
            taker_a: Pubkey::default(),
            taker_b: Pubkey::default(),
            taker_fee: Pubkey::default(),
            collect_account: Pubkey::default(),
            payer,
            initializer,
            taker,
        };

        let initializer = env.initializer.pubkey();
        let taker = env.taker.pubkey();
        env.initializer_a = env.token_account(&mint_a, &initializer, 5000);
        env.initializer_b = env.token_account(&mint_b, &initializer, 0);
        env.initializer_fee = env.token_account(&fee_mint, &initializer, 100);
        env.taker_a = env.token_account(&mint_a, &taker, 0);
        env.taker_b = env.token_account(&mint_b, &taker, 5000);
        env.taker_fee = env.token_account(&fee_mint, &taker, 100);
        env.collect_account = env.token_account(&fee_mint, &collector, 0);

        env.create_registry(&fee_mint).unwrap();
        Some(env)
    }

    fn token_account(&mut self, mint: &Pubkey, owner: &Pubkey, amount: u64) -> Pubkey {
        let account = CreateAssociatedTokenAccount::new(&mut self.svm, &self.payer, mint)
            .owner(owner)
            .send()
            .unwrap();
        if amount > 0 {
            MintTo::new(&mut self.svm, &self.payer, mint, &account, amount)
                .send()
                .unwrap();
        }
        account
    }

    fn create_registry(&mut self, fee_token: &Pubkey) -> TxResult {
        let (ix, _) = initialize_pda_ix(self.payer.pubkey(), *fee_token, self.collector);
        send(&mut self.svm, &[ix], &self.payer)
    }

    fn balance(&self, key: &Pubkey) -> u64 {
        self.svm
            .get_account(key)
            .filter(|account| !account.data.is_empty())
            .and_then(|account| TokenAccount::try_deserialize(&mut account.data.as_slice()).ok())
            .map_or(0, |account| account.amount)
    }

    fn is_closed(&self, key: &Pubkey) -> bool {
        self.svm
            .get_account(key)
            .map_or(true, |account| account.lamports == 0)
    }

    fn params(&self, terms: EscrowTerms) -> InitializeParams {
        InitializeParams {
            initializer: self.initializer.pubkey(),
            deposit_token: self.mint_a,
            receive_token: self.mint_b,
            fee_token: self.fee_mint,
            initializer_deposit_token_account: self.initializer_a,
            initializer_receive_token_account: self.initializer_b,
            initializer_fee_paying_token_account: self.initializer_fee,
            fee_collect_token_account: self.collect_account,
            initializer_amount: terms.initializer_amount,
            taker_amount: terms.taker_amount,
            fee_amount_initializer: terms.fee_amount_initializer,
            fee_amount_taker: terms.fee_amount_taker,
        }
    }

    fn initialize(&mut self, params: InitializeParams) -> TxResult {
        let (ix, _) = initialize_ix(params);
        send(&mut self.svm, &[ix], &self.initializer)
    }

    /// Open the A-for-B escrow and return its record
    fn open(&mut self, terms: EscrowTerms) -> EscrowAccount {
        let params = self.params(terms);
        self.initialize(params).unwrap();
        self.record().unwrap()
    }

    fn record(&self) -> anchor_lang::Result<EscrowAccount> {
        fetch_escrow(&self.svm, &self.initializer.pubkey(), &self.mint_a, &self.mint_b)
    }

    fn registry(&self, fee_token: &Pubkey) -> FeeRegistry {
        fetch_fee_registry(&self.svm, fee_token).unwrap()
    }

    fn escrow_key(&self) -> Pubkey {
        escrow_address(&self.initializer.pubkey(), &self.mint_a, &self.mint_b).0
    }

    fn taker_accounts(&self) -> TakerAccounts {
        TakerAccounts {
            deposit_token_account: self.taker_b,
            receive_token_account: self.taker_a,
            fee_paying_token_account: self.taker_fee,
        }
    }

    fn exchange_ix(&self, escrow: &EscrowAccount) -> Instruction {
        let registry = self.registry(&escrow.fee_token);
        exchange_ix(self.taker.pubkey(), escrow, &registry, self.taker_accounts())
    }

    fn cancel_ix(&self, escrow: &EscrowAccount) -> Instruction {
        cancel_ix(escrow, &self.registry(&escrow.fee_token))
    }

    fn exchange(&mut self, ix: Instruction) -> TxResult {
        send(&mut self.svm, &[ix], &self.taker)
    }

    fn cancel(&mut self, ix: Instruction) -> TxResult {
        send(&mut self.svm, &[ix], &self.initializer)
    }
}

#[test]
fn exchange_settles_both_sides_and_collects_fees() {
    let Some(mut env) = Env::new() else { return };
    let fee_vault = env.registry(&env.fee_mint).fee_vault;

    let escrow = env.open(terms(10, 20));
    assert_eq!(env.balance(&env.initializer_a), 4000);
    assert_eq!(env.balance(&env.initializer_fee), 90);
    assert_eq!(env.balance(&fee_vault), 10);
    assert_eq!(env.balance(&escrow.vault_account), 1000);

    let ix = env.exchange_ix(&escrow);
    let meta = env.exchange(ix.clone()).unwrap();

    assert_eq!(env.balance(&env.initializer_b), 2000);
    assert_eq!(env.balance(&env.taker_a), 1000);
    assert_eq!(env.balance(&env.taker_b), 3000);
    assert_eq!(env.balance(&env.taker_fee), 80);
    assert_eq!(env.balance(&env.collect_account), 30);
    assert_eq!(env.balance(&fee_vault), 0);
    assert!(env.is_closed(&escrow.vault_account));
    assert!(env.is_closed(&env.escrow_key()));

    let events = parse_logs(meta.logs.iter().map(String::as_str));
    assert_eq!(
        events,
        vec![EscrowEvent::Exchange(ExchangeEvent {
            initializer: env.initializer.pubkey(),
            taker: env.taker.pubkey(),
            deposit_token: env.mint_a,
            receive_token: env.mint_b,
            deposit_amount: 1000,
            receive_amount: 2000,
            initializer_fee_amount: 10,
            taker_fee_amount: 20,
        })]
    );


    assert_escrow_error(env.exchange(ix), EscrowError::NotFound);
    assert_eq!(
        env.record().unwrap_err(),
        anchor_lang::error::Error::from(EscrowError::NotFound)
    );
}

#[test]
fn second_open_on_same_triple_is_rejected() {
    let Some(mut env) = Env::new() else { return };
    let escrow = env.open(terms(10, 20));
    assert_eq!(escrow.vault_account, vault_address(&env.escrow_key()).0);

    let params = env.params(EscrowTerms {
        initializer_amount: 1,
        ..terms(1, 2)
    });
    assert_escrow_error(env.initialize(params), EscrowError::AlreadyOpen);

    let record = env.record().unwrap();
    assert_eq!(record.initializer_amount, 1000);
    assert_eq!(record.fee, escrow.fee);
    assert_eq!(env.balance(&env.initializer_a), 4000);
    assert_eq!(env.balance(&env.initializer_fee), 90);
}

#[test]
fn cancel_refunds_everything_and_frees_the_address() {
    let Some(mut env) = Env::new() else { return };
    let fee_vault = env.registry(&env.fee_mint).fee_vault;

    let escrow = env.open(terms(10, 20));
    let ix = env.cancel_ix(&escrow);
    let meta = env.cancel(ix).unwrap();

    assert_eq!(env.balance(&env.initializer_a), 5000);
    assert_eq!(env.balance(&env.initializer_fee), 100);
    assert_eq!(env.balance(&fee_vault), 0);
    assert_eq!(env.balance(&env.collect_account), 0);
    assert!(env.is_closed(&escrow.vault_account));
    assert!(env.is_closed(&env.escrow_key()));
    assert_eq!(
        parse_logs(meta.logs.iter().map(String::as_str)),
        vec![EscrowEvent::Cancel(CancelEvent {
            initializer: env.initializer.pubkey(),
            deposit_token: env.mint_a,
            receive_token: env.mint_b,
            deposit_amount: 1000,
            receive_amount: 2000,
            refunded_fee_amount: 10,
        })]
    );

    let again = env.open(EscrowTerms {
        initializer_amount: 300,
        ..terms(5, 5)
    });
    assert_eq!(again.initializer_amount, 300);
    assert_eq!(env.balance(&env.initializer_a), 4700);
    assert_eq!(env.balance(&env.initializer_fee), 95);

    let ix = env.exchange_ix(&again);
    env.exchange(ix).unwrap();
    assert_eq!(env.balance(&env.taker_a), 300);
    assert_eq!(env.balance(&env.collect_account), 10);
}

#[test]
fn funding_a_settled_escrow_does_not_block_reuse() {
    let Some(mut env) = Env::new() else { return };
    let escrow_key = env.escrow_key();
    let escrow = env.open(terms(10, 20));

    // the taker settles and sends lamports to the escrow address in one go
    let exchange = env.exchange_ix(&escrow);
    let top_up = system_instruction::transfer(&env.taker.pubkey(), &escrow_key, 1_000_000);
    send(&mut env.svm, &[exchange, top_up], &env.taker).unwrap();

    let account = env.svm.get_account(&escrow_key).unwrap();
    assert_eq!(account.owner, System::id());
    assert!(account.data.is_empty());
    assert_eq!(account.lamports, 1_000_000);

    let cancel = env.cancel_ix(&escrow);
    assert_escrow_error(env.cancel(cancel), EscrowError::NotFound);

    let again = env.open(terms(10, 20));
    assert!(again.initialized);
    assert_eq!(env.balance(&again.vault_account), 1000);
    assert_eq!(env.balance(&env.initializer_a), 3000);
}

#[test]
fn exchange_after_cancel_finds_nothing() {
    let Some(mut env) = Env::new() else { return };
    let escrow = env.open(terms(10, 20));
    let exchange = env.exchange_ix(&escrow);

    let cancel = env.cancel_ix(&escrow);
    env.cancel(cancel).unwrap();
    assert_escrow_error(env.exchange(exchange), EscrowError::NotFound);

    assert_eq!(env.balance(&env.taker_b), 5000);
    assert_eq!(env.balance(&env.taker_fee), 100);
    assert_eq!(env.balance(&env.initializer_a), 5000);
}

#[test]
fn only_the_initializer_may_cancel() {
    let Some(mut env) = Env::new() else { return };
    let escrow = env.open(terms(10, 20));

    let mut ix = env.cancel_ix(&escrow);
    ix.accounts[0].pubkey = env.taker.pubkey();
    assert_escrow_error(send(&mut env.svm, &[ix], &env.taker), EscrowError::Unauthorized);

    assert!(env.record().unwrap().initialized);
    assert_eq!(env.balance(&escrow.vault_account), 1000);
}

#[test]
fn cancel_rejects_accounts_the_escrow_does_not_name() {
    let Some(mut env) = Env::new() else { return };
    let escrow = env.open(terms(10, 20));
    let ix = env.cancel_ix(&escrow);

    let foreign = [
        (1, env.mint_b),              // deposit token
        (2, env.fee_mint),            // receive token
        (3, env.mint_b),              // fee token, registry no longer matches
        (5, env.taker_a),             // vault
        (6, Keypair::new().pubkey()), // vault authority
        (9, Keypair::new().pubkey()), // fee vault authority
        (10, env.initializer_b),      // deposit refund account
        (11, env.initializer_b),      // fee refund account
    ];
    for (index, key) in foreign {
        let mut ix = ix.clone();
        ix.accounts[index].pubkey = key;
        assert_escrow_error(env.cancel(ix), EscrowError::AddressMismatch);
    }

    assert_eq!(env.balance(&escrow.vault_account), 1000);
    env.cancel(ix).unwrap();
    assert_eq!(env.balance(&env.initializer_a), 5000);
}

#[test]
fn exchange_rejects_accounts_the_escrow_does_not_name() {
    let Some(mut env) = Env::new() else { return };
    let escrow = env.open(terms(10, 20));
    let ix = env.exchange_ix(&escrow);

    let foreign = [
        (1, env.collector),            // initializer
        (6, env.initializer_a),        // vault
        (7, Keypair::new().pubkey()),  // vault authority
        (10, Keypair::new().pubkey()), // fee vault authority
        (14, env.initializer_fee),     // initializer receive account
        (15, env.initializer_fee),     // fee collect account
    ];
    for (index, key) in foreign {
        let mut ix = ix.clone();
        ix.accounts[index].pubkey = key;
        assert_escrow_error(env.exchange(ix), EscrowError::AddressMismatch);
    }

    assert_eq!(env.balance(&env.taker_b), 5000);
    assert_eq!(env.balance(&env.taker_fee), 100);
    assert_eq!(env.balance(&escrow.vault_account), 1000);
    env.exchange(ix).unwrap();
    assert_eq!(env.balance(&env.collect_account), 30);
}

#[test]
fn initialize_checks_amounts_balances_and_fee_wiring() {
    let Some(mut env) = Env::new() else { return };
    let initializer = env.initializer.pubkey();
    let collector = env.collector;
    let fee_mint = env.fee_mint;

    let params = env.params(EscrowTerms {
        initializer_amount: 0,
        ..terms(10, 20)
    });
    assert_escrow_error(env.initialize(params), EscrowError::InvalidAmount);

    let params = env.params(EscrowTerms {
        initializer_amount: 5001,
        ..terms(10, 20)
    });
    assert_escrow_error(env.initialize(params), EscrowError::InsufficientFunds);

    let params = env.params(terms(101, 20));
    assert_escrow_error(env.initialize(params), EscrowError::InsufficientFunds);

    // fee-collect account not owned by the registry's collector
    let stranger = Keypair::new().pubkey();
    let mut params = env.params(terms(10, 20));
    params.fee_collect_token_account = env.token_account(&fee_mint, &stranger, 0);
    assert_escrow_error(env.initialize(params), EscrowError::AddressMismatch);

    // fee token nobody created a registry for
    let other = CreateMint::new(&mut env.svm, &env.payer)
        .decimals(6)
        .authority(&env.payer.pubkey())
        .send()
        .unwrap();
    let mut params = env.params(terms(10, 20));
    params.fee_token = other;
    params.initializer_fee_paying_token_account = env.token_account(&other, &initializer, 10);
    params.fee_collect_token_account = env.token_account(&other, &collector, 0);
    let stand_in_vault = env.token_account(&other, &env.taker.pubkey(), 0);
    let (mut ix, _) = initialize_ix(params);
    ix.accounts[8].pubkey = stand_in_vault;
    assert_escrow_error(
        send(&mut env.svm, &[ix], &env.initializer),
        EscrowError::FeeRegistryMissing,
    );

    assert!(env.record().is_err());
    assert_eq!(env.balance(&env.initializer_a), 5000);
    assert_eq!(env.balance(&env.initializer_fee), 100);

    assert_escrow_error(env.create_registry(&fee_mint), EscrowError::AlreadyExists);
}

#[test]
fn taker_paying_fee_from_deposit_account_must_cover_the_sum() {
    let Some(mut env) = Env::new() else { return };
    let mint_b = env.mint_b;
    let collector = env.collector;
    env.create_registry(&mint_b).unwrap();
    let collect_b = env.token_account(&mint_b, &collector, 0);
    let registry_b = env.registry(&mint_b);

    let params = |env: &Env, taker_amount: u64| InitializeParams {
        fee_token: mint_b,
        initializer_fee_paying_token_account: env.initializer_b,
        fee_collect_token_account: collect_b,
        ..env.params(EscrowTerms {
            taker_amount,
            ..terms(0, 20)
        })
    };
    // one account pays both the taker amount and the taker fee
    let shared = TakerAccounts {
        deposit_token_account: env.taker_b,
        receive_token_account: env.taker_a,
        fee_paying_token_account: env.taker_b,
    };

    env.initialize(params(&env, 4990)).unwrap();
    let escrow = env.record().unwrap();
    let ix = exchange_ix(env.taker.pubkey(), &escrow, &registry_b, shared);
    assert_escrow_error(env.exchange(ix), EscrowError::InsufficientFunds);

    let ix = env.cancel_ix(&escrow);
    env.cancel(ix).unwrap();

    env.initialize(params(&env, 4980)).unwrap();
    let escrow = env.record().unwrap();
    let ix = exchange_ix(env.taker.pubkey(), &escrow, &registry_b, shared);
    env.exchange(ix).unwrap();

    assert_eq!(env.balance(&env.taker_b), 0);
    assert_eq!(env.balance(&env.initializer_b), 4980);
    assert_eq!(env.balance(&collect_b), 20);
    assert_eq!(env.balance(&env.taker_a), 1000);
}

#[test]
fn waived_escrow_moves_no_fees() {
    let Some(mut env) = Env::new() else { return };

    let escrow = env.open(terms(0, 0));
    assert_eq!(escrow.fee, FeeSchedule::Waived);
    let ix = env.exchange_ix(&escrow);
    env.exchange(ix).unwrap();

    assert_eq!(env.balance(&env.taker_a), 1000);
    assert_eq!(env.balance(&env.initializer_b), 2000);
    assert_eq!(env.balance(&env.initializer_fee), 100);
    assert_eq!(env.balance(&env.taker_fee), 100);
    assert_eq!(env.balance(&env.collect_account), 0);
}
