//! End-to-end store behavior, through the public API only.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use bramble_blockchain::{scratchpad, Blockchain, StoreConfig, StoreError};
use bramble_types::{
    extra, AccountAddress, AliasRecord, Block, BlockHeader, Hash, KeyImage, PublicKey, Signature,
    Transaction, TransactionPrefix, TxIn, TxOut, TxOutTarget,
};

//---------------------------------------------------------------------------------------------------- Builders
fn pk(seed: u8) -> PublicKey {
    PublicKey([seed; 32])
}

/// A coinbase with one `to_key` output per `(amount, key)` pair and its
/// one-time pubkey (and optionally an alias) in `extra`.
fn miner_tx(
    height: u64,
    outs: &[(u64, PublicKey)],
    tx_pubkey: PublicKey,
    alias: Option<&AliasRecord>,
) -> Transaction {
    let mut extra_bytes = Vec::new();
    extra::write_tx_pubkey(&tx_pubkey, &mut extra_bytes);
    if let Some(alias) = alias {
        extra::write_alias(alias, &mut extra_bytes);
    }
    Transaction {
        prefix: TransactionPrefix {
            version: 1,
            unlock_time: height + 60,
            vin: vec![TxIn::Gen { height }],
            vout: outs
                .iter()
                .map(|(amount, key)| TxOut {
                    amount: *amount,
                    target: TxOutTarget::ToKey {
                        key: *key,
                        mix_attr: 0,
                    },
                })
                .collect(),
            extra: extra_bytes,
        },
        signatures: vec![vec![]],
    }
}

/// A payload transaction spending `key_image` into one `to_key` output.
fn spend_tx(key_image: KeyImage, amount: u64, out_key: PublicKey) -> Transaction {
    Transaction {
        prefix: TransactionPrefix {
            version: 1,
            unlock_time: 0,
            vin: vec![TxIn::ToKey {
                amount,
                key_offsets: vec![0, 1],
                key_image,
            }],
            vout: vec![TxOut {
                amount,
                target: TxOutTarget::ToKey {
                    key: out_key,
                    mix_attr: 0,
                },
            }],
            extra: vec![],
        },
        signatures: vec![vec![Signature([1; 64]), Signature([2; 64])]],
    }
}

fn block_at(prev_id: Hash, height: u64, miner_tx: Transaction, txs: &[Transaction]) -> Block {
    Block {
        header: BlockHeader {
            major_version: 1,
            minor_version: 0,
            timestamp: 1_700_000_000 + height,
            prev_id,
            nonce: height,
            flags: 0,
        },
        miner_tx,
        tx_hashes: txs.iter().map(Transaction::hash).collect(),
    }
}

/// Append a simple block whose coinbase mints `outs`; returns its hash.
fn push_block(
    chain: &Blockchain,
    outs: &[(u64, PublicKey)],
    txs: Vec<Transaction>,
    alias: Option<&AliasRecord>,
) -> Hash {
    let height = chain.height().unwrap();
    let prev_id = chain.top_block_hash().unwrap().unwrap_or(Hash::ZERO);
    #[allow(clippy::cast_possible_truncation)]
    let miner = miner_tx(height, outs, pk(height as u8 + 100), alias);
    let block = block_at(prev_id, height, miner, &txs);
    let hash = block.hash();
    let stored_height = chain
        .add_block(
            block,
            txs,
            1000,
            u128::from(height + 1) * 1_000,
            (height + 1) * 50,
            height + 1,
            chain.scratchpad_len(),
        )
        .unwrap();
    assert_eq!(stored_height, height);
    hash
}

fn open_tmp() -> (Blockchain, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let chain = Blockchain::open(StoreConfig::new(dir.path().join("chain"))).unwrap();
    (chain, dir)
}

/// Everything observable about the store, for exact before/after
/// comparisons.
#[derive(Debug, PartialEq, Eq)]
struct Snapshot {
    height: u64,
    top_hash: Option<Hash>,
    scratchpad: Vec<Hash>,
    total_transactions: u64,
    coins_generated: u64,
    coins_donated: u64,
    outputs_of_interest: Vec<Option<(u64, [u8; 32])>>,
}

fn snapshot(chain: &Blockchain, amounts: &[u64]) -> Snapshot {
    let mut outputs_of_interest = Vec::new();
    for &amount in amounts {
        for index in 0..8 {
            outputs_of_interest.push(
                chain
                    .get_output_info(amount, index)
                    .unwrap()
                    .map(|info| (info.local_index, info.tx_hash)),
            );
        }
    }
    Snapshot {
        height: chain.height().unwrap(),
        top_hash: chain.top_block_hash().unwrap(),
        scratchpad: chain.get_scratchpad(),
        total_transactions: chain.total_transactions().unwrap(),
        coins_generated: chain.coins_generated_total().unwrap(),
        coins_donated: chain.coins_donated_total().unwrap(),
        outputs_of_interest,
    }
}

//---------------------------------------------------------------------------------------------------- Scenarios
/// S1: the genesis append.
#[test]
fn genesis_block() {
    let (chain, _dir) = open_tmp();
    assert_eq!(chain.height().unwrap(), 0);
    assert_eq!(chain.top_block_hash().unwrap(), None);

    let p0 = pk(1);
    let miner = miner_tx(0, &[(100, p0)], pk(7), None);
    let block = block_at(Hash::ZERO, 0, miner, &[]);
    let expected_hash = block.hash();
    let expected_entries = scratchpad::block_entries(&block, 0).unwrap();

    let height = chain
        .add_block(block, Vec::new(), 500, 1_000, 50, 1, 0)
        .unwrap();
    assert_eq!(height, 0);
    assert_eq!(chain.height().unwrap(), 1);
    assert_eq!(chain.top_block_hash().unwrap(), Some(expected_hash));

    // Genesis pushes: miner pubkey, tree hash, one H(prev || out-key).
    // No prev entry, and no XOR patch over an empty prefix.
    assert_eq!(chain.scratchpad_len(), 3);
    assert_eq!(chain.get_scratchpad(), expected_entries);

    assert_eq!(chain.cumulative_difficulty(0).unwrap(), 1_000);
    assert_eq!(chain.coins_generated_total().unwrap(), 50);
    assert_eq!(chain.coins_donated_total().unwrap(), 1);
}

/// S2: a block containing two transactions sharing a key image is
/// rejected wholesale.
#[test]
fn double_spend_rejection() {
    let (chain, _dir) = open_tmp();
    push_block(&chain, &[(100, pk(1))], Vec::new(), None);
    let before = snapshot(&chain, &[100, 25]);

    let ki = KeyImage([0x33; 32]);
    let tx_a = spend_tx(ki, 25, pk(2));
    let tx_b = spend_tx(ki, 25, pk(3));
    let tx_a_hash = tx_a.hash();

    let height = chain.height().unwrap();
    let prev = chain.top_block_hash().unwrap().unwrap();
    let miner = miner_tx(height, &[(100, pk(4))], pk(5), None);
    let block = block_at(prev, height, miner, &[tx_a.clone(), tx_b.clone()]);

    let err = chain
        .add_block(block, vec![tx_a, tx_b], 1000, 2_000, 100, 2, chain.scratchpad_len())
        .unwrap_err();
    assert!(matches!(err, StoreError::KeyImageAlreadySpent(k) if k == ki));

    // Store state equals post-genesis, including the first transaction's
    // key image, which must have been rolled back.
    assert!(!chain.have_key_image_as_spent(&ki).unwrap());
    assert!(!chain.have_tx(&tx_a_hash).unwrap());
    assert_eq!(snapshot(&chain, &[100, 25]), before);
}

/// S3: appending then popping a block restores the exact prior state.
#[test]
fn pop_restores_state() {
    let (chain, _dir) = open_tmp();
    push_block(&chain, &[(100, pk(1))], Vec::new(), None);
    let before = snapshot(&chain, &[100, 25]);

    let ki = KeyImage([0x44; 32]);
    let tx = spend_tx(ki, 25, pk(2));
    let tx_hash = tx.hash();
    let block_hash = push_block(&chain, &[(100, pk(3))], vec![tx.clone()], None);

    assert_eq!(chain.height().unwrap(), 2);
    assert!(chain.have_key_image_as_spent(&ki).unwrap());
    assert!(chain.have_tx(&tx_hash).unwrap());

    let (popped_block, popped_txs) = chain.pop_block().unwrap();
    assert_eq!(popped_block.hash(), block_hash);
    assert_eq!(popped_txs, vec![tx]);

    assert_eq!(snapshot(&chain, &[100, 25]), before);
    assert!(!chain.have_key_image_as_spent(&ki).unwrap());
    assert!(!chain.have_tx(&tx_hash).unwrap());

    // The chain is still usable after the pop.
    push_block(&chain, &[(100, pk(9))], Vec::new(), None);
    assert_eq!(chain.height().unwrap(), 2);
}

/// S4: a transaction with a script input poisons its whole block; nothing
/// it touched survives.
#[test]
fn unsupported_input_rejected() {
    let (chain, _dir) = open_tmp();
    push_block(&chain, &[(100, pk(1))], Vec::new(), None);
    let before = snapshot(&chain, &[100, 25]);

    let ki = KeyImage([0x55; 32]);
    let mut tx = spend_tx(ki, 25, pk(2));
    // A to_key input (whose key image lands first) followed by a script
    // input: the abort must roll the key image back.
    tx.prefix.vin.push(TxIn::ToScript {
        prev: Hash([6; 32]),
        prevout: 0,
        sigset: vec![0xde, 0xad],
    });
    tx.signatures.push(vec![]);

    let height = chain.height().unwrap();
    let prev = chain.top_block_hash().unwrap().unwrap();
    let miner = miner_tx(height, &[(100, pk(4))], pk(5), None);
    let block = block_at(prev, height, miner, &[tx.clone()]);

    let err = chain
        .add_block(block, vec![tx], 1000, 2_000, 100, 2, chain.scratchpad_len())
        .unwrap_err();
    assert!(matches!(err, StoreError::UnsupportedInput));

    assert!(!chain.have_key_image_as_spent(&ki).unwrap());
    assert_eq!(snapshot(&chain, &[100, 25]), before);
}

/// S5: export to a bootstrap stream, import into a fresh store, compare.
#[test]
fn bootstrap_roundtrip() {
    let (chain, dir) = open_tmp();
    push_block(&chain, &[(100, pk(1))], Vec::new(), None);
    let ki = KeyImage([0x66; 32]);
    let tx = spend_tx(ki, 25, pk(2));
    push_block(&chain, &[(100, pk(3)), (10, pk(4))], vec![tx], None);
    push_block(&chain, &[(10, pk(5))], Vec::new(), None);

    let stream = dir.path().join("bootstrap.raw");
    assert_eq!(chain.export_bootstrap(&stream).unwrap(), 3);

    let other = Blockchain::open(StoreConfig {
        fast_sync: true,
        ..StoreConfig::new(dir.path().join("other"))
    })
    .unwrap();
    assert_eq!(other.import_bootstrap(&stream).unwrap(), 3);

    assert_eq!(other.height().unwrap(), chain.height().unwrap());
    assert_eq!(
        other.top_block_hash().unwrap(),
        chain.top_block_hash().unwrap(),
    );
    assert_eq!(other.get_scratchpad(), chain.get_scratchpad());
    assert_eq!(
        other.total_transactions().unwrap(),
        chain.total_transactions().unwrap(),
    );
    assert!(other.have_key_image_as_spent(&ki).unwrap());
    for height in 0..3 {
        assert_eq!(
            other.get_block_by_height(height).unwrap(),
            chain.get_block_by_height(height).unwrap(),
        );
        assert_eq!(
            other.cumulative_difficulty(height).unwrap(),
            chain.cumulative_difficulty(height).unwrap(),
        );
    }
    for amount in [100, 25, 10] {
        assert_eq!(
            other.num_outputs_for_amount(amount).unwrap(),
            chain.num_outputs_for_amount(amount).unwrap(),
        );
    }
}

/// S6: per-amount indices stay dense from 0 through appends and pops.
#[test]
fn dense_amount_indices() {
    let (chain, _dir) = open_tmp();
    for i in 0..7 {
        push_block(&chain, &[(10, pk(i + 1))], Vec::new(), None);
    }
    assert_eq!(chain.num_outputs_for_amount(10).unwrap(), 7);

    for _ in 0..3 {
        chain.pop_block().unwrap();
    }

    assert_eq!(chain.num_outputs_for_amount(10).unwrap(), 4);
    for n in 0..4 {
        assert!(chain.get_output_info(10, n).unwrap().is_some(), "index {n}");
    }
    for n in 4..8 {
        assert!(chain.get_output_info(10, n).unwrap().is_none(), "index {n}");
    }
}

//---------------------------------------------------------------------------------------------------- Lifecycle
#[test]
fn empty_chain_pop_fails() {
    let (chain, _dir) = open_tmp();
    assert!(matches!(chain.pop_block(), Err(StoreError::EmptyChain)));
}

#[test]
fn double_open_is_rejected() {
    let (chain, dir) = open_tmp();
    let path = chain.config().db_path.clone();
    assert!(matches!(
        Blockchain::open(StoreConfig::new(path.clone())),
        Err(StoreError::AlreadyOpen)
    ));

    // After a close the directory can be opened again.
    chain.close().unwrap();
    drop(chain);
    let reopened = Blockchain::open(StoreConfig::new(path)).unwrap();
    assert_eq!(reopened.height().unwrap(), 0);
    drop(dir);
}

#[test]
fn close_rejects_writes_and_state_survives_reopen() {
    let (chain, dir) = open_tmp();
    push_block(&chain, &[(100, pk(1))], Vec::new(), None);
    push_block(&chain, &[(100, pk(2))], Vec::new(), None);
    let top = chain.top_block_hash().unwrap();
    let pad = chain.get_scratchpad();
    let path = chain.config().db_path.clone();

    chain.close().unwrap();
    assert!(matches!(chain.pop_block(), Err(StoreError::Closing)));
    drop(chain);

    let reopened = Blockchain::open(StoreConfig::new(path)).unwrap();
    assert_eq!(reopened.height().unwrap(), 2);
    assert_eq!(reopened.top_block_hash().unwrap(), top);
    assert_eq!(reopened.get_scratchpad(), pad);

    // And the chain keeps extending across the reopen.
    push_block(&reopened, &[(100, pk(3))], Vec::new(), None);
    assert_eq!(reopened.height().unwrap(), 3);
    drop(dir);
}

#[test]
fn tampered_scratchpad_file_is_rejected_then_rebuilt() {
    let (chain, dir) = open_tmp();
    push_block(&chain, &[(100, pk(1))], Vec::new(), None);
    push_block(&chain, &[(100, pk(2))], Vec::new(), None);
    let pad = chain.get_scratchpad();
    let path = chain.config().db_path.clone();
    chain.close().unwrap();
    drop(chain);

    // Truncate one entry off the exported scratchpad.
    let file = path.join("scratchpad.bin");
    let mut bytes = std::fs::read(&file).unwrap();
    let new_len = (pad.len() - 1) as u64;
    bytes[..8].copy_from_slice(&new_len.to_le_bytes());
    bytes.truncate(8 + (pad.len() - 1) * 32);
    std::fs::write(&file, &bytes).unwrap();

    assert!(matches!(
        Blockchain::open(StoreConfig::new(path.clone())),
        Err(StoreError::CorruptScratchpad(_))
    ));

    // Removing the bad export lets the table copy load; a rebuild then
    // reproduces the same bytes from the canonical blocks.
    std::fs::remove_file(&file).unwrap();
    let reopened = Blockchain::open(StoreConfig::new(path)).unwrap();
    assert_eq!(reopened.get_scratchpad(), pad);
    assert_eq!(reopened.rebuild_scratchpad().unwrap(), pad.len() as u64);
    assert_eq!(reopened.get_scratchpad(), pad);
    drop(dir);
}

//---------------------------------------------------------------------------------------------------- Aliases
fn alias(name: &str, seed: u8) -> AliasRecord {
    AliasRecord {
        name: name.to_string(),
        address: AccountAddress {
            spend_public_key: pk(seed),
            view_public_key: pk(seed + 1),
        },
        signature: None,
    }
}

#[test]
fn alias_first_writer_wins_and_pop_respects_it() {
    let (chain, _dir) = open_tmp();
    let first = alias("miner-pool", 1);
    let second = alias("miner-pool", 9);

    push_block(&chain, &[(100, pk(1))], Vec::new(), Some(&first));
    assert_eq!(chain.get_alias("miner-pool").unwrap(), Some(first.clone()));

    // A later block cannot steal the name.
    push_block(&chain, &[(100, pk(2))], Vec::new(), Some(&second));
    assert_eq!(chain.get_alias("miner-pool").unwrap(), Some(first.clone()));

    // Popping the thief leaves the original registration alone.
    chain.pop_block().unwrap();
    assert_eq!(chain.get_alias("miner-pool").unwrap(), Some(first));

    // Popping the introducer removes it.
    chain.pop_block().unwrap();
    assert_eq!(chain.get_alias("miner-pool").unwrap(), None);
    assert_eq!(chain.get_alias("unknown").unwrap(), None);
}

//---------------------------------------------------------------------------------------------------- Queries
#[test]
fn tx_queries_and_output_indices() {
    let (chain, _dir) = open_tmp();
    push_block(&chain, &[(100, pk(1))], Vec::new(), None);

    let tx = spend_tx(KeyImage([0x77; 32]), 25, pk(2));
    let tx_hash = tx.hash();
    push_block(&chain, &[(100, pk(3))], vec![tx.clone()], None);

    assert_eq!(chain.get_tx(&tx_hash).unwrap(), tx);
    assert!(matches!(
        chain.get_tx(&Hash([0xee; 32])),
        Err(StoreError::TxNotFound)
    ));

    // The payload tx minted the very first output of amount 25.
    assert_eq!(chain.get_tx_output_global_indices(&tx_hash).unwrap(), vec![0]);

    // Blocks come back with their payloads attached.
    let blocks = chain.get_blocks(0, 10).unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[1].1, vec![tx]);

    let by_hash = chain
        .get_block_by_hash(&chain.top_block_hash().unwrap().unwrap())
        .unwrap();
    assert_eq!(by_hash, blocks[1].0);
    assert!(chain.have_block(&by_hash.hash()).unwrap());
    assert!(!chain.have_block(&Hash([0xdd; 32])).unwrap());
}

#[test]
fn random_outs_sampling() {
    let (chain, _dir) = open_tmp();
    for i in 0..5 {
        push_block(&chain, &[(10, pk(i + 1)), (25, pk(i + 50))], Vec::new(), None);
    }

    let response = chain
        .get_random_outs_for_amounts(&bramble_blockchain::RandomOutsRequest {
            amounts: vec![10, 25, 77],
            outs_count: 3,
        })
        .unwrap();

    assert_eq!(response.len(), 3);
    for amount_outs in &response[..2] {
        assert_eq!(amount_outs.outs.len(), 3);
        // Distinct, ascending, in range.
        for pair in amount_outs.outs.windows(2) {
            assert!(pair[0].global_index < pair[1].global_index);
        }
        for out in &amount_outs.outs {
            assert!(out.global_index < 5);
        }
    }
    // An amount with no outputs yields an empty sample.
    assert_eq!(response[2].outs, Vec::new());
}
