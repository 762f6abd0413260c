//! The [`Blockchain`] store facade.

//---------------------------------------------------------------------------------------------------- Import
use std::{
    collections::HashSet,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, OnceLock, PoisonError, RwLock,
    },
    time::{Duration, Instant},
};

use rand::Rng as _;

use bramble_database::{config::SyncMode, ConcreteEnv, DatabaseRo, Env, EnvInner, TxRo, TxRw};
use bramble_types::{
    extra, AliasRecord, Block, BlockHeader, Hash, KeyImage, MalformedBlob, PublicKey, Transaction,
    TxOutTarget,
};

use crate::{
    config::{StoreConfig, WriteAck},
    constants::SCRATCHPAD_FILENAME,
    error::StoreError,
    ops::{alias, block as block_ops, key_image, output, property, tx as tx_ops},
    scratchpad::{self, Mirror},
    tables::{
        create_all_tables, Aliases, BlockBlobs, BlockHeights, BlockInfos, KeyImages, Metadata,
        NumOutputs, Outputs, Scratchpad, TxBlobs, TxInfos, TxOutputIndices,
    },
    types::{split_u128, BlockHeight, BlockInfo, OutputInfo},
};

//---------------------------------------------------------------------------------------------------- Open-store registry
/// Directories with a live [`Blockchain`] in this process.
///
/// A second `open` on a registered path is [`StoreError::AlreadyOpen`];
/// `open` is *not* idempotent across handles.
static OPEN_STORES: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();

fn open_stores() -> &'static Mutex<HashSet<PathBuf>> {
    OPEN_STORES.get_or_init(|| Mutex::new(HashSet::new()))
}

//---------------------------------------------------------------------------------------------------- Stats
/// Cumulative write-path statistics, updated under the write lock.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Number of [`Blockchain::add_block`] calls that committed.
    pub num_calls: u64,
    /// Time spent computing block hashes.
    pub block_hash: Duration,
    /// Time spent inserting transactions.
    pub add_transaction: Duration,
    /// Time spent inserting block data and the scratchpad patch.
    pub add_block: Duration,
    /// Time spent committing.
    pub commit: Duration,
}

/// Mutable state owned by the single writer.
#[derive(Default)]
pub(crate) struct WriterState {
    blocks_since_sync: u64,
    stats: Stats,
}

//---------------------------------------------------------------------------------------------------- Random outputs
/// A request for ring-decoy candidates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RandomOutsRequest {
    /// The amounts to sample for.
    pub amounts: Vec<u64>,
    /// How many outputs to return per amount (fewer if the amount has
    /// fewer outputs than requested).
    pub outs_count: u64,
}

/// One sampled output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RandomOut {
    /// The output's per-amount global index.
    pub global_index: u64,
    /// The output's one-time key.
    pub key: PublicKey,
}

/// The sampled outputs of one amount.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RandomAmountOuts {
    /// The amount sampled.
    pub amount: u64,
    /// The sampled outputs, in ascending index order.
    pub outs: Vec<RandomOut>,
}

//---------------------------------------------------------------------------------------------------- Blockchain
/// The persistent blockchain store.
///
/// One instance exclusively owns a chain directory: the database
/// environment plus `scratchpad.bin`. All methods take `&self`; reads run
/// in parallel on snapshots while writes serialize through an internal
/// lock (and the environment's own single-writer rule).
///
/// Lifecycle: `Closed → Open → Closing → Closed`. [`Blockchain::close`]
/// enters `Closing` (writes are rejected), flushes, exports the
/// scratchpad, and releases the directory; dropping without closing does
/// the same on a best-effort basis.
pub struct Blockchain {
    env: ConcreteEnv,
    config: StoreConfig,
    /// In-memory scratchpad, updated only after commits.
    mirror: RwLock<Mirror>,
    /// Serializes `add_block`/`pop_block`/`rebuild`/`close`.
    pub(crate) writer: Mutex<WriterState>,
    closing: AtomicBool,
    closed: AtomicBool,
}

impl std::fmt::Debug for Blockchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blockchain")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Blockchain {
    //------------------------------------------------ Lifecycle
    /// Open (or create) the store at `config.db_path`.
    ///
    /// Creates missing tables, initializes chain metadata, imports
    /// `scratchpad.bin` when present and checks it against
    /// `metadata.scratchpad_len`.
    ///
    /// # Errors
    /// [`StoreError::AlreadyOpen`] when the directory already has a live
    /// store (in this process or another);
    /// [`StoreError::CorruptScratchpad`] when the exported scratchpad
    /// disagrees with the database — recover with
    /// [`Blockchain::rebuild_scratchpad`] after reopening without the
    /// file, or delete the file.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        let path = config.db_path.clone();
        {
            let mut registry = open_stores().lock().unwrap_or_else(PoisonError::into_inner);
            if !registry.insert(path.clone()) {
                return Err(StoreError::AlreadyOpen);
            }
        }

        match Self::open_inner(config) {
            Ok(store) => Ok(store),
            Err(e) => {
                open_stores()
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&path);
                Err(e)
            }
        }
    }

    fn open_inner(config: StoreConfig) -> Result<Self, StoreError> {
        let env = ConcreteEnv::open(config.db_config())?;

        let (height, mirror) = {
            let env_inner = env.env_inner();

            let tx_rw = env_inner.tx_rw()?;
            create_all_tables(&env_inner, &tx_rw)?;
            {
                let mut metadata = env_inner.open_db_rw::<Metadata>(&tx_rw)?;
                property::init_defaults(&mut metadata)?;
            }
            TxRw::commit(tx_rw)?;

            let tx_ro = env_inner.tx_ro()?;
            let metadata = env_inner.open_db_ro::<Metadata>(&tx_ro)?;
            let height = property::chain_height(&metadata)?;
            let scratchpad_len: u64 = property::get_pod(&metadata, property::SCRATCHPAD_LEN)?;

            let file = config.db_path.join(SCRATCHPAD_FILENAME);
            let mirror = if file.exists() {
                let imported = Mirror::import_from_file(&file)?;
                if imported.len() != scratchpad_len {
                    return Err(StoreError::CorruptScratchpad(
                        "scratchpad file length disagrees with metadata",
                    ));
                }
                // Consume the export: a crash from here on leaves no stale
                // file, and a clean close writes a fresh one.
                std::fs::remove_file(&file)?;
                imported
            } else {
                let table = env_inner.open_db_ro::<Scratchpad>(&tx_ro)?;
                let mirror = Mirror::load_from_table(&table, scratchpad_len)?;
                drop(table);
                mirror
            };
            drop(metadata);
            TxRo::commit(tx_ro)?;

            (height, mirror)
        };

        tracing::info!(
            path = %config.db_path.display(),
            height,
            scratchpad_len = mirror.len(),
            "opened blockchain store"
        );

        Ok(Self {
            env,
            config,
            mirror: RwLock::new(mirror),
            writer: Mutex::new(WriterState::default()),
            closing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    /// Flush, export the scratchpad, and release the directory.
    ///
    /// Write operations arriving after this call fail with
    /// [`StoreError::Closing`]. Idempotent.
    ///
    /// # Errors
    /// IO errors; the store still ends up closed.
    pub fn close(&self) -> Result<(), StoreError> {
        self.closing.store(true, Ordering::Release);

        // Wait out any in-flight writer.
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let result = self.env.sync().map_err(StoreError::from).and_then(|()| {
            let mirror = self.mirror.read().unwrap_or_else(PoisonError::into_inner);
            let path = self.config.db_path.join(SCRATCHPAD_FILENAME);
            tracing::info!(path = %path.display(), len = mirror.len(), "exporting scratchpad");
            Ok(mirror.export_to_file(&path)?)
        });

        open_stores()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.config.db_path);

        result
    }

    /// The configuration this store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    //------------------------------------------------ Write path
    /// Append a validated block and its payload transactions.
    ///
    /// `txs` must match `block.tx_hashes` in order and count; accounting
    /// values (`block_size`, `cumulative_difficulty`, `coins_generated`,
    /// `coins_donated`) come from consensus, which this store does not
    /// second-guess. `scratch_offset` must equal the current scratchpad
    /// length.
    ///
    /// Atomic: on any error the write transaction aborts and persistent
    /// state is unchanged. Returns the height the block was stored at
    /// (the chain height before the call).
    ///
    /// # Errors
    /// [`StoreError::KeyImageAlreadySpent`] on a double-spend,
    /// [`StoreError::UnsupportedInput`]/[`StoreError::UnsupportedOutput`]
    /// on script variants, [`StoreError::MalformedBlob`] on a coinbase
    /// without a one-time pubkey or a `txs`/`tx_hashes` mismatch,
    /// [`StoreError::Closing`] during shutdown.
    #[allow(clippy::too_many_arguments)] // the consensus accounting travels with the block
    pub fn add_block(
        &self,
        block: Block,
        txs: Vec<Transaction>,
        block_size: u64,
        cumulative_difficulty: u128,
        coins_generated: u64,
        coins_donated: u64,
        scratch_offset: u64,
    ) -> Result<BlockHeight, StoreError> {
        if self.closing.load(Ordering::Acquire) {
            return Err(StoreError::Closing);
        }
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        // Re-checked under the lock: `close` may have slipped in while we
        // were waiting for it.
        if self.closing.load(Ordering::Acquire) {
            return Err(StoreError::Closing);
        }

        let env_inner = self.env.env_inner();
        let tx_rw = env_inner.tx_rw()?;

        let mut timings = Stats::default();
        let result = (|| -> Result<_, StoreError> {
            let mut block_blobs = env_inner.open_db_rw::<BlockBlobs>(&tx_rw)?;
            let mut block_infos = env_inner.open_db_rw::<BlockInfos>(&tx_rw)?;
            let mut block_heights = env_inner.open_db_rw::<BlockHeights>(&tx_rw)?;
            let mut tx_infos = env_inner.open_db_rw::<TxInfos>(&tx_rw)?;
            let mut tx_blobs = env_inner.open_db_rw::<TxBlobs>(&tx_rw)?;
            let mut tx_output_indices = env_inner.open_db_rw::<TxOutputIndices>(&tx_rw)?;
            let mut outputs = env_inner.open_db_rw::<Outputs>(&tx_rw)?;
            let mut num_outputs = env_inner.open_db_rw::<NumOutputs>(&tx_rw)?;
            let mut key_images = env_inner.open_db_rw::<KeyImages>(&tx_rw)?;
            let mut aliases = env_inner.open_db_rw::<Aliases>(&tx_rw)?;
            let mut scratchpad_table = env_inner.open_db_rw::<Scratchpad>(&tx_rw)?;
            let mut metadata = env_inner.open_db_rw::<Metadata>(&tx_rw)?;

            if block.tx_hashes.len() != txs.len() {
                return Err(MalformedBlob {
                    offset: 0,
                    reason: "payload transaction count does not match the block's hash list",
                }
                .into());
            }

            let started = Instant::now();
            let block_hash = block.hash();
            timings.block_hash = started.elapsed();

            let height = property::chain_height(&metadata)?;

            let current_len: u64 = property::get_pod(&metadata, property::SCRATCHPAD_LEN)?;
            if scratch_offset != current_len {
                return Err(StoreError::CorruptScratchpad(
                    "caller scratch offset does not match the scratchpad length",
                ));
            }

            // Alias registration rides in the coinbase `extra`.
            if block.miner_tx.is_coinbase() {
                if let Ok(info) = extra::parse_extra(&block.miner_tx.prefix.extra) {
                    if let Some(record) = info.alias {
                        alias::add_alias(&mut aliases, &record, &block_hash)?;
                    }
                }
            }

            let started = Instant::now();
            let (low, high) = split_u128(cumulative_difficulty);
            block_ops::add_block_data(
                &mut block_blobs,
                &mut block_infos,
                &mut block_heights,
                &mut metadata,
                height,
                &block,
                &BlockInfo {
                    block_size,
                    cumulative_difficulty_low: low,
                    cumulative_difficulty_high: high,
                    coins_generated,
                    coins_donated,
                    scratch_offset,
                    block_hash: *block_hash.as_bytes(),
                },
            )?;
            timings.add_block = started.elapsed();

            let started = Instant::now();
            tx_ops::add_transaction(
                &mut tx_infos,
                &mut tx_blobs,
                &mut tx_output_indices,
                &mut outputs,
                &mut num_outputs,
                &mut key_images,
                &block_hash,
                &block.miner_tx,
                None,
            )?;
            for (tx, tx_hash) in txs.iter().zip(&block.tx_hashes) {
                tx_ops::add_transaction(
                    &mut tx_infos,
                    &mut tx_blobs,
                    &mut tx_output_indices,
                    &mut outputs,
                    &mut num_outputs,
                    &mut key_images,
                    &block_hash,
                    tx,
                    Some(*tx_hash),
                )?;
            }
            timings.add_transaction = started.elapsed();

            let started = Instant::now();
            let patch =
                scratchpad::append_block(&mut scratchpad_table, &mut metadata, &block, height)?;
            timings.add_block += started.elapsed();

            Ok((height, block_hash, patch))
        })();

        let (height, block_hash, patch) = match result {
            Ok(out) => out,
            Err(e) => {
                if let Err(abort_error) = TxRw::abort(tx_rw) {
                    tracing::error!(%abort_error, "failed to abort block append");
                }
                return Err(e);
            }
        };

        let started = Instant::now();
        TxRw::commit(tx_rw)?;
        timings.commit = started.elapsed();

        // Committed: the mirror may now observe the mutation.
        self.mirror
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(&patch);

        writer.stats.num_calls += 1;
        writer.stats.block_hash += timings.block_hash;
        writer.stats.add_transaction += timings.add_transaction;
        writer.stats.add_block += timings.add_block;
        writer.stats.commit += timings.commit;

        self.maybe_sync(&mut writer)?;

        tracing::debug!(height, %block_hash, txs = txs.len(), "appended block");
        Ok(height)
    }

    /// Batch syncing under the faster profiles.
    fn maybe_sync(&self, writer: &mut WriterState) -> Result<(), StoreError> {
        writer.blocks_since_sync += 1;
        if self.config.sync_mode != SyncMode::Safe
            && self.config.write_ack == WriteAck::Sync
            && writer.blocks_since_sync >= self.config.blocks_per_sync_clamped()
        {
            self.env.sync()?;
            writer.blocks_since_sync = 0;
        }
        Ok(())
    }

    /// Pop the top block, returning it and its payload transactions to the
    /// caller.
    ///
    /// Exact reverse of [`Blockchain::add_block`]: key images are
    /// unmarked, per-amount output indices are freed in reverse insertion
    /// order, the scratchpad patch is reverted via the stored
    /// `scratch_offset`, and an alias is dropped only if this block
    /// introduced it.
    ///
    /// # Errors
    /// [`StoreError::EmptyChain`] at height 0, [`StoreError::Closing`]
    /// during shutdown.
    pub fn pop_block(&self) -> Result<(Block, Vec<Transaction>), StoreError> {
        if self.closing.load(Ordering::Acquire) {
            return Err(StoreError::Closing);
        }
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if self.closing.load(Ordering::Acquire) {
            return Err(StoreError::Closing);
        }

        let env_inner = self.env.env_inner();
        let tx_rw = env_inner.tx_rw()?;

        let result = (|| -> Result<_, StoreError> {
            let mut block_blobs = env_inner.open_db_rw::<BlockBlobs>(&tx_rw)?;
            let mut block_infos = env_inner.open_db_rw::<BlockInfos>(&tx_rw)?;
            let mut block_heights = env_inner.open_db_rw::<BlockHeights>(&tx_rw)?;
            let mut tx_infos = env_inner.open_db_rw::<TxInfos>(&tx_rw)?;
            let mut tx_blobs = env_inner.open_db_rw::<TxBlobs>(&tx_rw)?;
            let mut tx_output_indices = env_inner.open_db_rw::<TxOutputIndices>(&tx_rw)?;
            let mut outputs = env_inner.open_db_rw::<Outputs>(&tx_rw)?;
            let mut num_outputs = env_inner.open_db_rw::<NumOutputs>(&tx_rw)?;
            let mut key_images = env_inner.open_db_rw::<KeyImages>(&tx_rw)?;
            let mut aliases = env_inner.open_db_rw::<Aliases>(&tx_rw)?;
            let mut scratchpad_table = env_inner.open_db_rw::<Scratchpad>(&tx_rw)?;
            let mut metadata = env_inner.open_db_rw::<Metadata>(&tx_rw)?;

            let (block, info) = block_ops::remove_top_block_data(
                &mut block_blobs,
                &mut block_infos,
                &mut block_heights,
                &mut metadata,
            )?;
            let block_hash = Hash(info.block_hash);

            // Free outputs strictly in reverse insertion order: payload
            // transactions last-to-first, the miner transaction last.
            let mut txs = Vec::with_capacity(block.tx_hashes.len());
            for tx_hash in block.tx_hashes.iter().rev() {
                txs.push(tx_ops::remove_transaction(
                    &mut tx_infos,
                    &mut tx_blobs,
                    &mut tx_output_indices,
                    &mut outputs,
                    &mut num_outputs,
                    &mut key_images,
                    tx_hash,
                )?);
            }
            txs.reverse();
            tx_ops::remove_transaction(
                &mut tx_infos,
                &mut tx_blobs,
                &mut tx_output_indices,
                &mut outputs,
                &mut num_outputs,
                &mut key_images,
                &block.miner_tx.hash(),
            )?;

            if block.miner_tx.is_coinbase() {
                if let Ok(info) = extra::parse_extra(&block.miner_tx.prefix.extra) {
                    if let Some(record) = info.alias {
                        alias::remove_alias_if_introduced(&mut aliases, &record.name, &block_hash)?;
                    }
                }
            }

            let patch = scratchpad::revert_block(
                &mut scratchpad_table,
                &mut metadata,
                info.scratch_offset,
            )?;

            Ok((block, txs, patch))
        })();

        let (block, txs, patch) = match result {
            Ok(out) => out,
            Err(e) => {
                if let Err(abort_error) = TxRw::abort(tx_rw) {
                    tracing::error!(%abort_error, "failed to abort block pop");
                }
                return Err(e);
            }
        };

        TxRw::commit(tx_rw)?;

        self.mirror
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .revert(&patch);

        tracing::debug!(new_height = patch.base_len, "popped top block");
        Ok((block, txs))
    }

    /// Rebuild the scratchpad by replaying `block_blobs` from genesis.
    ///
    /// The recovery path for [`StoreError::CorruptScratchpad`]. Returns
    /// the rebuilt length.
    ///
    /// # Errors
    /// [`StoreError::MalformedBlob`] if a stored block no longer decodes,
    /// [`StoreError::Closing`] during shutdown.
    pub fn rebuild_scratchpad(&self) -> Result<u64, StoreError> {
        if self.closing.load(Ordering::Acquire) {
            return Err(StoreError::Closing);
        }
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if self.closing.load(Ordering::Acquire) {
            return Err(StoreError::Closing);
        }

        let env_inner = self.env.env_inner();
        let mut tx_rw = env_inner.tx_rw()?;
        env_inner.clear_db::<Scratchpad>(&mut tx_rw)?;

        let result = (|| -> Result<Mirror, StoreError> {
            let block_blobs = env_inner.open_db_rw::<BlockBlobs>(&tx_rw)?;
            let mut scratchpad_table = env_inner.open_db_rw::<Scratchpad>(&tx_rw)?;
            let mut metadata = env_inner.open_db_rw::<Metadata>(&tx_rw)?;

            property::set_pod(&mut metadata, property::SCRATCHPAD_LEN, &0u64)?;

            let mut mirror = Mirror::default();
            let height = property::chain_height(&metadata)?;
            for h in 0..height {
                let blob = block_blobs.get(&h)?;
                let block = Block::from_bytes(&blob)?;
                let patch =
                    scratchpad::append_block(&mut scratchpad_table, &mut metadata, &block, h)?;
                mirror.apply(&patch);
            }
            Ok(mirror)
        })();

        let mirror = match result {
            Ok(mirror) => mirror,
            Err(e) => {
                if let Err(abort_error) = TxRw::abort(tx_rw) {
                    tracing::error!(%abort_error, "failed to abort scratchpad rebuild");
                }
                return Err(e);
            }
        };

        TxRw::commit(tx_rw)?;

        let len = mirror.len();
        *self.mirror.write().unwrap_or_else(PoisonError::into_inner) = mirror;
        tracing::info!(len, "rebuilt scratchpad from canonical blocks");
        Ok(len)
    }

    //------------------------------------------------ Queries
    /// The chain height: the number of stored blocks.
    ///
    /// # Errors
    /// Database errors.
    pub fn height(&self) -> Result<u64, StoreError> {
        let env_inner = self.env.env_inner();
        let tx_ro = env_inner.tx_ro()?;
        let metadata = env_inner.open_db_ro::<Metadata>(&tx_ro)?;
        let height = property::chain_height(&metadata)?;
        drop(metadata);
        TxRo::commit(tx_ro)?;
        Ok(height)
    }

    /// Hash of the top block; `None` on an empty chain.
    ///
    /// # Errors
    /// Database errors.
    pub fn top_block_hash(&self) -> Result<Option<Hash>, StoreError> {
        let env_inner = self.env.env_inner();
        let tx_ro = env_inner.tx_ro()?;
        let metadata = env_inner.open_db_ro::<Metadata>(&tx_ro)?;
        let top = if property::chain_height(&metadata)? == 0 {
            None
        } else {
            Some(Hash(property::get_pod(
                &metadata,
                property::TOP_BLOCK_HASH,
            )?))
        };
        drop(metadata);
        TxRo::commit(tx_ro)?;
        Ok(top)
    }

    /// Fetch the block stored at `height`.
    ///
    /// # Errors
    /// [`StoreError::BlockNotFound`] past the tip.
    pub fn get_block_by_height(&self, height: BlockHeight) -> Result<Block, StoreError> {
        let env_inner = self.env.env_inner();
        let tx_ro = env_inner.tx_ro()?;
        let block_blobs = env_inner.open_db_ro::<BlockBlobs>(&tx_ro)?;
        let block = block_ops::get_block_by_height(&block_blobs, height)?;
        drop(block_blobs);
        TxRo::commit(tx_ro)?;
        Ok(block)
    }

    /// Fetch a block by its hash.
    ///
    /// # Errors
    /// [`StoreError::BlockNotFound`] for unknown hashes.
    pub fn get_block_by_hash(&self, hash: &Hash) -> Result<Block, StoreError> {
        let env_inner = self.env.env_inner();
        let tx_ro = env_inner.tx_ro()?;
        let block_heights = env_inner.open_db_ro::<BlockHeights>(&tx_ro)?;
        let block_blobs = env_inner.open_db_ro::<BlockBlobs>(&tx_ro)?;
        let height = block_ops::block_height_by_hash(&block_heights, hash)?;
        let block = block_ops::get_block_by_height(&block_blobs, height)?;
        drop(block_heights);
        drop(block_blobs);
        TxRo::commit(tx_ro)?;
        Ok(block)
    }

    /// Fetch only the header of the block at `height`.
    ///
    /// # Errors
    /// [`StoreError::BlockNotFound`] past the tip.
    pub fn get_block_header(&self, height: BlockHeight) -> Result<BlockHeader, StoreError> {
        Ok(self.get_block_by_height(height)?.header)
    }

    /// Is a block with this hash stored?
    ///
    /// # Errors
    /// Database errors.
    pub fn have_block(&self, hash: &Hash) -> Result<bool, StoreError> {
        let env_inner = self.env.env_inner();
        let tx_ro = env_inner.tx_ro()?;
        let block_heights = env_inner.open_db_ro::<BlockHeights>(&tx_ro)?;
        let have = block_heights.contains(hash.as_bytes())?;
        drop(block_heights);
        TxRo::commit(tx_ro)?;
        Ok(have)
    }

    /// The stored metadata of the block at `height`.
    ///
    /// # Errors
    /// [`StoreError::BlockNotFound`] past the tip.
    pub fn get_block_info(&self, height: BlockHeight) -> Result<BlockInfo, StoreError> {
        let env_inner = self.env.env_inner();
        let tx_ro = env_inner.tx_ro()?;
        let block_infos = env_inner.open_db_ro::<BlockInfos>(&tx_ro)?;
        let info = block_ops::get_block_info(&block_infos, height)?;
        drop(block_infos);
        TxRo::commit(tx_ro)?;
        Ok(info)
    }

    /// Cumulative difficulty at `height`.
    ///
    /// # Errors
    /// [`StoreError::BlockNotFound`] past the tip.
    pub fn cumulative_difficulty(&self, height: BlockHeight) -> Result<u128, StoreError> {
        Ok(self.get_block_info(height)?.cumulative_difficulty())
    }

    /// Total coins emitted up to the top block.
    ///
    /// # Errors
    /// Database errors.
    pub fn coins_generated_total(&self) -> Result<u64, StoreError> {
        let env_inner = self.env.env_inner();
        let tx_ro = env_inner.tx_ro()?;
        let metadata = env_inner.open_db_ro::<Metadata>(&tx_ro)?;
        let coins = property::get_pod(&metadata, property::COINS_GENERATED)?;
        drop(metadata);
        TxRo::commit(tx_ro)?;
        Ok(coins)
    }

    /// Total coins donated up to the top block.
    ///
    /// # Errors
    /// Database errors.
    pub fn coins_donated_total(&self) -> Result<u64, StoreError> {
        let env_inner = self.env.env_inner();
        let tx_ro = env_inner.tx_ro()?;
        let metadata = env_inner.open_db_ro::<Metadata>(&tx_ro)?;
        let coins = property::get_pod(&metadata, property::COINS_DONATED)?;
        drop(metadata);
        TxRo::commit(tx_ro)?;
        Ok(coins)
    }

    /// Fetch blocks `start..start + count` (clamped to the tip) together
    /// with their payload transactions.
    ///
    /// # Errors
    /// [`StoreError::MalformedBlob`] on stored-blob corruption.
    pub fn get_blocks(
        &self,
        start: BlockHeight,
        count: u64,
    ) -> Result<Vec<(Block, Vec<Transaction>)>, StoreError> {
        let env_inner = self.env.env_inner();
        let tx_ro = env_inner.tx_ro()?;
        let metadata = env_inner.open_db_ro::<Metadata>(&tx_ro)?;
        let block_blobs = env_inner.open_db_ro::<BlockBlobs>(&tx_ro)?;
        let tx_infos = env_inner.open_db_ro::<TxInfos>(&tx_ro)?;
        let tx_blobs = env_inner.open_db_ro::<TxBlobs>(&tx_ro)?;

        let height = property::chain_height(&metadata)?;
        let end = height.min(start.saturating_add(count));

        let mut out = Vec::new();
        for h in start..end {
            let block = block_ops::get_block_by_height(&block_blobs, h)?;
            let mut txs = Vec::with_capacity(block.tx_hashes.len());
            for tx_hash in &block.tx_hashes {
                txs.push(tx_ops::get_transaction(&tx_infos, &tx_blobs, tx_hash)?);
            }
            out.push((block, txs));
        }
        drop(metadata);
        drop(block_blobs);
        drop(tx_infos);
        drop(tx_blobs);
        TxRo::commit(tx_ro)?;
        Ok(out)
    }

    /// Fetch a transaction by hash.
    ///
    /// # Errors
    /// [`StoreError::TxNotFound`] for unknown hashes.
    pub fn get_tx(&self, tx_hash: &Hash) -> Result<Transaction, StoreError> {
        let env_inner = self.env.env_inner();
        let tx_ro = env_inner.tx_ro()?;
        let tx_infos = env_inner.open_db_ro::<TxInfos>(&tx_ro)?;
        let tx_blobs = env_inner.open_db_ro::<TxBlobs>(&tx_ro)?;
        let tx = tx_ops::get_transaction(&tx_infos, &tx_blobs, tx_hash)?;
        drop(tx_infos);
        drop(tx_blobs);
        TxRo::commit(tx_ro)?;
        Ok(tx)
    }

    /// Is a transaction with this hash stored?
    ///
    /// # Errors
    /// Database errors.
    pub fn have_tx(&self, tx_hash: &Hash) -> Result<bool, StoreError> {
        let env_inner = self.env.env_inner();
        let tx_ro = env_inner.tx_ro()?;
        let tx_infos = env_inner.open_db_ro::<TxInfos>(&tx_ro)?;
        let have = tx_infos.contains(tx_hash.as_bytes())?;
        drop(tx_infos);
        TxRo::commit(tx_ro)?;
        Ok(have)
    }

    /// Number of stored transactions (miner transactions included).
    ///
    /// # Errors
    /// Database errors.
    pub fn total_transactions(&self) -> Result<u64, StoreError> {
        let env_inner = self.env.env_inner();
        let tx_ro = env_inner.tx_ro()?;
        let tx_infos = env_inner.open_db_ro::<TxInfos>(&tx_ro)?;
        let count = tx_infos.len()?;
        drop(tx_infos);
        TxRo::commit(tx_ro)?;
        Ok(count)
    }

    /// Has this key image been spent by a stored transaction?
    ///
    /// # Errors
    /// Database errors.
    pub fn have_key_image_as_spent(&self, key_image: &KeyImage) -> Result<bool, StoreError> {
        let env_inner = self.env.env_inner();
        let tx_ro = env_inner.tx_ro()?;
        let key_images = env_inner.open_db_ro::<KeyImages>(&tx_ro)?;
        let spent = key_image::key_image_exists(&key_images, key_image)?;
        drop(key_images);
        TxRo::commit(tx_ro)?;
        Ok(spent)
    }

    /// The per-amount global indices of a transaction's outputs, in
    /// output order.
    ///
    /// # Errors
    /// [`StoreError::TxNotFound`] for unknown hashes.
    pub fn get_tx_output_global_indices(&self, tx_hash: &Hash) -> Result<Vec<u64>, StoreError> {
        let env_inner = self.env.env_inner();
        let tx_ro = env_inner.tx_ro()?;
        let tx_infos = env_inner.open_db_ro::<TxInfos>(&tx_ro)?;
        let tx_output_indices = env_inner.open_db_ro::<TxOutputIndices>(&tx_ro)?;
        let info = tx_ops::get_tx_info(&tx_infos, tx_hash)?;
        let indices = tx_output_indices.get(&info.tx_id)?;
        drop(tx_infos);
        drop(tx_output_indices);
        TxRo::commit(tx_ro)?;
        Ok(indices.0)
    }

    /// Number of outputs recorded for `amount`.
    ///
    /// # Errors
    /// Database errors.
    pub fn num_outputs_for_amount(&self, amount: u64) -> Result<u64, StoreError> {
        let env_inner = self.env.env_inner();
        let tx_ro = env_inner.tx_ro()?;
        let num_outputs = env_inner.open_db_ro::<NumOutputs>(&tx_ro)?;
        let count = output::num_outputs(&num_outputs, amount)?;
        drop(num_outputs);
        TxRo::commit(tx_ro)?;
        Ok(count)
    }

    /// The output at `(amount, index)`, if that index is populated.
    ///
    /// # Errors
    /// Database errors.
    pub fn get_output_info(
        &self,
        amount: u64,
        amount_index: u64,
    ) -> Result<Option<OutputInfo>, StoreError> {
        let env_inner = self.env.env_inner();
        let tx_ro = env_inner.tx_ro()?;
        let outputs = env_inner.open_db_ro::<Outputs>(&tx_ro)?;
        let info = match output::get_output(&outputs, amount, amount_index) {
            Ok(info) => Some(info),
            Err(bramble_database::RuntimeError::KeyNotFound) => None,
            Err(e) => return Err(e.into()),
        };
        drop(outputs);
        TxRo::commit(tx_ro)?;
        Ok(info)
    }

    /// Sample ring-decoy candidates: up to `outs_count` uniformly random
    /// outputs per requested amount, without replacement.
    ///
    /// Unlock-time filtering is consensus policy and is left to the
    /// caller.
    ///
    /// # Errors
    /// [`StoreError::MalformedBlob`] on stored-blob corruption.
    pub fn get_random_outs_for_amounts(
        &self,
        request: &RandomOutsRequest,
    ) -> Result<Vec<RandomAmountOuts>, StoreError> {
        let env_inner = self.env.env_inner();
        let tx_ro = env_inner.tx_ro()?;
        let num_outputs = env_inner.open_db_ro::<NumOutputs>(&tx_ro)?;
        let outputs = env_inner.open_db_ro::<Outputs>(&tx_ro)?;
        let tx_infos = env_inner.open_db_ro::<TxInfos>(&tx_ro)?;
        let tx_blobs = env_inner.open_db_ro::<TxBlobs>(&tx_ro)?;

        let mut rng = rand::thread_rng();
        let mut response = Vec::with_capacity(request.amounts.len());

        for &amount in &request.amounts {
            let total = output::num_outputs(&num_outputs, amount)?;
            let want = request.outs_count.min(total);

            let mut indices: Vec<u64> = if want == total {
                (0..total).collect()
            } else {
                // `want < total`, so the rejection loop terminates fast.
                let mut picked = HashSet::with_capacity(usize::try_from(want).unwrap_or(0));
                while (picked.len() as u64) < want {
                    picked.insert(rng.gen_range(0..total));
                }
                picked.into_iter().collect()
            };
            indices.sort_unstable();

            let mut outs = Vec::with_capacity(indices.len());
            for global_index in indices {
                let info = output::get_output(&outputs, amount, global_index)?;
                let tx =
                    tx_ops::get_transaction(&tx_infos, &tx_blobs, &Hash(info.tx_hash))?;
                let local = usize::try_from(info.local_index).unwrap_or(usize::MAX);
                let Some(TxOutTarget::ToKey { key, .. }) =
                    tx.prefix.vout.get(local).map(|out| &out.target)
                else {
                    return Err(StoreError::UnsupportedOutput);
                };
                outs.push(RandomOut {
                    global_index,
                    key: *key,
                });
            }
            response.push(RandomAmountOuts { amount, outs });
        }
        drop(num_outputs);
        drop(outputs);
        drop(tx_infos);
        drop(tx_blobs);
        TxRo::commit(tx_ro)?;
        Ok(response)
    }

    /// Look up an alias registration by name.
    ///
    /// # Errors
    /// Database errors.
    pub fn get_alias(&self, name: &str) -> Result<Option<AliasRecord>, StoreError> {
        let env_inner = self.env.env_inner();
        let tx_ro = env_inner.tx_ro()?;
        let aliases = env_inner.open_db_ro::<Aliases>(&tx_ro)?;
        let record = alias::get_alias(&aliases, name)?;
        drop(aliases);
        TxRo::commit(tx_ro)?;
        Ok(record)
    }

    //------------------------------------------------ Scratchpad reads
    /// Current scratchpad length, in entries.
    pub fn scratchpad_len(&self) -> u64 {
        self.mirror
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// A copy of the scratchpad entries.
    pub fn get_scratchpad(&self) -> Vec<Hash> {
        self.mirror
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries()
            .to_vec()
    }

    //------------------------------------------------ Statistics
    /// A snapshot of the write-path statistics.
    pub fn stats(&self) -> Stats {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stats
            .clone()
    }

    /// Zero the statistics counters.
    pub fn reset_stats(&self) {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stats = Stats::default();
    }

    /// Log the statistics counters at `info` level.
    pub fn log_stats(&self) {
        let stats = self.stats();
        tracing::info!(
            num_calls = stats.num_calls,
            block_hash_ms = stats.block_hash.as_millis() as u64,
            add_transaction_ms = stats.add_transaction.as_millis() as u64,
            add_block_ms = stats.add_block.as_millis() as u64,
            commit_ms = stats.commit.as_millis() as u64,
            "blockchain store statistics"
        );
    }
}

impl Drop for Blockchain {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Acquire) {
            if let Err(e) = self.close() {
                tracing::warn!(error = %e, "error while closing blockchain store on drop");
            }
        }
    }
}
