//! The bootstrap stream: bulk block export/import.
//!
//! A self-describing file format for moving whole chains between nodes
//! without the network: a [`FileInfo`] prefix, a header containing
//! [`BlocksInfo`], then one [`BlockPackage`] record per block. Import
//! replays records through [`Blockchain::add_block`]; export streams the
//! store.

//---------------------------------------------------------------------------------------------------- Import
use std::{
    io::Write,
    path::Path,
    sync::PoisonError,
};

use bramble_types::{
    codec::{self, ByteReader, MalformedBlob},
    Block, Transaction,
};

use crate::{
    constants::{BOOTSTRAP_MAJOR_VERSION, BOOTSTRAP_MINOR_VERSION},
    error::StoreError,
    store::Blockchain,
};

//---------------------------------------------------------------------------------------------------- Records
/// The stream prefix: format version and the byte length of the header
/// that follows.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    /// Format major version; readers reject higher majors.
    pub major_version: u8,
    /// Format minor version.
    pub minor_version: u8,
    /// Byte length of the header region after this prefix.
    pub header_size: u64,
}

impl FileInfo {
    /// Append the wire encoding to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.push(self.major_version);
        out.push(self.minor_version);
        codec::write_varint(self.header_size, out);
    }

    /// Read a prefix.
    ///
    /// # Errors
    /// Fails on truncation or an unsupported major version.
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self, MalformedBlob> {
        let version_err = r.malformed("bootstrap stream version is not supported");
        let major_version = r.read_u8()?;
        if major_version > BOOTSTRAP_MAJOR_VERSION {
            return Err(version_err);
        }
        Ok(Self {
            major_version,
            minor_version: r.read_u8()?,
            header_size: r.read_varint()?,
        })
    }
}

/// The header: which blocks the stream holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlocksInfo {
    /// Height of the first block in the stream.
    pub block_first: u64,
    /// Height of the last block in the stream.
    pub block_last: u64,
    /// Byte position of the last block's package, relative to the start
    /// of the package stream, for directly reading the last block.
    pub block_last_pos: u64,
}

impl BlocksInfo {
    /// Append the wire encoding to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        codec::write_varint(self.block_first, out);
        codec::write_varint(self.block_last, out);
        codec::write_varint(self.block_last_pos, out);
    }

    /// Read a header.
    ///
    /// # Errors
    /// Fails on truncation.
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self, MalformedBlob> {
        Ok(Self {
            block_first: r.read_varint()?,
            block_last: r.read_varint()?,
            block_last_pos: r.read_varint()?,
        })
    }
}

/// One block with everything [`Blockchain::add_block`] needs to replay it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockPackage {
    /// The block.
    pub block: Block,
    /// Its payload transactions, in `tx_hashes` order.
    pub txs: Vec<Transaction>,
    /// Serialized size accounted to the block.
    pub block_size: u64,
    /// Cumulative difficulty at this block.
    pub cumulative_difficulty: u128,
    /// Total coins emitted at this block.
    pub coins_generated: u64,
    /// Total coins donated at this block.
    pub coins_donated: u64,
    /// Scratchpad length before this block was applied.
    pub scratch_offset: u64,
}

impl BlockPackage {
    /// Append the wire encoding to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        self.block.write(out);
        codec::write_varint(self.txs.len() as u64, out);
        for tx in &self.txs {
            tx.write(out);
        }
        codec::write_varint(self.block_size, out);
        codec::write_varint_u128(self.cumulative_difficulty, out);
        codec::write_varint(self.coins_generated, out);
        codec::write_varint(self.coins_donated, out);
        codec::write_varint(self.scratch_offset, out);
    }

    /// Read one package.
    ///
    /// # Errors
    /// Fails on any malformed field.
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self, MalformedBlob> {
        let block = Block::read(r)?;
        let tx_count = r.read_length()?;
        let mut txs = Vec::with_capacity(tx_count);
        for _ in 0..tx_count {
            txs.push(Transaction::read(r)?);
        }
        Ok(Self {
            block,
            txs,
            block_size: r.read_varint()?,
            cumulative_difficulty: r.read_varint_u128()?,
            coins_generated: r.read_varint()?,
            coins_donated: r.read_varint()?,
            scratch_offset: r.read_varint()?,
        })
    }

    /// The stream records everything add_block needs; check the parts
    /// that have to agree with each other.
    fn verify(&self) -> Result<(), MalformedBlob> {
        if self.block.tx_hashes.len() != self.txs.len() {
            return Err(MalformedBlob {
                offset: 0,
                reason: "package transaction count does not match the block's hash list",
            });
        }
        for (tx, expected) in self.txs.iter().zip(&self.block.tx_hashes) {
            if &tx.hash() != expected {
                return Err(MalformedBlob {
                    offset: 0,
                    reason: "package transaction does not hash to the block's listed hash",
                });
            }
        }
        Ok(())
    }
}

//---------------------------------------------------------------------------------------------------- Export / import
impl Blockchain {
    /// Export the whole chain to a bootstrap file at `path`.
    ///
    /// Returns the number of blocks written.
    ///
    /// # Errors
    /// [`StoreError::EmptyChain`] when there is nothing to export; IO and
    /// database errors otherwise.
    pub fn export_bootstrap(&self, path: &Path) -> Result<u64, StoreError> {
        // Hold the writer lock so the exported chain is one consistent
        // snapshot.
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let height = self.height()?;
        let Some(top_height) = height.checked_sub(1) else {
            return Err(StoreError::EmptyChain);
        };

        // Packages go to a side file first; the header needs the last
        // package's position before the final file can start.
        let packages_path = path.with_extension("packages.tmp");
        let mut last_pos = 0u64;
        {
            let file = std::fs::File::create(&packages_path)?;
            let mut w = std::io::BufWriter::new(file);
            let mut pos = 0u64;
            for h in 0..height {
                let block = self.get_block_by_height(h)?;
                let info = self.get_block_info(h)?;
                let mut txs = Vec::with_capacity(block.tx_hashes.len());
                for tx_hash in &block.tx_hashes {
                    txs.push(self.get_tx(tx_hash)?);
                }

                let package = BlockPackage {
                    block,
                    txs,
                    block_size: info.block_size,
                    cumulative_difficulty: info.cumulative_difficulty(),
                    coins_generated: info.coins_generated,
                    coins_donated: info.coins_donated,
                    scratch_offset: info.scratch_offset,
                };

                let mut bytes = Vec::new();
                package.write(&mut bytes);
                last_pos = pos;
                pos += bytes.len() as u64;
                w.write_all(&bytes)?;
            }
            w.flush()?;
        }

        let result = (|| -> Result<(), StoreError> {
            let mut header = Vec::new();
            BlocksInfo {
                block_first: 0,
                block_last: top_height,
                block_last_pos: last_pos,
            }
            .write(&mut header);

            let mut prefix = Vec::new();
            FileInfo {
                major_version: BOOTSTRAP_MAJOR_VERSION,
                minor_version: BOOTSTRAP_MINOR_VERSION,
                header_size: header.len() as u64,
            }
            .write(&mut prefix);

            let file = std::fs::File::create(path)?;
            let mut w = std::io::BufWriter::new(file);
            w.write_all(&prefix)?;
            w.write_all(&header)?;
            let mut packages = std::fs::File::open(&packages_path)?;
            std::io::copy(&mut packages, &mut w)?;
            w.flush()?;
            Ok(())
        })();
        let cleanup = std::fs::remove_file(&packages_path);
        result?;
        cleanup?;

        tracing::info!(blocks = height, path = %path.display(), "exported bootstrap stream");
        Ok(height)
    }

    /// Import a bootstrap file, replaying each package through
    /// [`Blockchain::add_block`].
    ///
    /// The stream must continue the current chain: its `block_first` must
    /// equal [`Blockchain::height`]. With
    /// [`fast_sync`](crate::StoreConfig::fast_sync) enabled, packages are
    /// integrity-checked in parallel on
    /// [`prep_threads`](crate::StoreConfig::prep_threads) workers before
    /// any of them is applied.
    ///
    /// Returns the number of blocks imported. Not atomic as a whole —
    /// each block is its own transaction, and an error leaves the chain
    /// at the last successfully applied block.
    ///
    /// # Errors
    /// [`StoreError::MalformedBlob`] on a corrupt stream, plus everything
    /// [`Blockchain::add_block`] can return.
    pub fn import_bootstrap(&self, path: &Path) -> Result<u64, StoreError> {
        let bytes = std::fs::read(path)?;
        let mut r = ByteReader::new(&bytes);

        let file_info = FileInfo::read(&mut r)?;
        let header_len_err = r.malformed("bootstrap header size exceeds the file");
        let header_size = usize::try_from(file_info.header_size).map_err(|_| header_len_err)?;
        if header_size > r.remaining() {
            return Err(header_len_err.into());
        }
        // The header region may grow in future minors; parse the known
        // part and skip the rest.
        let header_bytes = r.read_bytes(header_size)?;
        let blocks_info = BlocksInfo::read(&mut ByteReader::new(header_bytes))?;

        if blocks_info.block_first != self.height()? {
            return Err(MalformedBlob {
                offset: 0,
                reason: "bootstrap stream does not continue the chain",
            }
            .into());
        }

        let mut packages = Vec::new();
        while r.remaining() != 0 {
            packages.push(BlockPackage::read(&mut r)?);
        }

        if self.config().fast_sync {
            self.verify_packages_parallel(&packages)?;
        }

        let count = packages.len() as u64;
        for package in packages {
            self.add_block(
                package.block,
                package.txs,
                package.block_size,
                package.cumulative_difficulty,
                package.coins_generated,
                package.coins_donated,
                package.scratch_offset,
            )?;
        }

        tracing::info!(blocks = count, path = %path.display(), "imported bootstrap stream");
        Ok(count)
    }

    /// Chunked parallel pre-pass over the decoded packages.
    fn verify_packages_parallel(&self, packages: &[BlockPackage]) -> Result<(), StoreError> {
        let workers = usize::try_from(self.config().prep_threads.max(1)).unwrap_or(1);
        let chunk_size = packages.len().div_ceil(workers).max(1);

        std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for chunk in packages.chunks(chunk_size) {
                handles.push(scope.spawn(move || {
                    chunk.iter().try_for_each(BlockPackage::verify)
                }));
            }
            for handle in handles {
                match handle.join() {
                    Ok(result) => result?,
                    Err(_) => {
                        return Err(MalformedBlob {
                            offset: 0,
                            reason: "bootstrap verification worker failed",
                        })
                    }
                }
            }
            Ok(())
        })
        .map_err(StoreError::from)
    }
}
