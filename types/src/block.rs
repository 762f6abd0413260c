//! Blocks and block headers.

use crate::{
    codec::{self, ByteReader, MalformedBlob},
    constants::BLOCK_MAJOR_VERSION_MAX,
    hash::{cn_fast_hash, tree_hash, Hash},
    transaction::Transaction,
};

/// A block header.
///
/// Wire order differs from declaration order; see [`BlockHeader::write`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockHeader {
    /// Hard-fork version, bounded by [`BLOCK_MAJOR_VERSION_MAX`].
    pub major_version: u8,
    /// Soft version signal.
    pub minor_version: u8,
    /// Claimed creation time, UNIX seconds.
    pub timestamp: u64,
    /// Identity of the previous block.
    pub prev_id: Hash,
    /// Proof-of-work nonce.
    pub nonce: u64,
    /// Feature flags.
    pub flags: u8,
}

impl BlockHeader {
    /// Append the wire encoding to `out`.
    ///
    /// Wire order: `major_version` (raw), `nonce` (8 bytes LE), `prev_id`,
    /// `minor_version` (var-int), `timestamp` (var-int), `flags` (raw).
    pub fn write(&self, out: &mut Vec<u8>) {
        out.push(self.major_version);
        out.extend_from_slice(&self.nonce.to_le_bytes());
        out.extend_from_slice(self.prev_id.as_bytes());
        codec::write_varint(u64::from(self.minor_version), out);
        codec::write_varint(self.timestamp, out);
        out.push(self.flags);
    }

    /// Read a header.
    ///
    /// # Errors
    /// Fails on truncation or a `major_version` beyond the compiled maximum.
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self, MalformedBlob> {
        let version_err = r.malformed("block major version exceeds supported maximum");
        let major_version = r.read_u8()?;
        if major_version > BLOCK_MAJOR_VERSION_MAX {
            return Err(version_err);
        }
        let nonce = r.read_u64_le()?;
        let prev_id = Hash(r.read_array()?);

        let minor_err = r.malformed("block minor version exceeds one byte");
        let minor_version = u8::try_from(r.read_varint()?).map_err(|_| minor_err)?;
        let timestamp = r.read_varint()?;
        let flags = r.read_u8()?;

        Ok(Self {
            major_version,
            minor_version,
            timestamp,
            prev_id,
            nonce,
            flags,
        })
    }
}

/// A block: header, miner transaction and the hashes of the payload
/// transactions in payload order.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    /// The header.
    pub header: BlockHeader,
    /// The coinbase transaction.
    pub miner_tx: Transaction,
    /// Hashes of the payload transactions, in order.
    pub tx_hashes: Vec<Hash>,
}

impl Block {
    /// Append the wire encoding to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        self.header.write(out);
        self.miner_tx.write(out);
        codec::write_varint(self.tx_hashes.len() as u64, out);
        for hash in &self.tx_hashes {
            out.extend_from_slice(hash.as_bytes());
        }
    }

    /// Encode to a fresh blob.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write(&mut out);
        out
    }

    /// Read a block.
    ///
    /// # Errors
    /// Fails on any malformed field.
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self, MalformedBlob> {
        let header = BlockHeader::read(r)?;
        let miner_tx = Transaction::read(r)?;
        let hash_count = r.read_length()?;
        let mut tx_hashes = Vec::with_capacity(hash_count);
        for _ in 0..hash_count {
            tx_hashes.push(Hash(r.read_array()?));
        }
        Ok(Self {
            header,
            miner_tx,
            tx_hashes,
        })
    }

    /// Decode a block from a complete blob. Trailing bytes are an error.
    ///
    /// # Errors
    /// Fails on any malformed field or trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MalformedBlob> {
        let mut r = ByteReader::new(bytes);
        let block = Self::read(&mut r)?;
        r.finish()?;
        Ok(block)
    }

    /// The tree hash over the miner transaction hash and `tx_hashes`.
    pub fn tree_hash(&self) -> Hash {
        let mut hashes = Vec::with_capacity(1 + self.tx_hashes.len());
        hashes.push(self.miner_tx.hash());
        hashes.extend_from_slice(&self.tx_hashes);
        tree_hash(&hashes)
    }

    /// The block identity: hash of the header bytes, the tree hash and the
    /// transaction count (miner transaction included).
    pub fn hash(&self) -> Hash {
        let mut blob = Vec::new();
        self.header.write(&mut blob);
        blob.extend_from_slice(self.tree_hash().as_bytes());
        codec::write_varint(1 + self.tx_hashes.len() as u64, &mut blob);
        cn_fast_hash(&blob)
    }

    /// The height this block claims, read from the coinbase input.
    ///
    /// `None` when the miner transaction is not a well-formed coinbase.
    pub fn height(&self) -> Option<u64> {
        match self.miner_tx.prefix.vin.as_slice() {
            [crate::transaction::TxIn::Gen { height }] => Some(*height),
            _ => None,
        }
    }
}
