//! Transactions and their input/output sum types.

use crate::{
    codec::{self, tags, ByteReader, MalformedBlob},
    constants::TRANSACTION_VERSION_MAX,
    hash::{cn_fast_hash, Hash, KeyImage, PublicKey, Signature},
};

/// A transaction input.
///
/// A closed sum type with one-byte wire tags (see [`tags`]). The script
/// variants are carried for forward compatibility; the storage engine
/// refuses to index them.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TxIn {
    /// Coinbase input, allowed only as the sole input of a miner
    /// transaction. `height` is the height the block claims.
    Gen {
        /// Claimed block height.
        height: u64,
    },
    /// Script input (forward compatibility).
    ToScript {
        /// Previous transaction hash.
        prev: Hash,
        /// Output index inside `prev`.
        prevout: u64,
        /// Raw satisfaction data.
        sigset: Vec<u8>,
    },
    /// Script-hash input (forward compatibility).
    ToScriptHash {
        /// Previous transaction hash.
        prev: Hash,
        /// Output index inside `prev`.
        prevout: u64,
        /// Keys of the revealed script.
        keys: Vec<PublicKey>,
        /// Body of the revealed script.
        script: Vec<u8>,
        /// Raw satisfaction data.
        sigset: Vec<u8>,
    },
    /// Spend of a one-time-key output via a ring.
    ToKey {
        /// Amount being spent.
        amount: u64,
        /// Per-amount global output indices of the ring members.
        key_offsets: Vec<u64>,
        /// The spend's unique mark.
        key_image: KeyImage,
    },
}

impl TxIn {
    /// Number of signatures this input demands: its ring size.
    pub fn ring_size(&self) -> usize {
        match self {
            Self::ToKey { key_offsets, .. } => key_offsets.len(),
            Self::Gen { .. } | Self::ToScript { .. } | Self::ToScriptHash { .. } => 0,
        }
    }

    /// Append the tagged wire encoding to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        match self {
            Self::Gen { height } => {
                out.push(tags::TXIN_GEN);
                codec::write_varint(*height, out);
            }
            Self::ToScript {
                prev,
                prevout,
                sigset,
            } => {
                out.push(tags::TXIN_TO_SCRIPT);
                out.extend_from_slice(prev.as_bytes());
                codec::write_varint(*prevout, out);
                codec::write_bytes(sigset, out);
            }
            Self::ToScriptHash {
                prev,
                prevout,
                keys,
                script,
                sigset,
            } => {
                out.push(tags::TXIN_TO_SCRIPTHASH);
                out.extend_from_slice(prev.as_bytes());
                codec::write_varint(*prevout, out);
                codec::write_varint(keys.len() as u64, out);
                for key in keys {
                    out.extend_from_slice(key.as_bytes());
                }
                codec::write_bytes(script, out);
                codec::write_bytes(sigset, out);
            }
            Self::ToKey {
                amount,
                key_offsets,
                key_image,
            } => {
                out.push(tags::TXIN_TO_KEY);
                codec::write_varint(*amount, out);
                codec::write_varint(key_offsets.len() as u64, out);
                for offset in key_offsets {
                    codec::write_varint(*offset, out);
                }
                out.extend_from_slice(key_image.as_bytes());
            }
        }
    }

    /// Read a tagged input.
    ///
    /// # Errors
    /// Fails on an unknown tag or a malformed payload.
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self, MalformedBlob> {
        let tag_err = r.malformed("unknown transaction input tag");
        match r.read_u8()? {
            tags::TXIN_GEN => Ok(Self::Gen {
                height: r.read_varint()?,
            }),
            tags::TXIN_TO_SCRIPT => {
                let prev = Hash(r.read_array()?);
                let prevout = r.read_varint()?;
                let sigset_len = r.read_length()?;
                let sigset = r.read_bytes(sigset_len)?.to_vec();
                Ok(Self::ToScript {
                    prev,
                    prevout,
                    sigset,
                })
            }
            tags::TXIN_TO_SCRIPTHASH => {
                let prev = Hash(r.read_array()?);
                let prevout = r.read_varint()?;
                let key_count = r.read_length()?;
                let mut keys = Vec::with_capacity(key_count);
                for _ in 0..key_count {
                    keys.push(PublicKey(r.read_array()?));
                }
                let script_len = r.read_length()?;
                let script = r.read_bytes(script_len)?.to_vec();
                let sigset_len = r.read_length()?;
                let sigset = r.read_bytes(sigset_len)?.to_vec();
                Ok(Self::ToScriptHash {
                    prev,
                    prevout,
                    keys,
                    script,
                    sigset,
                })
            }
            tags::TXIN_TO_KEY => {
                let amount = r.read_varint()?;
                let offset_count = r.read_length()?;
                let mut key_offsets = Vec::with_capacity(offset_count);
                for _ in 0..offset_count {
                    key_offsets.push(r.read_varint()?);
                }
                Ok(Self::ToKey {
                    amount,
                    key_offsets,
                    key_image: KeyImage(r.read_array()?),
                })
            }
            _ => Err(tag_err),
        }
    }
}

/// Where a transaction output can be claimed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TxOutTarget {
    /// Script output (forward compatibility).
    ToScript {
        /// Script keys.
        keys: Vec<PublicKey>,
        /// Script body.
        script: Vec<u8>,
    },
    /// Script-hash output (forward compatibility).
    ToScriptHash(Hash),
    /// One-time-key output. On the wire this is a packed 33-byte blob.
    ToKey {
        /// The one-time public key.
        key: PublicKey,
        /// Mixin policy attribute.
        mix_attr: u8,
    },
}

/// A transaction output: an amount and its claim condition.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TxOut {
    /// Amount in atomic units.
    pub amount: u64,
    /// Claim condition.
    pub target: TxOutTarget,
}

impl TxOut {
    /// Append the wire encoding to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        codec::write_varint(self.amount, out);
        match &self.target {
            TxOutTarget::ToScript { keys, script } => {
                out.push(tags::TXOUT_TO_SCRIPT);
                codec::write_varint(keys.len() as u64, out);
                for key in keys {
                    out.extend_from_slice(key.as_bytes());
                }
                codec::write_bytes(script, out);
            }
            TxOutTarget::ToScriptHash(hash) => {
                out.push(tags::TXOUT_TO_SCRIPTHASH);
                out.extend_from_slice(hash.as_bytes());
            }
            TxOutTarget::ToKey { key, mix_attr } => {
                out.push(tags::TXOUT_TO_KEY);
                out.extend_from_slice(key.as_bytes());
                out.push(*mix_attr);
            }
        }
    }

    /// Read an output.
    ///
    /// # Errors
    /// Fails on an unknown target tag or a malformed payload.
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self, MalformedBlob> {
        let amount = r.read_varint()?;
        let tag_err = r.malformed("unknown transaction output tag");
        let target = match r.read_u8()? {
            tags::TXOUT_TO_SCRIPT => {
                let key_count = r.read_length()?;
                let mut keys = Vec::with_capacity(key_count);
                for _ in 0..key_count {
                    keys.push(PublicKey(r.read_array()?));
                }
                let script_len = r.read_length()?;
                TxOutTarget::ToScript {
                    keys,
                    script: r.read_bytes(script_len)?.to_vec(),
                }
            }
            tags::TXOUT_TO_SCRIPTHASH => TxOutTarget::ToScriptHash(Hash(r.read_array()?)),
            tags::TXOUT_TO_KEY => TxOutTarget::ToKey {
                key: PublicKey(r.read_array()?),
                mix_attr: r.read_u8()?,
            },
            _ => return Err(tag_err),
        };
        Ok(Self { amount, target })
    }
}

/// Everything in a transaction except the signatures.
///
/// The prefix hashes independently of the signatures, which is what ring
/// signatures sign.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransactionPrefix {
    /// Format version, bounded by [`TRANSACTION_VERSION_MAX`].
    pub version: u64,
    /// Block height (or timestamp) before which outputs cannot be spent.
    pub unlock_time: u64,
    /// Inputs.
    pub vin: Vec<TxIn>,
    /// Outputs.
    pub vout: Vec<TxOut>,
    /// Free-form tagged payload; see [`crate::extra`].
    pub extra: Vec<u8>,
}

impl TransactionPrefix {
    /// Append the wire encoding to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        codec::write_varint(self.version, out);
        codec::write_varint(self.unlock_time, out);
        codec::write_varint(self.vin.len() as u64, out);
        for input in &self.vin {
            input.write(out);
        }
        codec::write_varint(self.vout.len() as u64, out);
        for output in &self.vout {
            output.write(out);
        }
        codec::write_bytes(&self.extra, out);
    }

    /// Read a prefix.
    ///
    /// # Errors
    /// Fails on a malformed field or a `version` beyond the compiled maximum.
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self, MalformedBlob> {
        let version_err = r.malformed("transaction version exceeds supported maximum");
        let version = r.read_varint()?;
        if version > TRANSACTION_VERSION_MAX {
            return Err(version_err);
        }
        let unlock_time = r.read_varint()?;

        let vin_count = r.read_length()?;
        let mut vin = Vec::with_capacity(vin_count);
        for _ in 0..vin_count {
            vin.push(TxIn::read(r)?);
        }

        let vout_count = r.read_length()?;
        let mut vout = Vec::with_capacity(vout_count);
        for _ in 0..vout_count {
            vout.push(TxOut::read(r)?);
        }

        let extra_len = r.read_length()?;
        let extra = r.read_bytes(extra_len)?.to_vec();

        Ok(Self {
            version,
            unlock_time,
            vin,
            vout,
            extra,
        })
    }

    /// Hash of the prefix bytes alone.
    pub fn hash(&self) -> Hash {
        let mut bytes = Vec::new();
        self.write(&mut bytes);
        cn_fast_hash(&bytes)
    }
}

/// A full transaction: prefix plus the ragged signature matrix.
///
/// The matrix has one row per input and each row's length equals that
/// input's ring size. The matrix is *not* length-prefixed on the wire — its
/// shape is implied by `vin`, so `vin` must decode first.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transaction {
    /// The signed portion.
    pub prefix: TransactionPrefix,
    /// One signature row per input.
    pub signatures: Vec<Vec<Signature>>,
}

impl Transaction {
    /// Append the wire encoding to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        self.prefix.write(out);
        self.write_signatures(out);
    }

    fn write_signatures(&self, out: &mut Vec<u8>) {
        for row in &self.signatures {
            for sig in row {
                out.extend_from_slice(&sig.0);
            }
        }
    }

    /// Encode to a fresh blob.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write(&mut out);
        out
    }

    /// Read a transaction, signature shape driven by the decoded inputs.
    ///
    /// # Errors
    /// Fails on any malformed field.
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self, MalformedBlob> {
        let prefix = TransactionPrefix::read(r)?;
        let mut signatures = Vec::with_capacity(prefix.vin.len());
        for input in &prefix.vin {
            let mut row = Vec::with_capacity(input.ring_size());
            for _ in 0..input.ring_size() {
                row.push(Signature(r.read_array()?));
            }
            signatures.push(row);
        }
        Ok(Self { prefix, signatures })
    }

    /// Decode a transaction from a complete blob. Trailing bytes are an
    /// error.
    ///
    /// # Errors
    /// Fails on any malformed field or trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MalformedBlob> {
        let mut r = ByteReader::new(bytes);
        let tx = Self::read(&mut r)?;
        r.finish()?;
        Ok(tx)
    }

    /// The transaction identity: the hash of the prefix hash and the
    /// signature-bytes hash, concatenated.
    pub fn hash(&self) -> Hash {
        let mut sig_bytes = Vec::new();
        self.write_signatures(&mut sig_bytes);

        let mut combined = Vec::with_capacity(64);
        combined.extend_from_slice(self.prefix.hash().as_bytes());
        combined.extend_from_slice(cn_fast_hash(&sig_bytes).as_bytes());
        cn_fast_hash(&combined)
    }

    /// Hash of the prefix bytes alone.
    pub fn prefix_hash(&self) -> Hash {
        self.prefix.hash()
    }

    /// Is this a well-formed miner transaction: exactly one input, and it
    /// is the coinbase variant?
    pub fn is_coinbase(&self) -> bool {
        matches!(self.prefix.vin.as_slice(), [TxIn::Gen { .. }])
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::codec::tags;

    fn sample_to_key_tx() -> Transaction {
        Transaction {
            prefix: TransactionPrefix {
                version: 1,
                unlock_time: 42,
                vin: vec![TxIn::ToKey {
                    amount: 10_000,
                    key_offsets: vec![0, 3, 9],
                    key_image: KeyImage([7; 32]),
                }],
                vout: vec![TxOut {
                    amount: 9_000,
                    target: TxOutTarget::ToKey {
                        key: PublicKey([9; 32]),
                        mix_attr: 0,
                    },
                }],
                extra: vec![0x01; 33],
            },
            signatures: vec![vec![Signature::ZERO, Signature([1; 64]), Signature([2; 64])]],
        }
    }

    #[test]
    fn roundtrip_to_key() {
        let tx = sample_to_key_tx();
        let bytes = tx.to_bytes();
        assert_eq!(Transaction::from_bytes(&bytes).unwrap(), tx);
    }

    #[test]
    fn roundtrip_script_variants() {
        let tx = Transaction {
            prefix: TransactionPrefix {
                version: 1,
                unlock_time: 0,
                vin: vec![
                    TxIn::ToScript {
                        prev: Hash([1; 32]),
                        prevout: 4,
                        sigset: vec![0xaa, 0xbb],
                    },
                    TxIn::ToScriptHash {
                        prev: Hash([2; 32]),
                        prevout: 0,
                        keys: vec![PublicKey([3; 32])],
                        script: vec![0x51],
                        sigset: vec![],
                    },
                ],
                vout: vec![
                    TxOut {
                        amount: 5,
                        target: TxOutTarget::ToScript {
                            keys: vec![PublicKey([4; 32]), PublicKey([5; 32])],
                            script: vec![0x52, 0x53],
                        },
                    },
                    TxOut {
                        amount: 6,
                        target: TxOutTarget::ToScriptHash(Hash([6; 32])),
                    },
                ],
                extra: vec![],
            },
            signatures: vec![vec![], vec![]],
        };
        let bytes = tx.to_bytes();
        assert_eq!(Transaction::from_bytes(&bytes).unwrap(), tx);
    }

    #[test]
    fn wire_bytes_of_minimal_coinbase() {
        // version 1, unlock 0, one gen input at height 5,
        // one to_key output of amount 2, empty extra, no signatures.
        let tx = Transaction {
            prefix: TransactionPrefix {
                version: 1,
                unlock_time: 0,
                vin: vec![TxIn::Gen { height: 5 }],
                vout: vec![TxOut {
                    amount: 2,
                    target: TxOutTarget::ToKey {
                        key: PublicKey([0xee; 32]),
                        mix_attr: 1,
                    },
                }],
                extra: vec![],
            },
            signatures: vec![vec![]],
        };

        let mut expected = vec![
            1,    // version
            0,    // unlock_time
            1,    // vin length
            0xff, // txin_gen tag
            5,    // height
            1,    // vout length
            2,    // amount
            0x02, // txout_to_key tag
        ];
        expected.extend_from_slice(&[0xee; 32]); // key
        expected.push(1); // mix_attr
        expected.push(0); // extra length

        assert_eq!(tx.to_bytes(), expected);
    }

    #[test]
    fn signature_shape_is_implied_by_inputs() {
        let tx = sample_to_key_tx();
        let mut bytes = tx.to_bytes();
        // Drop the last signature byte: the matrix no longer fits.
        bytes.pop();
        let err = Transaction::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.reason, "unexpected end of blob");

        // An extra byte is also rejected.
        let mut bytes = tx.to_bytes();
        bytes.push(0);
        let err = Transaction::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.reason, "trailing bytes after value");
    }

    #[test]
    fn rejects_unknown_tags_and_versions() {
        let mut bytes = sample_to_key_tx().to_bytes();
        // vin tag position: version (1) + unlock (1) + vin len (1).
        bytes[3] = 0x77;
        assert_eq!(
            Transaction::from_bytes(&bytes).unwrap_err().reason,
            "unknown transaction input tag",
        );

        let mut bytes = sample_to_key_tx().to_bytes();
        bytes[0] = (TRANSACTION_VERSION_MAX + 1).try_into().unwrap();
        assert_eq!(
            Transaction::from_bytes(&bytes).unwrap_err().reason,
            "transaction version exceeds supported maximum",
        );
        assert_eq!(tags::TXIN_GEN, 0xff);
    }

    #[test]
    fn hash_is_stable_and_prefix_scoped() {
        let tx = sample_to_key_tx();
        assert_eq!(tx.hash(), tx.hash());

        // Changing a signature changes the tx hash but not the prefix hash.
        let mut tampered = tx.clone();
        tampered.signatures[0][0] = Signature([0xff; 64]);
        assert_ne!(tampered.hash(), tx.hash());
        assert_eq!(tampered.prefix_hash(), tx.prefix_hash());
    }

    #[test]
    fn coinbase_shape() {
        assert!(!sample_to_key_tx().is_coinbase());
        let gen = Transaction {
            prefix: TransactionPrefix {
                version: 1,
                unlock_time: 0,
                vin: vec![TxIn::Gen { height: 0 }],
                vout: vec![],
                extra: vec![],
            },
            signatures: vec![vec![]],
        };
        assert!(gen.is_coinbase());
    }
}
