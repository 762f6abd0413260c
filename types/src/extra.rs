//! Parsing and building of the transaction `extra` field.
//!
//! `extra` is a byte string of tagged entries. The storage engine needs two
//! of them: the one-time tx pubkey (mixed into the mining scratchpad) and
//! the alias registration some coinbases carry.

use crate::{
    codec::{self, ByteReader, MalformedBlob},
    hash::{PublicKey, Signature},
};

/// Entry tags inside `extra`.
mod entry_tags {
    /// Zero padding, running to the end of `extra`.
    pub const PADDING: u8 = 0x00;
    /// One-time tx pubkey, 32 bytes.
    pub const PUBKEY: u8 = 0x01;
    /// Free-form nonce: 1-byte length then payload.
    pub const NONCE: u8 = 0x02;
    /// Alias registration.
    pub const ALIAS: u8 = 0x04;
}

/// A standard address: spend and view public keys.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccountAddress {
    /// The spend key.
    pub spend_public_key: PublicKey,
    /// The view key.
    pub view_public_key: PublicKey,
}

/// An alias registration carried in a coinbase `extra`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AliasRecord {
    /// The human-readable name being claimed.
    pub name: String,
    /// The address the name resolves to.
    pub address: AccountAddress,
    /// Optional proof of ownership over the name.
    pub signature: Option<Signature>,
}

impl AliasRecord {
    /// Append the record body (without the entry tag) to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        codec::write_bytes(self.name.as_bytes(), out);
        out.extend_from_slice(self.address.spend_public_key.as_bytes());
        out.extend_from_slice(self.address.view_public_key.as_bytes());
        match &self.signature {
            Some(sig) => {
                out.push(1);
                out.extend_from_slice(&sig.0);
            }
            None => out.push(0),
        }
    }

    /// Read a record body.
    ///
    /// # Errors
    /// Fails on truncation, non-UTF-8 names, or a bad signature marker.
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self, MalformedBlob> {
        let name_err = r.malformed("alias name is not UTF-8");
        let name_len = r.read_length()?;
        let name = std::str::from_utf8(r.read_bytes(name_len)?)
            .map_err(|_| name_err)?
            .to_string();
        let address = AccountAddress {
            spend_public_key: PublicKey(r.read_array()?),
            view_public_key: PublicKey(r.read_array()?),
        };
        let marker_err = r.malformed("bad alias signature marker");
        let signature = match r.read_u8()? {
            0 => None,
            1 => Some(Signature(r.read_array()?)),
            _ => return Err(marker_err),
        };
        Ok(Self {
            name,
            address,
            signature,
        })
    }
}

/// Everything the storage engine extracts from an `extra` field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtraInfo {
    /// The one-time tx pubkey, if present.
    pub tx_pubkey: Option<PublicKey>,
    /// The nonce payload, if present.
    pub nonce: Vec<u8>,
    /// The alias registration, if present.
    pub alias: Option<AliasRecord>,
}

/// Parse a complete `extra` field.
///
/// The first occurrence of an entry kind wins; later duplicates are
/// consumed but ignored.
///
/// # Errors
/// Fails on an unknown entry tag, truncation, or non-zero padding.
pub fn parse_extra(extra: &[u8]) -> Result<ExtraInfo, MalformedBlob> {
    let mut r = ByteReader::new(extra);
    let mut info = ExtraInfo::default();

    while r.remaining() != 0 {
        let tag_err = r.malformed("unknown extra entry tag");
        match r.read_u8()? {
            entry_tags::PADDING => {
                let padding_err = r.malformed("non-zero extra padding");
                if r.read_bytes(r.remaining())?.iter().any(|b| *b != 0) {
                    return Err(padding_err);
                }
            }
            entry_tags::PUBKEY => {
                let key = PublicKey(r.read_array()?);
                info.tx_pubkey.get_or_insert(key);
            }
            entry_tags::NONCE => {
                let len = usize::from(r.read_u8()?);
                let payload = r.read_bytes(len)?;
                if info.nonce.is_empty() {
                    info.nonce = payload.to_vec();
                }
            }
            entry_tags::ALIAS => {
                let alias = AliasRecord::read(&mut r)?;
                info.alias.get_or_insert(alias);
            }
            _ => return Err(tag_err),
        }
    }
    Ok(info)
}

/// Extract the one-time tx pubkey, failing when absent or unparseable.
///
/// The scratchpad append requires this key; a coinbase without one is
/// malformed as far as the storage engine is concerned.
///
/// # Errors
/// Fails if `extra` doesn't parse or carries no pubkey entry.
pub fn tx_pubkey(extra: &[u8]) -> Result<PublicKey, MalformedBlob> {
    parse_extra(extra)?.tx_pubkey.ok_or(MalformedBlob {
        offset: extra.len(),
        reason: "extra carries no one-time tx pubkey",
    })
}

/// Append a pubkey entry to an `extra` field under construction.
pub fn write_tx_pubkey(pubkey: &PublicKey, out: &mut Vec<u8>) {
    out.push(entry_tags::PUBKEY);
    out.extend_from_slice(pubkey.as_bytes());
}

/// Append a nonce entry. Payloads longer than 255 bytes are truncated.
pub fn write_nonce(payload: &[u8], out: &mut Vec<u8>) {
    let len = payload.len().min(usize::from(u8::MAX));
    out.push(entry_tags::NONCE);
    #[allow(clippy::cast_possible_truncation)] // clamped above
    out.push(len as u8);
    out.extend_from_slice(&payload[..len]);
}

/// Append an alias entry.
pub fn write_alias(alias: &AliasRecord, out: &mut Vec<u8>) {
    out.push(entry_tags::ALIAS);
    alias.write(out);
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample_alias() -> AliasRecord {
        AliasRecord {
            name: "miner-one".to_string(),
            address: AccountAddress {
                spend_public_key: PublicKey([1; 32]),
                view_public_key: PublicKey([2; 32]),
            },
            signature: Some(Signature([3; 64])),
        }
    }

    #[test]
    fn parses_pubkey_nonce_and_alias() {
        let mut extra = Vec::new();
        write_tx_pubkey(&PublicKey([9; 32]), &mut extra);
        write_nonce(b"hello", &mut extra);
        write_alias(&sample_alias(), &mut extra);
        extra.extend_from_slice(&[0x00, 0, 0, 0]); // trailing padding

        let info = parse_extra(&extra).unwrap();
        assert_eq!(info.tx_pubkey, Some(PublicKey([9; 32])));
        assert_eq!(info.nonce, b"hello");
        assert_eq!(info.alias, Some(sample_alias()));
    }

    #[test]
    fn alias_without_signature_roundtrips() {
        let alias = AliasRecord {
            signature: None,
            ..sample_alias()
        };
        let mut extra = Vec::new();
        write_alias(&alias, &mut extra);
        assert_eq!(parse_extra(&extra).unwrap().alias, Some(alias));
    }

    #[test]
    fn missing_pubkey_is_an_error() {
        assert_eq!(
            tx_pubkey(&[]).unwrap_err().reason,
            "extra carries no one-time tx pubkey",
        );

        let mut extra = Vec::new();
        write_tx_pubkey(&PublicKey([7; 32]), &mut extra);
        assert_eq!(tx_pubkey(&extra).unwrap(), PublicKey([7; 32]));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            parse_extra(&[0x33]).unwrap_err().reason,
            "unknown extra entry tag",
        );
        assert_eq!(
            parse_extra(&[0x00, 0, 1]).unwrap_err().reason,
            "non-zero extra padding",
        );
        // Truncated pubkey.
        assert_eq!(
            parse_extra(&[0x01, 1, 2]).unwrap_err().reason,
            "unexpected end of blob",
        );
    }
}
