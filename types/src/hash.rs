//! Fixed-width crypto newtypes and the hash functions built on them.

use std::fmt;

use tiny_keccak::{Hasher as _, Keccak};

/// Generate a 32-byte POD newtype: ordering and equality are bytewise.
macro_rules! pod_32 {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// The all-zero value.
            pub const ZERO: Self = Self([0; 32]);

            /// View as raw bytes.
            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }
    };
}

pod_32! {
    /// A 32-byte hash.
    Hash
}

pod_32! {
    /// A key image: the unique mark left by spending an output.
    ///
    /// Globally unique across the chain; a second occurrence is a
    /// double-spend.
    KeyImage
}

pod_32! {
    /// An Ed25519 point in compressed form. Opaque to the storage stack.
    PublicKey
}

impl Hash {
    /// XOR two hashes together.
    #[must_use]
    pub fn xor(&self, other: &Self) -> Self {
        let mut out = [0; 32];
        for (out, (a, b)) in out.iter_mut().zip(self.0.iter().zip(other.0.iter())) {
            *out = a ^ b;
        }
        Self(out)
    }

    /// The first 8 bytes interpreted as a little-endian `u64`.
    ///
    /// Used by the scratchpad patch rule to derive a pseudo-random index
    /// from an entry.
    pub fn prefix_u64_le(&self) -> u64 {
        let mut prefix = [0; 8];
        prefix.copy_from_slice(&self.0[..8]);
        u64::from_le_bytes(prefix)
    }
}

/// A 64-byte ring signature element.
///
/// Not `Copy`: signatures only move through the codec in bulk.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Signature(#[cfg_attr(feature = "serde", serde(with = "serde_bytes64"))] pub [u8; 64]);

impl Signature {
    /// The all-zero signature.
    pub const ZERO: Self = Self([0; 64]);
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

#[cfg(feature = "serde")]
mod serde_bytes64 {
    //! `[u8; 64]` doesn't implement serde's traits directly.
    use serde::{Deserialize as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 64], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 64], D::Error> {
        let v = Vec::<u8>::deserialize(d)?;
        <[u8; 64]>::try_from(v.as_slice()).map_err(serde::de::Error::custom)
    }
}

/// Keccak-256 with the legacy (pre-NIST) padding, over arbitrary bytes.
///
/// This is the hash every identity in the data model is built from.
pub fn cn_fast_hash(bytes: &[u8]) -> Hash {
    let mut keccak = Keccak::v256();
    keccak.update(bytes);
    let mut out = [0; 32];
    keccak.finalize(&mut out);
    Hash(out)
}

/// Hash the concatenation of two hashes.
fn hash_pair(a: &Hash, b: &Hash) -> Hash {
    let mut buf = [0; 64];
    buf[..32].copy_from_slice(&a.0);
    buf[32..].copy_from_slice(&b.0);
    cn_fast_hash(&buf)
}

/// The binary tree hash over a list of hashes.
///
/// Leaves are paired from the right so that the tree stays left-complete:
/// with `n` leaves and `c` the largest power of two strictly below `n`, the
/// last `2 * (n - c)` leaves are combined pairwise first, reducing the list
/// to exactly `c` nodes, which then fold level by level.
///
/// The caller guarantees a non-empty list (a block always contributes at
/// least its miner transaction hash); an empty list yields the zero hash.
pub fn tree_hash(hashes: &[Hash]) -> Hash {
    match hashes {
        [] => Hash::ZERO,
        [single] => *single,
        [a, b] => hash_pair(a, b),
        _ => {
            let count = hashes.len();
            let mut cnt = 1;
            while cnt * 2 < count {
                cnt *= 2;
            }

            let mut ints = hashes[..2 * cnt - count].to_vec();
            let mut i = 2 * cnt - count;
            while ints.len() < cnt {
                ints.push(hash_pair(&hashes[i], &hashes[i + 1]));
                i += 2;
            }

            while cnt > 2 {
                cnt /= 2;
                for j in 0..cnt {
                    let (a, b) = (ints[2 * j], ints[2 * j + 1]);
                    ints[j] = hash_pair(&a, &b);
                }
            }
            hash_pair(&ints[0], &ints[1])
        }
    }
}

#[cfg(test)]
mod test {
    use hex_literal::hex;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn keccak256_known_answers() {
        // Legacy Keccak, not SHA3: these vectors differ from FIPS-202.
        assert_eq!(
            cn_fast_hash(b"").0,
            hex!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"),
        );
        assert_eq!(
            cn_fast_hash(b"abc").0,
            hex!("4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45"),
        );
    }

    #[test]
    fn xor_is_its_own_inverse() {
        let a = cn_fast_hash(b"a");
        let b = cn_fast_hash(b"b");
        assert_eq!(a.xor(&b).xor(&b), a);
        assert_eq!(a.xor(&Hash::ZERO), a);
    }

    #[test]
    fn prefix_is_little_endian() {
        let mut bytes = [0; 32];
        bytes[0] = 0x01;
        bytes[1] = 0x02;
        assert_eq!(Hash(bytes).prefix_u64_le(), 0x0201);
    }

    fn leaves(n: usize) -> Vec<Hash> {
        (0..n)
            .map(|i| cn_fast_hash(&u64::try_from(i).unwrap().to_le_bytes()))
            .collect()
    }

    #[test]
    fn tree_hash_small_shapes() {
        let l = leaves(5);

        // One leaf is its own root.
        assert_eq!(tree_hash(&l[..1]), l[0]);

        // Two leaves hash directly.
        let mut buf = Vec::new();
        buf.extend_from_slice(&l[0].0);
        buf.extend_from_slice(&l[1].0);
        assert_eq!(tree_hash(&l[..2]), cn_fast_hash(&buf));

        // Three leaves: the last two pair up first.
        assert_eq!(
            tree_hash(&l[..3]),
            hash_pair(&l[0], &hash_pair(&l[1], &l[2])),
        );

        // Four leaves: a perfect tree.
        assert_eq!(
            tree_hash(&l[..4]),
            hash_pair(&hash_pair(&l[0], &l[1]), &hash_pair(&l[2], &l[3])),
        );

        // Five leaves: three left leaves stay, the last two pair up.
        assert_eq!(
            tree_hash(&l[..5]),
            hash_pair(
                &hash_pair(&l[0], &l[1]),
                &hash_pair(&l[2], &hash_pair(&l[3], &l[4])),
            ),
        );
    }
}
