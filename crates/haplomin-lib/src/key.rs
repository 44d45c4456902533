//! Fixed-width binary keys and the codecs that produce them
//!
//! A [`Key`] packs a short sequence into a `u64`, first base in the highest
//! used bits. Two independent codecs exist:
//!
//! - [`Direct`]: the four-letter nucleotide alphabet, 2 bits per base.
//! - [`Rymer`]: the reduced purine/pyrimidine alphabet, 1 bit per base.
//!
//! The construction pipeline is generic over [`KeyCodec`]; the two schemes
//! differ only in how bases are packed and in the pre-transform applied to
//! sequences before selection. Keys produced by one codec must never be
//! compared against keys of the other.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::constants::{MAX_DIRECT_K, MAX_RYMER_K, NO_KEY};
use crate::encoding::{
    complement_base, complement_rymer_base, decode_base, decode_rymer_base, encode_base,
    encode_rymer_base, to_rymer_space, EncodingError,
};
use crate::error::BuildError;

/// A packed sequence key
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(u64);

impl Key {
    /// Key of an empty candidate
    pub const NO_KEY: Key = Key(NO_KEY);

    /// Wrap a raw packed value
    #[inline]
    pub const fn from_raw(value: u64) -> Self {
        Key(value)
    }

    /// The raw packed value
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this is the empty-candidate sentinel
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == NO_KEY
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// The encoding scheme of a key, selected at construction time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Nucleotide k-mers
    Direct,
    /// Reduced-alphabet rymers
    Rymer,
}

impl Scheme {
    /// Maximum key length supported by the scheme
    pub const fn max_k(self) -> usize {
        match self {
            Scheme::Direct => Direct::MAX_K,
            Scheme::Rymer => Rymer::MAX_K,
        }
    }

    /// What the indexed units are called in reports
    pub const fn unit_name(self) -> &'static str {
        match self {
            Scheme::Direct => "minimizers",
            Scheme::Rymer => "rymers",
        }
    }

    /// Tag used in the serialized header
    pub const fn tag(self) -> u8 {
        match self {
            Scheme::Direct => 0,
            Scheme::Rymer => 1,
        }
    }

    /// Inverse of [`Scheme::tag`]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Scheme::Direct),
            1 => Some(Scheme::Rymer),
            _ => None,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Direct => f.write_str("direct"),
            Scheme::Rymer => f.write_str("rymer"),
        }
    }
}

impl FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" | "kmer" | "minimizer" => Ok(Scheme::Direct),
            "rymer" | "ry" => Ok(Scheme::Rymer),
            other => Err(format!("unknown key scheme '{}'", other)),
        }
    }
}

/// Packing strategy for one key scheme
///
/// Implementors only describe single bases; encoding, decoding and the
/// round-trip check are provided.
pub trait KeyCodec: Copy + Send + Sync + 'static {
    /// Scheme implemented by this codec
    const SCHEME: Scheme;

    /// Bits used per packed base
    const BITS_PER_BASE: usize;

    /// Longest sequence a key can hold
    const MAX_K: usize;

    /// Pack one base, or `None` if it is outside the alphabet
    fn pack_base(base: u8) -> Option<u64>;

    /// Unpack one base (only the low `BITS_PER_BASE` bits are used)
    fn unpack_base(bits: u64) -> u8;

    /// Complement of a packed base
    fn complement(bits: u64) -> u64;

    /// Alphabet transform applied to raw sequences before selection
    fn reduce(sequence: &[u8]) -> Cow<'_, [u8]>;

    /// Mask selecting the bits of a single base
    #[inline]
    fn base_mask() -> u64 {
        (1u64 << Self::BITS_PER_BASE) - 1
    }

    /// Mask selecting the bits of a key of length `k`
    #[inline]
    fn key_mask(k: usize) -> u64 {
        let bits = Self::BITS_PER_BASE * k;
        if bits >= 64 {
            u64::MAX
        } else {
            (1u64 << bits) - 1
        }
    }

    /// Encode a sequence over the codec's alphabet
    ///
    /// # Errors
    /// Returns an error if the sequence is too long or contains a base
    /// outside the alphabet.
    fn encode(sequence: &[u8]) -> Result<Key, EncodingError> {
        if sequence.len() > Self::MAX_K {
            return Err(EncodingError::TooLong { length: sequence.len(), max: Self::MAX_K });
        }
        let mut value = 0u64;
        for (position, &base) in sequence.iter().enumerate() {
            let bits = Self::pack_base(base).ok_or(EncodingError::InvalidBase { base, position })?;
            value = (value << Self::BITS_PER_BASE) | bits;
        }
        Ok(Key(value))
    }

    /// Decode the last `k` bases stored in a key
    fn decode(key: Key, k: usize) -> String {
        let mut result = String::with_capacity(k);
        for i in (0..k).rev() {
            let shift = (i * Self::BITS_PER_BASE) as u32;
            let bits = key.0.checked_shr(shift).unwrap_or(0) & Self::base_mask();
            result.push(Self::unpack_base(bits) as char);
        }
        result
    }

    /// Check that decoding `key` with length `k` and re-encoding the result
    /// reproduces the key
    ///
    /// Returns the decoded sequence on success. A mismatch means the decode
    /// length disagrees with the length the key was built with, or the codec
    /// is broken; either way every key produced so far is suspect.
    fn verify_round_trip(key: Key, k: usize) -> Result<String, BuildError> {
        let decoded = Self::decode(key, k);
        let reencoded = Self::encode(decoded.as_bytes())?;
        if reencoded != key {
            return Err(BuildError::RoundTripMismatch {
                scheme: Self::SCHEME,
                k,
                decoded,
                original: key.0,
                reencoded: reencoded.0,
            });
        }
        Ok(decoded)
    }
}

/// Nucleotide codec, 2 bits per base
#[derive(Clone, Copy, Debug, Default)]
pub struct Direct;

impl KeyCodec for Direct {
    const SCHEME: Scheme = Scheme::Direct;
    const BITS_PER_BASE: usize = 2;
    const MAX_K: usize = MAX_DIRECT_K;

    #[inline]
    fn pack_base(base: u8) -> Option<u64> {
        encode_base(base).map(u64::from)
    }

    #[inline]
    fn unpack_base(bits: u64) -> u8 {
        decode_base(bits as u8)
    }

    #[inline]
    fn complement(bits: u64) -> u64 {
        u64::from(complement_base(bits as u8))
    }

    fn reduce(sequence: &[u8]) -> Cow<'_, [u8]> {
        Cow::Borrowed(sequence)
    }
}

/// Purine/pyrimidine codec, 1 bit per base
#[derive(Clone, Copy, Debug, Default)]
pub struct Rymer;

impl KeyCodec for Rymer {
    const SCHEME: Scheme = Scheme::Rymer;
    const BITS_PER_BASE: usize = 1;
    const MAX_K: usize = MAX_RYMER_K;

    #[inline]
    fn pack_base(base: u8) -> Option<u64> {
        encode_rymer_base(base).map(u64::from)
    }

    #[inline]
    fn unpack_base(bits: u64) -> u8 {
        decode_rymer_base(bits as u8)
    }

    #[inline]
    fn complement(bits: u64) -> u64 {
        u64::from(complement_rymer_base(bits as u8))
    }

    fn reduce(sequence: &[u8]) -> Cow<'_, [u8]> {
        Cow::Owned(to_rymer_space(sequence))
    }
}

/// Run a block with `C` bound to the codec type of a [`Scheme`]
///
/// ```
/// use haplomin_lib::key::{KeyCodec, Scheme};
///
/// let scheme = Scheme::Rymer;
/// let bits = haplomin_lib::dispatch_on_scheme!(scheme, C => C::BITS_PER_BASE);
/// assert_eq!(bits, 1);
/// ```
#[macro_export]
macro_rules! dispatch_on_scheme {
    ($scheme:expr, $codec:ident => $body:expr) => {
        match $scheme {
            $crate::key::Scheme::Direct => {
                type $codec = $crate::key::Direct;
                $body
            }
            $crate::key::Scheme::Rymer => {
                type $codec = $crate::key::Rymer;
                $body
            }
        }
    };
}
