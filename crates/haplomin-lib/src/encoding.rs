//! Nucleotide and rymer base encoding
//!
//! Two alphabets are packed into keys:
//!
//! Direct encoding (2 bits per base):
//! - A (65/97)  -> 00
//! - C (67/99)  -> 01
//! - G (71/103) -> 10
//! - T (84/116) -> 11
//!
//! Rymer encoding (1 bit per base), over the reduced alphabet where
//! purines collapse to `R` and pyrimidines to `Y`:
//! - R (A, G) -> 0
//! - Y (C, T) -> 1
//!
//! With these codes the complement of a base is `3 - code` (direct) and
//! `1 - code` (rymer), so a reverse complement never needs a lookup table.

use thiserror::Error;

/// Error type for encoding operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The input byte is not a valid base of the codec's alphabet
    #[error("Invalid base {base:?} at position {position}")]
    InvalidBase {
        /// Offending byte
        base: u8,
        /// Position of the byte in the input
        position: usize,
    },
    /// The input is longer than a key of this encoding can hold
    #[error("Sequence of length {length} exceeds the maximum key length {max}")]
    TooLong {
        /// Input length
        length: usize,
        /// Longest encodable sequence
        max: usize,
    },
}

/// Encode a single nucleotide to 2 bits
#[inline]
pub const fn encode_base(base: u8) -> Option<u8> {
    match base {
        b'A' | b'a' => Some(0b00),
        b'C' | b'c' => Some(0b01),
        b'G' | b'g' => Some(0b10),
        b'T' | b't' => Some(0b11),
        _ => None,
    }
}

/// Decode a 2-bit value to a nucleotide (uppercase)
#[inline]
pub const fn decode_base(bits: u8) -> u8 {
    match bits & 0b11 {
        0b00 => b'A',
        0b01 => b'C',
        0b10 => b'G',
        _ => b'T',
    }
}

/// Get the complement of an encoded nucleotide
#[inline]
pub const fn complement_base(bits: u8) -> u8 {
    // A(00) <-> T(11), C(01) <-> G(10)
    bits ^ 0b11
}

/// Encode a single rymer symbol to 1 bit
#[inline]
pub const fn encode_rymer_base(base: u8) -> Option<u8> {
    match base {
        b'R' | b'r' => Some(0),
        b'Y' | b'y' => Some(1),
        _ => None,
    }
}

/// Decode a 1-bit value to a rymer symbol
#[inline]
pub const fn decode_rymer_base(bits: u8) -> u8 {
    if bits & 1 == 0 {
        b'R'
    } else {
        b'Y'
    }
}

/// Get the complement of an encoded rymer symbol
#[inline]
pub const fn complement_rymer_base(bits: u8) -> u8 {
    // A/G pair with T/C, so R <-> Y
    bits ^ 1
}

/// Map a single byte into rymer space
///
/// Purines become `R`, pyrimidines become `Y`. Symbols that are already in
/// rymer space are kept, which makes the transform idempotent. Anything
/// else becomes `N` and cannot be part of a key.
#[inline]
pub const fn rymer_symbol(base: u8) -> u8 {
    match base {
        b'A' | b'a' | b'G' | b'g' | b'R' | b'r' => b'R',
        b'C' | b'c' | b'T' | b't' | b'Y' | b'y' => b'Y',
        _ => b'N',
    }
}

/// Convert a nucleotide sequence into rymer space
pub fn to_rymer_space(sequence: &[u8]) -> Vec<u8> {
    sequence.iter().map(|&b| rymer_symbol(b)).collect()
}

/// Reverse complement a nucleotide sequence
///
/// Bases outside `ACGT` are complemented to `N`.
pub fn reverse_complement(sequence: &[u8]) -> Vec<u8> {
    sequence
        .iter()
        .rev()
        .map(|&b| match encode_base(b) {
            Some(bits) => decode_base(complement_base(bits)),
            None => b'N',
        })
        .collect()
}
