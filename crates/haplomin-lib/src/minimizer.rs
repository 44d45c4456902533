//! Minimizer candidates and window-based selection
//!
//! Selection decides which k-mers of a sequence represent it in the index.
//! The construction pipeline only depends on the [`MinimizerSelector`]
//! trait; [`WindowMinimizers`] is the default policy: in every window of `w`
//! consecutive k-mers, the canonical k-mer (forward or reverse complement)
//! with the smallest hash wins.
//!
//! # Reverse candidates
//!
//! For a candidate taken from the reverse strand, `offset` is the window
//! position of the *last* base of the forward-strand occurrence, which is
//! the first base of the k-mer when reading the reverse strand. The
//! coordinate mapper reflects such offsets into the node's own frame.

use std::collections::VecDeque;
use std::marker::PhantomData;

use crate::error::BuildError;
use crate::hasher::KeyHasher;
use crate::key::{Key, KeyCodec};

/// A selected k-mer occurrence, relative to the scanned window
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Packed k-mer (canonical orientation)
    pub key: Key,
    /// Window-relative offset of the first base in the candidate's orientation
    pub offset: usize,
    /// Whether the key was taken from the reverse strand
    pub is_reverse: bool,
    /// Selection hash of the key
    pub hash: u64,
}

impl Candidate {
    /// Create a candidate
    pub fn new(key: Key, offset: usize, is_reverse: bool, hash: u64) -> Self {
        Self { key, offset, is_reverse, hash }
    }

    /// The candidate of a window without any valid k-mer
    pub const fn empty() -> Self {
        Self { key: Key::NO_KEY, offset: 0, is_reverse: false, hash: u64::MAX }
    }

    /// Whether this candidate carries no position
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }

    fn same_occurrence(&self, other: &Candidate) -> bool {
        self.key == other.key && self.offset == other.offset && self.is_reverse == other.is_reverse
    }
}

/// Selection of representative k-mers from a sequence
pub trait MinimizerSelector: Sync {
    /// K-mer length
    fn k(&self) -> usize;

    /// Window length in k-mers
    fn w(&self) -> usize;

    /// Window length in bases
    fn window_bp(&self) -> usize {
        self.k() + self.w() - 1
    }

    /// Candidates for a sequence, ordered by window
    ///
    /// The sequence must already be in the alphabet of the key codec.
    /// Windows without a valid k-mer contribute empty candidates.
    fn minimizers(&self, sequence: &[u8]) -> Vec<Candidate>;
}

/// Canonical random minimizers over windows of `w` k-mers
#[derive(Clone, Debug)]
pub struct WindowMinimizers<C: KeyCodec> {
    k: usize,
    w: usize,
    hasher: KeyHasher,
    _codec: PhantomData<C>,
}

impl<C: KeyCodec> WindowMinimizers<C> {
    /// Create a selector
    ///
    /// # Errors
    /// `k` must be in `1..=C::MAX_K` and `w` must be positive.
    pub fn new(k: usize, w: usize, seed: u64) -> Result<Self, BuildError> {
        if k == 0 || k > C::MAX_K {
            return Err(BuildError::InvalidConfig(format!(
                "k must be in range [1, {}] for {} keys, got k={}",
                C::MAX_K,
                C::SCHEME,
                k
            )));
        }
        if w == 0 {
            return Err(BuildError::InvalidConfig("w must be positive".to_string()));
        }
        if k.checked_add(w - 1).is_none() {
            return Err(BuildError::InvalidConfig(format!("window of k={} w={} is too long", k, w)));
        }
        Ok(Self { k, w, hasher: KeyHasher::new(seed), _codec: PhantomData })
    }

    /// Seed of the selection hash
    pub fn seed(&self) -> u64 {
        self.hasher.seed()
    }

    /// Canonical candidate for the k-mer starting at `start`
    #[inline]
    fn canonical(&self, forward: u64, reverse: u64, start: usize) -> Candidate {
        let forward_hash = self.hasher.hash_key(Key::from_raw(forward));
        let reverse_hash = self.hasher.hash_key(Key::from_raw(reverse));
        if reverse_hash < forward_hash {
            Candidate::new(Key::from_raw(reverse), start + self.k - 1, true, reverse_hash)
        } else {
            Candidate::new(Key::from_raw(forward), start, false, forward_hash)
        }
    }

    /// Leftmost smallest candidate among the buffered k-mers
    fn rescan(buffer: &VecDeque<(usize, Option<Candidate>)>) -> Option<(usize, Candidate)> {
        let mut best: Option<(usize, Candidate)> = None;
        for &(index, entry) in buffer {
            if let Some(candidate) = entry {
                if best.map_or(true, |(_, b)| candidate.hash < b.hash) {
                    best = Some((index, candidate));
                }
            }
        }
        best
    }
}

impl<C: KeyCodec> MinimizerSelector for WindowMinimizers<C> {
    fn k(&self) -> usize {
        self.k
    }

    fn w(&self) -> usize {
        self.w
    }

    fn minimizers(&self, sequence: &[u8]) -> Vec<Candidate> {
        let k = self.k;
        if sequence.len() < k {
            return Vec::new();
        }
        let num_kmers = sequence.len() - k + 1;
        // A sequence shorter than a full window is scanned as one window
        let w = self.w.min(num_kmers);

        let mask = C::key_mask(k);
        let top_shift = C::BITS_PER_BASE * (k - 1);

        let mut result: Vec<Candidate> = Vec::new();
        let mut buffer: VecDeque<(usize, Option<Candidate>)> = VecDeque::with_capacity(w + 1);
        let mut current: Option<(usize, Candidate)> = None;

        let mut forward = 0u64;
        let mut reverse = 0u64;
        let mut valid_len = 0usize;

        for (i, &base) in sequence.iter().enumerate() {
            match C::pack_base(base) {
                Some(bits) => {
                    forward = ((forward << C::BITS_PER_BASE) | bits) & mask;
                    reverse = (reverse >> C::BITS_PER_BASE) | (C::complement(bits) << top_shift);
                    valid_len += 1;
                }
                None => {
                    forward = 0;
                    reverse = 0;
                    valid_len = 0;
                }
            }
            if i + 1 < k {
                continue;
            }

            let start = i + 1 - k;
            let entry = (valid_len >= k).then(|| self.canonical(forward, reverse, start));
            buffer.push_back((start, entry));
            if buffer.len() > w {
                buffer.pop_front();
            }

            // Minimum fell out of the window: rescan
            if current.is_some_and(|(index, _)| index + w <= start) {
                current = Self::rescan(&buffer);
            } else if let Some(candidate) = entry {
                if current.map_or(true, |(_, c)| candidate.hash < c.hash) {
                    current = Some((start, candidate));
                }
            }

            if start + 1 < w {
                continue;
            }
            let selected = current.map_or(Candidate::empty(), |(_, c)| c);
            if result.last().map_or(true, |last| !last.same_occurrence(&selected)) {
                result.push(selected);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::reverse_complement;
    use crate::key::{Direct, Rymer};

    fn brute_force<C: KeyCodec>(selector: &WindowMinimizers<C>, seq: &[u8]) -> Vec<Candidate> {
        let k = selector.k;
        let num_kmers = seq.len() - k + 1;
        let w = selector.w.min(num_kmers);
        let mut result: Vec<Candidate> = Vec::new();
        for window_start in 0..=(num_kmers - w) {
            let mut best: Option<Candidate> = None;
            for start in window_start..window_start + w {
                let slice = &seq[start..start + k];
                let Ok(forward) = C::encode(slice) else { continue };
                let rc: Vec<u8> = slice
                    .iter()
                    .rev()
                    .map(|&b| C::unpack_base(C::complement(C::pack_base(b).unwrap())))
                    .collect();
                let reverse = C::encode(&rc).unwrap();
                let candidate = selector.canonical(forward.raw(), reverse.raw(), start);
                if best.map_or(true, |b| candidate.hash < b.hash) {
                    best = Some(candidate);
                }
            }
            let selected = best.unwrap_or(Candidate::empty());
            if result.last().map_or(true, |last| !last.same_occurrence(&selected)) {
                result.push(selected);
            }
        }
        result
    }

    #[test]
    fn test_new_validates_parameters() {
        assert!(WindowMinimizers::<Direct>::new(0, 5, 1).is_err());
        assert!(WindowMinimizers::<Direct>::new(32, 5, 1).is_err());
        assert!(WindowMinimizers::<Direct>::new(31, 0, 1).is_err());
        assert!(WindowMinimizers::<Direct>::new(31, usize::MAX, 1).is_err());
        assert!(WindowMinimizers::<Rymer>::new(63, 1, 1).is_ok());
        let selector = WindowMinimizers::<Direct>::new(21, 11, 1).unwrap();
        assert_eq!(selector.window_bp(), 31);
    }

    #[test]
    fn test_short_sequence_has_no_candidates() {
        let selector = WindowMinimizers::<Direct>::new(5, 3, 1).unwrap();
        assert!(selector.minimizers(b"ACGT").is_empty());
    }

    #[test]
    fn test_matches_brute_force() {
        let seq = b"ATTTTCAGGATGTTTTCAGGTTCATCATCTCCCTTCTTTGCAGGATAGTAGATAAGATCGCTCATCAACGGATGTTGTGT";
        for (k, w) in [(5, 3), (7, 4), (11, 1), (15, 10)] {
            let selector = WindowMinimizers::<Direct>::new(k, w, 7).unwrap();
            assert_eq!(selector.minimizers(seq), brute_force(&selector, seq), "k={k} w={w}");
        }
    }

    #[test]
    fn test_matches_brute_force_with_invalid_bases() {
        let seq = b"ACGTTGCANNNNNNNNNNNNGGCATTACGATNACGGT";
        let selector = WindowMinimizers::<Direct>::new(5, 3, 3).unwrap();
        let found = selector.minimizers(seq);
        assert_eq!(found, brute_force(&selector, seq));
        assert!(found.iter().any(|c| c.is_empty()));
    }

    #[test]
    fn test_rymer_matches_brute_force() {
        let seq = b"RYYRRRYRYYYRYRRYRYRRRYYYRYRYRRYYRYYRRR";
        let selector = WindowMinimizers::<Rymer>::new(9, 4, 1).unwrap();
        assert_eq!(selector.minimizers(seq), brute_force(&selector, seq));
    }

    #[test]
    fn test_candidates_point_at_their_kmer() {
        let seq = b"GGCATTACGATCCAGTTAGCATGCATTTACGGA";
        let k = 7;
        let selector = WindowMinimizers::<Direct>::new(k, 5, 1).unwrap();
        for candidate in selector.minimizers(seq) {
            let kmer = if candidate.is_reverse {
                let start = candidate.offset + 1 - k;
                reverse_complement(&seq[start..start + k])
            } else {
                seq[candidate.offset..candidate.offset + k].to_vec()
            };
            assert_eq!(Direct::decode(candidate.key, k).as_bytes(), kmer.as_slice());
        }
    }

    #[test]
    fn test_canonical_selection_is_strand_symmetric() {
        let seq = b"GGCATTACGATCCAGTTAGCATGCATTTACGGA";
        let selector = WindowMinimizers::<Direct>::new(7, 5, 1).unwrap();
        let mut forward: Vec<Key> = selector.minimizers(seq).iter().map(|c| c.key).collect();
        let mut reverse: Vec<Key> =
            selector.minimizers(&reverse_complement(seq)).iter().map(|c| c.key).collect();
        forward.sort();
        forward.dedup();
        reverse.sort();
        reverse.dedup();
        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_window_of_whole_sequence() {
        // Fewer k-mers than w: a single window and a single minimizer
        let selector = WindowMinimizers::<Direct>::new(3, 50, 1).unwrap();
        let found = selector.minimizers(b"ACGTACGTAC");
        assert_eq!(found.len(), 1);
        assert!(!found[0].is_empty());
    }

    #[test]
    fn test_empty_candidate() {
        let empty = Candidate::empty();
        assert!(empty.is_empty());
        assert!(!Candidate::new(Key::from_raw(3), 0, false, 1).is_empty());
    }
}
