//! Data model for alignment comparison.
//!
//! This module contains the data structures shared by the loaders, the
//! statistics and the renderers:
//! - Sequences and alignments
//! - The protein alphabet and residue lookup
//! - 1-based column ranges
//!
//! Alignments are loaded once and then only read.

use std::fmt;
use std::ops::RangeInclusive;

/// The 20 standard amino acids, in the order used for every distribution.
pub const AMINO_ACIDS: &[u8; 20] = b"ACDEFGHIKLMNPQRSTVWY";

/// Number of standard amino acids.
pub const AA_COUNT: usize = 20;

/// Ambiguity codes and stop accepted by the loaders but not counted.
const AMBIGUITY_CODES: &[u8] = b"BJOUXZ*";

/// Returns the index of a standard amino acid in [`AMINO_ACIDS`].
pub fn residue_index(residue: u8) -> Option<usize> {
    match residue.to_ascii_uppercase() {
        b'A' => Some(0),
        b'C' => Some(1),
        b'D' => Some(2),
        b'E' => Some(3),
        b'F' => Some(4),
        b'G' => Some(5),
        b'H' => Some(6),
        b'I' => Some(7),
        b'K' => Some(8),
        b'L' => Some(9),
        b'M' => Some(10),
        b'N' => Some(11),
        b'P' => Some(12),
        b'Q' => Some(13),
        b'R' => Some(14),
        b'S' => Some(15),
        b'T' => Some(16),
        b'V' => Some(17),
        b'W' => Some(18),
        b'Y' => Some(19),
        _ => None,
    }
}

/// Gap symbols.
pub fn is_gap(residue: u8) -> bool {
    residue == b'-' || residue == b'.'
}

/// True for any symbol an alignment row may contain.
pub fn is_recognized(residue: u8) -> bool {
    residue_index(residue).is_some()
        || is_gap(residue)
        || AMBIGUITY_CODES.contains(&residue.to_ascii_uppercase())
}

/// Represents a single sequence with its identifier and data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    /// The sequence identifier
    pub id: String,
    /// Residues, upper-cased
    data: Vec<u8>,
}

impl Sequence {
    /// Creates a new sequence from a string.
    pub fn new(id: impl Into<String>, data: impl AsRef<str>) -> Self {
        Self::from_bytes(id, data.as_ref().as_bytes().to_vec())
    }

    /// Creates a new sequence from raw bytes, upper-casing residues.
    pub fn from_bytes(id: impl Into<String>, mut data: Vec<u8>) -> Self {
        data.make_ascii_uppercase();
        Self { id: id.into(), data }
    }

    /// Returns the length of the sequence.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_str(&self) -> &str {
        // Loaders only accept ASCII residues.
        std::str::from_utf8(&self.data).unwrap_or("")
    }

    /// Gets the residue at a 0-based position.
    pub fn residue_at(&self, pos: usize) -> Option<u8> {
        self.data.get(pos).copied()
    }
}

/// Represents an alignment of multiple sequences.
///
/// Construction does not check row lengths; `formats::validate_alignment`
/// does that for everything read from disk.
#[derive(Debug, Clone)]
pub struct Alignment {
    /// All sequences in the alignment, in file order
    pub sequences: Vec<Sequence>,
}

impl Alignment {
    /// Creates a new alignment from a vector of sequences.
    pub fn new(sequences: Vec<Sequence>) -> Self {
        Self { sequences }
    }

    /// Returns the number of sequences.
    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    /// Returns the alignment length, taken from the first row.
    pub fn alignment_length(&self) -> usize {
        self.sequences.first().map_or(0, Sequence::len)
    }

    /// Gets a sequence by index.
    pub fn get(&self, index: usize) -> Option<&Sequence> {
        self.sequences.get(index)
    }

    /// Returns true if the alignment is empty.
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Iterates over the residues of a 0-based column, top to bottom.
    ///
    /// Rows shorter than the column are skipped; loaders reject such
    /// alignments, so this only matters for hand-built ones.
    pub fn column(&self, col: usize) -> impl Iterator<Item = u8> + '_ {
        self.sequences.iter().filter_map(move |s| s.residue_at(col))
    }
}

/// A 1-based inclusive range of alignment columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRange {
    pub start: usize,
    pub end: usize,
}

impl ColumnRange {
    /// Creates a range; callers validate bounds (see `sdi::resolve_range`).
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of columns covered.
    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// 1-based positions.
    pub fn positions(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }

    /// 0-based column indices.
    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start - 1..self.end
    }
}

impl fmt::Display for ColumnRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
