//! Clustal (`.aln`) parser.
//!
//! ## Clustal Format
//!
//! An optional header line, then interleaved blocks separated by blank
//! lines. Each block holds one line per sequence, optionally followed by a
//! cumulative residue count, and a conservation line starting with
//! whitespace:
//!
//! ```text
//! CLUSTAL W (1.83) multiple sequence alignment
//!
//! fer1_spiol      MAAYKVTLVTPTGNVEFQCPDDVYILDAAEEEGIDLPYSCRAGSCSSCAGKLKTGSLNQD 60
//! fer1_horvu      MAT-KVKLVTPDGEHEFDAPDDAYILDAAEEAGLELPYSCRAGACSTCAGKILSGSVDQS 59
//!                 **: ** **** * * **. *** *.*********** * :****.**.*** * :*: **.
//!
//! fer1_spiol      DQSFLDDDQIEEGWVLTCAAYPVSDVTIETHKEEELTA
//! fer1_horvu      DQSFLDDDQIEAGYVLTCVAYPTSDVVIETHKEEDLY-
//! ```
//!
//! Segments belonging to the same name are concatenated in order of
//! appearance. The first block fixes the row order.

use std::collections::HashMap;

use thiserror::Error;

use crate::model::{Alignment, Sequence};

/// Header keywords written by the common Clustal-format producers.
pub const HEADER_KEYWORDS: &[&str] = &["CLUSTAL", "MUSCLE", "PROBCONS"];

/// Errors that can occur during Clustal parsing.
#[derive(Error, Debug)]
pub enum ClustalError {
    #[error("Empty Clustal file")]
    EmptyFile,

    #[error("No sequence data found after header")]
    NoSequenceData,

    #[error("Line {line}: expected '<name> <residues>', got '{content}'")]
    MalformedLine { line: usize, content: String },

    #[error("Line {line}: sequence '{name}' appears twice in the same block")]
    DuplicateInBlock { line: usize, name: String },

    #[error("Line {line}: sequence '{name}' was not present in the first block")]
    UnknownSequence { line: usize, name: String },
}

/// Result type for Clustal operations.
pub type ClustalResult<T> = Result<T, ClustalError>;

/// True if the first non-empty line looks like a Clustal header.
pub fn has_clustal_header(content: &str) -> bool {
    content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| {
            let upper = l.to_uppercase();
            HEADER_KEYWORDS.iter().any(|kw| upper.starts_with(kw))
        })
        .unwrap_or(false)
}

/// Parses Clustal content from a string.
pub fn parse_clustal_str(content: &str) -> ClustalResult<Alignment> {
    if content.trim().is_empty() {
        return Err(ClustalError::EmptyFile);
    }

    let mut order: Vec<String> = Vec::new();
    let mut segments: HashMap<String, Vec<u8>> = HashMap::new();
    let mut block_names: Vec<String> = Vec::new();
    let mut first_block = true;
    let mut header_seen = false;

    for (idx, raw) in content.lines().enumerate() {
        let line_number = idx + 1;

        if raw.trim().is_empty() {
            if !block_names.is_empty() {
                first_block = false;
                block_names.clear();
            }
            continue;
        }

        if !header_seen && order.is_empty() {
            let upper = raw.trim().to_uppercase();
            if HEADER_KEYWORDS.iter().any(|kw| upper.starts_with(kw)) {
                header_seen = true;
                continue;
            }
        }

        // Conservation lines are indented; sequence lines never are.
        if raw.starts_with(char::is_whitespace) {
            continue;
        }

        let (name, residues) = split_sequence_line(raw).ok_or_else(|| {
            ClustalError::MalformedLine {
                line: line_number,
                content: raw.trim().to_string(),
            }
        })?;

        if block_names.iter().any(|n| n == name) {
            return Err(ClustalError::DuplicateInBlock {
                line: line_number,
                name: name.to_string(),
            });
        }
        block_names.push(name.to_string());

        match segments.get_mut(name) {
            Some(seq) => seq.extend_from_slice(residues.as_bytes()),
            None if first_block => {
                order.push(name.to_string());
                segments.insert(name.to_string(), residues.as_bytes().to_vec());
            }
            None => {
                return Err(ClustalError::UnknownSequence {
                    line: line_number,
                    name: name.to_string(),
                })
            }
        }
    }

    if order.is_empty() {
        return Err(ClustalError::NoSequenceData);
    }

    let sequences = order
        .into_iter()
        .map(|name| {
            let data = segments.remove(&name).unwrap_or_default();
            Sequence::from_bytes(name, data)
        })
        .collect();

    Ok(Alignment::new(sequences))
}

/// Splits `name residues [count]` into name and residues.
fn split_sequence_line(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split_whitespace();
    let name = parts.next()?;
    let residues = parts.next()?;

    match parts.next() {
        None => Some((name, residues)),
        Some(count) if count.bytes().all(|b| b.is_ascii_digit()) && parts.next().is_none() => {
            Some((name, residues))
        }
        Some(_) => None,
    }
}
