//! Aligned FASTA parser.
//!
//! Sequences may span several lines; everything after the first space of a
//! header is treated as description and dropped.
//!
//! ```text
//! >sp|P00001|FER1 ferredoxin
//! MAS-YKVTLVTPDG
//! >sp|P00002|FER2
//! MASSYKVTLVTPEG
//! ```

use thiserror::Error;

use crate::model::{Alignment, Sequence};

/// Errors that can occur during FASTA parsing.
#[derive(Error, Debug)]
pub enum FastaError {
    #[error("Empty FASTA file")]
    EmptyFile,

    #[error("Invalid FASTA format: {0}")]
    InvalidFormat(String),

    #[error("Sequence without header at line {0}")]
    SequenceWithoutHeader(usize),

    #[error("Record '{name}' at line {line} has no residues")]
    EmptySequence { name: String, line: usize },
}

/// Result type for FASTA operations.
pub type FastaResult<T> = Result<T, FastaError>;

/// Parses FASTA content held in memory.
/// Works on slices and bytes to avoid per-line allocations.
pub fn parse_fasta_str(content: &str) -> FastaResult<Alignment> {
    let mut sequences = Vec::new();
    let mut current_id: Option<(&str, usize)> = None;
    let mut current_seq: Vec<u8> = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_number = idx + 1;
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('>') {
            if let Some(record) = current_id.take() {
                sequences.push(finish_record(record, std::mem::take(&mut current_seq))?);
            }

            // Take everything before first space as ID
            let id = header.split_whitespace().next().unwrap_or(header);
            if id.is_empty() {
                return Err(FastaError::InvalidFormat(format!(
                    "Empty sequence identifier at line {}",
                    line_number
                )));
            }

            current_id = Some((id, line_number));
        } else {
            if current_id.is_none() {
                return Err(FastaError::SequenceWithoutHeader(line_number));
            }

            if line.bytes().all(|b| !b.is_ascii_whitespace()) {
                current_seq.extend_from_slice(line.as_bytes());
            } else {
                current_seq.extend(line.bytes().filter(|b| !b.is_ascii_whitespace()));
            }
        }
    }

    // Don't forget the last sequence
    if let Some(record) = current_id {
        sequences.push(finish_record(record, current_seq)?);
    }

    if sequences.is_empty() {
        return Err(FastaError::EmptyFile);
    }

    Ok(Alignment::new(sequences))
}

fn finish_record((id, line): (&str, usize), residues: Vec<u8>) -> FastaResult<Sequence> {
    if residues.is_empty() {
        return Err(FastaError::EmptySequence {
            name: id.to_string(),
            line,
        });
    }
    Ok(Sequence::from_bytes(id, residues))
}
