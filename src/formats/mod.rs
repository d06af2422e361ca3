//! Multiple sequence alignment loader.
//!
//! Supports automatic format detection for:
//! - Clustal (.aln, .clustal, .clw)
//! - FASTA (.fasta, .fa, .faa, .fas)
//!
//! The format comes from the file extension, falling back to the content.
//!
//! Every loaded alignment is checked before it is returned: rows must share
//! one length and only protein symbols, gaps and ambiguity codes are allowed.

pub mod clustal;
pub mod fasta;

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::model::{is_recognized, Alignment};

/// Detected file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Clustal,
    Fasta,
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileFormat::Clustal => write!(f, "Clustal"),
            FileFormat::Fasta => write!(f, "FASTA"),
        }
    }
}

/// Errors that can occur while loading an alignment.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Empty file")]
    EmptyFile,

    #[error("Could not determine alignment format (expected Clustal .aln or FASTA)")]
    UnknownFormat,

    #[error("Clustal error: {0}")]
    ClustalError(#[from] clustal::ClustalError),

    #[error("FASTA error: {0}")]
    FastaError(#[from] fasta::FastaError),

    #[error("Sequence '{name}' has length {found}, expected {expected}")]
    UnequalLength {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Sequence '{name}' has unrecognized character '{residue}' at column {column}")]
    InvalidResidue {
        name: String,
        residue: String,
        column: usize,
    },

    #[error("Alignment has no columns")]
    NoColumns,
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Detects format from file extension.
pub fn detect_format_from_extension<P: AsRef<Path>>(path: P) -> Option<FileFormat> {
    let ext = path.as_ref().extension().and_then(OsStr::to_str)?;
    match ext.to_lowercase().as_str() {
        "aln" | "clustal" | "clw" | "clustalw" => Some(FileFormat::Clustal),
        "fa" | "fas" | "fasta" | "faa" | "mfa" => Some(FileFormat::Fasta),
        _ => None,
    }
}

/// Detects the file format by examining the content.
pub fn detect_format_from_content(content: &str) -> Option<FileFormat> {
    let first = content.lines().map(str::trim).find(|l| !l.is_empty())?;

    if first.starts_with('>') {
        return Some(FileFormat::Fasta);
    }
    if clustal::has_clustal_header(first) {
        return Some(FileFormat::Clustal);
    }

    // Headerless Clustal: "name residues"
    let mut parts = first.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(_), Some(residues)) if residues.bytes().all(is_recognized) => {
            Some(FileFormat::Clustal)
        }
        _ => None,
    }
}

/// Parses content with a specific format.
fn parse_content(content: &str, format: FileFormat) -> ParseResult<Alignment> {
    match format {
        FileFormat::Clustal => Ok(clustal::parse_clustal_str(content)?),
        FileFormat::Fasta => Ok(fasta::parse_fasta_str(content)?),
    }
}

/// Parses alignment text and checks it is a usable protein alignment.
pub fn parse_alignment_str(content: &str, format: FileFormat) -> ParseResult<Alignment> {
    let alignment = parse_content(content, format)?;
    validate_alignment(&alignment)?;
    Ok(alignment)
}

/// The character starting at byte `col`, or `\xNN` when it is not valid UTF-8.
fn symbol_at(bytes: &[u8], col: usize) -> String {
    let tail = &bytes[col..];
    (1..=tail.len().min(4))
        .find_map(|n| std::str::from_utf8(&tail[..n]).ok())
        .map_or_else(|| format!("\\x{:02X}", tail[0]), str::to_string)
}

/// Checks row lengths and the residue alphabet.
pub fn validate_alignment(alignment: &Alignment) -> ParseResult<()> {
    let Some(first) = alignment.get(0) else {
        return Err(ParseError::EmptyFile);
    };
    let expected = first.len();
    if expected == 0 {
        return Err(ParseError::NoColumns);
    }

    for seq in &alignment.sequences {
        if seq.len() != expected {
            return Err(ParseError::UnequalLength {
                name: seq.id.clone(),
                expected,
                found: seq.len(),
            });
        }
        if let Some(col) = seq.as_bytes().iter().position(|&b| !is_recognized(b)) {
            return Err(ParseError::InvalidResidue {
                name: seq.id.clone(),
                residue: symbol_at(seq.as_bytes(), col),
                column: col + 1,
            });
        }
    }

    Ok(())
}

/// Loads an alignment file, detecting the format.
pub fn load_alignment<P: AsRef<Path>>(path: P) -> ParseResult<Alignment> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;

    if content.trim().is_empty() {
        return Err(ParseError::EmptyFile);
    }

    let format = detect_format_from_extension(path)
        .or_else(|| detect_format_from_content(&content))
        .ok_or(ParseError::UnknownFormat)?;
    debug!(path = %path.display(), %format, "parsing alignment");

    let alignment = parse_alignment_str(&content, format)?;
    info!(
        path = %path.display(),
        sequences = alignment.sequence_count(),
        columns = alignment.alignment_length(),
        "loaded alignment"
    );
    Ok(alignment)
}
