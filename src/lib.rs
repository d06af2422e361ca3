//! # protein-compare-toolkit
//!
//! Column-by-column comparison of two protein multiple sequence alignments.
//!
//! ## Architecture
//!
//! The tool is a single-pass pipeline, leaf modules first:
//! - `model`: sequences, alignments and 1-based column ranges
//! - `formats`: Clustal and FASTA loaders with alignment validation
//! - `stats`: column profiles, information content, Jensen-Shannon distance,
//!   consensus calls with credible intervals
//! - `sdi`: the selection-differentiation index and pluggable column scorers
//! - `rank`: score ordering
//! - `report`: terminal table and CSV output
//! - `logo`: two-sided sequence logo rendering
//! - `commands`: the `sdi rank` and `sdi logo` pipelines
//! - `config`: TOML settings shared by all of the above

pub mod commands;
pub mod config;
pub mod error;
pub mod formats;
pub mod logo;
pub mod model;
pub mod output;
pub mod rank;
pub mod report;
pub mod sdi;
pub mod stats;

pub use error::{CompareError, CompareResult};
