//! Ranking tables: terminal view and CSV export.

use std::path::{Path, PathBuf};

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color as TableColor, ContentArrangement, Table};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Serialize, Serializer};
use tracing::info;

use crate::config::RankSettings;
use crate::error::{CompareError, CompareResult};
use crate::output::write_atomically;
use crate::rank::RankEntry;
use crate::sdi::{Anchor, SdiTable};
use crate::stats::{consensus, ConsensusCall};

/// Where a ranking goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Print a table on stdout
    Peek,
    /// Write a CSV file
    Save(PathBuf),
}

fn fixed6<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:.6}", value))
}

/// One line of the ranking, with per-alignment details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankRow {
    pub rank: usize,
    pub position: usize,
    pub anchor: Anchor,
    #[serde(serialize_with = "fixed6")]
    pub score: f64,
    #[serde(serialize_with = "fixed6")]
    pub first_sdi: f64,
    pub first_identity: char,
    #[serde(serialize_with = "fixed6")]
    pub first_p: f64,
    #[serde(serialize_with = "fixed6")]
    pub first_lower: f64,
    #[serde(serialize_with = "fixed6")]
    pub first_upper: f64,
    #[serde(serialize_with = "fixed6")]
    pub second_sdi: f64,
    pub second_identity: char,
    #[serde(serialize_with = "fixed6")]
    pub second_p: f64,
    #[serde(serialize_with = "fixed6")]
    pub second_lower: f64,
    #[serde(serialize_with = "fixed6")]
    pub second_upper: f64,
}

/// Attach scores from both anchors and consensus calls to ranked entries.
///
/// Credible intervals are sampled from a generator seeded per position, so
/// the same inputs always give the same rows.
pub fn build_rows(entries: &[RankEntry], table: &SdiTable, settings: &RankSettings) -> CompareResult<Vec<RankRow>> {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let offset = table.offset(entry.position).ok_or_else(|| {
                CompareError::argument(format!("position {} is outside {}", entry.position, table.range))
            })?;

            let mut rng = StdRng::seed_from_u64(settings.seed.wrapping_add(entry.position as u64));
            let mut call = |anchor: Anchor| -> CompareResult<ConsensusCall> {
                consensus(
                    &table.profiles(anchor)[offset],
                    settings.ci_samples,
                    settings.ci_level,
                    &mut rng,
                )
                .map_err(CompareError::from)
            };
            let first = call(Anchor::First)?;
            let second = call(Anchor::Second)?;

            Ok(RankRow {
                rank: i + 1,
                position: entry.position,
                anchor: entry.anchor,
                score: entry.score,
                first_sdi: table.first[offset].score,
                first_identity: first.residue,
                first_p: first.probability,
                first_lower: first.lower,
                first_upper: first.upper,
                second_sdi: table.second[offset].score,
                second_identity: second.residue,
                second_p: second.probability,
                second_lower: second.lower,
                second_upper: second.upper,
            })
        })
        .collect()
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold).fg(TableColor::Cyan)
}

fn number_cell(value: f64) -> Cell {
    Cell::new(format!("{:.3}", value)).set_alignment(CellAlignment::Right)
}

/// Terminal table for `--peek`.
pub fn peek_table(rows: &[RankRow]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            [
                "Rank", "Position", "Anchor", "Score", "SDI 1", "Cons 1", "P 1", "CI 1", "SDI 2", "Cons 2",
                "P 2", "CI 2",
            ]
            .map(header_cell),
        );

    for row in rows {
        table.add_row(vec![
            Cell::new(row.rank).set_alignment(CellAlignment::Right),
            Cell::new(row.position).set_alignment(CellAlignment::Right),
            Cell::new(row.anchor.label()),
            number_cell(row.score).add_attribute(Attribute::Bold),
            number_cell(row.first_sdi),
            Cell::new(row.first_identity),
            number_cell(row.first_p),
            Cell::new(format!("[{:.3}, {:.3}]", row.first_lower, row.first_upper)),
            number_cell(row.second_sdi),
            Cell::new(row.second_identity),
            number_cell(row.second_p),
            Cell::new(format!("[{:.3}, {:.3}]", row.second_lower, row.second_upper)),
        ]);
    }
    table
}

/// Write rows as CSV, replacing `path` only on success.
pub fn write_csv(rows: &[RankRow], path: &Path) -> CompareResult<()> {
    write_atomically(path, |file| {
        let mut writer = csv::Writer::from_writer(file);
        for row in rows {
            writer
                .serialize(row)
                .map_err(|e| CompareError::io(path, std::io::Error::from(e)))?;
        }
        writer.flush().map_err(|e| CompareError::io(path, e))
    })?;
    info!(path = %path.display(), rows = rows.len(), "saved ranking");
    Ok(())
}

/// Deliver rows according to `mode`.
pub fn report(rows: &[RankRow], mode: &OutputMode) -> CompareResult<()> {
    match mode {
        OutputMode::Peek => {
            println!("{}", peek_table(rows));
            Ok(())
        }
        OutputMode::Save(path) => write_csv(rows, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SdiSettings;
    use crate::model::{Alignment, ColumnRange, Sequence};
    use crate::rank::rank;
    use crate::sdi::{ScorerRegistry, SdiEngine};

    fn make_alignment(rows: &[&str]) -> Alignment {
        Alignment::new(
            rows.iter()
                .enumerate()
                .map(|(i, r)| Sequence::new(format!("s{}", i), r))
                .collect(),
        )
    }

    fn small_settings() -> RankSettings {
        RankSettings {
            ci_samples: 500,
            ..RankSettings::default()
        }
    }

    fn sample_rows() -> Vec<RankRow> {
        let a = make_alignment(&["MKWL", "MKWL", "MRWL"]);
        let b = make_alignment(&["MKDL", "MKDL", "MKDL"]);
        let registry = ScorerRegistry::new(&SdiSettings::default());
        let engine = SdiEngine::new(registry.get("sdi").unwrap(), &SdiSettings::default());
        let table = engine.compute(&a, &b, ColumnRange::new(1, 4)).unwrap();
        let entries = rank(&table.first, 2, Anchor::First).unwrap();
        build_rows(&entries, &table, &small_settings()).unwrap()
    }

    #[test]
    fn test_interval_failure_is_not_an_argument_error() {
        let a = make_alignment(&["MKWL", "MKWL"]);
        let b = make_alignment(&["MKDL", "MKDL"]);
        let registry = ScorerRegistry::new(&SdiSettings::default());
        let engine = SdiEngine::new(registry.get("sdi").unwrap(), &SdiSettings::default());
        let table = engine.compute(&a, &b, ColumnRange::new(1, 4)).unwrap();
        let entries = rank(&table.first, 1, Anchor::First).unwrap();

        let settings = RankSettings {
            ci_samples: 2,
            ci_level: 0.4,
            ..RankSettings::default()
        };
        let err = build_rows(&entries, &table, &settings).unwrap_err();
        assert!(matches!(err, CompareError::Interval(_)));
        assert_ne!(err.exit_code(), 2);
    }

    #[test]
    fn test_rows_carry_both_alignments() {
        let rows = sample_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].position, 3);
        assert_eq!(rows[0].first_identity, 'W');
        assert_eq!(rows[0].second_identity, 'D');
        assert_eq!(rows[0].score, rows[0].first_sdi);
        assert!(rows[0].first_lower <= rows[0].first_upper);
        assert!(rows[0].first_p > 0.5);
    }

    #[test]
    fn test_rows_are_reproducible() {
        assert_eq!(sample_rows(), sample_rows());
    }

    #[test]
    fn test_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rank.csv");
        write_csv(&sample_rows(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "rank,position,anchor,score,first_sdi,first_identity,first_p,first_lower,first_upper,\
             second_sdi,second_identity,second_p,second_lower,second_upper"
        );
        let first: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(&first[..3], &["1", "3", "first"]);
        assert_eq!(first[3].split('.').nth(1).map(str::len), Some(6));
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn test_csv_byte_identical_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("one.csv");
        let two = dir.path().join("two.csv");
        write_csv(&sample_rows(), &one).unwrap();
        write_csv(&sample_rows(), &two).unwrap();
        assert_eq!(std::fs::read(&one).unwrap(), std::fs::read(&two).unwrap());
    }

    #[test]
    fn test_peek_table_lists_positions() {
        let rendered = peek_table(&sample_rows()).to_string();
        assert!(rendered.contains("Position"));
        assert!(rendered.contains("first"));
        assert!(rendered.contains('W'));
    }

    #[test]
    fn test_save_to_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let mode = OutputMode::Save(blocker.join("rank.csv"));
        assert!(matches!(report(&sample_rows(), &mode), Err(CompareError::Io { .. })));
    }
}
