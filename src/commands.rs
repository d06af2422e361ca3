//! The `sdi rank` and `sdi logo` pipelines.
//!
//! Both load the two alignments, resolve the requested range against their
//! common width and score it; `rank` then orders and reports the scores
//! while `logo` draws them.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{CompareError, CompareResult};
use crate::formats::load_alignment;
use crate::logo::{save_png, LogoMetric, LogoRenderer};
use crate::model::Alignment;
use crate::rank::rank;
use crate::report::{build_rows, report, OutputMode, RankRow};
use crate::sdi::{comparable_width, resolve_range, Anchor, ScorerRegistry, SdiEngine, SdiTable};

/// Arguments of `sdi rank`.
#[derive(Debug, Clone, Default)]
pub struct RankRequest {
    pub first: PathBuf,
    pub second: PathBuf,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub top: Option<i64>,
    pub by_first: bool,
    pub by_second: bool,
    pub peek: bool,
    pub save: bool,
    pub save_as: Option<PathBuf>,
    /// Scorer name; `None` means `sdi`
    pub metric: Option<String>,
}

impl RankRequest {
    pub fn anchor(&self) -> CompareResult<Anchor> {
        match (self.by_first, self.by_second) {
            (true, true) => Err(CompareError::argument("--by-first and --by-second cannot be used together")),
            (_, true) => Ok(Anchor::Second),
            _ => Ok(Anchor::First),
        }
    }

    pub fn output_mode(&self, settings: &Settings) -> CompareResult<OutputMode> {
        match (self.peek, self.save) {
            (true, true) => Err(CompareError::argument("--peek and --save cannot be used together")),
            (_, true) => Ok(OutputMode::Save(
                settings.resolve_output(self.save_as.as_deref(), &settings.output.rank_file),
            )),
            _ => {
                if let Some(path) = &self.save_as {
                    warn!(path = %path.display(), "--save-as has no effect without --save");
                }
                Ok(OutputMode::Peek)
            }
        }
    }
}

/// Arguments of `sdi logo`.
#[derive(Debug, Clone, Default)]
pub struct LogoRequest {
    pub first: PathBuf,
    pub second: PathBuf,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub save_as: Option<PathBuf>,
    pub metric: LogoMetric,
}

fn load(path: &Path) -> CompareResult<Alignment> {
    load_alignment(path).map_err(|source| CompareError::Format {
        path: path.to_path_buf(),
        source,
    })
}

fn score_pair(
    first: &Path,
    second: &Path,
    start: Option<i64>,
    end: Option<i64>,
    registry: &ScorerRegistry,
    metric: &str,
    settings: &Settings,
) -> CompareResult<SdiTable> {
    let scorer = registry.require(metric)?;
    let first = load(first)?;
    let second = load(second)?;

    let width = comparable_width(&first, &second);
    let range = resolve_range(start, end, width)?;
    SdiEngine::new(scorer, &settings.sdi).compute(&first, &second, range)
}

/// Rank positions and build the report rows, without writing anything.
pub fn rank_rows(request: &RankRequest, settings: &Settings) -> CompareResult<Vec<RankRow>> {
    let anchor = request.anchor()?;
    let top = request.top.unwrap_or(settings.rank.top);
    if top <= 0 {
        return Err(CompareError::argument(format!("top must be a positive integer (got {})", top)));
    }

    let registry = ScorerRegistry::new(&settings.sdi);
    let metric = request.metric.as_deref().unwrap_or("sdi");
    let table = score_pair(
        &request.first,
        &request.second,
        request.start,
        request.end,
        &registry,
        metric,
        settings,
    )?;

    let entries = rank(table.scores(anchor), top, anchor)?;
    build_rows(&entries, &table, &settings.rank)
}

/// `sdi rank`: print or save the best-scoring positions.
pub fn run_rank(request: &RankRequest, settings: &Settings) -> CompareResult<OutputMode> {
    let mode = request.output_mode(settings)?;
    let rows = rank_rows(request, settings)?;
    info!(rows = rows.len(), "ranked positions");
    report(&rows, &mode)?;
    Ok(mode)
}

/// `sdi logo`: draw the comparison logo; returns the image path.
pub fn run_logo(request: &LogoRequest, settings: &Settings) -> CompareResult<PathBuf> {
    let registry = ScorerRegistry::new(&settings.sdi);
    let table = score_pair(
        &request.first,
        &request.second,
        request.start,
        request.end,
        &registry,
        "sdi",
        settings,
    )?;

    let img = LogoRenderer::new(&settings.logo, &settings.sdi).render(&table, request.metric);
    let path = settings.resolve_output(request.save_as.as_deref(), &settings.output.logo_file);
    save_png(&img, &path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicting_anchor_flags() {
        let request = RankRequest {
            by_first: true,
            by_second: true,
            ..RankRequest::default()
        };
        assert!(matches!(request.anchor(), Err(CompareError::Argument(_))));

        let request = RankRequest {
            by_second: true,
            ..RankRequest::default()
        };
        assert_eq!(request.anchor().unwrap(), Anchor::Second);
        assert_eq!(RankRequest::default().anchor().unwrap(), Anchor::First);
    }

    #[test]
    fn test_output_mode() {
        let settings = Settings::default();
        let both = RankRequest {
            peek: true,
            save: true,
            ..RankRequest::default()
        };
        assert!(matches!(both.output_mode(&settings), Err(CompareError::Argument(_))));
        assert_eq!(RankRequest::default().output_mode(&settings).unwrap(), OutputMode::Peek);

        let save = RankRequest {
            save: true,
            ..RankRequest::default()
        };
        assert_eq!(
            save.output_mode(&settings).unwrap(),
            OutputMode::Save(PathBuf::from("./sdi_rank.csv"))
        );

        let save_as = RankRequest {
            save: true,
            save_as: Some(PathBuf::from("/tmp/custom.csv")),
            ..RankRequest::default()
        };
        assert_eq!(
            save_as.output_mode(&settings).unwrap(),
            OutputMode::Save(PathBuf::from("/tmp/custom.csv"))
        );
    }

    #[test]
    fn test_missing_input_is_format_error() {
        let request = RankRequest {
            first: PathBuf::from("/nonexistent/a.aln"),
            second: PathBuf::from("/nonexistent/b.aln"),
            ..RankRequest::default()
        };
        let err = rank_rows(&request, &Settings::default()).unwrap_err();
        assert!(matches!(err, CompareError::Format { .. }));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_top_checked_before_loading() {
        let request = RankRequest {
            first: PathBuf::from("/nonexistent/a.aln"),
            second: PathBuf::from("/nonexistent/b.aln"),
            top: Some(0),
            ..RankRequest::default()
        };
        assert!(matches!(
            rank_rows(&request, &Settings::default()),
            Err(CompareError::Argument(_))
        ));
    }

    #[test]
    fn test_unknown_metric() {
        let request = RankRequest {
            metric: Some("kl".to_string()),
            ..RankRequest::default()
        };
        assert!(matches!(
            rank_rows(&request, &Settings::default()),
            Err(CompareError::Argument(_))
        ));
    }
}
