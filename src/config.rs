//! Run settings.
//!
//! Everything that used to be implicit (default file names, sampling sizes,
//! the scoring prior) lives in one [`Settings`] value that is loaded once and
//! handed to each component. A TOML file can override any field; missing
//! fields keep their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::error::{CompareError, CompareResult};
use crate::stats::{interval_span, StatsError};

/// Errors in a settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0}")]
    Parse(#[from] toml::de::Error),

    #[error("{field} {message}")]
    InvalidValue { field: &'static str, message: String },

    #[error("rank.ci_samples and rank.ci_level: {0}")]
    CredibleInterval(#[from] StatsError),
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        message: message.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub sdi: SdiSettings,
    pub rank: RankSettings,
    pub logo: LogoSettings,
    pub output: OutputSettings,
}

/// Column statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SdiSettings {
    /// Pseudo-count added to each of the 20 residue counts
    pub pseudocount: f64,
    /// Subtract the small-sample entropy correction from information content
    pub small_sample_correction: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RankSettings {
    pub top: i64,
    /// Posterior draws per consensus credible interval
    pub ci_samples: usize,
    /// Credible interval mass, in (0, 1)
    pub ci_level: f64,
    /// Base seed; each position derives its own stream from it
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogoSettings {
    /// Pixel width of one alignment position
    pub column_width: u32,
    /// Pixel height of each half of the plot
    pub half_height: u32,
    /// Positions drawn at least, so very short ranges stay legible
    pub min_columns: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    /// Directory relative output paths are resolved against
    pub directory: PathBuf,
    pub rank_file: PathBuf,
    pub logo_file: PathBuf,
}

impl Default for SdiSettings {
    fn default() -> Self {
        Self {
            pseudocount: 0.05,
            small_sample_correction: false,
        }
    }
}

impl Default for RankSettings {
    fn default() -> Self {
        Self {
            top: 10,
            ci_samples: 10_000,
            ci_level: 0.95,
            seed: 0x5d1,
        }
    }
}

impl Default for LogoSettings {
    fn default() -> Self {
        Self {
            column_width: 40,
            half_height: 160,
            min_columns: 8,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            rank_file: PathBuf::from("sdi_rank.csv"),
            logo_file: PathBuf::from("comparison.png"),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sdi: SdiSettings::default(),
            rank: RankSettings::default(),
            logo: LogoSettings::default(),
            output: OutputSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> CompareResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| CompareError::io(path, e))?;
        let settings = Self::from_toml_str(&content).map_err(|source| CompareError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "loaded configuration");
        Ok(settings)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sdi.pseudocount > 0.0 && self.sdi.pseudocount.is_finite()) {
            return Err(invalid(
                "sdi.pseudocount",
                format!("must be a positive number (got {})", self.sdi.pseudocount),
            ));
        }
        if !(self.rank.ci_level > 0.0 && self.rank.ci_level < 1.0) {
            return Err(invalid(
                "rank.ci_level",
                format!("must be between 0 and 1 (got {})", self.rank.ci_level),
            ));
        }
        if self.rank.ci_samples < 2 {
            return Err(invalid("rank.ci_samples", "must be at least 2"));
        }
        // The interval must hold at least one sample gap and leave one out.
        interval_span(self.rank.ci_samples, self.rank.ci_level)?;
        if self.logo.column_width < 8 {
            return Err(invalid("logo.column_width", "must be at least 8"));
        }
        if self.logo.half_height < 16 {
            return Err(invalid("logo.half_height", "must be at least 16"));
        }
        Ok(())
    }

    /// Resolve a user-supplied or default output path.
    pub fn resolve_output(&self, requested: Option<&Path>, default: &Path) -> PathBuf {
        let path = requested.unwrap_or(default);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.output.directory.join(path)
        }
    }

    /// Sample configuration with comments.
    pub fn generate_sample() -> String {
        r#"# protein-compare-toolkit.toml
# Command line arguments override these settings.

[sdi]
# Pseudo-count added to each of the 20 amino-acid counts (uninformative prior)
pseudocount = 0.05
# Subtract the small-sample correction (19 / (2 ln2 n)) from information content.
# Leave off for alignments with few sequences: it drives their scores to zero.
small_sample_correction = false

[rank]
# Number of positions reported when [top] is not given
top = 10
# Posterior draws used for each consensus credible interval
ci_samples = 10000
# Credible interval mass
ci_level = 0.95
# Random seed for credible intervals (output is reproducible for a given seed)
seed = 1489

[logo]
# Pixel width of one alignment position
column_width = 40
# Pixel height above (and below) the axis
half_height = 160
# Short ranges are padded to this many positions
min_columns = 8

[output]
# Relative output paths are resolved against this directory
directory = "."
rank_file = "sdi_rank.csv"
logo_file = "comparison.png"
"#
        .to_string()
    }
}
