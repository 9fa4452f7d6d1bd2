//! Configuration of a [`ReadStream`](crate::stream::ReadStream): which
//! quality-control stages are enabled, how barcodes are obtained and how many
//! records are used for calibration.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Read;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::qc::{DEFAULT_LOW_COMPLEXITY, DEFAULT_MAX_N, DEFAULT_MIN_LEN};
use crate::quality::STREAM_SAMPLE_SIZE;

/// Highest canonical quality score representable in printable ASCII.
pub const MAX_QUALITY_SCORE: f64 = 93.0;

/// Error occurring when building or validating a [`ReadStreamConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// The option name is not recognized.
    UnknownOption(String),
    /// The option requires a value, but none was given.
    MissingValue(String),
    /// The option value could not be parsed.
    InvalidValue { key: String, value: String },
    /// The option value is outside of the accepted range.
    OutOfRange { key: &'static str, value: String },
    /// The option is only meaningful together with another one.
    MissingCompanion {
        key: &'static str,
        companion: &'static str,
    },
    /// The JSON configuration file could not be deserialized.
    JsonError(serde_json::Error),
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::JsonError(e)
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::UnknownOption(key) => write!(f, "Unknown option: {}", key),
            ConfigError::MissingValue(key) => write!(f, "Option {} requires a value", key),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "Invalid value for option {}: {}", key, value)
            }
            ConfigError::OutOfRange { key, value } => {
                write!(f, "Value out of range for option {}: {}", key, value)
            }
            ConfigError::MissingCompanion { key, companion } => {
                write!(f, "Option {} requires option {}", key, companion)
            }
            ConfigError::JsonError(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where the barcode catalog comes from.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(from = "String")]
pub enum BarcodeSource {
    /// Learn the catalog from the calibration sample.
    Learn,
    /// Load a reference barcode list.
    File(PathBuf),
}

impl From<String> for BarcodeSource {
    fn from(value: String) -> Self {
        match value.as_str() {
            "learn" | "auto" => BarcodeSource::Learn,
            _ => BarcodeSource::File(PathBuf::from(value)),
        }
    }
}

impl From<&str> for BarcodeSource {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl Display for BarcodeSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BarcodeSource::Learn => write!(f, "learn"),
            BarcodeSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Options of a [`ReadStream`](crate::stream::ReadStream).
///
/// Setters follow the builder style and can be chained:
/// ```
/// use readdb::config::ReadStreamConfig;
///
/// let mut config = ReadStreamConfig::new();
/// config.trim3(true).quality_window(5, 20.0).min_len(30);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadStreamConfig {
    trim3: bool,
    #[serde(rename = "trimN")]
    trim_n: bool,
    winsize: Option<usize>,
    meanq: Option<f64>,
    minlen: Option<usize>,
    maxn: Option<usize>,
    low_complexity: Option<f64>,
    low_q: Option<i32>,
    max_num_low_q: Option<usize>,
    min_mean_q: Option<f64>,
    roche_mid_len: Option<usize>,
    barcodes_file: Option<BarcodeSource>,
    barcodes_seq_col: usize,
    barcodes_label_col: Option<usize>,
    sample_size: usize,
}

impl ReadStreamConfig {
    /// Configuration with every quality-control stage disabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trim3: false,
            trim_n: false,
            winsize: None,
            meanq: None,
            minlen: None,
            maxn: None,
            low_complexity: None,
            low_q: None,
            max_num_low_q: None,
            min_mean_q: None,
            roche_mid_len: None,
            barcodes_file: None,
            barcodes_seq_col: 1,
            barcodes_label_col: None,
            sample_size: STREAM_SAMPLE_SIZE,
        }
    }

    /// Reads a JSON object whose keys are the option names and validates it.
    pub fn from_json_reader<R: Read>(reader: R) -> ConfigResult<Self> {
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;

        Ok(config)
    }

    pub fn trim3(&mut self, trim3: bool) -> &mut Self {
        self.trim3 = trim3;
        self
    }

    pub fn trim_n(&mut self, trim_n: bool) -> &mut Self {
        self.trim_n = trim_n;
        self
    }

    pub fn quality_window(&mut self, window: usize, mean_threshold: f64) -> &mut Self {
        self.winsize = Some(window);
        self.meanq = Some(mean_threshold);
        self
    }

    pub fn min_len(&mut self, min_len: usize) -> &mut Self {
        self.minlen = Some(min_len);
        self
    }

    pub fn max_n(&mut self, max_n: usize) -> &mut Self {
        self.maxn = Some(max_n);
        self
    }

    pub fn low_complexity(&mut self, threshold: f64) -> &mut Self {
        self.low_complexity = Some(threshold);
        self
    }

    pub fn low_quality(&mut self, min_q: i32, max_count: usize) -> &mut Self {
        self.low_q = Some(min_q);
        self.max_num_low_q = Some(max_count);
        self
    }

    pub fn mean_quality_filter(&mut self, min_mean_q: f64) -> &mut Self {
        self.min_mean_q = Some(min_mean_q);
        self
    }

    pub fn roche_mid_len(&mut self, len: usize) -> &mut Self {
        self.roche_mid_len = Some(len);
        self
    }

    pub fn barcodes<T: Into<BarcodeSource>>(&mut self, source: T) -> &mut Self {
        self.barcodes_file = Some(source.into());
        self
    }

    /// Sets the 1-based columns of a tabular barcode file.
    pub fn barcode_columns(&mut self, seq_col: usize, label_col: Option<usize>) -> &mut Self {
        self.barcodes_seq_col = seq_col;
        self.barcodes_label_col = label_col;
        self
    }

    pub fn sample_size(&mut self, sample_size: usize) -> &mut Self {
        self.sample_size = sample_size;
        self
    }

    /// Sets an option given as `key[=value]`.
    pub fn apply_option(&mut self, option: &str) -> ConfigResult<&mut Self> {
        match option.split_once('=') {
            Some((key, value)) => self.set_option(key.trim(), Some(value.trim())),
            None => self.set_option(option.trim(), None),
        }
    }

    /// Sets an option by its name. A missing value enables the option with
    /// its default where one exists.
    pub fn set_option(&mut self, key: &str, value: Option<&str>) -> ConfigResult<&mut Self> {
        match key {
            "trim3" => self.trim3 = parse_flag(key, value)?,
            "trimN" => self.trim_n = parse_flag(key, value)?,
            "winsize" => self.winsize = Some(parse_value(key, value)?),
            "meanq" => self.meanq = Some(parse_value(key, value)?),
            "minlen" => self.minlen = Some(parse_or_default(key, value, DEFAULT_MIN_LEN)?),
            "maxn" => self.maxn = Some(parse_or_default(key, value, DEFAULT_MAX_N)?),
            "low_complexity" => {
                self.low_complexity = Some(parse_or_default(key, value, DEFAULT_LOW_COMPLEXITY)?)
            }
            "low_q" => self.low_q = Some(parse_value(key, value)?),
            "max_num_low_q" => self.max_num_low_q = Some(parse_value(key, value)?),
            "min_mean_q" => self.min_mean_q = Some(parse_value(key, value)?),
            "roche_mid_len" => self.roche_mid_len = Some(parse_value(key, value)?),
            "barcodes_file" => {
                self.barcodes_file = Some(value.map_or(BarcodeSource::Learn, BarcodeSource::from))
            }
            "barcodes_seq_col" => self.barcodes_seq_col = parse_value(key, value)?,
            "barcodes_label_col" => self.barcodes_label_col = Some(parse_value(key, value)?),
            "sample_size" => self.sample_size = parse_value(key, value)?,
            _ => return Err(ConfigError::UnknownOption(key.to_owned())),
        }

        Ok(self)
    }

    /// Checks value ranges and option dependencies.
    pub fn validate(&self) -> ConfigResult<()> {
        match (self.winsize, self.meanq) {
            (Some(winsize), Some(meanq)) => {
                check_range("winsize", winsize, winsize >= 1)?;
                check_quality("meanq", meanq)?;
            }
            (Some(_), None) => return Err(missing_companion("winsize", "meanq")),
            (None, Some(_)) => return Err(missing_companion("meanq", "winsize")),
            (None, None) => {}
        }

        if let Some(minlen) = self.minlen {
            check_range("minlen", minlen, minlen >= 1)?;
        }
        if let Some(threshold) = self.low_complexity {
            check_range("low_complexity", threshold, threshold > 0.0 && threshold <= 1.0)?;
        }

        match (self.low_q, self.max_num_low_q) {
            (Some(low_q), Some(_)) => check_quality("low_q", f64::from(low_q))?,
            (Some(_), None) => return Err(missing_companion("low_q", "max_num_low_q")),
            (None, Some(_)) => return Err(missing_companion("max_num_low_q", "low_q")),
            (None, None) => {}
        }

        if let Some(min_mean_q) = self.min_mean_q {
            check_quality("min_mean_q", min_mean_q)?;
        }
        if let Some(len) = self.roche_mid_len {
            check_range("roche_mid_len", len, len >= 1)?;
        }

        check_range(
            "barcodes_seq_col",
            self.barcodes_seq_col,
            self.barcodes_seq_col >= 1,
        )?;
        if let Some(label_col) = self.barcodes_label_col {
            check_range(
                "barcodes_label_col",
                label_col,
                label_col >= 1 && label_col != self.barcodes_seq_col,
            )?;
        }
        check_range("sample_size", self.sample_size, self.sample_size >= 1)?;

        Ok(())
    }

    #[must_use]
    pub fn get_trim3(&self) -> bool {
        self.trim3
    }

    #[must_use]
    pub fn get_trim_n(&self) -> bool {
        self.trim_n
    }

    /// Window size and mean threshold of the sliding-window trim.
    #[must_use]
    pub fn get_quality_window(&self) -> Option<(usize, f64)> {
        self.winsize.zip(self.meanq)
    }

    #[must_use]
    pub fn get_min_len(&self) -> Option<usize> {
        self.minlen
    }

    #[must_use]
    pub fn get_max_n(&self) -> Option<usize> {
        self.maxn
    }

    #[must_use]
    pub fn get_low_complexity(&self) -> Option<f64> {
        self.low_complexity
    }

    /// Minimum score and the number of bases allowed below it.
    #[must_use]
    pub fn get_low_quality(&self) -> Option<(i32, usize)> {
        self.low_q.zip(self.max_num_low_q)
    }

    #[must_use]
    pub fn get_min_mean_quality(&self) -> Option<f64> {
        self.min_mean_q
    }

    #[must_use]
    pub fn get_roche_mid_len(&self) -> Option<usize> {
        self.roche_mid_len
    }

    #[must_use]
    pub fn get_barcodes(&self) -> Option<&BarcodeSource> {
        self.barcodes_file.as_ref()
    }

    #[must_use]
    pub fn get_barcode_seq_col(&self) -> usize {
        self.barcodes_seq_col
    }

    #[must_use]
    pub fn get_barcode_label_col(&self) -> Option<usize> {
        self.barcodes_label_col
    }

    #[must_use]
    pub fn get_sample_size(&self) -> usize {
        self.sample_size
    }
}

impl Default for ReadStreamConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_flag(key: &str, value: Option<&str>) -> ConfigResult<bool> {
    match value {
        None | Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(value) => Err(invalid_value(key, value)),
    }
}

fn parse_value<T: FromStr>(key: &str, value: Option<&str>) -> ConfigResult<T> {
    let value = value.ok_or_else(|| ConfigError::MissingValue(key.to_owned()))?;
    value.parse().map_err(|_| invalid_value(key, value))
}

fn parse_or_default<T: FromStr>(key: &str, value: Option<&str>, default: T) -> ConfigResult<T> {
    match value {
        Some(_) => parse_value(key, value),
        None => Ok(default),
    }
}

fn invalid_value(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
    }
}

fn missing_companion(key: &'static str, companion: &'static str) -> ConfigError {
    ConfigError::MissingCompanion { key, companion }
}

fn check_range<T: Display>(key: &'static str, value: T, valid: bool) -> ConfigResult<()> {
    if valid {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            key,
            value: value.to_string(),
        })
    }
}

fn check_quality(key: &'static str, value: f64) -> ConfigResult<()> {
    check_range(
        key,
        value,
        value.is_finite() && (0.0..=MAX_QUALITY_SCORE).contains(&value),
    )
}
