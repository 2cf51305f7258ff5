use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub chart: ChartConfig,
}

/// Upload decoding and delimited-text parsing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoaderConfig {
    /// Encoding label tried once when the upload is not valid UTF-8.
    #[serde(default = "default_fallback_encoding")]
    pub fallback_encoding: String,

    /// A single character, or "auto" to sniff the delimiter from the data.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

/// Peak detection and report formatting
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// Minimum prominence = factor × sample standard deviation.
    #[serde(default = "default_prominence_factor")]
    pub prominence_factor: f64,

    #[serde(default = "default_display_decimals")]
    pub display_decimals: usize,
}

/// Chart construction defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChartConfig {
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,

    #[serde(default = "default_moving_average_windows")]
    pub moving_average_windows: Vec<usize>,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_fallback_encoding() -> String {
    "euc-kr".to_string()
}
fn default_delimiter() -> String {
    ",".to_string()
}
fn default_prominence_factor() -> f64 {
    0.5
}
fn default_display_decimals() -> usize {
    2
}
fn default_histogram_bins() -> usize {
    20
}
fn default_moving_average_windows() -> Vec<usize> {
    vec![20, 50]
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            fallback_encoding: default_fallback_encoding(),
            delimiter: default_delimiter(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            prominence_factor: default_prominence_factor(),
            display_decimals: default_display_decimals(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            histogram_bins: default_histogram_bins(),
            moving_average_windows: default_moving_average_windows(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            loader: LoaderConfig::default(),
            analysis: AnalysisConfig::default(),
            chart: ChartConfig::default(),
        }
    }
}

impl LoaderConfig {
    /// `None` means "sniff the delimiter from the content".
    pub fn delimiter_byte(&self) -> Option<u8> {
        let d = self.delimiter.trim_matches(' ');
        if d.eq_ignore_ascii_case("auto") {
            return None;
        }
        if d == "\\t" || d.eq_ignore_ascii_case("tab") {
            return Some(b'\t');
        }
        match d.as_bytes() {
            [b] => Some(*b),
            _ => {
                warn!("Unusable delimiter {:?}, falling back to ','", self.delimiter);
                Some(b',')
            }
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("PEAK").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|e| {
            warn!("Invalid configuration ({}), using defaults", e);
            AppConfig::default()
        });
        Ok(app_cfg)
    }
}
