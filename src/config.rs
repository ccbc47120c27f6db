use crate::engine::{OcrOptions, DEFAULT_LANGUAGE, DEFAULT_OCR_TIMEOUT};
use crate::engines::{google_vision, ocr_space};
use crate::error::MeterError;
use crate::extract::{Strategy, DEFAULT_DIGITS};
use crate::preprocessing::{FilterStrategy, RoiSpec, DEFAULT_KERNEL_SIZE};
use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "meter-ocr-server")]
#[command(about = "Extracts utility meter readings from uploaded photos")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "METER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "METER_PORT", default_value = "9292")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 20MB)
    #[arg(long, env = "METER_MAX_FILE_SIZE", default_value = "20971520")]
    pub max_file_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Default OCR engine (ocr-space, google-vision, ocrs, tesseract); first available if unset
    #[arg(long, env = "METER_OCR_ENGINE")]
    pub engine: Option<String>,

    /// OCR language code (e.g. "eng")
    #[arg(long, env = "METER_OCR_LANGUAGE", default_value = DEFAULT_LANGUAGE)]
    pub language: String,

    /// Timeout for a single OCR call, in seconds
    #[arg(long, env = "METER_OCR_TIMEOUT_SECS", default_value = "30")]
    pub ocr_timeout_secs: u64,

    /// OCR.space API key; the engine is disabled without one
    #[arg(long, env = "OCR_API_KEY", hide_env_values = true)]
    pub ocr_space_api_key: Option<String>,

    /// OCR.space endpoint
    #[arg(long, env = "OCR_SPACE_URL", default_value = ocr_space::DEFAULT_URL)]
    pub ocr_space_url: String,

    /// OCR.space recognition engine (1, 2 or 3)
    #[arg(long, env = "OCR_SPACE_ENGINE", default_value_t = ocr_space::DEFAULT_ENGINE_MODE)]
    pub ocr_space_engine: u8,

    /// Google Cloud Vision API key; the engine is disabled without one
    #[arg(long, env = "GOOGLE_VISION_API_KEY", hide_env_values = true)]
    pub google_vision_api_key: Option<String>,

    /// Google Cloud Vision annotate endpoint
    #[arg(long, env = "GOOGLE_VISION_URL", default_value = google_vision::DEFAULT_URL)]
    pub google_vision_url: String,

    /// Path to tessdata directory (downloaded to the cache if not set)
    #[arg(long, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Region of interest, as fractions of the image height/width
    #[arg(long, env = "METER_ROI_TOP", default_value_t = RoiSpec::default().top)]
    pub roi_top: f64,

    #[arg(long, env = "METER_ROI_BOTTOM", default_value_t = RoiSpec::default().bottom)]
    pub roi_bottom: f64,

    #[arg(long, env = "METER_ROI_LEFT", default_value_t = RoiSpec::default().left)]
    pub roi_left: f64,

    #[arg(long, env = "METER_ROI_RIGHT", default_value_t = RoiSpec::default().right)]
    pub roi_right: f64,

    /// Noise filter (none, gaussian, box, median, adaptive-threshold)
    #[arg(long, env = "METER_FILTER", default_value = "gaussian")]
    pub filter: FilterStrategy,

    /// Smoothing kernel size (odd)
    #[arg(long, env = "METER_KERNEL_SIZE", default_value_t = DEFAULT_KERNEL_SIZE)]
    pub kernel_size: u32,

    /// Number of digits on the meter register
    #[arg(long, env = "METER_DIGITS", default_value_t = DEFAULT_DIGITS)]
    pub digits: usize,

    /// Extraction strategies in the order they are tried
    #[arg(
        long,
        env = "METER_STRATEGIES",
        value_delimiter = ',',
        default_value = "spaced,contiguous,pool"
    )]
    pub strategies: Vec<Strategy>,

    /// Write every normalized image here (for tuning the ROI)
    #[arg(long, env = "METER_DEBUG_DIR")]
    pub debug_dir: Option<PathBuf>,
}

/// OCR.space settings
#[derive(Debug, Clone)]
pub struct OcrSpaceConfig {
    pub api_key: Option<String>,
    pub url: String,
    pub engine_mode: u8,
}

/// Google Cloud Vision settings
#[derive(Debug, Clone)]
pub struct GoogleVisionConfig {
    pub api_key: Option<String>,
    pub url: String,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub default_engine: Option<String>,
    pub language: String,
    pub ocr_timeout: Duration,
    pub ocr_space: OcrSpaceConfig,
    pub google_vision: GoogleVisionConfig,
    pub tessdata_path: Option<String>,
    pub roi: RoiSpec,
    pub filter: FilterStrategy,
    pub kernel_size: u32,
    pub digits: usize,
    pub strategies: Vec<Strategy>,
    pub debug_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9292,
            max_file_size: 20 * 1024 * 1024,
            default_engine: None,
            language: DEFAULT_LANGUAGE.to_string(),
            ocr_timeout: DEFAULT_OCR_TIMEOUT,
            ocr_space: OcrSpaceConfig {
                api_key: None,
                url: ocr_space::DEFAULT_URL.to_string(),
                engine_mode: ocr_space::DEFAULT_ENGINE_MODE,
            },
            google_vision: GoogleVisionConfig {
                api_key: None,
                url: google_vision::DEFAULT_URL.to_string(),
            },
            tessdata_path: None,
            roi: RoiSpec::default(),
            filter: FilterStrategy::default(),
            kernel_size: DEFAULT_KERNEL_SIZE,
            digits: DEFAULT_DIGITS,
            strategies: Strategy::default_order(),
            debug_dir: None,
        }
    }
}

impl Config {
    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), MeterError> {
        self.roi
            .validate()
            .map_err(|e| MeterError::InvalidConfig(format!("default ROI: {}", e)))?;

        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(MeterError::InvalidConfig(format!(
                "kernel size must be odd and at least 1, got {}",
                self.kernel_size
            )));
        }
        if self.digits == 0 {
            return Err(MeterError::InvalidConfig(
                "digit count must be at least 1".to_string(),
            ));
        }
        if self.strategies.is_empty() {
            return Err(MeterError::InvalidConfig(
                "at least one extraction strategy is required".to_string(),
            ));
        }
        let unique: HashSet<_> = self.strategies.iter().collect();
        if unique.len() != self.strategies.len() {
            return Err(MeterError::InvalidConfig(
                "extraction strategies must not repeat".to_string(),
            ));
        }
        if !(1..=3).contains(&self.ocr_space.engine_mode) {
            return Err(MeterError::InvalidConfig(format!(
                "OCR.space engine must be 1, 2 or 3, got {}",
                self.ocr_space.engine_mode
            )));
        }
        if self.ocr_timeout.is_zero() {
            return Err(MeterError::InvalidConfig(
                "OCR timeout must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Options for OCR calls made with this configuration
    pub fn ocr_options(&self) -> OcrOptions {
        OcrOptions {
            language: self.language.clone(),
            timeout: self.ocr_timeout,
            ..OcrOptions::default()
        }
    }
}

/// Blank strings from the environment mean "not set"
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<Args> for Config {
    type Error = MeterError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let config = Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
            default_engine: non_empty(args.engine),
            language: args.language,
            ocr_timeout: Duration::from_secs(args.ocr_timeout_secs),
            ocr_space: OcrSpaceConfig {
                api_key: non_empty(args.ocr_space_api_key),
                url: args.ocr_space_url,
                engine_mode: args.ocr_space_engine,
            },
            google_vision: GoogleVisionConfig {
                api_key: non_empty(args.google_vision_api_key),
                url: args.google_vision_url,
            },
            tessdata_path: non_empty(args.tessdata_path),
            roi: RoiSpec {
                top: args.roi_top,
                bottom: args.roi_bottom,
                left: args.roi_left,
                right: args.roi_right,
            },
            filter: args.filter,
            kernel_size: args.kernel_size,
            digits: args.digits,
            strategies: args.strategies,
            debug_dir: args.debug_dir,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, MeterError> {
        let mut argv = vec!["meter-ocr-server"];
        argv.extend_from_slice(args);
        Config::try_from(Args::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.roi, RoiSpec::default());
        assert_eq!(config.filter, FilterStrategy::Gaussian);
        assert_eq!(config.kernel_size, 3);
        assert_eq!(config.digits, 5);
        assert_eq!(config.strategies, Strategy::default_order());
        assert_eq!(config.ocr_space.engine_mode, 2);
        assert_eq!(config.ocr_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = parse(&[
            "--roi-top",
            "0.3",
            "--roi-bottom",
            "0.7",
            "--filter",
            "median",
            "--kernel-size",
            "5",
            "--digits",
            "6",
            "--strategies",
            "contiguous,pool",
        ])
        .unwrap();
        assert_eq!(config.roi.top, 0.3);
        assert_eq!(config.roi.bottom, 0.7);
        assert_eq!(config.filter, FilterStrategy::Median);
        assert_eq!(config.kernel_size, 5);
        assert_eq!(config.digits, 6);
        assert_eq!(config.strategies, vec![Strategy::Contiguous, Strategy::Pool]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(parse(&["--kernel-size", "4"]).is_err());
        assert!(parse(&["--digits", "0"]).is_err());
        assert!(parse(&["--roi-top", "0.8"]).is_err());
        assert!(parse(&["--strategies", "pool,pool"]).is_err());
        assert!(parse(&["--ocr-space-engine", "7"]).is_err());
    }

    #[test]
    fn test_unknown_strategy_is_parse_error() {
        assert!(Args::try_parse_from(["meter-ocr-server", "--strategies", "guess"]).is_err());
    }

    #[test]
    fn test_blank_api_key_is_unset() {
        let config = parse(&["--ocr-space-api-key", "  "]).unwrap();
        assert!(config.ocr_space.api_key.is_none());
    }
}
