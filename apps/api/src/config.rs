use std::str::FromStr;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use thiserror::Error;

use crate::layout::estimator::Calibration;
use crate::layout::geometry::PageMargin;
use crate::render::rasterizer::ExportOptions;

/// Which `PageCapturer` backs the export endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Decode the canvas snapshots the editor attaches to each page.
    Snapshot,
    /// Paint section boxes; needs no snapshots.
    Wireframe,
}

#[derive(Debug, Error)]
#[error("unknown capture mode '{0}', expected 'snapshot' or 'wireframe'")]
pub struct UnknownCaptureMode(String);

impl FromStr for CaptureMode {
    type Err = UnknownCaptureMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snapshot" => Ok(CaptureMode::Snapshot),
            "wireframe" => Ok(CaptureMode::Wireframe),
            other => Err(UnknownCaptureMode(other.to_string())),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Every variable is optional; invalid values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub page_margin_mm: f64,
    pub export_scale: f64,
    pub export_quality: u8,
    pub reconcile_settle_ms: u64,
    pub capture_mode: CaptureMode,
    /// Height estimator costs; overridden from `HEIGHT_CALIBRATION_FILE`.
    pub calibration: Calibration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Config {
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            page_margin_mm: parse_or(&lookup, "PAGE_MARGIN_MM", 10.0)?,
            export_scale: parse_or(&lookup, "EXPORT_SCALE", 2.0)?,
            export_quality: parse_or(&lookup, "EXPORT_QUALITY", 95)?,
            reconcile_settle_ms: parse_or(&lookup, "RECONCILE_SETTLE_MS", 100)?,
            capture_mode: parse_or(&lookup, "CAPTURE_MODE", CaptureMode::Snapshot)?,
            calibration: match lookup("HEIGHT_CALIBRATION_FILE") {
                Some(path) => load_calibration(&path)?,
                None => Calibration::default(),
            },
        };

        ensure!(
            (0.0..100.0).contains(&config.page_margin_mm),
            "PAGE_MARGIN_MM must be in [0, 100), got {}",
            config.page_margin_mm
        );
        ensure!(
            config.export_scale.is_finite() && config.export_scale > 0.0,
            "EXPORT_SCALE must be a positive number, got {}",
            config.export_scale
        );
        ensure!(
            (1..=100).contains(&config.export_quality),
            "EXPORT_QUALITY must be between 1 and 100, got {}",
            config.export_quality
        );
        ensure!(
            config.calibration.unit_to_mm > 0.0 && config.calibration.reference_width_mm > 0.0,
            "Height calibration needs positive unit_to_mm and reference_width_mm"
        );
        Ok(config)
    }

    pub fn default_margin(&self) -> PageMargin {
        PageMargin::uniform(self.page_margin_mm)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile_settle_ms)
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            scale: self.export_scale,
            quality: self.export_quality,
            margin: self.default_margin(),
            ..Default::default()
        }
    }
}

fn load_calibration(path: &str) -> Result<Calibration> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read height calibration file '{path}'"))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Height calibration file '{path}' is not valid JSON"))
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
