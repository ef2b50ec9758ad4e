// src/config/validate.rs

use std::time::Duration;

use reqwest::Url;

use crate::config::model::{ConfigFile, DashboardConfig, RawConfigFile};
use crate::errors::{PipewatchError, Result};
use crate::steps::StepRegistry;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PipewatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let dashboard = validate_dashboard(&raw)?;
        validate_step_names(&raw)?;
        let registry = StepRegistry::new(raw.pipeline.steps)?;
        Ok(ConfigFile::new_unchecked(dashboard, registry))
    }
}

fn validate_dashboard(cfg: &RawConfigFile) -> Result<DashboardConfig> {
    // transport is strongly typed and validated during deserialization, so we
    // don't need to check it here.
    let section = &cfg.dashboard;

    let url = Url::parse(&section.backend_url).map_err(|e| {
        PipewatchError::ConfigError(format!(
            "[dashboard].backend_url '{}' is not a valid URL: {}",
            section.backend_url, e
        ))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PipewatchError::ConfigError(format!(
            "[dashboard].backend_url must use http or https (got '{}')",
            url.scheme()
        )));
    }

    let poll_interval = non_zero_duration("poll_interval", &section.poll_interval)?;
    let request_timeout = non_zero_duration("request_timeout", &section.request_timeout)?;

    Ok(DashboardConfig {
        backend_url: section.backend_url.trim_end_matches('/').to_string(),
        transport: section.transport,
        poll_interval,
        request_timeout,
    })
}

fn validate_step_names(cfg: &RawConfigFile) -> Result<()> {
    for step in cfg.pipeline.steps.iter() {
        if step.chars().any(char::is_whitespace) {
            return Err(PipewatchError::ConfigError(format!(
                "pipeline step '{}' must not contain whitespace",
                step
            )));
        }
    }
    Ok(())
}

fn non_zero_duration(field: &str, value: &str) -> Result<Duration> {
    let duration = parse_duration(value)
        .map_err(|e| PipewatchError::ConfigError(format!("[dashboard].{field}: {e}")))?;
    if duration.is_zero() {
        return Err(PipewatchError::ConfigError(format!(
            "[dashboard].{field} must be greater than zero"
        )));
    }
    Ok(duration)
}

/// Parse a duration string like `"500ms"`, `"2s"`, `"1m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => scaled_secs(value, 60),
        "h" => scaled_secs(value, 60 * 60),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}

fn scaled_secs(value: u64, factor: u64) -> std::result::Result<Duration, String> {
    value
        .checked_mul(factor)
        .map(Duration::from_secs)
        .ok_or_else(|| "duration too large".to_string())
}
