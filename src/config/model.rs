// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::steps::registry::DEFAULT_PIPELINE_STEPS;
use crate::steps::StepRegistry;
use crate::types::TransportMode;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [dashboard]
/// backend_url = "http://127.0.0.1:5000"
/// transport = "poll"
/// poll_interval = "2s"
///
/// [pipeline]
/// steps = ["qc_raw_fastq", "trim_fastq", "map_fastq_to_bam"]
/// ```
///
/// All sections are optional and have reasonable defaults. Convert into a
/// [`ConfigFile`] (which validates) before use.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Connection settings from `[dashboard]`.
    #[serde(default)]
    pub dashboard: DashboardSection,

    /// Step list from `[pipeline]`.
    #[serde(default)]
    pub pipeline: PipelineSection,
}

/// `[dashboard]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardSection {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// `"stream"` (default) or `"poll"`.
    #[serde(default)]
    pub transport: TransportMode,

    /// Duration string (e.g. `"2s"`, `"500ms"`) between status polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// Duration string bounding each backend request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_poll_interval() -> String {
    "2s".to_string()
}

fn default_request_timeout() -> String {
    "10s".to_string()
}

impl Default for DashboardSection {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            transport: TransportMode::default(),
            poll_interval: default_poll_interval(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// Module identifiers in execution (and display) order.
    #[serde(default = "default_steps")]
    pub steps: Vec<String>,
}

fn default_steps() -> Vec<String> {
    DEFAULT_PIPELINE_STEPS.iter().map(|s| s.to_string()).collect()
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            steps: default_steps(),
        }
    }
}

/// Validated dashboard settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub backend_url: String,
    pub transport: TransportMode,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

/// Validated configuration. Only obtainable through
/// `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub dashboard: DashboardConfig,
    pub registry: StepRegistry,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(dashboard: DashboardConfig, registry: StepRegistry) -> Self {
        Self {
            dashboard,
            registry,
        }
    }
}
