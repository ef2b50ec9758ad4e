#![allow(dead_code)]

use pipewatch::config::{ConfigFile, RawConfigFile};
use pipewatch::steps::{StepRegistry, StepStateStore};
use pipewatch::types::TransportMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn backend_url(mut self, url: &str) -> Self {
        self.config.dashboard.backend_url = url.to_string();
        self
    }

    pub fn transport(mut self, mode: TransportMode) -> Self {
        self.config.dashboard.transport = mode;
        self
    }

    pub fn poll_interval(mut self, interval: &str) -> Self {
        self.config.dashboard.poll_interval = interval.to_string();
        self
    }

    pub fn request_timeout(mut self, timeout: &str) -> Self {
        self.config.dashboard.request_timeout = timeout.to_string();
        self
    }

    pub fn steps(mut self, steps: &[&str]) -> Self {
        self.config.pipeline.steps = steps.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Store over the default bulk pipeline steps.
pub fn bulk_store() -> StepStateStore {
    StepStateStore::new(StepRegistry::bulk_pipeline())
}

/// Store over an explicit step list.
pub fn store_with(steps: &[&str]) -> StepStateStore {
    let registry = StepRegistry::new(steps.iter().copied()).expect("valid step list");
    StepStateStore::new(registry)
}
