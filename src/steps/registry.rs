// src/steps/registry.rs

use std::collections::HashMap;

use crate::errors::{PipewatchError, Result};
use crate::steps::ModuleName;

/// Steps of the bulk RNA/ATAC/ChIP-seq pipeline, from raw reads to counts.
pub const DEFAULT_PIPELINE_STEPS: [&str; 12] = [
    "qc_raw_fastq",
    "detect_adapters",
    "quantify_adapters",
    "trim_fastq",
    "qc_trimmed_fastq",
    "map_fastq_to_bam",
    "index_bam",
    "dedup_bam",
    "index_dedup_bam",
    "qc_nondedup_bam",
    "aggregate_counts",
    "aggregate_qc_reports",
];

/// Fixed, ordered list of known pipeline modules.
///
/// Built once at startup from configuration. There is no mutation API: the
/// order defines display order and the set defines which identifiers the
/// store will accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRegistry {
    modules: Vec<ModuleName>,
    index: HashMap<ModuleName, usize>,
}

impl StepRegistry {
    /// Build a registry, rejecting empty or duplicate identifiers.
    pub fn new<I, S>(modules: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<ModuleName>,
    {
        let mut list = Vec::new();
        let mut index = HashMap::new();

        for module in modules {
            let module: ModuleName = module.into();
            if module.trim().is_empty() {
                return Err(PipewatchError::ConfigError(
                    "pipeline step names must not be empty".to_string(),
                ));
            }
            if index.insert(module.clone(), list.len()).is_some() {
                return Err(PipewatchError::ConfigError(format!(
                    "pipeline step '{module}' is listed more than once"
                )));
            }
            list.push(module);
        }

        if list.is_empty() {
            return Err(PipewatchError::ConfigError(
                "pipeline must contain at least one step".to_string(),
            ));
        }

        Ok(Self {
            modules: list,
            index,
        })
    }

    /// Registry of the default bulk pipeline steps.
    pub fn bulk_pipeline() -> Self {
        let modules: Vec<ModuleName> =
            DEFAULT_PIPELINE_STEPS.iter().map(|s| s.to_string()).collect();
        let index = modules
            .iter()
            .enumerate()
            .map(|(i, m)| (m.clone(), i))
            .collect();
        Self { modules, index }
    }

    /// Modules in display order.
    pub fn list(&self) -> &[ModuleName] {
        &self.modules
    }

    pub fn contains(&self, module: &str) -> bool {
        self.index.contains_key(module)
    }

    /// Display position of a module, if known.
    pub fn position(&self, module: &str) -> Option<usize> {
        self.index.get(module).copied()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
