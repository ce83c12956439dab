use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{info, warn};

use crate::error::ConfigError;

// Include default mappings at compile time
const DEFAULT_PIPELINES_BYTES: &[u8] = include_bytes!("../default_pipelines.txt");

pub const DEFAULT_PIPELINE_FILE: &str = "pipelines.txt";

/// Label that selects every record regardless of pipeline.
pub const WILDCARD: &str = "All";

/// Coarse pipeline labels and the underlying source values each one covers,
/// e.g. `Sales => [Campaigns, Referrals]`. Read once at startup and shared by
/// every view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineTable {
    groups: Vec<(String, Vec<String>)>,
}

impl PipelineTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Mappings compiled into the binary.
    pub fn builtin() -> Result<Self> {
        let content = std::str::from_utf8(DEFAULT_PIPELINES_BYTES)
            .context("Failed to decode embedded default pipelines")?;
        let mut table = Self::empty();
        for (line_num, line) in content.lines().enumerate() {
            table.push_line(line_num + 1, line)?;
        }
        Ok(table)
    }

    pub fn get(&self, label: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, values)| values.as_slice())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Parses one mapping line and adds it. Blank lines and comments are
    /// accepted and ignored.
    fn push_line(&mut self, line_num: usize, line: &str) -> Result<(), ConfigError> {
        if let Some((label, values)) = parse_mapping(line_num, line)? {
            if label == WILDCARD {
                return Err(ConfigError::ReservedLabel {
                    label,
                    line: line_num,
                });
            }
            if self.get(&label).is_some() {
                return Err(ConfigError::DuplicateLabel {
                    label,
                    line: line_num,
                });
            }
            self.groups.push((label, values));
        }
        Ok(())
    }
}

fn mapping_pattern() -> &'static Regex {
    static MAPPING: OnceLock<Regex> = OnceLock::new();
    MAPPING.get_or_init(|| {
        Regex::new(r"^([^=]+?)\s*=\s*(.*)$").expect("mapping pattern is valid")
    })
}

fn parse_mapping(
    line_num: usize,
    line: &str,
) -> Result<Option<(String, Vec<String>)>, ConfigError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let captures = mapping_pattern()
        .captures(line)
        .ok_or_else(|| ConfigError::InvalidMapping {
            line: line_num,
            reason: "expected `Label = Value, Value`".to_string(),
        })?;

    let label = captures[1].trim().to_string();
    let values: Vec<String> = captures[2]
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();

    if values.is_empty() {
        return Err(ConfigError::InvalidMapping {
            line: line_num,
            reason: format!("label '{}' maps to no values", label),
        });
    }

    Ok(Some((label, values)))
}

pub fn load_pipeline_table(pipeline_file_path: Option<&Path>) -> Result<PipelineTable> {
    load_pipeline_table_from(pipeline_file_path, Path::new(DEFAULT_PIPELINE_FILE))
}

/// Explicit file (strict) → default file (lenient) → embedded defaults.
fn load_pipeline_table_from(
    pipeline_file_path: Option<&Path>,
    default_file: &Path,
) -> Result<PipelineTable> {
    let start_time = Instant::now();
    info!(
        action = "start",
        component = "pipeline_loading",
        "Starting pipeline mapping loading"
    );

    let mut table = PipelineTable::empty();

    if let Some(path) = pipeline_file_path {
        info!(action = "load", component = "pipeline_file", file_path = ?path, "Loading pipelines from specified file");
        if !path.exists() {
            anyhow::bail!("Pipeline file not found: {:?}", path);
        }

        let content = fs::read_to_string(path)?;
        for (line_num, line) in content.lines().enumerate() {
            table
                .push_line(line_num + 1, line)
                .with_context(|| format!("Invalid pipeline file {:?}", path))?;
        }
        info!(action = "loaded", component = "pipeline_file", pipeline_count = table.len(), file_path = ?path, "Loaded pipelines from file");
    } else {
        if default_file.exists() {
            info!(action = "load", component = "default_pipeline_file", file_path = ?default_file, "Loading pipelines from default file");
            let content = fs::read_to_string(default_file)?;
            for (line_num, line) in content.lines().enumerate() {
                if let Err(e) = table.push_line(line_num + 1, line) {
                    warn!(action = "parse", component = "pipeline_mapping", line_number = line_num + 1, error = %e, "Skipping pipeline mapping");
                }
            }
            info!(action = "loaded", component = "default_pipeline_file", pipeline_count = table.len(), file_path = ?default_file, "Loaded pipelines from default file");
        }

        if table.is_empty() {
            info!(
                action = "load",
                component = "embedded_pipelines",
                "Using embedded default pipelines"
            );
            table = PipelineTable::builtin()?;
            info!(
                action = "loaded",
                component = "embedded_pipelines",
                pipeline_count = table.len(),
                "Loaded pipelines from embedded defaults"
            );
        }
    }

    info!(
        action = "complete",
        component = "pipeline_loading",
        pipeline_count = table.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Pipeline mappings ready"
    );
    Ok(table)
}

pub fn init_default_pipelines() -> Result<()> {
    init_default_pipelines_at(Path::new(DEFAULT_PIPELINE_FILE))?;
    println!("Created {} with default pipelines", DEFAULT_PIPELINE_FILE);
    Ok(())
}

fn init_default_pipelines_at(target: &Path) -> Result<()> {
    if target.exists() {
        anyhow::bail!(
            "{:?} already exists. Remove it first if you want to reinitialize.",
            target
        );
    }

    let default_content = std::str::from_utf8(DEFAULT_PIPELINES_BYTES)
        .context("Failed to decode embedded default pipelines")?;

    fs::write(target, default_content)?;
    Ok(())
}
