/// User configuration for the irtcat CLI.
///
/// Lives at ~/.config/irtcat/config.toml. Sections mirror the study file: `[estimator]`
/// tunables are layered over the study's own, `[simulation]` feeds `irtcat simulate`.
/// Every value is optional and a CLI flag always wins.
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::bail;
use crate::study::EstimatorOverrides;

pub const DEFAULT_REPLICATIONS: usize = 100;
pub const DEFAULT_CONCURRENCY: usize = 32;

#[derive(Deserialize, Default, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IrtcatConfig {
    /// Study used when `--study` is absent. Relative paths are taken from the config's directory.
    pub study: Option<PathBuf>,
    #[serde(default)]
    pub estimator: EstimatorSection,
    #[serde(default)]
    pub simulation: SimulationSection,
}

#[derive(Deserialize, Default, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EstimatorSection {
    pub max_iterations: Option<usize>,
    pub tolerance: Option<f64>,
}

#[derive(Deserialize, Default, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SimulationSection {
    pub replications: Option<usize>,
    pub concurrency: Option<usize>,
    pub seed: Option<u64>,
}

/// Simulation settings after merging flags, config and defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationSettings {
    pub replications: usize,
    pub concurrency: usize,
    pub seed: u64,
}

impl IrtcatConfig {
    /// Study to load: the flag, else the configured one.
    pub fn study_path(&self, flag: Option<PathBuf>) -> Option<PathBuf> {
        flag.or_else(|| self.study.clone())
    }
}

impl EstimatorSection {
    pub fn overrides(&self, max_iterations: Option<usize>, tolerance: Option<f64>) -> EstimatorOverrides {
        EstimatorOverrides {
            max_iterations: max_iterations.or(self.max_iterations),
            tolerance: tolerance.or(self.tolerance),
        }
    }
}

impl SimulationSection {
    /// Merge flags over this section. An unset seed is drawn at random.
    pub fn resolve(
        &self,
        replications: Option<usize>,
        concurrency: Option<usize>,
        seed: Option<u64>,
    ) -> Result<SimulationSettings, String> {
        let replications = replications.or(self.replications).unwrap_or(DEFAULT_REPLICATIONS);
        let concurrency = concurrency.or(self.concurrency).unwrap_or(DEFAULT_CONCURRENCY);
        if replications == 0 {
            return Err("replications must be at least 1".to_string());
        }
        if concurrency == 0 {
            return Err("concurrency must be at least 1".to_string());
        }
        Ok(SimulationSettings {
            replications,
            concurrency,
            seed: seed.or(self.seed).unwrap_or_else(rand::random),
        })
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = "\
# irtcat configuration
# All values here can be overridden by CLI flags.

# Study file used when --study is not given.
# Relative paths are resolved from this file's directory.
# study = \"studies/programming_anxiety.toml\"

[estimator]
# Layered over the study file's own [estimator] section.
# max_iterations = 20
# tolerance = 0.001

[simulation]
# Sessions per true theta
# replications = 100
# Max simulated sessions running at once
# concurrency = 32
# Base seed. Unset = random.
# seed = 42
";

/// Returns the default config path: ~/.config/irtcat/config.toml
pub fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| bail("HOME environment variable not set"));
    PathBuf::from(home).join(".config").join("irtcat").join("config.toml")
}

/// Load config from a file path. Returns default (all None) if file doesn't exist.
pub fn load_config(path: &Path) -> IrtcatConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content, path.parent())
            .unwrap_or_else(|e| bail(format!("Failed to parse config at {}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => IrtcatConfig::default(),
        Err(e) => bail(format!("Failed to read config at {}: {e}", path.display())),
    }
}

fn parse_config(content: &str, base_dir: Option<&Path>) -> Result<IrtcatConfig, toml::de::Error> {
    let mut cfg: IrtcatConfig = toml::from_str(content)?;
    if let (Some(study), Some(dir)) = (cfg.study.as_mut(), base_dir) {
        if study.is_relative() {
            *study = dir.join(&*study);
        }
    }
    Ok(cfg)
}

/// Create the default config file at the default path.
pub fn create_default_config() -> PathBuf {
    let path = config_path();
    write_default_config(&path);
    path
}

/// Write the commented template to `path`. Errors if a file is already there.
fn write_default_config(path: &Path) {
    if path.exists() {
        bail(format!("Config file already exists at {}", path.display()));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .unwrap_or_else(|e| bail(format!("Failed to create directory {}: {e}", parent.display())));
    }

    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .unwrap_or_else(|e| bail(format!("Failed to write config to {}: {e}", path.display())));
}
