/// Study file loading.
///
/// A study file is TOML: the response scale, the calibrated items with their display
/// text, and the administration plan. It is read once at startup and turned into a
/// shared `Study`; item text and scale labels stay here, on the UI side.
use irtcat_core::{EstimatorOptions, Item, ItemBank, ItemIndex, ItemPhase, SessionDesign, Study};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::bail;

fn default_max_category() -> u8 {
    irtcat_core::constants::DEFAULT_MAX_CATEGORY
}

fn default_adaptive_length() -> usize {
    irtcat_core::constants::DEFAULT_ADAPTIVE_LENGTH
}

#[derive(Debug, Deserialize)]
pub struct ScaleSection {
    #[serde(default = "default_max_category")]
    pub max_category: u8,
    /// One label per category, lowest first. Empty = numbers only.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Default for ScaleSection {
    fn default() -> Self {
        ScaleSection {
            max_category: default_max_category(),
            labels: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ItemEntry {
    pub index: ItemIndex,
    pub text: String,
    pub discrimination: f64,
    pub difficulty: f64,
    pub phase: ItemPhase,
}

#[derive(Debug, Deserialize)]
pub struct StudyFile {
    pub name: Option<String>,
    #[serde(default)]
    pub scale: ScaleSection,
    #[serde(default)]
    pub fixed_pre: Vec<ItemIndex>,
    #[serde(default = "default_adaptive_length")]
    pub adaptive_length: usize,
    #[serde(default)]
    pub fixed_post: Vec<ItemIndex>,
    /// Estimator tunables. `max_category` is always taken from `[scale]`.
    #[serde(default)]
    pub estimator: EstimatorOptions,
    pub items: Vec<ItemEntry>,
}

/// Estimator settings from the config file or CLI, applied over the study file's.
#[derive(Debug, Default, Clone, Copy)]
pub struct EstimatorOverrides {
    pub max_iterations: Option<usize>,
    pub tolerance: Option<f64>,
}

/// A validated study plus what the terminal needs to show it.
pub struct LoadedStudy {
    pub name: String,
    pub study: Arc<Study>,
    pub texts: HashMap<ItemIndex, String>,
    pub labels: Vec<String>,
}

impl LoadedStudy {
    pub fn text(&self, index: ItemIndex) -> &str {
        self.texts.get(&index).map(String::as_str).unwrap_or("")
    }

    pub fn max_category(&self) -> u8 {
        self.study.design().estimator.max_category
    }
}

/// Parse and validate study TOML.
pub fn parse_study(content: &str, overrides: EstimatorOverrides) -> Result<LoadedStudy, String> {
    let file: StudyFile = toml::from_str(content).map_err(|e| format!("invalid study file: {e}"))?;

    let max_category = file.scale.max_category;
    if !file.scale.labels.is_empty() && file.scale.labels.len() != usize::from(max_category) {
        return Err(format!(
            "scale has {} labels but max_category is {max_category}",
            file.scale.labels.len()
        ));
    }

    let mut estimator = file.estimator;
    estimator.max_category = max_category;
    if let Some(n) = overrides.max_iterations {
        estimator.max_iterations = n;
    }
    if let Some(t) = overrides.tolerance {
        estimator.tolerance = t;
    }

    let mut texts = HashMap::with_capacity(file.items.len());
    let items: Vec<Item> = file
        .items
        .into_iter()
        .map(|entry| {
            texts.insert(entry.index, entry.text);
            Item::new(entry.index, entry.discrimination, entry.difficulty, entry.phase)
        })
        .collect();

    let bank = ItemBank::new(items).map_err(|e| e.to_string())?;
    let design = SessionDesign {
        fixed_pre: file.fixed_pre,
        adaptive_length: file.adaptive_length,
        fixed_post: file.fixed_post,
        estimator,
    };
    let study = Study::new(bank, design).map_err(|e| e.to_string())?;

    Ok(LoadedStudy {
        name: file.name.unwrap_or_else(|| "study".to_string()),
        study: Arc::new(study),
        texts,
        labels: file.scale.labels,
    })
}

/// Load a study from disk. Exits with an error message on failure.
pub fn load_study(path: &Path, overrides: EstimatorOverrides) -> LoadedStudy {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| bail(format!("Failed to read study file {}: {e}", path.display())));
    parse_study(&content, overrides)
        .unwrap_or_else(|e| bail(format!("{}: {e}", path.display())))
}
