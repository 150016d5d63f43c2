use crate::constants::MIN_CATEGORY;

/// Caller-provided item identifier. Unique within a bank, stable across sessions.
pub type ItemIndex = usize;

/// How an item is administered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ItemPhase {
    /// Administered in a predetermined order, before or after the adaptive phase.
    Fixed,
    /// Eligible for information-driven selection.
    #[cfg_attr(feature = "serde", serde(alias = "adaptive"))]
    AdaptivePool,
}

/// A calibrated 2PL item.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Item {
    pub index: ItemIndex,
    /// `a`, slope of the response curve. Must be > 0.
    pub discrimination: f64,
    /// `b`, the theta at which P = 0.5.
    pub difficulty: f64,
    pub phase: ItemPhase,
}

impl Item {
    pub fn new(index: ItemIndex, discrimination: f64, difficulty: f64, phase: ItemPhase) -> Self {
        Item { index, discrimination, difficulty, phase }
    }
}

/// One observed answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Response {
    pub item_index: ItemIndex,
    /// Ordinal category, `1..=max_category`.
    pub category: u8,
}

impl Response {
    pub fn new(item_index: ItemIndex, category: u8) -> Self {
        Response { item_index, category }
    }

    /// Category mapped onto `[0, 1]`: `(category - 1) / (max_category - 1)`.
    ///
    /// Callers validate `max_category >= 2` first (`EstimatorOptions::validate`).
    pub(crate) fn normalized(&self, max_category: u8) -> f64 {
        let span = max_category.saturating_sub(MIN_CATEGORY).max(1);
        f64::from(self.category.saturating_sub(MIN_CATEGORY)) / f64::from(span)
    }
}

/// Point estimate of the latent trait.
///
/// Recomputed from the full response log each time; a new estimate replaces the old one.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityEstimate {
    pub theta: f64,
    pub standard_error: f64,
    /// False for the classical fallback and for Newton runs that hit the iteration cap.
    pub converged: bool,
    /// Newton-Raphson iterations performed. 0 for the fallback.
    pub iterations: usize,
}

/// Which path produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EstimationMethod {
    NewtonRaphson,
    /// Mean of normalized responses, used with too few responses or no usable curvature.
    Fallback,
}

/// State after one Newton-Raphson iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IterationStep {
    /// 1-based.
    pub iteration: usize,
    /// Theta after this iteration's update. Unchanged when the first curvature is degenerate.
    pub theta: f64,
    /// First derivative of the log-likelihood at the theta the iteration started from.
    pub score: f64,
    /// Test information at the theta the iteration started from.
    pub information: f64,
    /// Applied change in theta, Newton or bisection, after clamping to the bounds.
    /// `None` when the first curvature is degenerate.
    pub step: Option<f64>,
    pub standard_error: f64,
}

/// Everything the estimator did, for an external logger or report to consume.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EstimationTrace {
    pub method: EstimationMethod,
    pub steps: Vec<IterationStep>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_spans_unit_interval() {
        assert_eq!(Response::new(0, 1).normalized(5), 0.0);
        assert_eq!(Response::new(0, 3).normalized(5), 0.5);
        assert_eq!(Response::new(0, 5).normalized(5), 1.0);
    }

    #[test]
    fn test_normalized_single_category_is_finite() {
        assert_eq!(Response::new(0, 1).normalized(1), 0.0);
        assert!(Response::new(0, 2).normalized(0).is_finite());
    }
}
