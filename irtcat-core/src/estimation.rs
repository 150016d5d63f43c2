/// Newton-Raphson maximum likelihood estimation of theta under the 2PL model.
///
/// Ordinal responses are scored as fractions of the scale (`(category - 1) / (max - 1)`)
/// and treated as fractional outcomes of a dichotomous 2PL item. Pure function of its
/// inputs: no state, no IO. Each iteration is emitted as a `tracing` debug event and
/// recorded in the returned `EstimationTrace`.
use std::collections::HashSet;

use tracing::debug;

use crate::bank::ItemBank;
use crate::constants::{
    CONVERGENCE_TOLERANCE, CURVATURE_EPSILON, DEFAULT_FALLBACK_SCALE, DEFAULT_MAX_CATEGORY,
    DEFAULT_MAX_ITERATIONS, DEFAULT_THETA_BOUNDS, FALLBACK_STANDARD_ERROR, INITIAL_THETA,
    MIN_CATEGORY, MIN_RESPONSES_FOR_MLE,
};
use crate::error::{CatError, Result};
use crate::irt::probability;
use crate::types::{
    AbilityEstimate, EstimationMethod, EstimationTrace, Item, IterationStep, Response,
};

/// Tunables for `estimate()`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EstimatorOptions {
    /// Highest response category. Categories run `1..=max_category`.
    pub max_category: u8,
    /// Hard cap on Newton-Raphson iterations.
    pub max_iterations: usize,
    /// Converged once an applied step is smaller than this.
    pub tolerance: f64,
    /// Curvatures with magnitude at or below this are degenerate.
    pub curvature_epsilon: f64,
    /// Theta is clamped into `[lower, upper]` after every update.
    pub theta_bounds: (f64, f64),
    /// Multiplier applied to the centered mean in the classical fallback.
    pub fallback_scale: f64,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        EstimatorOptions {
            max_category: DEFAULT_MAX_CATEGORY,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: CONVERGENCE_TOLERANCE,
            curvature_epsilon: CURVATURE_EPSILON,
            theta_bounds: DEFAULT_THETA_BOUNDS,
            fallback_scale: DEFAULT_FALLBACK_SCALE,
        }
    }
}

impl EstimatorOptions {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(CatError::InvalidOptions(msg)) };

        if self.max_category <= MIN_CATEGORY {
            return invalid(format!("max_category must be at least 2, got {}", self.max_category));
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations must be at least 1".to_string());
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return invalid(format!("tolerance must be positive, got {}", self.tolerance));
        }
        if !(self.curvature_epsilon.is_finite() && self.curvature_epsilon >= 0.0) {
            return invalid(format!(
                "curvature_epsilon must be non-negative, got {}",
                self.curvature_epsilon
            ));
        }
        let (lower, upper) = self.theta_bounds;
        if !(lower.is_finite() && upper.is_finite() && lower < upper) {
            return invalid(format!("theta_bounds must satisfy lower < upper, got ({lower}, {upper})"));
        }
        if !self.fallback_scale.is_finite() {
            return invalid(format!("fallback_scale must be finite, got {}", self.fallback_scale));
        }
        Ok(())
    }
}

/// Estimate theta from a response log.
///
/// Every response must name an item in `bank`, at most once, with a category in
/// `1..=options.max_category`. Numerical trouble is never an error: it yields the
/// classical fallback with `converged = false`.
pub fn estimate(
    bank: &ItemBank,
    responses: &[Response],
    options: &EstimatorOptions,
) -> Result<AbilityEstimate> {
    estimate_with_trace(bank, responses, options).map(|(estimate, _)| estimate)
}

/// `estimate()`, plus the per-iteration trace.
pub fn estimate_with_trace(
    bank: &ItemBank,
    responses: &[Response],
    options: &EstimatorOptions,
) -> Result<(AbilityEstimate, EstimationTrace)> {
    options.validate()?;
    let observations = collect_observations(bank, responses, options.max_category)?;

    if observations.len() < MIN_RESPONSES_FOR_MLE {
        debug!(responses = observations.len(), "too few responses for MLE, using fallback");
        return Ok(fallback(&observations, options, Vec::new()));
    }

    Ok(newton_raphson(&observations, options))
}

/// Administered item paired with its normalized response.
type Observation<'a> = (&'a Item, f64);

fn collect_observations<'a>(
    bank: &'a ItemBank,
    responses: &[Response],
    max_category: u8,
) -> Result<Vec<Observation<'a>>> {
    let mut seen = HashSet::with_capacity(responses.len());
    responses
        .iter()
        .map(|r| {
            let item = bank.item(r.item_index)?;
            if !(MIN_CATEGORY..=max_category).contains(&r.category) {
                return Err(CatError::CategoryOutOfRange {
                    item: r.item_index,
                    category: r.category,
                    max_category,
                });
            }
            if !seen.insert(r.item_index) {
                return Err(CatError::DuplicateResponse(r.item_index));
            }
            Ok((item, r.normalized(max_category)))
        })
        .collect()
}

/// First derivative of the log-likelihood and test information at theta.
fn derivatives(observations: &[Observation<'_>], theta: f64) -> (f64, f64) {
    observations.iter().fold((0.0, 0.0), |(score, information), &(item, x)| {
        let a = item.discrimination;
        let p = probability(item, theta);
        (score + a * (x - p), information + a * a * p * (1.0 - p))
    })
}

fn information_at(observations: &[Observation<'_>], theta: f64) -> f64 {
    derivatives(observations, theta).1
}

fn standard_error(information: f64) -> f64 {
    if information.is_finite() && information > 0.0 {
        1.0 / information.sqrt()
    } else {
        FALLBACK_STANDARD_ERROR
    }
}

/// Interval known to contain the root of the score.
///
/// The score is decreasing in theta, so a positive score puts the root above and a
/// negative one below. A bound only becomes a hard endpoint once the score has been
/// evaluated there.
#[derive(Debug, Clone, Copy)]
struct Bracket {
    lo: f64,
    hi: f64,
    lo_evaluated: bool,
    hi_evaluated: bool,
}

impl Bracket {
    fn new((lower, upper): (f64, f64)) -> Self {
        Bracket {
            lo: lower,
            hi: upper,
            lo_evaluated: false,
            hi_evaluated: false,
        }
    }

    fn narrow(&mut self, theta: f64, score: f64) {
        if score > 0.0 {
            self.lo = theta;
            self.lo_evaluated = true;
        } else if score < 0.0 {
            self.hi = theta;
            self.hi_evaluated = true;
        }
    }

    fn admits(&self, candidate: f64) -> bool {
        let above = candidate > self.lo || (candidate == self.lo && !self.lo_evaluated);
        let below = candidate < self.hi || (candidate == self.hi && !self.hi_evaluated);
        above && below
    }

    fn midpoint(&self) -> f64 {
        0.5 * (self.lo + self.hi)
    }
}

/// Safeguarded Newton-Raphson.
///
/// A Newton step is taken when it lands inside the bracket and the previous Newton
/// step reduced the magnitude of the score. Otherwise the bracket is bisected. Once
/// a usable curvature has been seen, a degenerate one is treated as an unbounded
/// step towards the bound the score points at.
fn newton_raphson(
    observations: &[Observation<'_>],
    options: &EstimatorOptions,
) -> (AbilityEstimate, EstimationTrace) {
    let (lower, upper) = options.theta_bounds;
    let mut theta = INITIAL_THETA.clamp(lower, upper);
    let mut bracket = Bracket::new(options.theta_bounds);
    let mut newton_score: Option<f64> = None;
    let mut steps: Vec<IterationStep> = Vec::with_capacity(options.max_iterations);
    let mut usable_curvature = false;
    let mut converged = false;

    for iteration in 1..=options.max_iterations {
        let (score, information) = derivatives(observations, theta);
        let curvature = -information;
        let usable = curvature.abs() > options.curvature_epsilon;

        if !usable && !usable_curvature {
            // Theta did not move, so every remaining iteration would repeat this one.
            let se = standard_error(information);
            debug!(iteration, theta, score, information, se, "degenerate curvature");
            steps.push(IterationStep {
                iteration,
                theta,
                score,
                information,
                step: None,
                standard_error: se,
            });
            break;
        }
        usable_curvature = true;
        bracket.narrow(theta, score);

        let unclamped = if usable {
            theta - score / curvature
        } else if score > 0.0 {
            upper
        } else if score < 0.0 {
            lower
        } else {
            theta
        };
        let newton = unclamped.clamp(lower, upper);
        let stalled = newton_score.is_some_and(|previous| score.abs() >= previous.abs());

        let next = if newton == theta || (!stalled && bracket.admits(newton)) {
            newton_score = Some(score);
            newton
        } else {
            newton_score = None;
            bracket.midpoint()
        };
        let applied = next - theta;
        theta = next;

        let se = standard_error(information_at(observations, theta));
        debug!(
            iteration,
            theta,
            score,
            information,
            step = applied,
            bisected = newton_score.is_none(),
            se,
            "newton-raphson iteration"
        );
        steps.push(IterationStep {
            iteration,
            theta,
            score,
            information,
            step: Some(applied),
            standard_error: se,
        });

        if applied.abs() < options.tolerance {
            converged = true;
            break;
        }
    }

    if !usable_curvature {
        debug!("curvature degenerate at every iteration, using fallback");
        return fallback(observations, options, steps);
    }

    let estimate = AbilityEstimate {
        theta,
        standard_error: standard_error(information_at(observations, theta)),
        converged,
        iterations: steps.len(),
    };
    let trace = EstimationTrace {
        method: EstimationMethod::NewtonRaphson,
        steps,
    };
    (estimate, trace)
}

/// Classical estimate: centered mean of normalized responses, scaled onto theta.
fn fallback(
    observations: &[Observation<'_>],
    options: &EstimatorOptions,
    steps: Vec<IterationStep>,
) -> (AbilityEstimate, EstimationTrace) {
    let (lower, upper) = options.theta_bounds;
    let theta = if observations.is_empty() {
        INITIAL_THETA
    } else {
        let mean = observations.iter().map(|&(_, x)| x).sum::<f64>() / observations.len() as f64;
        (mean - 0.5) * options.fallback_scale
    };

    let estimate = AbilityEstimate {
        theta: theta.clamp(lower, upper),
        standard_error: FALLBACK_STANDARD_ERROR,
        converged: false,
        iterations: 0,
    };
    let trace = EstimationTrace {
        method: EstimationMethod::Fallback,
        steps,
    };
    (estimate, trace)
}
