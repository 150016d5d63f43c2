/// Simulated respondents for trying a study design before it goes live.
///
/// A respondent with known theta answers each item with
/// `1 + Binomial(max_category - 1, P(theta))`, so the expected normalized response is
/// exactly the 2PL probability the estimator models.
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::MIN_CATEGORY;
use crate::error::Result;
use crate::irt::probability;
use crate::session::{SessionController, SessionOutcome, Study};
use crate::types::Item;

pub struct SimulatedRespondent {
    true_theta: f64,
    rng: StdRng,
}

impl SimulatedRespondent {
    pub fn new(true_theta: f64, seed: u64) -> Self {
        SimulatedRespondent {
            true_theta,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn true_theta(&self) -> f64 {
        self.true_theta
    }

    /// Draw a category in `1..=max_category`.
    ///
    /// Scales with fewer than two categories always answer 1.
    pub fn respond(&mut self, item: &Item, max_category: u8) -> u8 {
        let p = probability(item, self.true_theta);
        let successes = (0..max_category.saturating_sub(MIN_CATEGORY))
            .filter(|_| self.rng.random::<f64>() < p)
            .count();
        MIN_CATEGORY + successes as u8
    }
}

/// SplitMix64 finalizer.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Seed for one replication, so parallel runs are reproducible regardless of scheduling.
///
/// Indices are hashed in one at a time, so seeds do not repeat across thetas however
/// many replications are run.
pub fn replication_seed(seed: u64, theta_index: usize, replication: usize) -> u64 {
    mix(mix(mix(seed) ^ theta_index as u64) ^ replication as u64)
}

/// Run one full session against a simulated respondent.
pub fn simulate_session(study: Arc<Study>, true_theta: f64, seed: u64) -> Result<SessionOutcome> {
    let max_category = study.design().estimator.max_category;
    let mut respondent = SimulatedRespondent::new(true_theta, seed);
    let mut controller = SessionController::new(Arc::clone(&study));

    while let Some(next) = controller.next_item()? {
        let item = study.bank().item(next.item)?;
        let category = respondent.respond(item, max_category);
        controller.record_response(next.item, category)?;
    }

    controller.finish()
}

/// How well repeated sessions recover one true theta.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecoverySummary {
    pub true_theta: f64,
    pub replications: usize,
    pub mean_theta: f64,
    pub bias: f64,
    pub rmse: f64,
    pub mean_standard_error: f64,
    pub mean_items: f64,
    /// Share of sessions whose final estimate converged.
    pub converged_rate: f64,
}

/// Aggregate outcomes for one true theta. `None` if there are no outcomes.
pub fn summarize(true_theta: f64, outcomes: &[SessionOutcome]) -> Option<RecoverySummary> {
    if outcomes.is_empty() {
        return None;
    }
    let n = outcomes.len() as f64;
    let mean = |f: &dyn Fn(&SessionOutcome) -> f64| outcomes.iter().map(f).sum::<f64>() / n;

    let mean_theta = mean(&|o| o.estimate.theta);
    Some(RecoverySummary {
        true_theta,
        replications: outcomes.len(),
        mean_theta,
        bias: mean_theta - true_theta,
        rmse: mean(&|o| (o.estimate.theta - true_theta).powi(2)).sqrt(),
        mean_standard_error: mean(&|o| o.estimate.standard_error),
        mean_items: mean(&|o| o.administered.len() as f64),
        converged_rate: mean(&|o| if o.estimate.converged { 1.0 } else { 0.0 }),
    })
}
